//! # Note storage
//!
//! Notes are held in memory and, when a directory is configured,
//! mirrored to one JSON file per note id. Every access that touches a
//! specific note is scoped to its owner; the only unauthenticated path
//! in is a public slug.
use crate::session::UserId;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::*;
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Length of a minted public slug
const SLUG_LEN: usize = 16;

/// One stored note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub owner: UserId,
    pub title: String,
    pub content_json: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub public_slug: Option<String>,
}

/// The subset of a note sent in listings
#[derive(Debug, Clone, Serialize)]
pub struct NoteSummary {
    pub id: Uuid,
    pub title: String,
    pub is_public: bool,
}

/// The sharing state after a toggle
#[derive(Debug, Clone, Serialize)]
pub struct SharingState {
    pub is_public: bool,
    pub slug: Option<String>,
}

pub struct NoteStore {
    notes: HashMap<Uuid, Note>,
    slugs: HashMap<String, Uuid>,
    save_dir: Option<PathBuf>,
}

impl NoteStore {
    /// Open a store, loading any notes persisted under `save_dir`.
    ///
    /// Files that do not parse are skipped with a warning; one corrupt
    /// note must not take the service down.
    pub async fn open(save_dir: Option<PathBuf>) -> Result<Self> {
        let mut store = NoteStore {
            notes: HashMap::new(),
            slugs: HashMap::new(),
            save_dir,
        };
        if let Some(dir) = store.save_dir.clone() {
            fs::create_dir_all(&dir)
                .await
                .wrap_err("Could not create the notes directory")?;
            let mut entries = fs::read_dir(&dir)
                .await
                .wrap_err("Could not read the notes directory")?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .wrap_err("Could not read the notes directory")?
            {
                let path = entry.path();
                if path.extension() != Some(OsStr::new("json")) {
                    continue;
                }
                let data = fs::read(&path)
                    .await
                    .wrap_err_with(|| format!("Could not read {}", path.display()))?;
                match serde_json::from_slice::<Note>(&data) {
                    Ok(note) => {
                        store.index(note);
                    }
                    Err(err) => warn!("Skipping {}: {}", path.display(), err),
                }
            }
            info!("Loaded {} notes from {}", store.notes.len(), dir.display());
        }
        Ok(store)
    }

    fn index(&mut self, note: Note) {
        if let Some(slug) = &note.public_slug {
            self.slugs.insert(slug.clone(), note.id);
        }
        self.notes.insert(note.id, note);
    }

    fn note_path(dir: &Path, id: &Uuid) -> PathBuf {
        dir.join(format!("{}.json", id))
    }

    async fn persist(&self, note: &Note) -> Result<()> {
        if let Some(dir) = &self.save_dir {
            let path = Self::note_path(dir, &note.id);
            let data = serde_json::to_vec_pretty(note)?;
            fs::write(&path, data)
                .await
                .wrap_err_with(|| format!("Could not write {}", path.display()))?;
        }
        Ok(())
    }

    /// Insert a new note.
    pub async fn insert(&mut self, note: Note) -> Result<()> {
        self.persist(&note).await?;
        self.index(note);
        Ok(())
    }

    /// Update title and content of an owned note. `false` means no note
    /// matched the id and owner.
    pub async fn update(
        &mut self,
        id: &Uuid,
        owner: &UserId,
        title: String,
        content_json: String,
    ) -> Result<bool> {
        let note = match self.notes.get_mut(id) {
            Some(note) if &note.owner == owner => note,
            _ => return Ok(false),
        };
        note.title = title;
        note.content_json = content_json;
        let note = note.clone();
        self.persist(&note).await?;
        Ok(true)
    }

    /// Delete an owned note. Unknown ids and foreign notes are a no-op.
    pub async fn delete(&mut self, id: &Uuid, owner: &UserId) -> Result<bool> {
        match self.notes.get(id) {
            Some(note) if &note.owner == owner => {}
            _ => return Ok(false),
        }
        if let Some(note) = self.notes.remove(id) {
            if let Some(slug) = &note.public_slug {
                self.slugs.remove(slug);
            }
            if let Some(dir) = &self.save_dir {
                let path = Self::note_path(dir, id);
                if let Err(err) = fs::remove_file(&path).await {
                    if err.kind() != io::ErrorKind::NotFound {
                        return Err(err)
                            .wrap_err_with(|| format!("Could not remove {}", path.display()));
                    }
                }
            }
        }
        Ok(true)
    }

    /// An owned note.
    pub fn get(&self, id: &Uuid, owner: &UserId) -> Option<&Note> {
        self.notes.get(id).filter(|note| &note.owner == owner)
    }

    /// All notes of one owner, ordered by title.
    pub fn list(&self, owner: &UserId) -> Vec<NoteSummary> {
        let mut summaries: Vec<NoteSummary> = self
            .notes
            .values()
            .filter(|note| &note.owner == owner)
            .map(|note| NoteSummary {
                id: note.id,
                title: note.title.clone(),
                is_public: note.is_public,
            })
            .collect();
        summaries.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    /// The note behind a public slug, if it is currently shared.
    pub fn find_public(&self, slug: &str) -> Option<&Note> {
        let id = self.slugs.get(slug)?;
        self.notes.get(id).filter(|note| note.is_public)
    }

    /// Toggle public sharing of an owned note.
    ///
    /// The first enable mints a slug; re-enabling reuses it, and
    /// disabling keeps it around so the URL stays stable across
    /// toggles. `None` means no note matched.
    pub async fn set_sharing(
        &mut self,
        id: &Uuid,
        owner: &UserId,
        enable: bool,
    ) -> Result<Option<SharingState>> {
        let note = match self.notes.get_mut(id) {
            Some(note) if &note.owner == owner => note,
            _ => return Ok(None),
        };
        if enable && note.public_slug.is_none() {
            note.public_slug = Some(nanoid!(SLUG_LEN));
        }
        note.is_public = enable;
        let note = note.clone();
        if let Some(slug) = &note.public_slug {
            self.slugs.insert(slug.clone(), note.id);
        }
        self.persist(&note).await?;
        Ok(Some(SharingState {
            is_public: note.is_public,
            slug: note.public_slug,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::{Note, NoteStore};
    use crate::session::UserId;
    use uuid::Uuid;

    fn note(owner: &UserId, title: &str) -> Note {
        Note {
            id: Uuid::new_v4(),
            owner: owner.clone(),
            title: title.to_owned(),
            content_json: String::from(r#"{"type":"doc","content":[]}"#),
            is_public: false,
            public_slug: None,
        }
    }

    #[tokio::test]
    async fn get_is_owner_scoped() {
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        let mut store = NoteStore::open(None).await.unwrap();
        let n = note(&alice, "Mine");
        let id = n.id;
        store.insert(n).await.unwrap();

        assert!(store.get(&id, &alice).is_some());
        assert!(store.get(&id, &bob).is_none());
    }

    #[tokio::test]
    async fn update_misses_foreign_notes() {
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        let mut store = NoteStore::open(None).await.unwrap();
        let n = note(&alice, "Mine");
        let id = n.id;
        store.insert(n).await.unwrap();

        let changed = store
            .update(&id, &bob, String::from("Stolen"), String::from("{}"))
            .await
            .unwrap();
        assert!(!changed);
        assert_eq!(store.get(&id, &alice).unwrap().title, "Mine");

        let changed = store
            .update(&id, &alice, String::from("Renamed"), String::from("{}"))
            .await
            .unwrap();
        assert!(changed);
        assert_eq!(store.get(&id, &alice).unwrap().title, "Renamed");
    }

    #[tokio::test]
    async fn delete_misses_foreign_notes() {
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        let mut store = NoteStore::open(None).await.unwrap();
        let n = note(&alice, "Mine");
        let id = n.id;
        store.insert(n).await.unwrap();

        assert!(!store.delete(&id, &bob).await.unwrap());
        assert!(store.delete(&id, &alice).await.unwrap());
        assert!(store.get(&id, &alice).is_none());
    }

    #[tokio::test]
    async fn listing_is_owner_scoped_and_ordered() {
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        let mut store = NoteStore::open(None).await.unwrap();
        store.insert(note(&alice, "Beta")).await.unwrap();
        store.insert(note(&alice, "Alpha")).await.unwrap();
        store.insert(note(&bob, "Other")).await.unwrap();

        let titles: Vec<_> = store.list(&alice).into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn sharing_mints_a_stable_slug() {
        let alice = UserId::from("alice");
        let mut store = NoteStore::open(None).await.unwrap();
        let n = note(&alice, "Mine");
        let id = n.id;
        store.insert(n).await.unwrap();

        let enabled = store.set_sharing(&id, &alice, true).await.unwrap().unwrap();
        assert!(enabled.is_public);
        let slug = enabled.slug.unwrap();
        assert_eq!(slug.len(), 16);
        assert!(store.find_public(&slug).is_some());

        let disabled = store.set_sharing(&id, &alice, false).await.unwrap().unwrap();
        assert!(!disabled.is_public);
        assert_eq!(disabled.slug.as_deref(), Some(slug.as_str()));
        assert!(store.find_public(&slug).is_none());

        let again = store.set_sharing(&id, &alice, true).await.unwrap().unwrap();
        assert_eq!(again.slug.as_deref(), Some(slug.as_str()));
    }

    #[tokio::test]
    async fn sharing_unknown_note_is_none() {
        let alice = UserId::from("alice");
        let mut store = NoteStore::open(None).await.unwrap();
        let missing = Uuid::new_v4();
        assert!(store
            .set_sharing(&missing, &alice, true)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn notes_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let alice = UserId::from("alice");
        let id = {
            let mut store = NoteStore::open(Some(dir.path().to_owned())).await.unwrap();
            let n = note(&alice, "Persisted");
            let id = n.id;
            store.insert(n).await.unwrap();
            store.set_sharing(&id, &alice, true).await.unwrap();
            id
        };

        let store = NoteStore::open(Some(dir.path().to_owned())).await.unwrap();
        let loaded = store.get(&id, &alice).unwrap();
        assert_eq!(loaded.title, "Persisted");
        assert!(loaded.is_public);
        let slug = loaded.public_slug.clone().unwrap();
        assert!(store.find_public(&slug).is_some());
    }
}
