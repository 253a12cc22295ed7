use super::{ApiRequest, NotePayload, RenderedNote, Reply, RequestKind, ServiceError};
use crate::content::parse_content;
use crate::render;
use crate::sanitize::Sanitizer;
use crate::session::Sessions;
use crate::store::{Note, NoteStore};
use crate::validation;
use derive_new::new;
use displaydoc::Display;
use futures_util::future::{select, Either};
use log::*;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

/// ID for a client connection
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
/// conn#{0}
pub struct ConnId(u64);

impl From<ConnId> for u64 {
    fn from(c_id: ConnId) -> u64 {
        c_id.0
    }
}

impl From<u64> for ConnId {
    fn from(id: u64) -> ConnId {
        ConnId(id)
    }
}

/// The task that owns the notes
#[derive(new)]
pub struct NoteService {
    msg_rx: mpsc::Receiver<ApiRequest>,
    ter_rx: oneshot::Receiver<()>,
    store: NoteStore,
    sessions: Sessions,
    #[new(default)]
    sanitizer: Sanitizer,
}

impl NoteService {
    /// The main loop of the service
    pub async fn run(self) {
        let NoteService {
            msg_rx,
            ter_rx,
            mut store,
            sessions,
            sanitizer,
        } = self;
        let mut msg_rx = ReceiverStream::new(msg_rx);

        let mut ter_fut = ter_rx;
        let mut msg_fut = Box::pin(msg_rx.next());
        loop {
            match select(ter_fut, msg_fut).await {
                Either::Left((sig, _msg_fut)) => {
                    match sig {
                        Ok(()) => info!("Terminate signal received, shutting down"),
                        Err(_) => info!("Terminate channel closed, shutting down"),
                    }
                    break;
                }
                Either::Right((req, ter_fut_continue)) => {
                    if let Some(ApiRequest {
                        source,
                        kind,
                        response,
                    }) = req
                    {
                        let reply = dispatch(source, kind, &mut store, &sessions, &sanitizer).await;
                        if response.send(reply).is_err() {
                            debug!("Connection {} dropped before its reply", source);
                        }
                    } else {
                        debug!("Request stream closed");
                        break;
                    }
                    ter_fut = ter_fut_continue;
                    msg_fut = Box::pin(msg_rx.next());
                }
            }
        }
    }
}

fn render_note(note: &Note) -> RenderedNote {
    let views = render::render_document(&note.content_json);
    RenderedNote {
        title: note.title.clone(),
        html: render::to_html(&views),
    }
}

async fn dispatch(
    source: ConnId,
    kind: RequestKind,
    store: &mut NoteStore,
    sessions: &Sessions,
    sanitizer: &Sanitizer,
) -> Result<Reply, ServiceError> {
    match kind {
        RequestKind::Auth { token } => {
            let session = sessions
                .get_session(&token)
                .ok_or(ServiceError::NotAuthenticated)?;
            info!("{} authenticated as {}", source, session.user);
            Ok(Reply::Session(session.user))
        }
        RequestKind::Create { user, payload } => {
            let params = serde_json::from_str(&payload).map_err(|_| ServiceError::InvalidInput)?;
            let form = validation::validate_create(params)?;
            let note = Note {
                id: Uuid::new_v4(),
                owner: user,
                title: sanitizer.clean_text(&form.title),
                content_json: sanitizer.sanitize_content(&form.content_json),
                is_public: false,
                public_slug: None,
            };
            let id = note.id;
            if let Err(err) = store.insert(note).await {
                error!("Could not store new note: {:#}", err);
                return Err(ServiceError::CreateFailed);
            }
            info!("{} created note {}", source, id);
            Ok(Reply::Created(id))
        }
        RequestKind::Update { user, payload } => {
            let params = serde_json::from_str(&payload).map_err(|_| ServiceError::InvalidInput)?;
            let form = validation::validate_update(params)?;
            let title = sanitizer.clean_text(&form.title);
            let content_json = sanitizer.sanitize_content(&form.content_json);
            match store.update(&form.id, &user, title, content_json).await {
                Ok(true) => {
                    debug!("{} updated note {}", source, form.id);
                    Ok(Reply::Updated(form.id))
                }
                Ok(false) => Err(ServiceError::AccessDenied),
                Err(err) => {
                    error!("Could not update note {}: {:#}", form.id, err);
                    Err(ServiceError::UpdateFailed)
                }
            }
        }
        RequestKind::Delete { user, note_id } => {
            // A malformed id deletes nothing, silently, like an id that
            // matches no note.
            if let Ok(id) = Uuid::parse_str(&note_id) {
                match store.delete(&id, &user).await {
                    Ok(true) => debug!("{} deleted note {}", source, id),
                    Ok(false) => {}
                    Err(err) => error!("Could not delete note {}: {:#}", id, err),
                }
            }
            Ok(Reply::Deleted)
        }
        RequestKind::Share {
            user,
            note_id,
            enable,
        } => {
            let form = validation::validate_sharing(&note_id, &enable)?;
            let id = Uuid::parse_str(&form.note_id).map_err(|_| ServiceError::NotFound)?;
            match store.set_sharing(&id, &user, form.enable).await {
                Ok(Some(state)) => Ok(Reply::Sharing(state)),
                Ok(None) => Err(ServiceError::NotFound),
                Err(err) => {
                    error!("Could not toggle sharing of {}: {:#}", id, err);
                    Err(ServiceError::UpdateFailed)
                }
            }
        }
        RequestKind::Fetch { user, note_id } => {
            let id = Uuid::parse_str(&note_id).map_err(|_| ServiceError::NotFound)?;
            let note = store.get(&id, &user).cloned().ok_or(ServiceError::NotFound)?;
            let content = parse_content(Some(&note.content_json));
            Ok(Reply::Note(NotePayload { note, content }))
        }
        RequestKind::List { user } => Ok(Reply::Listing(store.list(&user))),
        RequestKind::Render { user, note_id } => {
            let id = Uuid::parse_str(&note_id).map_err(|_| ServiceError::NotFound)?;
            let note = store.get(&id, &user).ok_or(ServiceError::NotFound)?;
            Ok(Reply::Rendered(render_note(note)))
        }
        RequestKind::Public { slug } => {
            let note = store.find_public(&slug).ok_or(ServiceError::NotFound)?;
            Ok(Reply::Rendered(render_note(note)))
        }
    }
}
