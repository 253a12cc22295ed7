//! # Request handling
//!
//! Connections do not touch the store directly. Each parsed command
//! becomes an [`ApiRequest`] sent to the [`NoteService`] task, which
//! owns the store and answers over a oneshot channel. Write paths
//! sanitize before they persist; read paths render per request.
mod server;

pub use server::{ConnId, NoteService};

use crate::content::ParsedContent;
use crate::session::UserId;
use crate::store::{Note, NoteSummary, SharingState};
use crate::validation::ValidationError;
use displaydoc::Display;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// What a connection can ask the service to do
#[derive(Debug)]
pub enum RequestKind {
    /// Resolve a session token
    Auth { token: String },
    /// Create a note from a raw JSON payload
    Create { user: UserId, payload: String },
    /// Update a note from a raw JSON payload
    Update { user: UserId, payload: String },
    /// Delete a note
    Delete { user: UserId, note_id: String },
    /// Toggle public sharing; the flag is the raw form value
    Share {
        user: UserId,
        note_id: String,
        enable: String,
    },
    /// Fetch one note
    Fetch { user: UserId, note_id: String },
    /// List the user's notes
    List { user: UserId },
    /// Render a note for display
    Render { user: UserId, note_id: String },
    /// Render the note behind a public slug
    Public { slug: String },
}

/// A rendered note page
#[derive(Debug, Clone, Serialize)]
pub struct RenderedNote {
    pub title: String,
    pub html: String,
}

/// A fetched note together with its content parsed for the editor
#[derive(Debug, Clone, Serialize)]
pub struct NotePayload {
    pub note: Note,
    pub content: ParsedContent,
}

/// A successful answer from the service
#[derive(Debug)]
pub enum Reply {
    Session(UserId),
    Created(Uuid),
    Updated(Uuid),
    Deleted,
    Sharing(SharingState),
    Note(NotePayload),
    Listing(Vec<NoteSummary>),
    Rendered(RenderedNote),
}

/// A refused request; every variant renders as its user-facing message
#[derive(Debug, Error, Display)]
pub enum ServiceError {
    /// Not authenticated
    NotAuthenticated,
    /// Note not found
    NotFound,
    /// Note not found or access denied.
    AccessDenied,
    /// Invalid input
    InvalidInput,
    /// {0}
    Invalid(#[from] ValidationError),
    /// Failed to create note. Please try again.
    CreateFailed,
    /// Failed to update note. Please try again.
    UpdateFailed,
}

/// A request as the service sees it
#[derive(Debug)]
pub struct ApiRequest {
    pub source: ConnId,
    pub kind: RequestKind,
    pub response: oneshot::Sender<Result<Reply, ServiceError>>,
}

/// Error when a request could not complete
#[derive(Debug, Error, Display)]
pub enum RequestError {
    /// Receiving the reply failed
    RecvFailed(#[from] oneshot::error::RecvError),
    /// Sending the request failed
    SendFailed(#[from] mpsc::error::SendError<ApiRequest>),
    /// {0}
    Service(#[from] ServiceError),
}

/// A handle for sending requests to the note service
#[derive(Debug, Clone)]
pub struct ServiceClient(mpsc::Sender<ApiRequest>);

impl From<mpsc::Sender<ApiRequest>> for ServiceClient {
    fn from(inner: mpsc::Sender<ApiRequest>) -> Self {
        Self(inner)
    }
}

impl ServiceClient {
    /// Send one request and wait for the service's answer.
    pub async fn request(&mut self, source: ConnId, kind: RequestKind) -> Result<Reply, RequestError> {
        let (tx, rx) = oneshot::channel();

        self.0
            .send(ApiRequest {
                source,
                kind,
                response: tx,
            })
            .await
            .map_err(RequestError::SendFailed)?;

        let reply = rx.await?;
        Ok(reply?)
    }
}
