pub mod backoff;
pub mod http;

use std::time::Duration;

use crate::domain::note::{MetadataSpec, Note, NoteFilter, NoteList, NoteParts, Notebook, User};

/// Everything the service can tell us about a failed call. `RateLimited` is
/// the only recoverable case and carries the wait the service suggested, when
/// it suggested one.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("rate limited by the service")]
    RateLimited { retry_after: Option<Duration> },

    #[error("failed after {retries} retries due to rate limiting")]
    RetriesExhausted { retries: u32 },

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("service request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode service response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Network(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// The remote note-store surface this tool consumes. Kept as a trait so the
/// batch loop can run against fakes in tests and against HTTP in production.
pub trait NoteStore {
    fn list_notebooks(&self) -> ServiceResult<Vec<Notebook>>;

    fn find_notes_metadata(
        &self,
        filter: &NoteFilter,
        offset: u32,
        max_notes: u32,
        spec: &MetadataSpec,
    ) -> ServiceResult<NoteList>;

    fn get_note(&self, guid: &str, parts: NoteParts) -> ServiceResult<Note>;

    fn update_note(&self, note: &Note) -> ServiceResult<Note>;

    fn get_user(&self) -> ServiceResult<User>;
}
