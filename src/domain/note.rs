use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub guid: String,
    pub name: String,
}

/// Title-only listing entry; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteMeta {
    pub guid: String,
    pub title: String,
}

/// Full note as far as this tool cares: `created` is epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub guid: String,
    pub title: String,
    pub created: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

/// Search scope for the metadata listing call. Serialized straight into the
/// search request body; an absent notebook is omitted, not sent as null.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NoteFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notebook_guid: Option<String>,
}

impl NoteFilter {
    pub fn for_notebook(guid: impl Into<String>) -> Self {
        Self {
            notebook_guid: Some(guid.into()),
        }
    }
}

/// Which fields the metadata listing should fill in.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetadataSpec {
    pub include_title: bool,
}

impl MetadataSpec {
    pub fn titles() -> Self {
        Self {
            include_title: true,
        }
    }
}

/// Inclusion flags for the full-note fetch. All false fetches just the
/// attributes, which is all the batch loop needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteParts {
    pub content: bool,
    pub resources: bool,
    pub recognition: bool,
    pub alternate_data: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteList {
    pub total_notes: u32,
    pub notes: Vec<NoteMeta>,
}
