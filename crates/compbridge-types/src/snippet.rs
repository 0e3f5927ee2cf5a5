//! Snippet shapes shared with the storage and catalog collaborators.

use serde::{Deserialize, Serialize};

/// A saved, named component snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: u64,
    pub name: String,
    pub code: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw JSON text used to seed the preview input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data: Option<String>,
}

/// A read-only example from the built-in catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_data: Option<&'static str>,
}
