//! Wire types for the knowledge-base v2 API.
//!
//! These are read-only snapshots of remote state, constructed fresh per run
//! and discarded after being written to the sink.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Space
// ---------------------------------------------------------------------------

/// A top-level content container (a named workspace).
#[derive(Debug, Clone, Deserialize)]
pub struct Space {
    pub id: String,
    pub key: String,
    pub name: String,
    /// `global`, `personal`, ...
    #[serde(rename = "type", default)]
    pub kind: String,
    /// `current` or `archived`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: Option<SpaceDescription>,
}

/// Nested `{ plain: { value } }` wire shape of a space description.
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceDescription {
    #[serde(default)]
    pub plain: Option<PlainValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlainValue {
    #[serde(default)]
    pub value: String,
}

impl Space {
    /// Plain-text description, if the API supplied one.
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_ref()
            .and_then(|d| d.plain.as_ref())
            .map(|p| p.value.as_str())
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// A versioned document owned by exactly one space, optionally nested
/// under a parent page.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "spaceId", default)]
    pub space_id: String,
    #[serde(rename = "parentId", default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub version: Option<PageVersion>,
    #[serde(default)]
    pub body: Option<PageBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageVersion {
    #[serde(default)]
    pub number: i64,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageBody {
    #[serde(default)]
    pub storage: Option<StorageBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageBody {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub representation: String,
}

impl Page {
    /// The storage-format body, if the page has one. A page with no body
    /// produces no content artifact.
    pub fn storage_body(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.storage.as_ref())
            .map(|s| s.value.as_str())
    }
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// A binary file associated with one page.
///
/// The API inconsistently represents `downloadLink` as either a bare URL
/// string or an object carrying a `url` field; both variants are permanently
/// supported and normalized to `download_url` at decode time. An empty
/// `download_url` is a terminal "no source" condition for that attachment.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    #[serde(rename = "fileSize", default)]
    pub file_size: i64,
    #[serde(
        rename = "downloadLink",
        default,
        deserialize_with = "de_download_link"
    )]
    pub download_url: String,
}

/// Normalize the polymorphic download-link wire value into one URL string.
///
/// String form wins, then an object's `url` field; anything else (absent,
/// null, unexpected shape) yields the empty string rather than an error.
pub fn resolve_download_link(value: &serde_json::Value) -> String {
    if let Some(s) = value.as_str() {
        return s.to_string();
    }
    if let Some(url) = value.get("url").and_then(|u| u.as_str()) {
        return url.to_string();
    }
    String::new()
}

fn de_download_link<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(resolve_download_link(&value))
}
