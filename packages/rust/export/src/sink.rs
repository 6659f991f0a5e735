//! Local mirror layout.
//!
//! ```text
//! <root>/
//!   <space key>/
//!     space.json
//!     pages/
//!       <page id>_<title>/
//!         metadata.json
//!         content.html
//!         content.md          (optional)
//!         attachments/
//!           <title>
//!           <title>.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use wikimirror_shared::{Attachment, MirrorError, Page, Result, Space, sanitize_filename};

/// Writes exported entities into the mirror directory tree.
#[derive(Debug, Clone)]
pub struct ExportSink {
    root: PathBuf,
}

impl ExportSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|err| MirrorError::io(&self.root, err))
    }

    /// Create the space directory and write `space.json`.
    pub fn write_space(&self, space: &Space) -> Result<PathBuf> {
        let dir = self.root.join(sanitize_filename(&space.key));
        fs::create_dir_all(&dir).map_err(|err| MirrorError::io(&dir, err))?;

        let mut doc = json!({
            "id": space.id,
            "key": space.key,
            "name": space.name,
            "type": space.kind,
            "status": space.status,
        });
        if let Some(description) = space.description_text() {
            doc["description"] = json!(description);
        }
        write_json(&dir.join("space.json"), &doc)?;
        Ok(dir)
    }

    pub fn pages_dir(&self, space_dir: &Path) -> Result<PathBuf> {
        let dir = space_dir.join("pages");
        fs::create_dir_all(&dir).map_err(|err| MirrorError::io(&dir, err))?;
        Ok(dir)
    }

    /// Page directories are keyed by id so title collisions cannot clobber
    /// each other.
    pub fn create_page_dir(&self, pages_dir: &Path, page: &Page) -> Result<PathBuf> {
        let dir = pages_dir.join(format!("{}_{}", page.id, sanitize_filename(&page.title)));
        fs::create_dir_all(&dir).map_err(|err| MirrorError::io(&dir, err))?;
        Ok(dir)
    }

    pub fn write_page_metadata(&self, page_dir: &Path, page: &Page) -> Result<()> {
        let mut doc = json!({
            "id": page.id,
            "title": page.title,
            "status": page.status,
            "spaceId": page.space_id,
            "parentId": page.parent_id,
        });
        if let Some(version) = &page.version {
            doc["version"] = json!({
                "number": version.number,
                "createdAt": version.created_at,
            });
        }
        write_json(&page_dir.join("metadata.json"), &doc)
    }

    pub fn write_content_html(&self, page_dir: &Path, storage_html: &str) -> Result<()> {
        let path = page_dir.join("content.html");
        fs::write(&path, storage_html).map_err(|err| MirrorError::io(&path, err))
    }

    pub fn write_content_markdown(&self, page_dir: &Path, markdown: &str) -> Result<()> {
        let path = page_dir.join("content.md");
        fs::write(&path, markdown).map_err(|err| MirrorError::io(&path, err))
    }

    pub fn create_attachments_dir(&self, page_dir: &Path) -> Result<PathBuf> {
        let dir = page_dir.join("attachments");
        fs::create_dir_all(&dir).map_err(|err| MirrorError::io(&dir, err))?;
        Ok(dir)
    }

    pub fn write_attachment(
        &self,
        attachments_dir: &Path,
        attachment: &Attachment,
        data: &[u8],
    ) -> Result<PathBuf> {
        let path = attachments_dir.join(sanitize_filename(&attachment.title));
        fs::write(&path, data).map_err(|err| MirrorError::io(&path, err))?;
        Ok(path)
    }

    pub fn write_attachment_metadata(
        &self,
        attachments_dir: &Path,
        attachment: &Attachment,
    ) -> Result<()> {
        let doc = json!({
            "id": attachment.id,
            "title": attachment.title,
            "type": attachment.kind,
            "mediaType": attachment.media_type,
            "fileSize": attachment.file_size,
        });
        let name = format!("{}.json", sanitize_filename(&attachment.title));
        write_json(&attachments_dir.join(name), &doc)
    }
}

fn write_json(path: &Path, doc: &serde_json::Value) -> Result<()> {
    let pretty = serde_json::to_string_pretty(doc)
        .map_err(|err| MirrorError::decode(err.to_string()))?;
    fs::write(path, pretty).map_err(|err| MirrorError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikimirror_shared::PageVersion;

    fn space() -> Space {
        serde_json::from_value(json!({
            "id": "10",
            "key": "DOCS",
            "name": "Documentation",
            "type": "global",
            "status": "current",
            "description": {"plain": {"value": "Team docs", "representation": "plain"}},
        }))
        .unwrap()
    }

    fn page() -> Page {
        Page {
            id: "42".into(),
            status: "current".into(),
            title: "Setup / Install".into(),
            space_id: "10".into(),
            parent_id: None,
            version: Some(PageVersion {
                number: 3,
                created_at: Some("2024-01-02T03:04:05Z".into()),
            }),
            body: None,
        }
    }

    #[test]
    fn writes_space_json_with_description() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = ExportSink::new(tmp.path());
        sink.create_root().unwrap();

        let dir = sink.write_space(&space()).unwrap();
        assert_eq!(dir, tmp.path().join("DOCS"));

        let raw = fs::read_to_string(dir.join("space.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["key"], "DOCS");
        assert_eq!(doc["type"], "global");
        assert_eq!(doc["description"], "Team docs");
    }

    #[test]
    fn page_dir_name_combines_id_and_sanitized_title() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = ExportSink::new(tmp.path());
        let pages = sink.pages_dir(tmp.path()).unwrap();

        let dir = sink.create_page_dir(&pages, &page()).unwrap();
        assert_eq!(dir.file_name().unwrap(), "42_Setup _ Install");
    }

    #[test]
    fn page_metadata_includes_version() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = ExportSink::new(tmp.path());
        sink.write_page_metadata(tmp.path(), &page()).unwrap();

        let raw = fs::read_to_string(tmp.path().join("metadata.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["id"], "42");
        assert_eq!(doc["version"]["number"], 3);
        assert_eq!(doc["version"]["createdAt"], "2024-01-02T03:04:05Z");
    }

    #[test]
    fn attachment_data_and_metadata_land_side_by_side() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = ExportSink::new(tmp.path());
        let dir = sink.create_attachments_dir(tmp.path()).unwrap();

        let attachment: Attachment = serde_json::from_value(json!({
            "id": "att1",
            "type": "attachment",
            "title": "diagram.png",
            "mediaType": "image/png",
            "fileSize": 4,
            "downloadLink": "/download/att1",
        }))
        .unwrap();

        sink.write_attachment(&dir, &attachment, b"\x89PNG").unwrap();
        sink.write_attachment_metadata(&dir, &attachment).unwrap();

        assert_eq!(fs::read(dir.join("diagram.png")).unwrap(), b"\x89PNG");
        let raw = fs::read_to_string(dir.join("diagram.png.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["mediaType"], "image/png");
        assert_eq!(doc["fileSize"], 4);
    }
}
