//! Shared resource library: links and uploaded files.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Viewer;
use crate::backend::{BlobRef, BlobStore, Document, DocumentStore, from_document, to_document};
use crate::constants::{MAX_UPLOAD_BYTES, RESOURCES_COLLECTION};
use crate::error::{UntetheredError, UntetheredResult, ValidationError};

/// Accepted upload types by file extension.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("ogg", "video/ogg"),
    ("ogv", "video/ogg"),
    ("pdf", "application/pdf"),
];

/// The MIME type for an allowed file, judged by extension.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

fn is_allowed_type(content_type: &str) -> bool {
    ALLOWED_TYPES.iter().any(|(_, mime)| *mime == content_type)
}

/// Prefix `https://` when the link has no scheme.
pub fn normalize_link(link: &str) -> String {
    let link = link.trim();
    let lower = link.to_lowercase();
    if link.is_empty() || lower.starts_with("http://") || lower.starts_with("https://") {
        link.to_string()
    } else {
        format!("https://{link}")
    }
}

/// The text fields of a resource being shared.
#[derive(Debug, Clone, Default)]
pub struct ResourceDraft {
    pub topic: String,
    pub description: String,
    pub link: String,
}

/// A file to attach to a resource.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Build an upload, deriving the content type from the file name.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ValidationError> {
        let file_name = file_name.into();
        let content_type = content_type_for(Path::new(&file_name))
            .ok_or_else(|| ValidationError::DisallowedFileType(file_name.clone()))?;
        Ok(Upload {
            file_name,
            content_type: content_type.to_string(),
            bytes,
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bytes.len() as u64 > MAX_UPLOAD_BYTES {
            return Err(ValidationError::FileTooLarge(MAX_UPLOAD_BYTES / (1024 * 1024)));
        }
        if !is_allowed_type(&self.content_type) {
            return Err(ValidationError::DisallowedFileType(self.content_type.clone()));
        }
        Ok(())
    }

    /// Blob path `resources/{millis}_{slug}.{ext}`.
    fn blob_path(&self, now: DateTime<Utc>) -> String {
        let path = Path::new(&self.file_name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(slug::slugify)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "file".to_string());
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();

        format!("resources/{}_{}{}", now.timestamp_millis(), stem, ext)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub topic: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    pub uploaded_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Resource {
    fn from_entry(id: String, document: Document) -> UntetheredResult<Self> {
        let mut resource: Resource = from_document(document)?;
        resource.id = id;
        Ok(resource)
    }

    pub fn is_uploaded_by(&self, viewer: &Viewer) -> bool {
        match &self.uploader_uid {
            Some(uid) => uid == viewer.uid(),
            None => self.uploaded_by == viewer.handle(),
        }
    }
}

pub struct ResourceLibrary<B> {
    backend: Arc<B>,
}

impl<B: DocumentStore + BlobStore> ResourceLibrary<B> {
    pub fn new(backend: Arc<B>) -> Self {
        ResourceLibrary { backend }
    }

    /// Every resource, newest first.
    pub async fn list(&self) -> UntetheredResult<Vec<Resource>> {
        let mut resources = self
            .backend
            .scan(RESOURCES_COLLECTION)
            .await?
            .into_iter()
            .map(|(id, document)| Resource::from_entry(id, document))
            .collect::<UntetheredResult<Vec<_>>>()?;

        resources.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(resources)
    }

    /// Share a link and/or a file. Everything is validated before the first
    /// backend call.
    pub async fn share(
        &self,
        viewer: &Viewer,
        draft: ResourceDraft,
        upload: Option<Upload>,
    ) -> UntetheredResult<Resource> {
        if draft.topic.trim().is_empty() {
            return Err(ValidationError::Required("Topic").into());
        }
        if draft.link.trim().is_empty() && upload.is_none() {
            return Err(ValidationError::LinkOrFileRequired.into());
        }
        if let Some(upload) = &upload {
            upload.validate()?;
        }

        let now = Utc::now();
        let mut resource = Resource {
            id: String::new(),
            topic: draft.topic.trim().to_string(),
            description: draft.description.trim().to_string(),
            link: normalize_link(&draft.link),
            uploaded_by: viewer.handle(),
            uploader_uid: Some(viewer.uid().to_string()),
            file_url: None,
            file_name: None,
            file_type: None,
            file_path: None,
            created_at: now,
        };

        let blob = match upload {
            Some(upload) => {
                let path = upload.blob_path(now);
                let blob = self.backend.upload_blob(&path, upload.bytes).await?;
                resource.file_name = Some(upload.file_name);
                resource.file_type = Some(upload.content_type);
                resource.file_path = Some(blob.path.clone());
                Some(blob)
            }
            None => None,
        };

        let id = uuid::Uuid::new_v4().to_string();
        let saved: UntetheredResult<()> = async {
            if let Some(blob) = &blob {
                resource.file_url = Some(self.backend.blob_url(blob).await?);
            }
            self.backend
                .set(RESOURCES_COLLECTION, &id, to_document(&resource)?)
                .await
        }
        .await;

        if let Err(e) = saved {
            // No document points at the file, so nothing else would delete it.
            if let Some(blob) = &blob {
                self.discard_blob(blob).await;
            }
            return Err(e);
        }
        resource.id = id;

        tracing::info!(id = %resource.id, topic = %resource.topic, "resource shared");
        Ok(resource)
    }

    /// Remove a resource. Only its uploader may do so. The attached file is
    /// deleted afterwards on a best-effort basis.
    pub async fn remove(&self, viewer: &Viewer, id: &str) -> UntetheredResult<Resource> {
        let document = self
            .backend
            .get(RESOURCES_COLLECTION, id)
            .await?
            .ok_or_else(|| UntetheredError::NotFound(format!("resource {id}")))?;
        let resource = Resource::from_entry(id.to_string(), document)?;

        if !resource.is_uploaded_by(viewer) {
            return Err(UntetheredError::PermissionDenied(
                "you can only delete resources you uploaded".into(),
            ));
        }

        self.backend.delete(RESOURCES_COLLECTION, id).await?;

        if let Some(path) = &resource.file_path {
            self.discard_blob(&BlobRef { path: path.clone() }).await;
        }

        tracing::info!(id, "resource removed");
        Ok(resource)
    }

    /// Best-effort blob delete; failures are logged only.
    async fn discard_blob(&self, blob: &BlobRef) {
        if let Err(e) = self.backend.delete_blob(blob).await {
            tracing::warn!(path = %blob.path, "could not delete file: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, Session};

    fn viewer(uid: &str) -> Viewer {
        Viewer {
            session: Session {
                uid: uid.into(),
                email: format!("{uid}@example.com"),
            },
            member: None,
        }
    }

    fn draft(topic: &str, link: &str) -> ResourceDraft {
        ResourceDraft {
            topic: topic.into(),
            description: "worth a read".into(),
            link: link.into(),
        }
    }

    fn library() -> (Arc<MemoryBackend>, ResourceLibrary<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (backend.clone(), ResourceLibrary::new(backend))
    }

    #[test]
    fn test_normalize_link() {
        assert_eq!(normalize_link("example.com/a"), "https://example.com/a");
        assert_eq!(normalize_link("http://example.com"), "http://example.com");
        assert_eq!(normalize_link("HTTPS://example.com"), "HTTPS://example.com");
        assert_eq!(normalize_link("  "), "");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.PDF")), Some("application/pdf"));
        assert_eq!(content_type_for(Path::new("clip.webm")), Some("video/webm"));
        assert_eq!(content_type_for(Path::new("notes.docx")), None);
        assert_eq!(content_type_for(Path::new("README")), None);
    }

    #[test]
    fn test_upload_validation() {
        assert!(matches!(
            Upload::new("slides.pptx", vec![]),
            Err(ValidationError::DisallowedFileType(_))
        ));

        let big = Upload::new("big.png", vec![0; MAX_UPLOAD_BYTES as usize + 1]).unwrap();
        assert_eq!(big.validate(), Err(ValidationError::FileTooLarge(5)));

        let ok = Upload::new("photo.png", vec![0; 10]).unwrap();
        assert_eq!(ok.validate(), Ok(()));
    }

    #[test]
    fn test_blob_path_is_slugged() {
        let upload = Upload::new("My Trip (2).JPG", vec![]).unwrap();
        let now = DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            upload.blob_path(now),
            format!("resources/{}_my-trip-2.jpg", now.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn test_share_link() {
        let (_, library) = library();
        let resource = library
            .share(&viewer("u1"), draft("Breathing", "example.com/breath"), None)
            .await
            .unwrap();

        assert_eq!(resource.link, "https://example.com/breath");
        assert_eq!(resource.uploaded_by, "u1");
        assert_eq!(resource.file_url, None);
        assert_eq!(library.list().await.unwrap(), vec![resource]);
    }

    #[tokio::test]
    async fn test_share_requires_topic_and_link_or_file() {
        let (_, library) = library();
        assert!(matches!(
            library.share(&viewer("u1"), draft("", "example.com"), None).await,
            Err(UntetheredError::Validation(ValidationError::Required("Topic")))
        ));
        assert!(matches!(
            library.share(&viewer("u1"), draft("Topic", ""), None).await,
            Err(UntetheredError::Validation(ValidationError::LinkOrFileRequired))
        ));
    }

    #[tokio::test]
    async fn test_share_file_uploads_blob() {
        let (backend, library) = library();
        let upload = Upload::new("guide.pdf", b"%PDF-1.7".to_vec()).unwrap();
        let resource = library
            .share(&viewer("u1"), draft("Guide", ""), Some(upload))
            .await
            .unwrap();

        let path = resource.file_path.clone().unwrap();
        assert!(path.starts_with("resources/") && path.ends_with("_guide.pdf"));
        assert!(backend.blob_exists(&path));
        assert_eq!(resource.file_type.as_deref(), Some("application/pdf"));
        assert_eq!(resource.file_url, Some(format!("memory:///{path}")));
    }

    #[tokio::test]
    async fn test_failed_share_deletes_uploaded_file() {
        let (backend, library) = library();
        let upload = Upload::new("guide.pdf", b"%PDF-1.7".to_vec()).unwrap();
        backend.fail_next_document(1);

        let result = library
            .share(&viewer("u1"), draft("Guide", ""), Some(upload))
            .await;

        assert!(matches!(result, Err(UntetheredError::BackendUnavailable(_))));
        assert!(backend.blob_paths().is_empty());
        assert!(library.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (_, library) = library();
        let first = library
            .share(&viewer("u1"), draft("First", "a.com"), None)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = library
            .share(&viewer("u1"), draft("Second", "b.com"), None)
            .await
            .unwrap();

        let topics: Vec<String> = library.list().await.unwrap().into_iter().map(|r| r.topic).collect();
        assert_eq!(topics, vec![second.topic, first.topic]);
    }

    #[tokio::test]
    async fn test_remove_only_by_uploader_and_deletes_blob() {
        let (backend, library) = library();
        let upload = Upload::new("clip.mp4", vec![1, 2, 3]).unwrap();
        let resource = library
            .share(&viewer("u1"), draft("Clip", ""), Some(upload))
            .await
            .unwrap();
        let path = resource.file_path.clone().unwrap();

        assert!(matches!(
            library.remove(&viewer("u2"), &resource.id).await,
            Err(UntetheredError::PermissionDenied(_))
        ));

        library.remove(&viewer("u1"), &resource.id).await.unwrap();
        assert!(library.list().await.unwrap().is_empty());
        assert!(!backend.blob_exists(&path));
    }

    #[tokio::test]
    async fn test_remove_survives_missing_blob() {
        let (backend, library) = library();
        let upload = Upload::new("clip.mp4", vec![1]).unwrap();
        let resource = library
            .share(&viewer("u1"), draft("Clip", ""), Some(upload))
            .await
            .unwrap();
        backend
            .delete_blob(&BlobRef {
                path: resource.file_path.clone().unwrap(),
            })
            .await
            .unwrap();

        library.remove(&viewer("u1"), &resource.id).await.unwrap();
    }
}
