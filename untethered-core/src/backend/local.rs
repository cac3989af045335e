//! Filesystem backend.
//!
//! Layout under the data directory:
//!
//! ```text
//! db/<collection>/<key>.json   one pretty-printed JSON document per key
//! blobs/<path>                 uploaded files
//! session.json                 signed-in session (durable persistence only)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::sync::watch;

use super::identity::{self, IdentityProvider, Persistence, Profile, Session, SessionSubscription};
use super::{BlobRef, BlobStore, Document, DocumentStore, validate_blob_path, validate_key};
use crate::error::{UntetheredError, UntetheredResult};

const SESSION_FILE: &str = "session.json";

pub struct LocalBackend {
    root: PathBuf,
    session: watch::Sender<Option<Session>>,
    persistence: Mutex<Persistence>,
}

impl LocalBackend {
    /// Open (creating if needed) a data directory, restoring a durable session.
    pub fn open(root: impl Into<PathBuf>) -> UntetheredResult<Self> {
        let root = std::path::absolute(root.into())?;
        std::fs::create_dir_all(root.join("db"))?;
        std::fs::create_dir_all(root.join("blobs"))?;

        let restored = Self::read_session(&root);
        if let Some(session) = &restored {
            tracing::debug!(uid = %session.uid, "restored durable session");
        }
        let (session, _) = watch::channel(restored);

        Ok(LocalBackend {
            root,
            session,
            persistence: Mutex::new(Persistence::default()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_session(root: &Path) -> Option<Session> {
        let content = std::fs::read_to_string(root.join(SESSION_FILE)).ok()?;
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("ignoring unreadable session file: {e}");
                None
            }
        }
    }

    fn collection_dir(&self, collection: &str) -> UntetheredResult<PathBuf> {
        validate_key(collection)?;
        Ok(self.root.join("db").join(collection))
    }

    fn document_path(&self, collection: &str, key: &str) -> UntetheredResult<PathBuf> {
        validate_key(key)?;
        Ok(self.collection_dir(collection)?.join(format!("{key}.json")))
    }

    fn blob_path(&self, path: &str) -> UntetheredResult<PathBuf> {
        validate_blob_path(path)?;
        Ok(path
            .split('/')
            .fold(self.root.join("blobs"), |acc, segment| acc.join(segment)))
    }

    fn read_document(path: &Path) -> UntetheredResult<Option<Document>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a temp file so readers never see a partial document.
    fn write_atomic(path: &Path, content: &[u8]) -> UntetheredResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, path)?;
        Ok(())
    }

    fn write_document(path: &Path, document: &Document) -> UntetheredResult<()> {
        let content = serde_json::to_vec_pretty(document)?;
        Self::write_atomic(path, &content)
    }

    fn persistence(&self) -> Persistence {
        self.persistence.lock().map(|p| *p).unwrap_or_default()
    }

    fn start_session(&self, session: &Session) -> UntetheredResult<()> {
        let path = self.root.join(SESSION_FILE);
        match self.persistence() {
            Persistence::Durable => Self::write_atomic(&path, &serde_json::to_vec_pretty(session)?)?,
            Persistence::Session => remove_if_exists(&path)?,
        }
        self.session.send_replace(Some(session.clone()));
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> UntetheredResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl DocumentStore for LocalBackend {
    async fn get(&self, collection: &str, key: &str) -> UntetheredResult<Option<Document>> {
        let path = self.document_path(collection, key)?;
        tracing::debug!(collection, key, "get");
        Self::read_document(&path)
    }

    async fn set(&self, collection: &str, key: &str, document: Document) -> UntetheredResult<()> {
        let path = self.document_path(collection, key)?;
        tracing::debug!(collection, key, "set");
        Self::write_document(&path, &document)
    }

    async fn update(&self, collection: &str, key: &str, fields: Document) -> UntetheredResult<()> {
        let path = self.document_path(collection, key)?;
        tracing::debug!(collection, key, "update");

        let mut document = Self::read_document(&path)?
            .ok_or_else(|| UntetheredError::NotFound(format!("{collection}/{key}")))?;
        document.extend(fields);
        Self::write_document(&path, &document)
    }

    async fn scan(&self, collection: &str) -> UntetheredResult<Vec<(String, Document)>> {
        let dir = self.collection_dir(collection)?;
        tracing::debug!(collection, "scan");

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut documents = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(document) = Self::read_document(&path)? {
                documents.push((key.to_string(), document));
            }
        }

        documents.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(documents)
    }

    async fn delete(&self, collection: &str, key: &str) -> UntetheredResult<()> {
        let path = self.document_path(collection, key)?;
        tracing::debug!(collection, key, "delete");
        remove_if_exists(&path)
    }
}

impl BlobStore for LocalBackend {
    async fn upload_blob(&self, path: &str, bytes: Vec<u8>) -> UntetheredResult<BlobRef> {
        let file = self.blob_path(path)?;
        Self::write_atomic(&file, &bytes)?;
        tracing::debug!(path, size = bytes.len(), "uploaded blob");
        Ok(BlobRef {
            path: path.to_string(),
        })
    }

    async fn blob_url(&self, blob: &BlobRef) -> UntetheredResult<String> {
        let file = self.blob_path(&blob.path)?;
        if !file.exists() {
            return Err(UntetheredError::NotFound(blob.path.clone()));
        }
        url::Url::from_file_path(&file)
            .map(|u| u.to_string())
            .map_err(|_| UntetheredError::BackendUnavailable(format!("no URL for {}", file.display())))
    }

    async fn delete_blob(&self, blob: &BlobRef) -> UntetheredResult<()> {
        let file = self.blob_path(&blob.path)?;
        match std::fs::remove_file(&file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(UntetheredError::NotFound(blob.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl IdentityProvider for LocalBackend {
    async fn sign_in(&self, email: &str, password: &str) -> UntetheredResult<Session> {
        let session = identity::authenticate(self, email, password).await?;
        self.start_session(&session)?;
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: Profile,
    ) -> UntetheredResult<Session> {
        let session = identity::register(self, email, password, profile).await?;
        self.start_session(&session)?;
        Ok(session)
    }

    async fn sign_out(&self) -> UntetheredResult<()> {
        remove_if_exists(&self.root.join(SESSION_FILE))?;
        self.session.send_replace(None);
        Ok(())
    }

    fn set_persistence(&self, persistence: Persistence) -> UntetheredResult<()> {
        let mut current = self
            .persistence
            .lock()
            .map_err(|_| UntetheredError::BackendUnavailable("persistence poisoned".into()))?;
        *current = persistence;
        Ok(())
    }

    fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.session.subscribe())
    }
}
