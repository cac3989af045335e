//! In-process backend. Nothing survives the process; used by tests and
//! throwaway sessions.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;

use super::identity::{self, IdentityProvider, Persistence, Profile, Session, SessionSubscription};
use super::{BlobRef, BlobStore, Document, DocumentStore, validate_blob_path, validate_key};
use crate::error::{UntetheredError, UntetheredResult};

type Collections = HashMap<String, BTreeMap<String, Document>>;

pub struct MemoryBackend {
    collections: Mutex<Collections>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    session: watch::Sender<Option<Session>>,
    failures: AtomicUsize,
    document_failures: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        MemoryBackend {
            collections: Mutex::new(HashMap::new()),
            blobs: Mutex::new(HashMap::new()),
            session,
            failures: AtomicUsize::new(0),
            document_failures: AtomicUsize::new(0),
        }
    }

    /// Make the next `count` backend calls fail with `BackendUnavailable`.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Like `fail_next`, but only document calls count; blob calls pass.
    pub fn fail_next_document(&self, count: usize) {
        self.document_failures.store(count, Ordering::SeqCst);
    }

    pub fn blob_exists(&self, path: &str) -> bool {
        self.blobs
            .lock()
            .map(|blobs| blobs.contains_key(path))
            .unwrap_or(false)
    }

    pub fn blob_paths(&self) -> Vec<String> {
        self.blobs
            .lock()
            .map(|blobs| blobs.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn check_fault(failures: &AtomicUsize) -> UntetheredResult<()> {
        let injected = failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if injected {
            Err(UntetheredError::BackendUnavailable("injected failure".into()))
        } else {
            Ok(())
        }
    }

    fn collections(&self) -> UntetheredResult<MutexGuard<'_, Collections>> {
        Self::check_fault(&self.failures)?;
        Self::check_fault(&self.document_failures)?;
        self.collections
            .lock()
            .map_err(|_| UntetheredError::BackendUnavailable("document store poisoned".into()))
    }

    fn blobs(&self) -> UntetheredResult<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        Self::check_fault(&self.failures)?;
        self.blobs
            .lock()
            .map_err(|_| UntetheredError::BackendUnavailable("blob store poisoned".into()))
    }
}

impl DocumentStore for MemoryBackend {
    async fn get(&self, collection: &str, key: &str) -> UntetheredResult<Option<Document>> {
        validate_key(key)?;
        let collections = self.collections()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    async fn set(&self, collection: &str, key: &str, document: Document) -> UntetheredResult<()> {
        validate_key(key)?;
        let mut collections = self.collections()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), document);
        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, fields: Document) -> UntetheredResult<()> {
        validate_key(key)?;
        let mut collections = self.collections()?;
        let document = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(key))
            .ok_or_else(|| UntetheredError::NotFound(format!("{collection}/{key}")))?;
        document.extend(fields);
        Ok(())
    }

    async fn scan(&self, collection: &str) -> UntetheredResult<Vec<(String, Document)>> {
        let collections = self.collections()?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(key, doc)| (key.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, key: &str) -> UntetheredResult<()> {
        validate_key(key)?;
        let mut collections = self.collections()?;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(key);
        }
        Ok(())
    }
}

impl BlobStore for MemoryBackend {
    async fn upload_blob(&self, path: &str, bytes: Vec<u8>) -> UntetheredResult<BlobRef> {
        validate_blob_path(path)?;
        self.blobs()?.insert(path.to_string(), bytes);
        Ok(BlobRef {
            path: path.to_string(),
        })
    }

    async fn blob_url(&self, blob: &BlobRef) -> UntetheredResult<String> {
        if !self.blobs()?.contains_key(&blob.path) {
            return Err(UntetheredError::NotFound(blob.path.clone()));
        }
        Ok(format!("memory:///{}", blob.path))
    }

    async fn delete_blob(&self, blob: &BlobRef) -> UntetheredResult<()> {
        self.blobs()?
            .remove(&blob.path)
            .map(|_| ())
            .ok_or_else(|| UntetheredError::NotFound(blob.path.clone()))
    }
}

impl IdentityProvider for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> UntetheredResult<Session> {
        let session = identity::authenticate(self, email, password).await?;
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: Profile,
    ) -> UntetheredResult<Session> {
        let session = identity::register(self, email, password, profile).await?;
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> UntetheredResult<()> {
        self.session.send_replace(None);
        Ok(())
    }

    /// Nothing outlives the process, so the choice is ignored.
    fn set_persistence(&self, _persistence: Persistence) -> UntetheredResult<()> {
        Ok(())
    }

    fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.session.subscribe())
    }
}
