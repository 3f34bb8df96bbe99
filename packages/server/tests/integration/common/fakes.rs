//! Fault-injecting wrappers around the real stores.
//!
//! Both wrappers append to a shared [`EventLog`] so tests can assert the
//! order in which records and images were touched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use clinic_server::entity::patient;
use clinic_server::store::{
    ImageUrlChange, MemoryPatientStore, PatientFields, PatientStore, StoreError,
};
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::{BlobStore, ObjectName, StorageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BlobPut(String),
    BlobDelete(String),
    RecordInsert,
    RecordUpdate(Uuid),
    RecordDelete(Uuid),
}

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// Position of the first event equal to `event`.
    pub fn position(&self, event: &Event) -> Option<usize> {
        self.snapshot().iter().position(|e| e == event)
    }
}

/// In-memory record store whose writes can be made to fail.
pub struct FlakyPatientStore {
    inner: MemoryPatientStore,
    events: EventLog,
    pub fail_insert: AtomicBool,
    pub fail_update: AtomicBool,
    /// Delete the record right before an update reaches it.
    pub vanish_on_update: AtomicBool,
}

impl FlakyPatientStore {
    pub fn new(events: EventLog) -> Self {
        Self {
            inner: MemoryPatientStore::new(),
            events,
            fail_insert: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            vanish_on_update: AtomicBool::new(false),
        }
    }
}

fn injected() -> StoreError {
    StoreError::Unavailable("injected failure".into())
}

#[async_trait]
impl PatientStore for FlakyPatientStore {
    async fn insert(
        &self,
        fields: PatientFields,
        image_url: Option<String>,
    ) -> Result<patient::Model, StoreError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let created = self.inner.insert(fields, image_url).await?;
        self.events.push(Event::RecordInsert);
        Ok(created)
    }

    async fn update(
        &self,
        id: Uuid,
        fields: PatientFields,
        image_url: ImageUrlChange,
    ) -> Result<Option<patient::Model>, StoreError> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(injected());
        }
        if self.vanish_on_update.load(Ordering::SeqCst) {
            self.inner.delete(id).await?;
        }
        let updated = self.inner.update(id, fields, image_url).await?;
        if updated.is_some() {
            self.events.push(Event::RecordUpdate(id));
        }
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<patient::Model>, StoreError> {
        let deleted = self.inner.delete(id).await?;
        if deleted.is_some() {
            self.events.push(Event::RecordDelete(id));
        }
        Ok(deleted)
    }

    async fn get(&self, id: Uuid) -> Result<Option<patient::Model>, StoreError> {
        self.inner.get(id).await
    }

    async fn find_by_image_url(
        &self,
        image_url: &str,
    ) -> Result<Option<patient::Model>, StoreError> {
        self.inner.find_by_image_url(image_url).await
    }

    async fn all(&self) -> Result<Vec<patient::Model>, StoreError> {
        self.inner.all().await
    }
}

/// Filesystem blob store whose writes and deletes can be made to fail.
pub struct FlakyBlobStore {
    inner: FilesystemBlobStore,
    events: EventLog,
    pub fail_put: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl FlakyBlobStore {
    pub fn new(inner: FilesystemBlobStore, events: EventLog) -> Self {
        Self {
            inner,
            events,
            fail_put: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    fn bucket(&self) -> &str {
        self.inner.bucket()
    }

    fn public_url(&self, name: &ObjectName) -> String {
        self.inner.public_url(name)
    }

    async fn put(&self, name: &ObjectName, data: &[u8]) -> Result<String, StorageError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected failure".into()));
        }
        let url = self.inner.put(name, data).await?;
        self.events.push(Event::BlobPut(url.clone()));
        Ok(url)
    }

    async fn get(&self, name: &ObjectName) -> Result<Vec<u8>, StorageError> {
        self.inner.get(name).await
    }

    async fn exists(&self, name: &ObjectName) -> Result<bool, StorageError> {
        self.inner.exists(name).await
    }

    async fn delete(&self, name: &ObjectName) -> Result<bool, StorageError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected failure".into()));
        }
        let deleted = self.inner.delete(name).await?;
        self.events.push(Event::BlobDelete(self.inner.public_url(name)));
        Ok(deleted)
    }
}
