use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::document::{ChangeKind, DocumentChange, DocumentStore, Query, WriteBatch, WriteOp};
use super::{Document, DocumentSnapshot, StoreError};

const CHANGE_FEED_CAPACITY: usize = 256;

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// Document store held in process memory.
///
/// Writes are serialized behind one lock, so a committed batch is never
/// observed half applied. Change notifications are published after the lock
/// is released.
pub struct InMemoryDocumentStore {
    collections: RwLock<Collections>,
    changes: broadcast::Sender<DocumentChange>,
    offline: AtomicBool,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
            offline: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("document store is offline".into()));
        }
        Ok(())
    }

    fn publish(&self, changes: Vec<DocumentChange>) {
        for change in changes {
            // no subscribers is fine
            let _ = self.changes.send(change);
        }
    }

    /// Applies one write to the locked state and returns its notification.
    fn apply(collections: &mut Collections, op: WriteOp) -> Result<DocumentChange, StoreError> {
        match op {
            WriteOp::Set {
                collection,
                id,
                data,
            } => {
                let docs = collections.entry(collection.clone()).or_default();
                let kind = if docs.contains_key(&id) {
                    ChangeKind::Modified
                } else {
                    ChangeKind::Added
                };
                docs.insert(id.clone(), data.clone());
                Ok(DocumentChange {
                    collection,
                    id,
                    kind,
                    data: Some(data),
                })
            }
            WriteOp::Update {
                collection,
                id,
                fields,
            } => {
                let doc = collections
                    .get_mut(&collection)
                    .and_then(|docs| docs.get_mut(&id))
                    .ok_or_else(|| StoreError::not_found(&collection, &id))?;
                for (field, value) in fields {
                    doc.insert(field, value);
                }
                Ok(DocumentChange {
                    data: Some(doc.clone()),
                    collection,
                    id,
                    kind: ChangeKind::Modified,
                })
            }
            WriteOp::Delete { collection, id } => {
                if let Some(docs) = collections.get_mut(&collection) {
                    docs.remove(&id);
                }
                Ok(DocumentChange {
                    collection,
                    id,
                    kind: ChangeKind::Removed,
                    data: None,
                })
            }
        }
    }

    fn exists(collections: &Collections, collection: &str, id: &str) -> bool {
        collections
            .get(collection)
            .map(|docs| docs.contains_key(id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn new_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<DocumentSnapshot>, StoreError> {
        self.ensure_online()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| DocumentSnapshot::new(id, data.clone())))
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.set(collection, id, data);
        self.commit(batch).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.update(collection, id, fields);
        self.commit(batch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, id);
        self.commit(batch).await
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<DocumentSnapshot>, StoreError> {
        self.ensure_online()?;
        let collections = self.collections.read().await;
        let mut results: Vec<DocumentSnapshot> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| query.matches(data))
                    .map(|(id, data)| DocumentSnapshot::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default();
        query.arrange(&mut results);
        Ok(results)
    }

    #[instrument(skip(self, batch), fields(writes = batch.len()))]
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.ensure_online()?;
        let changes = {
            let mut collections = self.collections.write().await;

            // Every update must target a document that exists at that point
            // of the batch, so the apply loop below cannot fail halfway.
            let mut overlay: HashMap<(&str, &str), bool> = HashMap::new();
            for op in batch.ops() {
                let (collection, id) = op.target();
                match op {
                    WriteOp::Set { .. } => {
                        overlay.insert((collection, id), true);
                    }
                    WriteOp::Delete { .. } => {
                        overlay.insert((collection, id), false);
                    }
                    WriteOp::Update { .. } => {
                        let present = overlay
                            .get(&(collection, id))
                            .copied()
                            .unwrap_or_else(|| Self::exists(&collections, collection, id));
                        if !present {
                            return Err(StoreError::not_found(collection, id));
                        }
                    }
                }
            }

            let mut changes = Vec::with_capacity(batch.len());
            for op in batch.into_ops() {
                changes.push(Self::apply(&mut collections, op)?);
            }
            changes
        };
        debug!(count = changes.len(), "batch committed");
        self.publish(changes);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.changes.subscribe()
    }
}
