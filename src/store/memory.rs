// region:    --- Imports
use super::{Document, DocumentStore, Filter, SharedDocumentStore, StoreError, StoreEvent,
            Subscription};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};

// endregion: --- Imports

// region:    --- In-Memory Store
/// 테스트용 인메모리 문서 저장소
/// 문서 추가는 broadcast 채널로 모든 구독에 전파된다
pub struct InMemoryStore {
    collections: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    changes: broadcast::Sender<(String, Document)>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        InMemoryStore {
            collections: Mutex::new(BTreeMap::new()),
            changes,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn new_shared() -> SharedDocumentStore {
        Arc::new(Self::new())
    }

    /// 지정한 키로 문서 삽입(시드 데이터용, 기존 문서는 덮어쓴다)
    pub fn seed_document(&self, collection: &str, id: &str, data: Value) {
        self.collections
            .lock()
            .expect("lock")
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data.clone());
        let _ = self.changes.send((
            collection.to_string(),
            Document {
                id: id.to_string(),
                data,
            },
        ));
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
// endregion: --- In-Memory Store

// region:    --- DocumentStore impl
#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_documents(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.lock().expect("lock");
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|(_, data)| filter.matches(data))
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_document_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.lock().expect("lock");
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn add_document(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = format!("-M{:012}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.collections
            .lock()
            .expect("lock")
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data.clone());
        let _ = self.changes.send((
            collection.to_string(),
            Document {
                id: id.clone(),
                data,
            },
        ));
        Ok(id)
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Subscription, StoreError> {
        // 구독 시점의 스냅샷을 먼저 보내고 이후 변경을 전달한다
        let initial = self.get_documents(collection, filter).await?;
        let mut changes = self.changes.subscribe();
        let collection = collection.to_string();
        let filter = filter.clone();

        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(async move {
            if tx.send(StoreEvent::Snapshot(initial)).await.is_err() {
                return;
            }
            loop {
                match changes.recv().await {
                    Ok((changed_collection, document)) => {
                        if changed_collection != collection || !filter.matches(&document.data) {
                            continue;
                        }
                        if tx.send(StoreEvent::Upsert(document)).await.is_err() {
                            return;
                        }
                    }
                    // 밀린 구독자는 이후 변경부터 다시 받는다
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
        Ok(Subscription::new(rx, task))
    }
}
// endregion: --- DocumentStore impl
