// region:    --- Imports
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// endregion: --- Imports

pub mod memory;
pub mod rest;

// region:    --- Collections
/// 상품 컬렉션
pub const BID_ITEM_COLLECTION: &str = "bid-item";

/// 상품 색상 컬렉션
pub const BID_COLOR_COLLECTION: &str = "bid-item-color";

/// 입찰 활동 컬렉션
pub const BID_ACTIVITY_COLLECTION: &str = "bid-activity";

/// 사용자 프로필 컬렉션
pub const USERS_COLLECTION: &str = "users";
// endregion: --- Collections

// region:    --- Store Error
/// 저장소 오류
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("백엔드 요청 실패: {0}")]
    Request(String),

    #[error("응답 디코딩 실패: {0}")]
    Decode(String),

    #[error("문서 스키마 불일치 ({collection}/{id}): {reason}")]
    Schema {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("실시간 구독 실패: {0}")]
    Subscribe(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            StoreError::Decode(error.to_string())
        } else {
            StoreError::Request(error.to_string())
        }
    }
}
// endregion: --- Store Error

// region:    --- Document
/// 저장소의 원시 문서(키 + 본문)
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// 동등 조건 필터
/// 첫 조건은 서버 측 쿼리로 보내고, 나머지는 클라이언트 측에서 적용한다
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 동등 조건 추가
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((key.to_string(), value.into()));
        self
    }

    /// 서버 측 쿼리에 쓰는 첫 조건
    pub fn primary(&self) -> Option<&(String, Value)> {
        self.conditions.first()
    }

    /// 문서 본문이 모든 조건을 만족하는지 확인
    pub fn matches(&self, data: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(key, value)| data.get(key) == Some(value))
    }
}
// endregion: --- Document

// region:    --- Store Event
/// 구독 스트림이 전달하는 변경 스냅샷
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// 구독 시작 시 전체 스냅샷
    Snapshot(Vec<Document>),
    /// 단일 문서 추가/변경
    Upsert(Document),
}
// endregion: --- Store Event

// region:    --- Subscription
/// 취소 가능한 실시간 구독 핸들
/// 버리거나 stop() 하면 수신 태스크가 중단된다
pub struct Subscription {
    receiver: mpsc::Receiver<StoreEvent>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn new(receiver: mpsc::Receiver<StoreEvent>, task: JoinHandle<()>) -> Self {
        Self { receiver, task }
    }

    /// 다음 변경 스냅샷 수신(스트림 종료 시 None)
    pub async fn next_event(&mut self) -> Option<StoreEvent> {
        self.receiver.recv().await
    }

    /// 구독 중지
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
// endregion: --- Subscription

// region:    --- Document Store Trait
/// 문서/실시간 저장소 트레이트
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 컬렉션 문서 목록 조회
    async fn get_documents(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError>;

    /// 키로 단일 문서 조회
    async fn get_document_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError>;

    /// 문서 추가 후 생성된 키 반환
    async fn add_document(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    /// 컬렉션 변경 구독
    async fn subscribe(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Subscription, StoreError>;
}

pub type SharedDocumentStore = Arc<dyn DocumentStore>;
// endregion: --- Document Store Trait
