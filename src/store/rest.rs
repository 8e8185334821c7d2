// region:    --- Imports
use super::{Document, DocumentStore, Filter, StoreError, StoreEvent, Subscription};
use crate::config::BackendConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Rest Store
/// 외부 문서/실시간 저장소 REST 클라이언트
/// 문서 조회/생성은 단건 요청, 구독은 SSE 스트림을 사용한다
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

/// RestStore 구현
impl RestStore {
    pub fn new(config: &BackendConfig) -> Self {
        // 구독 스트림은 오래 유지되므로 타임아웃은 단건 요청에만 건다
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .expect("HTTP 클라이언트 생성 실패");

        RestStore {
            client,
            base_url: config.database_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}.json", self.base_url, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}.json", self.base_url, collection, id)
    }

    /// 첫 필터 조건을 orderBy/equalTo 쿼리 파라미터로 변환
    fn filter_params(filter: &Filter) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some((field, value)) = filter.primary() {
            params.push(("orderBy".to_string(), format!("\"{}\"", field)));
            params.push(("equalTo".to_string(), value.to_string()));
        }
        params
    }

    /// 스냅샷(키 → 본문 맵)을 문서 목록으로 변환
    /// 빈 컬렉션은 null 로 내려온다
    fn documents_from_snapshot(snapshot: Value, filter: &Filter) -> Vec<Document> {
        match snapshot {
            Value::Object(map) => map
                .into_iter()
                .filter(|(_, data)| filter.matches(data))
                .map(|(id, data)| Document { id, data })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// SSE 프레임 수신 루프
    async fn run_event_stream(
        mut response: reqwest::Response,
        filter: Filter,
        tx: mpsc::Sender<StoreEvent>,
    ) -> Result<(), StoreError> {
        let mut buffer = String::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| StoreError::Subscribe(e.to_string()))?
        {
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // 프레임 경계(빈 줄) 단위로 해석
            while let Some(position) = buffer.find("\n\n") {
                let frame = buffer[..position].to_string();
                buffer.drain(..position + 2);

                if let Some(event) = Self::parse_frame(&frame, &filter) {
                    if tx.send(event).await.is_err() {
                        // 수신 측이 구독을 해제함
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    /// 단일 SSE 프레임 해석(put/patch 외는 무시)
    fn parse_frame(frame: &str, filter: &Filter) -> Option<StoreEvent> {
        let mut event_name = "";
        let mut data_line = "";
        for line in frame.lines() {
            if let Some(rest) = line.strip_prefix("event:") {
                event_name = rest.trim();
            } else if let Some(rest) = line.strip_prefix("data:") {
                data_line = rest.trim();
            }
        }

        // keep-alive, auth_revoked 등은 데이터 프레임이 아니다
        if event_name != "put" && event_name != "patch" {
            return None;
        }

        let payload: Value = serde_json::from_str(data_line).ok()?;
        let path = payload.get("path")?.as_str()?.to_string();
        let data = payload.get("data")?.clone();

        if path == "/" {
            // 루트 경로는 전체 스냅샷
            Some(StoreEvent::Snapshot(Self::documents_from_snapshot(
                data, filter,
            )))
        } else {
            // 하위 경로는 단일 문서(활동 컬렉션은 추가 전용이라 필드 단위 변경은 없다)
            let id = path.trim_start_matches('/').to_string();
            if id.contains('/') || !filter.matches(&data) {
                return None;
            }
            Some(StoreEvent::Upsert(Document { id, data }))
        }
    }
}
// endregion: --- Rest Store

// region:    --- DocumentStore impl
#[async_trait]
impl DocumentStore for RestStore {
    async fn get_documents(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        debug!("{:<12} --> 문서 목록 조회: {}", "RestStore", collection);
        let response = self
            .client
            .get(self.collection_url(collection))
            .query(&Self::filter_params(filter))
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?;

        let snapshot = response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Self::documents_from_snapshot(snapshot, filter))
    }

    async fn get_document_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        debug!("{:<12} --> 문서 조회: {}/{}", "RestStore", collection, id);
        let response = self
            .client
            .get(self.document_url(collection, id))
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?;

        let snapshot = response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        if snapshot.is_null() {
            return Ok(None);
        }
        Ok(Some(Document {
            id: id.to_string(),
            data: snapshot,
        }))
    }

    async fn add_document(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        info!("{:<12} --> 문서 추가: {}", "RestStore", collection);

        /// 생성된 키를 담는 응답
        #[derive(Deserialize)]
        struct PushResponse {
            name: String,
        }

        let created: PushResponse = self
            .client
            .post(self.collection_url(collection))
            .timeout(self.request_timeout)
            .json(&data)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(created.name)
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Subscription, StoreError> {
        info!("{:<12} --> 실시간 구독 시작: {}", "RestStore", collection);
        let response = self
            .client
            .get(self.collection_url(collection))
            .query(&Self::filter_params(filter))
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| StoreError::Subscribe(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Subscribe(format!(
                "상태 코드 {}",
                response.status()
            )));
        }

        let filter = filter.clone();
        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(async move {
            if let Err(e) = Self::run_event_stream(response, filter, tx).await {
                error!("{:<12} --> 실시간 스트림 종료: {:?}", "RestStore", e);
            }
        });
        Ok(Subscription::new(rx, task))
    }
}
// endregion: --- DocumentStore impl
