/// 실시간 리더보드 피드
/// 입찰 활동 구독을 소비해 번호별 최고 입찰 리더보드를 유지하고
/// watch 채널로 발행한다. 관찰 순서는 "id 로 중복 제거 후 마지막 관찰 승리"다.
// region:    --- Imports
use crate::bidding::model::BidActivity;
use crate::query;
use crate::store::{Filter, SharedDocumentStore, StoreError, StoreEvent, Subscription,
                   BID_ACTIVITY_COLLECTION};
use std::collections::HashSet;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Feed Filter
/// 피드 구독 범위(비어 있으면 전체 번호)
#[derive(Debug, Clone, Default)]
pub struct FeedFilter {
    bid_numbers: Vec<i64>,
}

impl FeedFilter {
    /// 전체 번호
    pub fn all() -> Self {
        Self::default()
    }

    /// 특정 번호 하나
    pub fn single(number: i64) -> Self {
        FeedFilter {
            bid_numbers: vec![number],
        }
    }

    pub fn numbers(numbers: impl IntoIterator<Item = i64>) -> Self {
        FeedFilter {
            bid_numbers: numbers.into_iter().collect(),
        }
    }

    fn accepts(&self, number: i64) -> bool {
        self.bid_numbers.is_empty() || self.bid_numbers.contains(&number)
    }
}
// endregion: --- Feed Filter

// region:    --- Feed Consumer
/// 실행 중인 피드 핸들(버리거나 stop() 하면 구독이 해제된다)
pub struct FeedHandle {
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// 실시간 리더보드 소비자
pub struct FeedConsumer {
    store: SharedDocumentStore,
    item_id: String,
    limit: usize,
}

/// FeedConsumer 구현
impl FeedConsumer {
    pub fn new(store: SharedDocumentStore, item_id: impl Into<String>, limit: usize) -> Self {
        FeedConsumer {
            store,
            item_id: item_id.into(),
            limit,
        }
    }

    /// 피드 시작: 리더보드 스냅샷을 watch 채널로 발행
    /// 번호 범위가 바뀌면 호출 측이 기존 핸들을 버리고 다시 시작한다
    pub async fn start(
        &self,
        filter: FeedFilter,
    ) -> Result<(FeedHandle, watch::Receiver<Vec<BidActivity>>), StoreError> {
        info!("{:<12} --> 실시간 피드 시작: {}", "Feed", self.item_id);
        let store_filter = Filter::new().field("itemId", self.item_id.as_str());
        let subscription = self
            .store
            .subscribe(BID_ACTIVITY_COLLECTION, &store_filter)
            .await?;

        let (tx, rx) = watch::channel(Vec::new());
        let item_id = self.item_id.clone();
        let limit = self.limit;
        let task = tokio::spawn(async move {
            Self::run(subscription, filter, item_id, limit, tx).await;
        });
        Ok((FeedHandle { task }, rx))
    }

    /// 수신 루프: id 중복 제거 후 리더보드 재계산
    async fn run(
        mut subscription: Subscription,
        filter: FeedFilter,
        item_id: String,
        limit: usize,
        tx: watch::Sender<Vec<BidActivity>>,
    ) {
        let mut seen: HashSet<String> = HashSet::new();
        let mut activities: Vec<BidActivity> = Vec::new();

        while let Some(event) = subscription.next_event().await {
            let documents = match event {
                StoreEvent::Snapshot(documents) => documents,
                StoreEvent::Upsert(document) => vec![document],
            };

            let mut changed = false;
            for document in documents {
                match BidActivity::from_document(&document) {
                    Ok(activity) => {
                        if !filter.accepts(activity.bid_number) {
                            continue;
                        }
                        // 같은 활동은 한 번만 반영한다
                        if !seen.insert(activity.id.clone()) {
                            continue;
                        }
                        activities.push(activity);
                        changed = true;
                    }
                    Err(e) => warn!("{:<12} --> 활동 스키마 불일치 무시: {:?}", "Feed", e),
                }
            }

            if changed {
                let board = query::handlers::leaderboard(&activities, limit);
                if tx.send(board).is_err() {
                    // 수신 측 종료
                    break;
                }
            }
        }
        info!("{:<12} --> 실시간 피드 종료: {}", "Feed", item_id);
    }
}
// endregion: --- Feed Consumer
