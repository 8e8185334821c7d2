/// 경매 종료 감시자
/// 상품 상태 전이는 백엔드 측 상품 관리 서비스가 수행한다고 가정하고,
/// 클라이언트는 상태 문서를 주기적으로 읽어 종료 시점만 관찰한다.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::bidding::model::BidItemStatus;
use crate::query;
use crate::store::SharedDocumentStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Status Watcher
/// 경매 종료 감시자
pub struct StatusWatcher {
    store: SharedDocumentStore,
    item_id: String,
}

/// StatusWatcher 구현
impl StatusWatcher {
    pub fn new(store: SharedDocumentStore, item_id: impl Into<String>) -> Self {
        StatusWatcher {
            store,
            item_id: item_id.into(),
        }
    }

    /// 1초 주기로 상품 상태를 확인하고 종료 시 이벤트를 보낸다
    pub async fn start(&self) -> mpsc::Receiver<AuctionEvent> {
        let (tx, rx) = mpsc::channel(4);
        let store = Arc::clone(&self.store);
        let item_id = self.item_id.clone();

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                if tx.is_closed() {
                    break;
                }
                match query::handlers::get_item(store.as_ref(), &item_id).await {
                    Ok(Some(item)) if item.status == BidItemStatus::Ended => {
                        info!("{:<12} --> 경매 종료 감지: {}", "Scheduler", item_id);
                        let _ = tx
                            .send(AuctionEvent::AuctionEnded {
                                item_id: item_id.clone(),
                                timestamp: Utc::now(),
                            })
                            .await;
                        break;
                    }
                    Ok(Some(_)) => {
                        debug!("{:<12} --> 경매 진행 중: {}", "Scheduler", item_id)
                    }
                    Ok(None) => {
                        debug!("{:<12} --> 상품 문서 없음: {}", "Scheduler", item_id)
                    }
                    Err(e) => error!(
                        "{:<12} --> 상태 확인 중 오류 발생: {:?}",
                        "Scheduler", e
                    ),
                }
            }
        });
        rx
    }
}
// endregion: --- Status Watcher
