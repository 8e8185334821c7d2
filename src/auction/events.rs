use crate::bidding::model::BidActivity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 클라이언트가 관찰하는 경매 이벤트
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum AuctionEvent {
    // 입찰 이벤트
    BidPlaced { activity: BidActivity },
    // 경매 종료 이벤트
    AuctionEnded {
        item_id: String,
        timestamp: DateTime<Utc>,
    },
}
