/// 입찰 커맨드 처리
/// 제출 직전 상태를 다시 검증한 뒤 활동을 생성한다
// region:    --- Imports
use crate::bidding::model::{BidActivity, BidColor, BidItem, BidItemStatus};
use crate::query;
use crate::store::{DocumentStore, StoreError, BID_ACTIVITY_COLLECTION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Commands
/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub item_id: String,
    pub bid_number: i64,
    pub bid_item_color_id: String,
    pub amount: i64,
    pub user_id: String,
    pub user_name: String,
}

/// 입찰 처리 오류
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("경매가 이미 종료되었습니다.")]
    AlreadyEnded,

    #[error("유효하지 않은 번호입니다: {0}")]
    InvalidNumber(i64),

    #[error("유효하지 않은 색상입니다: {0}")]
    InvalidColor(String),

    #[error("입찰 금액이 현재 가격보다 낮습니다. (현재 가격: {standing})")]
    LowBid { standing: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CommandError {
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::AlreadyEnded => "ALREADY_ENDED",
            CommandError::InvalidNumber(_) => "INVALID_NUMBER",
            CommandError::InvalidColor(_) => "INVALID_COLOR",
            CommandError::LowBid { .. } => "LOW_BID",
            CommandError::Store(_) => "STORE_ERROR",
        }
    }
}

/// 입찰 처리: 상태/번호/색상/금액 검증 후 활동 생성
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    item: &BidItem,
    colors: &[BidColor],
    store: &dyn DocumentStore,
) -> Result<BidActivity, CommandError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);

    // 경매 상태 검증
    if item.status == BidItemStatus::Ended {
        return Err(CommandError::AlreadyEnded);
    }

    // 번호 범위 검증
    if !item.contains_number(cmd.bid_number) {
        return Err(CommandError::InvalidNumber(cmd.bid_number));
    }

    // 색상 검증
    if !colors.iter().any(|color| color.id == cmd.bid_item_color_id) {
        return Err(CommandError::InvalidColor(cmd.bid_item_color_id));
    }

    // 제출 직전 최신 최고가 재조회
    // 동시 입찰 간 최종 순서는 백엔드가 결정하므로 여기서는 한 번만 확인한다
    let top = query::handlers::get_top_bid_amount(store, &cmd.item_id, cmd.bid_number).await?;
    let standing = top.unwrap_or(item.initial_price);
    if cmd.amount <= standing {
        warn!(
            "{:<12} --> 입찰 금액이 현재 가격 이하: {} <= {}",
            "Command", cmd.amount, standing
        );
        return Err(CommandError::LowBid { standing });
    }

    // 활동 생성
    let mut activity = BidActivity {
        id: String::new(),
        item_id: cmd.item_id,
        bid_number: cmd.bid_number,
        bid_item_color_id: cmd.bid_item_color_id,
        amount: cmd.amount,
        user_id: cmd.user_id,
        name: cmd.user_name,
        created_at: Utc::now(),
    };
    let data = serde_json::to_value(&activity).map_err(|e| StoreError::Decode(e.to_string()))?;
    activity.id = store.add_document(BID_ACTIVITY_COLLECTION, data).await?;

    info!("{:<12} --> 입찰 활동 생성: {}", "Command", activity.id);
    Ok(activity)
}
// endregion: --- Commands
