// region:    --- Imports
use crate::bidding::model::{BidActivity, BidColor, BidItem};
use crate::cache::{keys, TtlCache};
use crate::store::{DocumentStore, Filter, StoreError, BID_ACTIVITY_COLLECTION,
                   BID_COLOR_COLLECTION, BID_ITEM_COLLECTION};
use std::collections::BTreeMap;
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// 모든 상품 조회
pub async fn get_all_items(store: &dyn DocumentStore) -> Result<Vec<BidItem>, StoreError> {
    info!("{:<12} --> 모든 상품 조회", "Query");
    let documents = store.get_documents(BID_ITEM_COLLECTION, &Filter::new()).await?;
    documents.iter().map(BidItem::from_document).collect()
}

/// 상품 조회
pub async fn get_item(
    store: &dyn DocumentStore,
    item_id: &str,
) -> Result<Option<BidItem>, StoreError> {
    info!("{:<12} --> 상품 조회 id: {}", "Query", item_id);
    store
        .get_document_by_id(BID_ITEM_COLLECTION, item_id)
        .await?
        .map(|document| BidItem::from_document(&document))
        .transpose()
}

/// 상품 색상 조회
pub async fn get_item_colors(
    store: &dyn DocumentStore,
    item_id: &str,
) -> Result<Vec<BidColor>, StoreError> {
    info!("{:<12} --> 상품 색상 조회 id: {}", "Query", item_id);
    let filter = Filter::new().field("bidItemId", item_id);
    let documents = store.get_documents(BID_COLOR_COLLECTION, &filter).await?;
    documents.iter().map(BidColor::from_document).collect()
}

/// 상품 입찰 활동 조회
pub async fn get_activities(
    store: &dyn DocumentStore,
    item_id: &str,
) -> Result<Vec<BidActivity>, StoreError> {
    info!("{:<12} --> 상품 입찰 활동 조회 id: {}", "Query", item_id);
    let filter = Filter::new().field("itemId", item_id);
    let documents = store.get_documents(BID_ACTIVITY_COLLECTION, &filter).await?;
    documents.iter().map(BidActivity::from_document).collect()
}

/// 사용자 본인의 입찰 활동 조회
pub async fn get_user_activities(
    store: &dyn DocumentStore,
    item_id: &str,
    user_id: &str,
) -> Result<Vec<BidActivity>, StoreError> {
    info!(
        "{:<12} --> 사용자 입찰 활동 조회 id: {} / {}",
        "Query", item_id, user_id
    );
    // 두 번째 조건부터는 클라이언트 측에서 적용된다
    let filter = Filter::new().field("itemId", item_id).field("userId", user_id);
    let documents = store.get_documents(BID_ACTIVITY_COLLECTION, &filter).await?;
    documents.iter().map(BidActivity::from_document).collect()
}

/// 번호의 최고 입찰가 조회
pub async fn get_top_bid_amount(
    store: &dyn DocumentStore,
    item_id: &str,
    bid_number: i64,
) -> Result<Option<i64>, StoreError> {
    info!(
        "{:<12} --> 최고 입찰가 조회 id: {} / No.{}",
        "Query", item_id, bid_number
    );
    let filter = Filter::new()
        .field("bidNumber", bid_number)
        .field("itemId", item_id);
    let documents = store.get_documents(BID_ACTIVITY_COLLECTION, &filter).await?;
    let activities = documents
        .iter()
        .map(BidActivity::from_document)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(top_bid_amount(&activities))
}

/// 번호의 사용자 본인 최신 입찰 조회
pub async fn get_latest_own_bid(
    store: &dyn DocumentStore,
    item_id: &str,
    bid_number: i64,
    user_id: &str,
) -> Result<Option<BidActivity>, StoreError> {
    info!(
        "{:<12} --> 본인 최신 입찰 조회 id: {} / No.{}",
        "Query", item_id, bid_number
    );
    let filter = Filter::new()
        .field("bidNumber", bid_number)
        .field("itemId", item_id)
        .field("userId", user_id);
    let documents = store.get_documents(BID_ACTIVITY_COLLECTION, &filter).await?;
    let activities = documents
        .iter()
        .map(BidActivity::from_document)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(activities
        .into_iter()
        .max_by_key(|activity| (activity.created_at, activity.amount)))
}

/// 상품 카탈로그 조회(캐시 적용)
pub async fn get_cached_items(
    store: &dyn DocumentStore,
    cache: &TtlCache<Vec<BidItem>>,
) -> Result<Vec<BidItem>, StoreError> {
    if let Some(cached) = cache.get(&keys::bid_items()) {
        return Ok(cached);
    }
    let items = get_all_items(store).await?;
    cache.put(&keys::bid_items(), items.clone());
    Ok(items)
}

/// 사용자 입찰 활동 조회(캐시 적용)
pub async fn get_cached_user_activities(
    store: &dyn DocumentStore,
    cache: &TtlCache<Vec<BidActivity>>,
    item_id: &str,
    user_id: &str,
) -> Result<Vec<BidActivity>, StoreError> {
    let key = keys::user_activities(user_id);
    if let Some(cached) = cache.get(&key) {
        return Ok(cached);
    }
    let activities = get_user_activities(store, item_id, user_id).await?;
    cache.put(&key, activities.clone());
    Ok(activities)
}

/// 경매 종료 후 최종 리더보드 조회(캐시 적용)
pub async fn get_final_leaderboard(
    store: &dyn DocumentStore,
    cache: &TtlCache<Vec<BidActivity>>,
    item_id: &str,
) -> Result<Vec<BidActivity>, StoreError> {
    let key = keys::final_leaderboard(item_id);
    if let Some(cached) = cache.get(&key) {
        return Ok(cached);
    }
    info!("{:<12} --> 최종 리더보드 조회 id: {}", "Query", item_id);
    let activities = get_activities(store, item_id).await?;
    let board = leaderboard(&activities, usize::MAX);
    cache.put(&key, board.clone());
    Ok(board)
}

// endregion: --- Query Handlers

// region:    --- Reductions

/// 활동 목록에서 최고 입찰가 도출
pub fn top_bid_amount(activities: &[BidActivity]) -> Option<i64> {
    activities.iter().map(|activity| activity.amount).max()
}

/// 번호별 최고 금액 활동만 남긴다
pub fn max_per_number(activities: &[BidActivity]) -> Vec<BidActivity> {
    let mut best: BTreeMap<i64, &BidActivity> = BTreeMap::new();
    for activity in activities {
        match best.get(&activity.bid_number) {
            Some(current) if current.amount >= activity.amount => {}
            _ => {
                best.insert(activity.bid_number, activity);
            }
        }
    }
    best.into_values().cloned().collect()
}

/// 리더보드: 번호별 최고 활동, 금액 내림차순, 상한 적용
pub fn leaderboard(activities: &[BidActivity], limit: usize) -> Vec<BidActivity> {
    let mut board = max_per_number(activities);
    board.sort_by(|a, b| b.amount.cmp(&a.amount));
    board.truncate(limit);
    board
}

// endregion: --- Reductions
