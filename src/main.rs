// region:    --- Imports
use bidding_client::auction::events::AuctionEvent;
use bidding_client::auth::rest::RestIdentityProvider;
use bidding_client::auth::{AuthManager, SignupPolicy};
use bidding_client::bidding::model::BidItemStatus;
use bidding_client::cache::TtlCache;
use bidding_client::config::BackendConfig;
use bidding_client::feed::{FeedConsumer, FeedFilter};
use bidding_client::query;
use bidding_client::scheduler::StatusWatcher;
use bidding_client::store::rest::RestStore;
use bidding_client::store::SharedDocumentStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // 백엔드 설정 로드
    let backend_config = BackendConfig::from_env();
    info!(
        "{:<12} --> 백엔드 설정 로드: {}",
        "Main", backend_config.database_url
    );

    // 저장소/신원 클라이언트 생성(수명은 애플리케이션 루트가 소유)
    let store: SharedDocumentStore = Arc::new(RestStore::new(&backend_config));
    let provider = Arc::new(RestIdentityProvider::new(&backend_config));
    let auth_manager = AuthManager::new(provider, Arc::clone(&store), SignupPolicy::open());

    // 데모 계정이 설정되어 있으면 로그인
    if let (Ok(email), Ok(password)) = (
        std::env::var("BACKEND_DEMO_EMAIL"),
        std::env::var("BACKEND_DEMO_PASSWORD"),
    ) {
        match auth_manager.login(&email, &password).await {
            Ok(profile) => info!(
                "{:<12} --> 로그인: {} ({})",
                "Main",
                profile.display_name(),
                profile.uid
            ),
            Err(e) => error!("{:<12} --> 로그인 실패: {}", "Main", e),
        }
    }

    // 상품 카탈로그 조회(캐시 적용)
    let item_cache = TtlCache::new(Duration::from_secs(60 * 30));
    let items = query::handlers::get_cached_items(store.as_ref(), &item_cache).await?;
    info!("{:<12} --> 상품 {}개 조회", "Main", items.len());

    // 진행 중인 상품 선택
    let item = match items
        .into_iter()
        .find(|item| item.status == BidItemStatus::Active)
    {
        Some(item) => item,
        None => {
            info!("{:<12} --> 진행 중인 경매가 없습니다.", "Main");
            return Ok(());
        }
    };
    info!("{:<12} --> 경매 모니터 시작: {}", "Main", item.name);

    // 실시간 리더보드 피드 시작
    let consumer = FeedConsumer::new(Arc::clone(&store), item.id.clone(), 50);
    let (_feed_handle, mut board_rx) = consumer.start(FeedFilter::all()).await?;

    // 경매 종료 감시 시작
    let watcher = StatusWatcher::new(Arc::clone(&store), item.id.clone());
    let mut ended_rx = watcher.start().await;

    // 리더보드 출력 루프
    loop {
        tokio::select! {
            changed = board_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let board = board_rx.borrow_and_update().clone();
                for (rank, activity) in board.iter().enumerate() {
                    info!(
                        "{:<12} --> {}위: No.{} {} ({})",
                        "Monitor",
                        rank + 1,
                        activity.bid_number,
                        activity.amount,
                        activity.name
                    );
                }
            }
            event = ended_rx.recv() => {
                if let Some(AuctionEvent::AuctionEnded { item_id, .. }) = event {
                    info!("{:<12} --> 경매 종료: {}", "Main", item_id);
                }
                break;
            }
        }
    }

    // 최종 리더보드 출력
    let final_cache = TtlCache::new(Duration::from_secs(60 * 5));
    match query::handlers::get_final_leaderboard(store.as_ref(), &final_cache, &item.id).await {
        Ok(final_board) => {
            for (rank, activity) in final_board.iter().enumerate() {
                info!(
                    "{:<12} --> 최종 {}위: No.{} {} ({})",
                    "Main",
                    rank + 1,
                    activity.bid_number,
                    activity.amount,
                    activity.name
                );
            }
        }
        Err(e) => error!("{:<12} --> 최종 리더보드 조회 실패: {:?}", "Main", e),
    }

    Ok(())
}
// endregion: --- Main
