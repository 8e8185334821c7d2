use bidding_client::auth::memory::InMemoryIdentityProvider;
use bidding_client::auth::{AuthError, AuthManager, IdentityProvider, SignupForm, SignupPolicy};
use bidding_client::bidding::form::{BidMode, FormError};
use bidding_client::bidding::model::UserInfo;
use bidding_client::bidding::session::{BiddingSession, SessionError};
use bidding_client::cache::{keys, TtlCache};
use bidding_client::feed::{FeedConsumer, FeedFilter};
use bidding_client::query;
use bidding_client::scheduler::StatusWatcher;
use bidding_client::store::memory::InMemoryStore;
use bidding_client::store::SharedDocumentStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// 테스트용 저장소 구성
fn setup_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new())
}

/// 테스트용 상품 시드
fn seed_test_item(store: &InMemoryStore, item_id: &str, status: &str) {
    store.seed_document(
        "bid-item",
        item_id,
        json!({
            "name": "입찰 테스트 상품",
            "description": "입찰 기능 테스트를 위한 상품입니다.",
            "numberStartedAt": 1,
            "numberEndedAt": 10,
            "initialPrice": 500,
            "biddingPoint": 100,
            "status": status,
        }),
    );
    store.seed_document(
        "bid-item-color",
        "color-1",
        json!({
            "name": "red",
            "thumbnail": "red.png",
            "icon": "red-icon.png",
            "code": "#ff0000",
            "bidItemId": item_id,
        }),
    );
}

/// 테스트용 입찰 활동 시드
fn seed_activity(
    store: &InMemoryStore,
    id: &str,
    item_id: &str,
    bid_number: i64,
    amount: i64,
    user_id: &str,
) {
    store.seed_document(
        "bid-activity",
        id,
        json!({
            "itemId": item_id,
            "bidNumber": bid_number,
            "bidItemColorId": "color-1",
            "amount": amount,
            "userId": user_id,
            "name": "bidder",
            "createdAt": 1_700_000_000_000_i64,
        }),
    );
}

/// 테스트용 사용자
fn test_user(uid: &str) -> UserInfo {
    UserInfo {
        id: String::new(),
        uid: uid.to_string(),
        username: "tester".to_string(),
        email: "tester@gmail.com".to_string(),
        first_name: String::new(),
        last_name: String::new(),
        phone: String::new(),
        country_code: String::new(),
    }
}

/// 입찰 제출과 실시간 에코 중복 제거 테스트
#[tokio::test]
async fn test_session_bid_flow_with_echo_dedup() {
    let store = setup_store();
    seed_test_item(&store, "item-1", "active");
    seed_activity(&store, "act-legacy", "item-1", 7, 1000, "other-user");

    let shared: SharedDocumentStore = store.clone();
    let mut session = BiddingSession::open(shared, "item-1", test_user("user-1"))
        .await
        .expect("세션 생성 실패");

    // 기존 최고가 1000 → 표시 금액 1100, 즉시 제출 가능
    session.select_number(7).await.expect("번호 선택 실패");
    assert_eq!(session.proposed_amount(), 1100);
    assert!(session.is_valid());

    // 제출 성공 후 낙관적 선반영
    let (number, amount) = session.submit().await.expect("입찰 실패");
    assert_eq!((number, amount), (7, 1100));
    assert_eq!(session.proposed_amount(), 1200);

    // 구독 시점 스냅샷(기존 활동)이 먼저 반영된다
    let first = timeout(Duration::from_secs(1), session.pump_realtime()).await;
    assert!(first.is_ok(), "스냅샷 이벤트가 도착해야 한다");

    // 본인 입찰의 실시간 에코는 같은 id 로 중복 제거되어 이중 전진이 없다
    let second = timeout(Duration::from_millis(300), session.pump_realtime()).await;
    assert!(second.is_err(), "에코는 중복 제거되어야 한다");
    assert_eq!(session.proposed_amount(), 1200);

    // 활동은 저장소에 기록되어 있다
    let top = query::handlers::get_top_bid_amount(store.as_ref(), "item-1", 7)
        .await
        .unwrap();
    assert_eq!(top, Some(1100));
}

/// 첫 입찰은 기준가보다 엄격히 커야 한다
#[tokio::test]
async fn test_first_bid_requires_strictly_greater_amount() {
    let store = setup_store();
    seed_test_item(&store, "item-1", "active");

    let shared: SharedDocumentStore = store.clone();
    let mut session = BiddingSession::open(shared, "item-1", test_user("user-1"))
        .await
        .unwrap();

    session.select_number(3).await.unwrap();
    assert_eq!(session.proposed_amount(), 500);
    assert!(!session.is_valid());

    // 시작가 그대로는 제출 불가
    let error = session.submit().await.unwrap_err();
    assert!(matches!(
        error,
        SessionError::Form(FormError::LowBid { standing: 500 })
    ));

    // 한 증분 올리면 제출 가능
    session.increment();
    assert_eq!(session.proposed_amount(), 600);
    let (number, amount) = session.submit().await.unwrap();
    assert_eq!((number, amount), (3, 600));
}

/// 타인 입찰 실시간 수신: 기준가만 올라가고 표시 금액은 유지된다
#[tokio::test]
async fn test_foreign_bid_realtime_update() {
    let store = setup_store();
    seed_test_item(&store, "item-1", "active");

    let shared: SharedDocumentStore = store.clone();
    let mut session = BiddingSession::open(shared, "item-1", test_user("user-1"))
        .await
        .unwrap();
    session.select_number(5).await.unwrap();
    assert_eq!(session.proposed_amount(), 500);

    // 다른 클라이언트의 입찰이 도착한다
    seed_activity(&store, "act-other", "item-1", 5, 900, "other-user");

    let event = timeout(Duration::from_secs(1), session.pump_realtime())
        .await
        .expect("실시간 이벤트가 도착해야 한다");
    assert!(event.is_some());

    assert_eq!(session.form().top_bid(), Some(900));
    assert_eq!(session.proposed_amount(), 500);
    assert!(!session.is_valid());

    // 기준가를 넘길 때까지 올리면 다시 제출 가능
    for _ in 0..5 {
        session.increment();
    }
    assert_eq!(session.proposed_amount(), 1000);
    assert!(session.is_valid());
}

/// 모드 전환: 전체 열람 중에는 제출 불가, 복귀 시 금액 복원
#[tokio::test]
async fn test_mode_switch_round_trip() {
    let store = setup_store();
    seed_test_item(&store, "item-1", "active");
    seed_activity(&store, "act-legacy", "item-1", 2, 700, "other-user");

    let shared: SharedDocumentStore = store.clone();
    let mut session = BiddingSession::open(shared, "item-1", test_user("user-1"))
        .await
        .unwrap();
    session.select_number(2).await.unwrap();
    assert_eq!(session.proposed_amount(), 800);
    session.increment();
    assert_eq!(session.proposed_amount(), 900);

    session.set_mode(BidMode::All);
    assert!(!session.is_valid());
    let error = session.submit().await.unwrap_err();
    assert!(matches!(
        error,
        SessionError::Form(FormError::BrowsingAllNumbers)
    ));

    // 사이에 새 입찰이 없었으므로 금액이 복원된다
    session.set_mode(BidMode::Single);
    assert_eq!(session.proposed_amount(), 900);
    assert!(session.is_valid());
}

/// 구성이 없는 상품은 조작 불가 상태로 열린다
#[tokio::test]
async fn test_item_without_colors_is_disabled() {
    let store = setup_store();
    // 색상 시드 없이 상품만 등록
    store.seed_document(
        "bid-item",
        "item-2",
        json!({
            "name": "색상 없는 상품",
            "description": "색상 구성이 없는 상품입니다.",
            "numberStartedAt": 1,
            "numberEndedAt": 5,
            "initialPrice": 500,
            "biddingPoint": 100,
            "status": "active",
        }),
    );

    let shared: SharedDocumentStore = store.clone();
    let mut session = BiddingSession::open(shared, "item-2", test_user("user-1"))
        .await
        .unwrap();
    session.select_number(1).await.unwrap();

    assert!(!session.form().is_enabled());
    assert!(!session.is_valid());
}

/// 실시간 피드: 번호별 최고 입찰만 금액 내림차순으로 발행된다
#[tokio::test]
async fn test_feed_leaderboard_reduction() {
    let store = setup_store();
    seed_test_item(&store, "item-1", "active");
    seed_activity(&store, "act-1", "item-1", 1, 700, "user-a");
    seed_activity(&store, "act-2", "item-1", 2, 900, "user-b");
    seed_activity(&store, "act-3", "item-1", 2, 1200, "user-c");
    seed_activity(&store, "act-4", "item-1", 3, 800, "user-a");

    let shared: SharedDocumentStore = store.clone();
    let consumer = FeedConsumer::new(shared, "item-1", 50);
    let (_handle, mut board_rx) = consumer.start(FeedFilter::all()).await.unwrap();

    timeout(Duration::from_secs(1), board_rx.changed())
        .await
        .expect("리더보드가 발행되어야 한다")
        .unwrap();

    let board = board_rx.borrow_and_update().clone();
    let summary: Vec<(i64, i64)> = board
        .iter()
        .map(|activity| (activity.bid_number, activity.amount))
        .collect();
    assert_eq!(summary, vec![(2, 1200), (3, 800), (1, 700)]);

    // 새 최고 입찰이 도착하면 리더보드가 갱신된다
    seed_activity(&store, "act-5", "item-1", 1, 1500, "user-d");
    timeout(Duration::from_secs(1), board_rx.changed())
        .await
        .expect("갱신이 발행되어야 한다")
        .unwrap();
    let board = board_rx.borrow_and_update().clone();
    assert_eq!(board.first().map(|activity| activity.amount), Some(1500));
}

/// 번호 필터가 걸린 피드는 해당 번호의 활동만 반영한다
#[tokio::test]
async fn test_feed_single_number_filter() {
    let store = setup_store();
    seed_test_item(&store, "item-1", "active");
    seed_activity(&store, "act-1", "item-1", 1, 700, "user-a");
    seed_activity(&store, "act-2", "item-1", 2, 900, "user-b");

    let shared: SharedDocumentStore = store.clone();
    let consumer = FeedConsumer::new(shared, "item-1", 50);
    let (_handle, mut board_rx) = consumer.start(FeedFilter::single(2)).await.unwrap();

    timeout(Duration::from_secs(1), board_rx.changed())
        .await
        .expect("리더보드가 발행되어야 한다")
        .unwrap();
    let board = board_rx.borrow_and_update().clone();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].bid_number, 2);
}

/// 경매 종료 감시: 상태가 ended 로 바뀌면 이벤트가 도착한다
#[tokio::test]
async fn test_status_watcher_detects_auction_end() {
    let store = setup_store();
    seed_test_item(&store, "item-1", "active");

    let shared: SharedDocumentStore = store.clone();
    let watcher = StatusWatcher::new(shared, "item-1");
    let mut ended_rx = watcher.start().await;

    // 백엔드 측 상태 전이를 흉내 낸다
    seed_test_item(&store, "item-1", "ended");

    let event = timeout(Duration::from_secs(5), ended_rx.recv())
        .await
        .expect("종료 이벤트가 도착해야 한다");
    assert!(event.is_some());
}

/// 가입 → 프로필 생성 → 로그인 → 로그아웃 흐름 테스트
#[tokio::test]
async fn test_auth_register_and_login_flow() {
    let store = setup_store();
    let provider = Arc::new(InMemoryIdentityProvider::new());
    let shared: SharedDocumentStore = store.clone();
    let policy = SignupPolicy::with_domains(["@gmail.com"], ["vip@company.com"]);
    let manager = AuthManager::new(provider.clone(), shared, policy);

    let form = SignupForm {
        username: "alice".to_string(),
        email: "alice@gmail.com".to_string(),
        password: "Secretpw1".to_string(),
        first_name: "Alice".to_string(),
        last_name: "Kim".to_string(),
        phone: "0812345678".to_string(),
        country_code: "+66".to_string(),
    };

    let profile = manager.register(form).await.expect("가입 실패");
    assert_eq!(profile.username, "alice");
    assert!(!profile.uid.is_empty());

    // 프로필 문서가 생성되어 있다
    let stored = manager.user_info_by_uid(&profile.uid).await.unwrap();
    assert!(stored.is_some());
    assert!(manager.is_username_taken("alice").await.unwrap());

    // 인증 상태 관찰
    let state_rx = provider.watch_auth_state();
    assert!(state_rx.borrow().is_some());

    manager.logout().await.unwrap();
    assert!(state_rx.borrow().is_none());

    // 재로그인
    let profile = manager.login("alice@gmail.com", "Secretpw1").await.unwrap();
    assert_eq!(profile.username, "alice");
    let error = manager.login("alice@gmail.com", "wrong-pw").await.unwrap_err();
    assert_eq!(error, AuthError::InvalidCredential);
}

/// 가입 정책: 허용 도메인과 비밀번호 규칙 검증
#[tokio::test]
async fn test_signup_policy_rejections() {
    let store = setup_store();
    let provider = Arc::new(InMemoryIdentityProvider::new());
    let shared: SharedDocumentStore = store.clone();
    let policy = SignupPolicy::with_domains(["@gmail.com"], ["vip@company.com"]);
    let manager = AuthManager::new(provider, shared, policy);

    let base = SignupForm {
        username: "bob".to_string(),
        email: "bob@evil.com".to_string(),
        password: "Secretpw1".to_string(),
        first_name: "Bob".to_string(),
        last_name: "Lee".to_string(),
        phone: String::new(),
        country_code: String::new(),
    };

    // 허용되지 않은 도메인
    let error = manager.register(base.clone()).await.unwrap_err();
    assert_eq!(error, AuthError::EmailDomainNotAllowed);

    // 허용 목록에 있는 개별 이메일은 통과한다
    let mut allowed = base.clone();
    allowed.email = "vip@company.com".to_string();
    assert!(manager.register(allowed).await.is_ok());

    // 약한 비밀번호(문자 종류 부족)
    let mut weak = base;
    weak.email = "bob@gmail.com".to_string();
    weak.password = "aaaaaaaa".to_string();
    let error = manager.register(weak).await.unwrap_err();
    assert_eq!(error, AuthError::PasswordPolicy);
}

/// 인증 메일 확인 코드 검증 흐름
#[tokio::test]
async fn test_email_verification_code_flow() {
    let provider = InMemoryIdentityProvider::new();

    let user = provider
        .sign_up("carol@gmail.com", "Secretpw1")
        .await
        .unwrap();
    assert!(!user.email_verified);

    // 로그아웃 상태에서는 인증 메일을 보낼 수 없다
    provider.sign_out().await.unwrap();
    let error = provider.send_verification_email().await.unwrap_err();
    assert_eq!(error, AuthError::NotSignedIn);

    provider
        .sign_in("carol@gmail.com", "Secretpw1")
        .await
        .unwrap();
    provider.send_verification_email().await.unwrap();

    // 잘못된 코드는 거부된다
    let error = provider.verify_action_code("bad-code").await.unwrap_err();
    assert_eq!(error, AuthError::InvalidActionCode);

    // 메일로 받은 코드를 검증하면 세션에 반영된다
    let code = provider
        .last_action_code("carol@gmail.com")
        .expect("확인 코드가 발급되어야 한다");
    provider.verify_action_code(&code).await.unwrap();
    let user = provider.current_user().await.unwrap();
    assert!(user.email_verified);
}

/// 최종 리더보드는 캐시되고, 무효화 후에만 새 활동이 보인다
#[tokio::test]
async fn test_final_leaderboard_uses_cache() {
    let store = setup_store();
    seed_test_item(&store, "item-1", "ended");
    seed_activity(&store, "act-1", "item-1", 1, 700, "user-a");
    seed_activity(&store, "act-2", "item-1", 2, 900, "user-b");

    let cache = TtlCache::new(Duration::from_secs(60));
    let board = query::handlers::get_final_leaderboard(store.as_ref(), &cache, "item-1")
        .await
        .unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].amount, 900);

    // 캐시가 살아 있는 동안에는 새 활동이 보이지 않는다
    seed_activity(&store, "act-3", "item-1", 3, 1500, "user-c");
    let cached = query::handlers::get_final_leaderboard(store.as_ref(), &cache, "item-1")
        .await
        .unwrap();
    assert_eq!(cached.len(), 2);

    // 무효화 후 재조회
    cache.invalidate(&keys::final_leaderboard("item-1"));
    let refreshed = query::handlers::get_final_leaderboard(store.as_ref(), &cache, "item-1")
        .await
        .unwrap();
    assert_eq!(refreshed.len(), 3);
    assert_eq!(refreshed[0].amount, 1500);
}

/// 사용자 본인 활동 조회와 캐시 무효화
#[tokio::test]
async fn test_user_activities_cache_invalidation() {
    let store = setup_store();
    seed_test_item(&store, "item-1", "active");
    seed_activity(&store, "act-1", "item-1", 1, 700, "user-1");
    seed_activity(&store, "act-2", "item-1", 2, 900, "other-user");

    let cache = TtlCache::new(Duration::from_secs(60));
    let mine =
        query::handlers::get_cached_user_activities(store.as_ref(), &cache, "item-1", "user-1")
            .await
            .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].amount, 700);

    // 입찰 확정 직후에는 사용자 활동 캐시를 무효화한다
    seed_activity(&store, "act-3", "item-1", 1, 1100, "user-1");
    cache.invalidate(&keys::user_activities("user-1"));
    let mine =
        query::handlers::get_cached_user_activities(store.as_ref(), &cache, "item-1", "user-1")
            .await
            .unwrap();
    assert_eq!(mine.len(), 2);
}

/// 종료된 경매에는 입찰할 수 없다
#[tokio::test]
async fn test_bid_on_ended_auction_is_rejected() {
    let store = setup_store();
    seed_test_item(&store, "item-1", "ended");

    let shared: SharedDocumentStore = store.clone();
    let mut session = BiddingSession::open(shared, "item-1", test_user("user-1"))
        .await
        .unwrap();
    session.select_number(1).await.unwrap();
    session.increment();

    let error = session.submit().await.unwrap_err();
    assert!(matches!(
        error,
        SessionError::Command(
            bidding_client::bidding::commands::CommandError::AlreadyEnded
        )
    ));
}
