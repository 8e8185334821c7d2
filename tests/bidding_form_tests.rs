use bidding_client::bidding::form::{BidForm, BidMode, FormError, OwnBid};

/// 최고 입찰가가 있는 번호 선택: 한 증분 위에서 시작하고 즉시 제출 가능
#[test]
fn test_select_number_with_existing_top_bid() {
    let mut form = BidForm::new(500, 100);
    form.select_number(7, Some(1000), None);

    assert_eq!(form.proposed_amount(), 1100);
    assert!(form.is_valid());
}

/// 입찰이 없는 번호: 시작가에서 시작하고 한 증분 올리기 전에는 제출 불가
#[test]
fn test_fresh_number_requires_one_increment() {
    let mut form = BidForm::new(500, 50);
    form.select_number(1, None, None);

    assert_eq!(form.proposed_amount(), 500);
    assert_eq!(form.min_allowed(), 500);
    assert!(!form.is_valid());
    // 실제 입찰이 없으면 인라인 오류도 없다
    assert!(form.form_error().is_none());

    form.increment();
    assert_eq!(form.proposed_amount(), 550);
    assert!(form.is_valid());
}

/// 본인 직전 입찰 800, 증분 100: 하한 900, 900 에서 감소는 무시
#[test]
fn test_decrement_clamps_to_min_allowed() {
    let mut form = BidForm::new(500, 100);
    form.select_number(
        3,
        Some(900),
        Some(OwnBid {
            activity_id: "act-own".to_string(),
            amount: 800,
        }),
    );

    assert_eq!(form.min_allowed(), 900);
    assert_eq!(form.proposed_amount(), 1000);
    assert!(form.decrement_enabled());

    form.decrement();
    assert_eq!(form.proposed_amount(), 900);
    assert!(!form.decrement_enabled());

    // 하한에서의 감소는 오류 없이 무시된다
    form.decrement();
    assert_eq!(form.proposed_amount(), 900);
}

/// 증감 시퀀스: 표시 금액은 항상 시작가 + k*증분이고 하한 아래로 내려가지 않는다
#[test]
fn test_step_sequence_stays_aligned() {
    let mut form = BidForm::new(500, 50);
    form.select_number(2, None, None);

    for _ in 0..5 {
        form.increment();
    }
    for _ in 0..2 {
        form.decrement();
    }

    assert_eq!(form.proposed_amount(), 650);
    assert_eq!((form.proposed_amount() - 500) % 50, 0);
    assert!(form.proposed_amount() >= form.min_allowed());

    // 하한까지 계속 내려도 시작가 밑으로는 가지 않는다
    for _ in 0..10 {
        form.decrement();
    }
    assert_eq!(form.proposed_amount(), 500);
}

/// 증가가 최고가를 지나칠 때는 최소 한 증분 위로 올라간다
#[test]
fn test_step_past_top_lands_at_least_one_increment_above() {
    let mut form = BidForm::new(500, 100);
    form.select_number(2, None, None);
    form.apply_activity("act-1", 950, false);

    // 타인 입찰은 표시 금액을 건드리지 않는다
    assert_eq!(form.proposed_amount(), 500);

    for _ in 0..4 {
        form.increment();
    }
    assert_eq!(form.proposed_amount(), 900);

    // 900 → 1000 은 최고가 950 을 지나치므로 1050 으로 올라간다
    form.increment();
    assert_eq!(form.proposed_amount(), 1050);
    assert!(form.is_valid());
}

/// 같은 활동 id 의 중복 반영은 두 번째부터 무시된다(멱등)
#[test]
fn test_realtime_echo_is_idempotent() {
    let mut form = BidForm::new(500, 100);
    form.select_number(5, Some(1000), None);

    assert!(form.apply_activity("act-1", 1200, false));
    assert_eq!(form.top_bid(), Some(1200));
    let before = form.proposed_amount();

    assert!(!form.apply_activity("act-1", 1200, false));
    assert_eq!(form.proposed_amount(), before);
    assert_eq!(form.top_bid(), Some(1200));
}

/// 본인 입찰 반영: 표시 금액이 한 증분 위로 전진하고 하한도 올라간다
#[test]
fn test_own_activity_advances_proposed() {
    let mut form = BidForm::new(500, 100);
    form.select_number(5, Some(1000), None);

    assert!(form.apply_activity("act-9", 1100, true));
    assert_eq!(form.proposed_amount(), 1200);
    assert_eq!(form.min_allowed(), 1200);
    assert!(form.is_valid());
}

/// 타인 입찰 반영: 기준가만 올리고 표시 금액은 끌어내리지 않는다
#[test]
fn test_foreign_activity_only_raises_top() {
    let mut form = BidForm::new(500, 100);
    form.select_number(5, Some(1000), None);
    for _ in 0..3 {
        form.increment();
    }
    assert_eq!(form.proposed_amount(), 1400);

    form.apply_activity("act-2", 1200, false);
    assert_eq!(form.top_bid(), Some(1200));
    assert_eq!(form.proposed_amount(), 1400);
    assert!(form.is_valid());
}

/// 타인 입찰이 표시 금액을 추월하면 제출이 막히고 인라인 오류가 보인다
#[test]
fn test_foreign_overtake_blocks_submission() {
    let mut form = BidForm::new(500, 100);
    form.select_number(5, Some(1000), None);
    assert_eq!(form.proposed_amount(), 1100);

    form.apply_activity("act-3", 1300, false);
    assert!(!form.is_valid());
    assert_eq!(
        form.form_error(),
        Some(FormError::LowBid { standing: 1300 })
    );
}

/// 제출 성공 후 낙관적 전진: 같은 id 의 에코는 이중 전진하지 않는다
#[test]
fn test_submission_echo_is_deduplicated() {
    let mut form = BidForm::new(500, 100);
    form.select_number(5, Some(1000), None);

    // 1100 제출 성공 가정
    form.record_submission("act-42", 1100);
    assert_eq!(form.proposed_amount(), 1200);
    assert_eq!(form.min_allowed(), 1200);

    // 실시간 에코 도착
    assert!(!form.apply_activity("act-42", 1100, true));
    assert_eq!(form.proposed_amount(), 1200);
}

/// 모드 전환: 사이에 새 입찰이 없으면 단일 모드 복귀 시 금액이 복원된다
#[test]
fn test_mode_switch_restores_amount() {
    let mut form = BidForm::new(500, 100);
    form.select_number(5, Some(1000), None);
    form.increment();
    assert_eq!(form.proposed_amount(), 1200);

    form.set_mode(BidMode::All);
    // 전체 열람 모드에서는 제출과 증감이 막힌다
    assert!(!form.is_valid());
    form.increment();
    assert_eq!(form.proposed_amount(), 1200);

    form.set_mode(BidMode::Single);
    assert_eq!(form.proposed_amount(), 1200);
    assert!(form.is_valid());
}

/// 모드 전환 사이에 새 입찰이 있으면 본인 직전 입찰 기준으로 재계산된다
#[test]
fn test_mode_switch_recomputes_after_new_activity() {
    let mut form = BidForm::new(500, 100);
    form.select_number(
        5,
        None,
        Some(OwnBid {
            activity_id: "act-own".to_string(),
            amount: 700,
        }),
    );
    form.set_mode(BidMode::All);
    form.apply_activity("act-4", 900, false);

    form.set_mode(BidMode::Single);
    assert_eq!(form.proposed_amount(), 800);
    // 기준가 900 보다 낮으므로 아직 제출은 불가
    assert!(!form.is_valid());
}

/// 번호/색상 구성이 없으면 조작 불가 상태로 내려간다
#[test]
fn test_disabled_form_ignores_steps() {
    let mut form = BidForm::new(500, 100);
    form.set_enabled(false);
    form.select_number(1, Some(1000), None);

    assert!(!form.is_valid());
    assert!(!form.decrement_enabled());

    let before = form.proposed_amount();
    form.increment();
    assert_eq!(form.proposed_amount(), before);
}
