/// 입찰 금액 상태 기계
/// 선택한 번호의 최고 입찰가, 본인의 직전 입찰, 수동 증감 조작을 반영해
/// 표시 금액과 제출 가능 여부를 재계산한다. 순수 동기 상태 기계로
/// 저장소 호출은 하지 않는다.
// region:    --- Imports
use std::collections::HashSet;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Types
/// 입찰 모드: 단일 번호 편집 또는 전체 번호 열람
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidMode {
    Single,
    All,
}

/// 사용자 본인의 직전 입찰
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnBid {
    pub activity_id: String,
    pub amount: i64,
}

/// 폼 검증 오류(제출만 차단, 치명적이지 않음)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("입찰 금액은 {standing} 보다 높아야 합니다.")]
    LowBid { standing: i64 },

    #[error("번호가 선택되지 않았습니다.")]
    NoNumberSelected,

    #[error("전체 열람 모드에서는 입찰할 수 없습니다.")]
    BrowsingAllNumbers,
}

impl FormError {
    pub fn code(&self) -> &'static str {
        match self {
            FormError::LowBid { .. } => "LOW_BID",
            FormError::NoNumberSelected => "NO_NUMBER",
            FormError::BrowsingAllNumbers => "ALL_MODE",
        }
    }
}

/// 모드 전환 복원용 저장 상태
/// stale 은 저장 이후 새 활동이 반영되었음을 뜻한다
#[derive(Debug, Clone)]
struct SavedAmount {
    number: i64,
    proposed: i64,
    stale: bool,
}
// endregion: --- Types

// region:    --- Bid Form
/// 입찰 금액 상태 기계
pub struct BidForm {
    increment: i64,
    initial_price: i64,
    mode: BidMode,
    enabled: bool,
    selected_number: Option<i64>,
    selected_color: Option<String>,
    top_bid: Option<i64>,
    latest_own_bid: Option<OwnBid>,
    proposed: i64,
    processed_ids: HashSet<String>,
    saved: Option<SavedAmount>,
}

impl BidForm {
    /// 상품의 시작가/증분 기준으로 폼 생성
    pub fn new(initial_price: i64, increment: i64) -> Self {
        BidForm {
            increment,
            initial_price,
            mode: BidMode::Single,
            enabled: true,
            selected_number: None,
            selected_color: None,
            top_bid: None,
            latest_own_bid: None,
            proposed: initial_price,
            processed_ids: HashSet::new(),
            saved: None,
        }
    }

    /// 번호/색상 구성이 없는 상품은 조작 불가 상태로 내린다
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // region:    --- 파생 출력
    pub fn proposed_amount(&self) -> i64 {
        self.proposed
    }

    /// 허용 최소 금액(본인 직전 입찰 + 증분, 없으면 시작가)
    pub fn min_allowed(&self) -> i64 {
        match &self.latest_own_bid {
            Some(own) => own.amount + self.increment,
            None => self.initial_price,
        }
    }

    /// 현재 기준가(최고 입찰가, 없으면 시작가)
    pub fn standing_price(&self) -> i64 {
        self.top_bid.unwrap_or(self.initial_price)
    }

    /// 제출 가능 여부
    /// 제출 금액은 기준가보다 항상 엄격히 커야 한다
    pub fn is_valid(&self) -> bool {
        self.enabled
            && self.mode == BidMode::Single
            && self.selected_number.is_some()
            && self.proposed >= self.min_allowed()
            && self.proposed > self.standing_price()
            && self
                .latest_own_bid
                .as_ref()
                .map(|own| self.proposed > own.amount)
                .unwrap_or(true)
    }

    pub fn decrement_enabled(&self) -> bool {
        self.enabled && self.mode == BidMode::Single && self.proposed > self.min_allowed()
    }

    /// 인라인 폼 오류(실제 입찰이 존재할 때만 표시)
    pub fn form_error(&self) -> Option<FormError> {
        if self.mode != BidMode::Single || self.selected_number.is_none() {
            return None;
        }
        if self.top_bid.is_some() && self.proposed <= self.standing_price() {
            return Some(FormError::LowBid {
                standing: self.standing_price(),
            });
        }
        None
    }

    pub fn mode(&self) -> BidMode {
        self.mode
    }

    pub fn selected_number(&self) -> Option<i64> {
        self.selected_number
    }

    pub fn selected_color(&self) -> Option<&str> {
        self.selected_color.as_deref()
    }

    pub fn top_bid(&self) -> Option<i64> {
        self.top_bid
    }

    pub fn latest_own_bid(&self) -> Option<&OwnBid> {
        self.latest_own_bid.as_ref()
    }
    // endregion: --- 파생 출력

    // region:    --- 전이
    /// 번호 선택: 최고 입찰가가 있으면 한 증분 위, 없으면 시작가에서 시작
    pub fn select_number(&mut self, number: i64, top_bid: Option<i64>, own_bid: Option<OwnBid>) {
        self.selected_number = Some(number);
        self.top_bid = top_bid.filter(|amount| *amount > 0);
        self.latest_own_bid = own_bid;
        self.processed_ids.clear();
        self.saved = None;
        self.proposed = match self.top_bid {
            Some(top) => top + self.increment,
            None => self.initial_price,
        };
        self.clamp_floor();
    }

    /// 색상 선택
    pub fn select_color(&mut self, color_id: impl Into<String>) {
        self.selected_color = Some(color_id.into());
    }

    /// 모드 전환
    /// 전체 → 단일 전환 시 사이에 새 입찰이 없으면 이전 금액을 복원하고,
    /// 있었으면 본인 직전 입찰(+증분) 기준으로 재계산한다
    pub fn set_mode(&mut self, mode: BidMode) {
        if self.mode == mode {
            return;
        }
        match mode {
            BidMode::All => {
                if let Some(number) = self.selected_number {
                    self.saved = Some(SavedAmount {
                        number,
                        proposed: self.proposed,
                        stale: false,
                    });
                }
                self.mode = BidMode::All;
            }
            BidMode::Single => {
                self.mode = BidMode::Single;
                match self.saved.take() {
                    Some(saved)
                        if Some(saved.number) == self.selected_number && !saved.stale =>
                    {
                        self.proposed = saved.proposed;
                    }
                    _ => {
                        self.proposed = match (&self.latest_own_bid, self.top_bid) {
                            (Some(own), _) => own.amount + self.increment,
                            (None, Some(top)) => top + self.increment,
                            (None, None) => self.initial_price,
                        };
                    }
                }
                self.clamp_floor();
            }
        }
    }

    /// 한 증분 증가
    pub fn increment(&mut self) {
        self.step(self.increment);
    }

    /// 한 증분 감소(하한 밑으로는 조용히 고정)
    pub fn decrement(&mut self) {
        self.step(-self.increment);
    }

    /// 수동 증감: ±증분 후 하한/최고가 클램프
    fn step(&mut self, delta: i64) {
        if !self.enabled || self.mode != BidMode::Single {
            return;
        }
        let mut next = self.proposed + delta;
        let floor = self.min_allowed();
        if next < floor {
            next = floor;
        } else if let Some(top) = self.top_bid {
            // 최고가를 넘어설 때는 최소 한 증분 위여야 한다
            if next > top && next < top + self.increment {
                next = top + self.increment;
            }
        }
        self.proposed = next;
    }

    fn clamp_floor(&mut self) {
        let floor = self.min_allowed();
        if self.proposed < floor {
            self.proposed = floor;
        }
    }

    /// 실시간 활동 반영(id 기준 멱등, 반영 여부 반환)
    /// 본인 입찰은 표시 금액을 한 증분 위로 전진시키고,
    /// 타인 입찰은 기준가만 올린다(표시 금액 강제 하향 없음)
    pub fn apply_activity(&mut self, activity_id: &str, amount: i64, is_own: bool) -> bool {
        if !self.processed_ids.insert(activity_id.to_string()) {
            // 같은 활동의 에코는 무시한다
            return false;
        }
        if is_own {
            // 과거 본인 입찰의 늦은 에코는 무시
            if self
                .latest_own_bid
                .as_ref()
                .map(|own| amount < own.amount)
                .unwrap_or(false)
            {
                return false;
            }
            self.latest_own_bid = Some(OwnBid {
                activity_id: activity_id.to_string(),
                amount,
            });
            if amount > self.top_bid.unwrap_or(0) {
                self.top_bid = Some(amount);
            }
            if self.mode == BidMode::Single {
                self.proposed = amount + self.increment;
            }
        } else if amount > self.top_bid.unwrap_or(0) {
            self.top_bid = Some(amount);
        }
        if let Some(saved) = self.saved.as_mut() {
            saved.stale = true;
        }
        true
    }

    /// 제출 성공 직후 낙관적 선반영(에코를 기다리지 않는다)
    /// 같은 id 의 실시간 에코는 중복 제거되어 이중 전진이 없다
    pub fn record_submission(&mut self, activity_id: &str, amount: i64) {
        self.processed_ids.insert(activity_id.to_string());
        self.latest_own_bid = Some(OwnBid {
            activity_id: activity_id.to_string(),
            amount,
        });
        if amount > self.top_bid.unwrap_or(0) {
            self.top_bid = Some(amount);
        }
        if let Some(saved) = self.saved.as_mut() {
            saved.stale = true;
        }
        self.proposed = amount + self.increment;
    }
    // endregion: --- 전이
}
// endregion: --- Bid Form
