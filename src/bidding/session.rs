/// 입찰 페이지 컨트롤러
/// 폼 상태 기계와 저장소/실시간 구독을 묶어 호출 측(페이지)에
/// 번호/색상 선택, 모드 전환, 증감, 제출, 실시간 반영 인터페이스를 제공한다
// region:    --- Imports
use super::commands::{self, CommandError, PlaceBidCommand};
use super::form::{BidForm, BidMode, FormError, OwnBid};
use super::model::{BidActivity, BidColor, BidItem, UserInfo};
use crate::auction::events::AuctionEvent;
use crate::query;
use crate::store::{Filter, SharedDocumentStore, StoreError, StoreEvent, Subscription,
                   BID_ACTIVITY_COLLECTION};
use thiserror::Error;
use tracing::{error, info, warn};

// endregion: --- Imports

// region:    --- Session Error
/// 세션 오류
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("상품을 찾을 수 없습니다: {0}")]
    ItemNotFound(String),

    #[error("유효하지 않은 번호입니다: {0}")]
    InvalidNumber(i64),

    #[error("유효하지 않은 색상입니다: {0}")]
    InvalidColor(String),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
// endregion: --- Session Error

// region:    --- Bidding Session
/// 입찰 세션
pub struct BiddingSession {
    store: SharedDocumentStore,
    item: BidItem,
    colors: Vec<BidColor>,
    user: UserInfo,
    form: BidForm,
    subscription: Option<Subscription>,
}

impl BiddingSession {
    /// 세션 생성: 상품/색상 로드 후 폼 초기화
    pub async fn open(
        store: SharedDocumentStore,
        item_id: &str,
        user: UserInfo,
    ) -> Result<Self, SessionError> {
        let item = query::handlers::get_item(store.as_ref(), item_id)
            .await?
            .ok_or_else(|| SessionError::ItemNotFound(item_id.to_string()))?;

        // 색상 조회 실패는 빈 목록으로 강등(조작 불가 상태로 내려간다)
        let colors = match query::handlers::get_item_colors(store.as_ref(), item_id).await {
            Ok(colors) => colors,
            Err(e) => {
                error!("{:<12} --> 색상 조회 실패, 기본값 사용: {:?}", "Session", e);
                Vec::new()
            }
        };

        let mut form = BidForm::new(item.initial_price, item.bidding_point);
        // 번호나 색상 구성이 없으면 조작 불가
        form.set_enabled(!colors.is_empty() && item.number_started_at <= item.number_ended_at);
        if let Some(first_color) = colors.first() {
            form.select_color(first_color.id.clone());
        }

        info!("{:<12} --> 입찰 세션 시작: {}", "Session", item.id);
        Ok(BiddingSession {
            store,
            item,
            colors,
            user,
            form,
            subscription: None,
        })
    }

    // region:    --- 선택/모드
    /// 번호 선택: 최고가/본인 입찰 재조회 후 폼 재초기화, 구독 교체
    pub async fn select_number(&mut self, number: i64) -> Result<(), SessionError> {
        if !self.item.contains_number(number) {
            return Err(SessionError::InvalidNumber(number));
        }

        // 최고가 조회 실패는 시작가로 강등
        let top_bid =
            match query::handlers::get_top_bid_amount(self.store.as_ref(), &self.item.id, number)
                .await
            {
                Ok(top) => top,
                Err(e) => {
                    error!("{:<12} --> 최고가 조회 실패, 시작가 사용: {:?}", "Session", e);
                    None
                }
            };

        let own_bid = match query::handlers::get_latest_own_bid(
            self.store.as_ref(),
            &self.item.id,
            number,
            &self.user.uid,
        )
        .await
        {
            Ok(own) => own.map(|activity| OwnBid {
                activity_id: activity.id,
                amount: activity.amount,
            }),
            Err(e) => {
                error!("{:<12} --> 본인 입찰 조회 실패: {:?}", "Session", e);
                None
            }
        };

        self.form.select_number(number, top_bid, own_bid);
        self.resubscribe(number).await;
        Ok(())
    }

    /// 선택 번호가 바뀌면 기존 구독을 해제하고 새로 구독한다
    async fn resubscribe(&mut self, number: i64) {
        if let Some(old) = self.subscription.take() {
            old.stop();
        }
        let filter = Filter::new()
            .field("bidNumber", number)
            .field("itemId", self.item.id.as_str());
        match self.store.subscribe(BID_ACTIVITY_COLLECTION, &filter).await {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(e) => {
                // 구독 없이도 제출 경로는 동작한다(피드만 비어 있다)
                error!("{:<12} --> 실시간 구독 실패: {:?}", "Session", e);
            }
        }
    }

    /// 색상 선택
    pub fn select_color(&mut self, color_id: &str) -> Result<(), SessionError> {
        if !self.colors.iter().any(|color| color.id == color_id) {
            return Err(SessionError::InvalidColor(color_id.to_string()));
        }
        self.form.select_color(color_id);
        Ok(())
    }

    /// 모드 전환
    pub fn set_mode(&mut self, mode: BidMode) {
        self.form.set_mode(mode);
    }

    pub fn increment(&mut self) {
        self.form.increment();
    }

    pub fn decrement(&mut self) {
        self.form.decrement();
    }
    // endregion: --- 선택/모드

    // region:    --- 반응형 출력
    pub fn proposed_amount(&self) -> i64 {
        self.form.proposed_amount()
    }

    pub fn is_valid(&self) -> bool {
        self.form.is_valid()
    }

    pub fn decrement_enabled(&self) -> bool {
        self.form.decrement_enabled()
    }

    pub fn form_error(&self) -> Option<FormError> {
        self.form.form_error()
    }

    pub fn form(&self) -> &BidForm {
        &self.form
    }

    pub fn item(&self) -> &BidItem {
        &self.item
    }

    pub fn colors(&self) -> &[BidColor] {
        &self.colors
    }
    // endregion: --- 반응형 출력

    // region:    --- 제출
    /// 제출: 검증 → 활동 생성 → 낙관적 선반영, (번호, 금액) 반환
    pub async fn submit(&mut self) -> Result<(i64, i64), SessionError> {
        let number = self
            .form
            .selected_number()
            .ok_or(FormError::NoNumberSelected)?;
        if self.form.mode() != BidMode::Single {
            return Err(FormError::BrowsingAllNumbers.into());
        }
        if let Some(form_error) = self.form.form_error() {
            return Err(form_error.into());
        }
        if !self.form.is_valid() {
            return Err(FormError::LowBid {
                standing: self.form.standing_price(),
            }
            .into());
        }

        let amount = self.form.proposed_amount();
        let cmd = PlaceBidCommand {
            item_id: self.item.id.clone(),
            bid_number: number,
            bid_item_color_id: self.form.selected_color().unwrap_or_default().to_string(),
            amount,
            user_id: self.user.uid.clone(),
            user_name: self.user.display_name().to_string(),
        };

        match commands::handle_place_bid(cmd, &self.item, &self.colors, self.store.as_ref()).await
        {
            Ok(activity) => {
                // 에코를 기다리지 않는 낙관적 선반영(에코는 id 로 중복 제거)
                self.form.record_submission(&activity.id, activity.amount);
                info!("{:<12} --> 입찰 성공: No.{} / {}", "Session", number, amount);
                Ok((number, amount))
            }
            Err(e) => {
                // 제출 실패 시 낙관적 상태 롤백은 하지 않는다
                error!("{:<12} --> 입찰 실패: {:?}", "Session", e);
                Err(e.into())
            }
        }
    }
    // endregion: --- 제출

    // region:    --- 실시간 반영
    /// 실시간 활동 반영(중복 에코는 false)
    pub fn on_realtime_activity(&mut self, activity: &BidActivity) -> bool {
        if Some(activity.bid_number) != self.form.selected_number()
            || activity.item_id != self.item.id
        {
            return false;
        }
        let is_own = activity.user_id == self.user.uid;
        self.form.apply_activity(&activity.id, activity.amount, is_own)
    }

    /// 구독 스트림에서 다음 변경을 받아 폼에 반영한다
    /// 반영된 활동이 있을 때만 이벤트를 돌려주고, 스트림이 끝나면 None
    pub async fn pump_realtime(&mut self) -> Option<AuctionEvent> {
        loop {
            let event = match self.subscription.as_mut() {
                Some(subscription) => subscription.next_event().await?,
                None => return None,
            };
            let documents = match event {
                StoreEvent::Snapshot(documents) => documents,
                StoreEvent::Upsert(document) => vec![document],
            };

            let mut applied: Option<BidActivity> = None;
            for document in &documents {
                match BidActivity::from_document(document) {
                    Ok(activity) => {
                        if self.on_realtime_activity(&activity) {
                            applied = Some(activity);
                        }
                    }
                    Err(e) => {
                        warn!("{:<12} --> 활동 스키마 불일치 무시: {:?}", "Session", e)
                    }
                }
            }
            if let Some(activity) = applied {
                return Some(AuctionEvent::BidPlaced { activity });
            }
        }
    }
    // endregion: --- 실시간 반영
}
// endregion: --- Bidding Session
