// region:    --- Imports
use crate::store::{Document, StoreError, BID_ACTIVITY_COLLECTION, BID_COLOR_COLLECTION,
                   BID_ITEM_COLLECTION, USERS_COLLECTION};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Parse
/// 문서 본문을 스키마로 검증 해석
/// 해석 실패는 타입 오류로 표면화한다(형태를 신뢰하지 않는다)
fn parse_document<T: DeserializeOwned>(
    collection: &str,
    document: &Document,
) -> Result<T, StoreError> {
    serde_json::from_value(document.data.clone()).map_err(|e| StoreError::Schema {
        collection: collection.to_string(),
        id: document.id.clone(),
        reason: e.to_string(),
    })
}
// endregion: --- Parse

// region:    --- Models
/// 상품 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidItemStatus {
    Active,
    Ended,
}

/// 상품 모델
/// 문서 키는 본문에 저장하지 않고 해석 시 주입한다
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidItem {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    pub description: String,
    pub number_started_at: i64,
    pub number_ended_at: i64,
    pub initial_price: i64,
    pub bidding_point: i64,
    pub status: BidItemStatus,
}

impl BidItem {
    pub fn from_document(document: &Document) -> Result<Self, StoreError> {
        let mut item: BidItem = parse_document(BID_ITEM_COLLECTION, document)?;
        item.id = document.id.clone();
        Ok(item)
    }

    /// 번호가 상품 범위 안에 있는지 확인
    pub fn contains_number(&self, number: i64) -> bool {
        self.number_started_at <= number && number <= self.number_ended_at
    }

    /// 입찰 가능한 번호 목록
    pub fn bid_numbers(&self) -> Vec<i64> {
        (self.number_started_at..=self.number_ended_at).collect()
    }
}

/// 상품 색상 모델
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidColor {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    pub thumbnail: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub code: String,
    pub bid_item_id: String,
}

impl BidColor {
    pub fn from_document(document: &Document) -> Result<Self, StoreError> {
        let mut color: BidColor = parse_document(BID_COLOR_COLLECTION, document)?;
        color.id = document.id.clone();
        Ok(color)
    }
}

/// 입찰 활동 모델(추가 전용 사실 레코드)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidActivity {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub item_id: String,
    pub bid_number: i64,
    pub bid_item_color_id: String,
    pub amount: i64,
    pub user_id: String,
    pub name: String,
    // 와이어에서는 epoch 밀리초
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl BidActivity {
    pub fn from_document(document: &Document) -> Result<Self, StoreError> {
        let mut activity: BidActivity = parse_document(BID_ACTIVITY_COLLECTION, document)?;
        activity.id = document.id.clone();
        Ok(activity)
    }
}

/// 사용자 프로필 모델
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub uid: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country_code: String,
}

impl UserInfo {
    pub fn from_document(document: &Document) -> Result<Self, StoreError> {
        let mut user: UserInfo = parse_document(USERS_COLLECTION, document)?;
        user.id = document.id.clone();
        Ok(user)
    }

    /// 활동에 기록할 표시 이름(사용자명, 없으면 이름)
    pub fn display_name(&self) -> &str {
        if self.username.is_empty() {
            &self.first_name
        } else {
            &self.username
        }
    }
}
// endregion: --- Models
