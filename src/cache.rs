/// 읽기 위주 데이터의 TTL 캐시
/// 카탈로그와 최종 리더보드처럼 자주 바뀌지 않는 조회 결과를 보관한다
// region:    --- Imports
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// endregion: --- Imports

// region:    --- Cache Keys
/// 캐시 키(무효화 단위)
pub mod keys {
    pub fn user_activities(user_id: &str) -> String {
        format!("user-activities:{}", user_id)
    }

    pub fn app_activities() -> String {
        "app-activities".to_string()
    }

    pub fn bid_items() -> String {
        "bid-items".to_string()
    }

    pub fn bid_item_colors() -> String {
        "bid-item-colors".to_string()
    }

    pub fn final_leaderboard(item_id: &str) -> String {
        format!("final-leaderboard:{}", item_id)
    }
}
// endregion: --- Cache Keys

// region:    --- Ttl Cache
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, (Instant, V)>>,
    ttl: Duration,
}

/// TtlCache 구현
impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// 보존 시간이 지나지 않은 값 조회
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.lock().expect("lock");
        entries.get(key).and_then(|(stored_at, value)| {
            if stored_at.elapsed() < self.ttl {
                Some(value.clone())
            } else {
                None
            }
        })
    }

    pub fn put(&self, key: &str, value: V) {
        self.entries
            .lock()
            .expect("lock")
            .insert(key.to_string(), (Instant::now(), value));
    }

    /// 키 무효화(입찰 확정 직후 등)
    pub fn invalidate(&self, key: &str) {
        self.entries.lock().expect("lock").remove(key);
    }

    pub fn clear(&self) {
        self.entries.lock().expect("lock").clear();
    }
}
// endregion: --- Ttl Cache
