// region:    --- Imports
use std::env;
use std::time::Duration;
use tracing::warn;

// endregion: --- Imports

// region:    --- Backend Config
/// 외부 백엔드 접속 설정
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// 문서/실시간 저장소 베이스 URL
    pub database_url: String,
    /// 신원 제공자 베이스 URL
    pub auth_url: String,
    /// 신원 제공자 API 키
    pub api_key: String,
    /// 단건 요청 타임아웃
    pub request_timeout: Duration,
}

/// BackendConfig 구현
impl BackendConfig {
    pub fn new(
        database_url: impl Into<String>,
        auth_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        BackendConfig {
            database_url: database_url.into(),
            auth_url: auth_url.into(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        let database_url =
            env::var("BACKEND_DATABASE_URL").expect("BACKEND_DATABASE_URL must be set");
        let auth_url = env::var("BACKEND_AUTH_URL")
            .unwrap_or_else(|_| "https://identitytoolkit.googleapis.com/v1".to_string());
        let api_key = env::var("BACKEND_API_KEY").unwrap_or_else(|_| {
            warn!("{:<12} --> BACKEND_API_KEY 미설정, 빈 키 사용", "Config");
            String::new()
        });
        BackendConfig::new(database_url, auth_url, api_key)
    }
}
// endregion: --- Backend Config
