// region:    --- Imports
use crate::bidding::model::UserInfo;
use crate::store::{Filter, SharedDocumentStore, StoreError, USERS_COLLECTION};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info};

// endregion: --- Imports

pub mod memory;
pub mod rest;

// region:    --- Auth User
/// 신원 제공자가 돌려주는 계정 정보
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub id_token: String,
}
// endregion: --- Auth User

// region:    --- Auth Error
/// 인증 오류(사용자에게 보여줄 메시지 포함)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("이메일 또는 비밀번호가 올바르지 않습니다. 다시 확인해 주세요.")]
    InvalidCredential,

    #[error("이미 다른 계정에서 사용 중인 이메일입니다.")]
    EmailAlreadyInUse,

    #[error("비밀번호가 너무 약합니다.")]
    WeakPassword,

    #[error("해당 이메일의 계정을 찾을 수 없습니다.")]
    UserNotFound,

    #[error("로그인된 사용자가 없습니다.")]
    NotSignedIn,

    #[error("허용되지 않은 이메일 도메인입니다.")]
    EmailDomainNotAllowed,

    #[error("비밀번호는 8자 이상이어야 하며 소문자/대문자/숫자/특수문자 중 3가지 이상을 포함해야 합니다.")]
    PasswordPolicy,

    #[error("이름은 1자 이상 {0}자 이하여야 합니다.")]
    NameLength(usize),

    #[error("유효하지 않은 확인 코드입니다.")]
    InvalidActionCode,

    #[error("알 수 없는 인증 오류가 발생했습니다. 다시 시도해 주세요. ({0})")]
    Unknown(String),
}

impl AuthError {
    /// 신원 제공자 오류 코드 매핑
    pub fn from_provider_code(code: &str) -> Self {
        match code {
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "INVALID_CREDENTIAL" => {
                AuthError::InvalidCredential
            }
            "EMAIL_EXISTS" => AuthError::EmailAlreadyInUse,
            "EMAIL_NOT_FOUND" => AuthError::UserNotFound,
            "INVALID_OOB_CODE" | "EXPIRED_OOB_CODE" => AuthError::InvalidActionCode,
            code if code.starts_with("WEAK_PASSWORD") => AuthError::WeakPassword,
            other => AuthError::Unknown(other.to_string()),
        }
    }
}
// endregion: --- Auth Error

// region:    --- Identity Provider Trait
/// 신원 제공자 트레이트
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 이메일/비밀번호 계정 생성
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    /// 이메일/비밀번호 로그인
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    /// 로그아웃
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// 현재 로그인된 계정
    async fn current_user(&self) -> Option<AuthUser>;

    /// 현재 계정의 표시 이름 변경
    async fn update_display_name(&self, display_name: &str) -> Result<(), AuthError>;

    /// 비밀번호 재설정 메일 발송
    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// 현재 계정으로 인증 메일 발송
    async fn send_verification_email(&self) -> Result<(), AuthError>;

    /// 메일로 받은 확인 코드 검증
    async fn verify_action_code(&self, code: &str) -> Result<(), AuthError>;

    /// 인증 상태 변경 관찰(None 은 로그아웃 상태)
    fn watch_auth_state(&self) -> watch::Receiver<Option<AuthUser>>;
}

pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;
// endregion: --- Identity Provider Trait

// region:    --- Signup Policy
/// 이름류 필드 길이 상한
const NAME_CHARACTER_LIMIT: usize = 100;

/// 가입 입력값
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub country_code: String,
}

/// 가입 정책: 이메일 도메인 허용 목록 + 비밀번호 규칙
/// 도메인 목록이 비어 있으면 모든 도메인을 허용한다
#[derive(Debug, Clone, Default)]
pub struct SignupPolicy {
    pub allow_email_domains: Vec<String>,
    pub allow_emails: Vec<String>,
}

impl SignupPolicy {
    /// 모든 도메인을 허용하는 정책
    pub fn open() -> Self {
        Self::default()
    }

    pub fn with_domains(
        domains: impl IntoIterator<Item = impl Into<String>>,
        emails: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        SignupPolicy {
            allow_email_domains: domains.into_iter().map(Into::into).collect(),
            allow_emails: emails.into_iter().map(Into::into).collect(),
        }
    }

    /// 가입 입력값 검증
    pub fn validate(&self, form: &SignupForm) -> Result<(), AuthError> {
        for name in [&form.username, &form.first_name, &form.last_name] {
            if name.is_empty() || name.chars().count() > NAME_CHARACTER_LIMIT {
                return Err(AuthError::NameLength(NAME_CHARACTER_LIMIT));
            }
        }
        if !self.email_allowed(&form.email) {
            return Err(AuthError::EmailDomainNotAllowed);
        }
        if !password_strong_enough(&form.password) {
            return Err(AuthError::PasswordPolicy);
        }
        Ok(())
    }

    fn email_allowed(&self, email: &str) -> bool {
        if self.allow_email_domains.is_empty() {
            return email.contains('@');
        }
        if self.allow_emails.iter().any(|allowed| allowed == email) {
            return true;
        }
        email
            .split_once('@')
            .map(|(_, domain)| {
                self.allow_email_domains
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('@') == domain)
            })
            .unwrap_or(false)
    }
}

/// 비밀번호 규칙: 8자 이상, 소문자/대문자/숫자/특수문자 중 3종 이상
fn password_strong_enough(password: &str) -> bool {
    if password.chars().count() < 8 {
        return false;
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| "!@#$%&".contains(c));
    [has_lower, has_upper, has_digit, has_special]
        .iter()
        .filter(|present| **present)
        .count()
        >= 3
}
// endregion: --- Signup Policy

// region:    --- Auth Manager
/// 신원 제공자와 사용자 프로필 컬렉션을 묶는 매니저
pub struct AuthManager {
    provider: SharedIdentityProvider,
    store: SharedDocumentStore,
    policy: SignupPolicy,
}

/// AuthManager 구현
impl AuthManager {
    pub fn new(
        provider: SharedIdentityProvider,
        store: SharedDocumentStore,
        policy: SignupPolicy,
    ) -> Self {
        AuthManager {
            provider,
            store,
            policy,
        }
    }

    /// 가입: 정책 검증 → 계정 생성 → 표시 이름 설정 → 프로필 문서 생성 → 로그인
    pub async fn register(&self, form: SignupForm) -> Result<UserInfo, AuthError> {
        info!("{:<12} --> 가입 처리 시작: {}", "Auth", form.email);
        self.policy.validate(&form)?;

        let account = self.provider.sign_up(&form.email, &form.password).await?;
        self.provider.update_display_name(&form.username).await?;

        let profile = UserInfo {
            id: String::new(),
            uid: account.uid,
            username: form.username.clone(),
            email: form.email.clone(),
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            phone: form.phone.clone(),
            country_code: form.country_code.clone(),
        };
        let data =
            serde_json::to_value(&profile).map_err(|e| AuthError::Unknown(e.to_string()))?;
        self.store
            .add_document(USERS_COLLECTION, data)
            .await
            .map_err(|e| AuthError::Unknown(e.to_string()))?;

        self.login(&form.email, &form.password).await
    }

    /// 로그인: 인증 후 프로필 문서 조회
    pub async fn login(&self, email: &str, password: &str) -> Result<UserInfo, AuthError> {
        info!("{:<12} --> 로그인 처리 시작: {}", "Auth", email);
        let account = self.provider.sign_in(email, password).await?;

        match self.user_info_by_uid(&account.uid).await {
            Ok(Some(profile)) => Ok(profile),
            // 프로필 문서가 없으면 계정 정보로 최소 프로필 구성
            Ok(None) => Ok(UserInfo {
                id: String::new(),
                uid: account.uid,
                username: account.display_name.unwrap_or_default(),
                email: account.email,
                first_name: String::new(),
                last_name: String::new(),
                phone: String::new(),
                country_code: String::new(),
            }),
            Err(e) => {
                error!("{:<12} --> 프로필 조회 실패: {:?}", "Auth", e);
                Err(AuthError::Unknown(e.to_string()))
            }
        }
    }

    /// 로그아웃
    pub async fn logout(&self) -> Result<(), AuthError> {
        info!("{:<12} --> 로그아웃", "Auth");
        self.provider.sign_out().await
    }

    /// uid 로 프로필 조회
    pub async fn user_info_by_uid(&self, uid: &str) -> Result<Option<UserInfo>, StoreError> {
        let filter = Filter::new().field("uid", uid);
        let documents = self.store.get_documents(USERS_COLLECTION, &filter).await?;
        documents.first().map(UserInfo::from_document).transpose()
    }

    /// 사용자명 중복 확인
    pub async fn is_username_taken(&self, username: &str) -> Result<bool, StoreError> {
        let filter = Filter::new().field("username", username);
        let documents = self.store.get_documents(USERS_COLLECTION, &filter).await?;
        Ok(!documents.is_empty())
    }

    pub fn provider(&self) -> &SharedIdentityProvider {
        &self.provider
    }
}
// endregion: --- Auth Manager
