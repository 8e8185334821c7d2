// region:    --- Imports
use super::{AuthError, AuthUser, IdentityProvider};
use crate::config::BackendConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::info;

// endregion: --- Imports

// region:    --- Rest Identity Provider
/// 신원 제공자 REST 클라이언트
/// 세션(현재 계정)은 프로세스 수명 동안만 유지한다
pub struct RestIdentityProvider {
    client: reqwest::Client,
    auth_url: String,
    api_key: String,
    session: Mutex<Option<AuthUser>>,
    state_tx: watch::Sender<Option<AuthUser>>,
}

/// 계정 자격 증명 응답
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialResponse {
    local_id: String,
    email: String,
    id_token: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// RestIdentityProvider 구현
impl RestIdentityProvider {
    pub fn new(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("HTTP 클라이언트 생성 실패");
        let (state_tx, _) = watch::channel(None);

        RestIdentityProvider {
            client,
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            session: Mutex::new(None),
            state_tx,
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/accounts:{}?key={}", self.auth_url, action, self.api_key)
    }

    /// 오류 응답에서 제공자 오류 코드 추출
    async fn error_from_response(response: reqwest::Response) -> AuthError {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: ErrorDetail,
        }
        #[derive(Deserialize)]
        struct ErrorDetail {
            message: String,
        }
        match response.json::<ErrorBody>().await {
            Ok(body) => AuthError::from_provider_code(&body.error.message),
            Err(e) => AuthError::Unknown(e.to_string()),
        }
    }

    /// 이메일/비밀번호 요청(계정 생성과 로그인이 같은 형태를 쓴다)
    async fn credential_request(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .post(self.endpoint(action))
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Unknown(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let credential: CredentialResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unknown(e.to_string()))?;
        Ok(AuthUser {
            uid: credential.local_id,
            email: credential.email,
            display_name: credential.display_name.filter(|name| !name.is_empty()),
            email_verified: false,
            id_token: credential.id_token,
        })
    }

    /// 본문만 다른 단순 액션 요청
    async fn action_request(&self, action: &str, body: serde_json::Value) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoint(action))
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Unknown(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }

    /// 계정 조회로 이메일 인증 여부 확인
    async fn lookup_email_verified(&self, id_token: &str) -> Result<bool, AuthError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct LookupUser {
            #[serde(default)]
            email_verified: bool,
        }
        #[derive(Deserialize)]
        struct LookupResponse {
            #[serde(default)]
            users: Vec<LookupUser>,
        }

        let response = self
            .client
            .post(self.endpoint("lookup"))
            .json(&json!({ "idToken": id_token }))
            .send()
            .await
            .map_err(|e| AuthError::Unknown(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unknown(e.to_string()))?;
        Ok(lookup.users.first().map(|user| user.email_verified).unwrap_or(false))
    }

    fn require_token(&self) -> Result<String, AuthError> {
        self.session
            .lock()
            .expect("lock")
            .as_ref()
            .map(|user| user.id_token.clone())
            .ok_or(AuthError::NotSignedIn)
    }

    fn set_session(&self, user: Option<AuthUser>) {
        *self.session.lock().expect("lock") = user.clone();
        let _ = self.state_tx.send(user);
    }
}
// endregion: --- Rest Identity Provider

// region:    --- IdentityProvider impl
#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        info!("{:<12} --> 계정 생성: {}", "Auth", email);
        let user = self.credential_request("signUp", email, password).await?;
        self.set_session(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        info!("{:<12} --> 로그인: {}", "Auth", email);
        let mut user = self
            .credential_request("signInWithPassword", email, password)
            .await?;
        // 이메일 인증 여부는 별도 조회로 확인
        if let Ok(verified) = self.lookup_email_verified(&user.id_token).await {
            user.email_verified = verified;
        }
        self.set_session(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        info!("{:<12} --> 로그아웃", "Auth");
        self.set_session(None);
        Ok(())
    }

    async fn current_user(&self) -> Option<AuthUser> {
        self.session.lock().expect("lock").clone()
    }

    async fn update_display_name(&self, display_name: &str) -> Result<(), AuthError> {
        let id_token = self.require_token()?;
        self.action_request(
            "update",
            json!({
                "idToken": id_token,
                "displayName": display_name,
                "returnSecureToken": false,
            }),
        )
        .await?;

        let mut session = self.session.lock().expect("lock");
        if let Some(user) = session.as_mut() {
            user.display_name = Some(display_name.to_string());
        }
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        info!("{:<12} --> 비밀번호 재설정 메일 발송: {}", "Auth", email);
        self.action_request(
            "sendOobCode",
            json!({ "requestType": "PASSWORD_RESET", "email": email }),
        )
        .await
    }

    async fn send_verification_email(&self) -> Result<(), AuthError> {
        let id_token = self.require_token()?;
        info!("{:<12} --> 인증 메일 발송", "Auth");
        self.action_request(
            "sendOobCode",
            json!({ "requestType": "VERIFY_EMAIL", "idToken": id_token }),
        )
        .await
    }

    async fn verify_action_code(&self, code: &str) -> Result<(), AuthError> {
        info!("{:<12} --> 확인 코드 검증", "Auth");
        self.action_request("update", json!({ "oobCode": code })).await?;

        // 인증 메일 코드가 확인되면 현재 세션에도 반영한다
        let mut session = self.session.lock().expect("lock");
        if let Some(user) = session.as_mut() {
            user.email_verified = true;
        }
        Ok(())
    }

    fn watch_auth_state(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state_tx.subscribe()
    }
}
// endregion: --- IdentityProvider impl
