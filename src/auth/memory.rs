// region:    --- Imports
use super::{AuthError, AuthUser, IdentityProvider};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;

// endregion: --- Imports

// region:    --- In-Memory Identity Provider
/// 저장된 계정
#[derive(Debug, Clone)]
struct StoredAccount {
    uid: String,
    password: String,
    display_name: Option<String>,
    email_verified: bool,
}

/// 테스트용 인메모리 신원 제공자
pub struct InMemoryIdentityProvider {
    accounts: Mutex<BTreeMap<String, StoredAccount>>,
    session: Mutex<Option<AuthUser>>,
    pending_codes: Mutex<BTreeMap<String, String>>,
    state_tx: watch::Sender<Option<AuthUser>>,
    next_uid: AtomicU64,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(None);
        InMemoryIdentityProvider {
            accounts: Mutex::new(BTreeMap::new()),
            session: Mutex::new(None),
            pending_codes: Mutex::new(BTreeMap::new()),
            state_tx,
            next_uid: AtomicU64::new(1),
        }
    }

    /// 마지막으로 발급된 확인 코드(테스트에서 메일 수신 대신 사용)
    pub fn last_action_code(&self, email: &str) -> Option<String> {
        self.pending_codes.lock().expect("lock").get(email).cloned()
    }

    fn session_user(&self, email: &str, account: &StoredAccount) -> AuthUser {
        AuthUser {
            uid: account.uid.clone(),
            email: email.to_string(),
            display_name: account.display_name.clone(),
            email_verified: account.email_verified,
            id_token: format!("token-{}", account.uid),
        }
    }

    fn set_session(&self, user: Option<AuthUser>) {
        *self.session.lock().expect("lock") = user.clone();
        let _ = self.state_tx.send(user);
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}
// endregion: --- In-Memory Identity Provider

// region:    --- IdentityProvider impl
#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let mut accounts = self.accounts.lock().expect("lock");
        if accounts.contains_key(email) {
            return Err(AuthError::EmailAlreadyInUse);
        }
        // 신원 제공자 자체의 최소 비밀번호 규칙
        if password.chars().count() < 6 {
            return Err(AuthError::WeakPassword);
        }
        let uid = format!("uid-{:06}", self.next_uid.fetch_add(1, Ordering::SeqCst));
        let account = StoredAccount {
            uid,
            password: password.to_string(),
            display_name: None,
            email_verified: false,
        };
        accounts.insert(email.to_string(), account.clone());
        drop(accounts);

        let user = self.session_user(email, &account);
        self.set_session(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let accounts = self.accounts.lock().expect("lock");
        let account = accounts.get(email).ok_or(AuthError::UserNotFound)?;
        if account.password != password {
            return Err(AuthError::InvalidCredential);
        }
        let user = self.session_user(email, account);
        drop(accounts);

        self.set_session(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.set_session(None);
        Ok(())
    }

    async fn current_user(&self) -> Option<AuthUser> {
        self.session.lock().expect("lock").clone()
    }

    async fn update_display_name(&self, display_name: &str) -> Result<(), AuthError> {
        let email = {
            let session = self.session.lock().expect("lock");
            session.as_ref().map(|user| user.email.clone())
        }
        .ok_or(AuthError::NotSignedIn)?;

        let mut accounts = self.accounts.lock().expect("lock");
        if let Some(account) = accounts.get_mut(&email) {
            account.display_name = Some(display_name.to_string());
        }
        drop(accounts);

        let mut session = self.session.lock().expect("lock");
        if let Some(user) = session.as_mut() {
            user.display_name = Some(display_name.to_string());
        }
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let accounts = self.accounts.lock().expect("lock");
        if !accounts.contains_key(email) {
            return Err(AuthError::UserNotFound);
        }
        drop(accounts);
        self.pending_codes
            .lock()
            .expect("lock")
            .insert(email.to_string(), format!("reset-{}", email));
        Ok(())
    }

    async fn send_verification_email(&self) -> Result<(), AuthError> {
        let email = {
            let session = self.session.lock().expect("lock");
            session.as_ref().map(|user| user.email.clone())
        }
        .ok_or(AuthError::NotSignedIn)?;
        self.pending_codes
            .lock()
            .expect("lock")
            .insert(email.clone(), format!("verify-{}", email));
        Ok(())
    }

    async fn verify_action_code(&self, code: &str) -> Result<(), AuthError> {
        let mut pending = self.pending_codes.lock().expect("lock");
        let email = pending
            .iter()
            .find(|(_, pending_code)| pending_code.as_str() == code)
            .map(|(email, _)| email.clone())
            .ok_or(AuthError::InvalidActionCode)?;
        pending.remove(&email);
        drop(pending);

        let mut accounts = self.accounts.lock().expect("lock");
        if let Some(account) = accounts.get_mut(&email) {
            account.email_verified = true;
        }
        drop(accounts);

        let mut session = self.session.lock().expect("lock");
        if let Some(user) = session.as_mut() {
            if user.email == email {
                user.email_verified = true;
            }
        }
        Ok(())
    }

    fn watch_auth_state(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state_tx.subscribe()
    }
}
// endregion: --- IdentityProvider impl
