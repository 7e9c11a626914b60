use crate::domain::model::{Identity, ProfileRecord, SessionEvent};
use crate::domain::ports::{IdentityProvider, ProfileStore};
use crate::utils::error::{Result, WaqtiError};
use crate::utils::validation::{require_field, validate_email, validate_password};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

impl Registration {
    fn validate(&self) -> Result<()> {
        require_field("Name", &self.name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        require_field("Phone", &self.phone)
    }
}

/// 目前身分的唯一寫入點；每次寫入都帶一個遞增的序號
///
/// A write is applied only if its ticket is not older than the last applied
/// one, so a slow profile lookup can never overwrite a newer result.
struct IdentitySlot {
    tx: watch::Sender<Option<Identity>>,
    issued: AtomicU64,
    applied: AtomicU64,
}

impl IdentitySlot {
    fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        }
    }

    fn ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn publish(&self, ticket: u64, identity: Option<Identity>) {
        let applied = &self.applied;
        let written = self.tx.send_if_modified(|current| {
            if ticket < applied.load(Ordering::SeqCst) {
                return false;
            }
            applied.store(ticket, Ordering::SeqCst);
            *current = identity;
            true
        });
        if !written {
            tracing::debug!("Dropped stale identity update #{}", ticket);
        }
    }

    fn clear(&self) {
        let ticket = self.ticket();
        self.publish(ticket, None);
    }
}

/// Owns the "current member or nobody" value and keeps it in step with the
/// identity provider.
///
/// The identity lives in a watch channel written only by this manager.
/// Cloning is cheap and every clone shares the same state.
pub struct SessionManager<A: IdentityProvider, P: ProfileStore> {
    auth: Arc<A>,
    profiles: Arc<P>,
    identity: Arc<IdentitySlot>,
}

impl<A: IdentityProvider, P: ProfileStore> Clone for SessionManager<A, P> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            profiles: Arc::clone(&self.profiles),
            identity: Arc::clone(&self.identity),
        }
    }
}

/// Listener registration; the listener stops when this guard is dropped.
pub struct SessionSubscription {
    handle: Option<JoinHandle<()>>,
}

impl SessionSubscription {
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Session listener released");
        }
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<A, P> SessionManager<A, P>
where
    A: IdentityProvider + 'static,
    P: ProfileStore + 'static,
{
    pub fn new(auth: Arc<A>, profiles: Arc<P>) -> Self {
        Self {
            auth,
            profiles,
            identity: Arc::new(IdentitySlot::new()),
        }
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.identity.tx.borrow().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.identity.tx.borrow().is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.is_logged_in() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    /// Passive read handle that is notified on every identity change.
    pub fn watch_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.tx.subscribe()
    }

    /// 啟動時查詢既有 session，有的話載入會員資料
    pub async fn resolve_existing_session(&self) -> Option<Identity> {
        match self.auth.current_session().await {
            Ok(Some(session)) => {
                tracing::info!("🔑 Existing session found for user {}", session.user.id);
                self.load_profile(&session.user.id).await;
            }
            Ok(None) => {
                tracing::debug!("No existing session");
            }
            Err(e) => {
                tracing::error!("❌ Session lookup failed: {}", e);
            }
        }
        self.current_identity()
    }

    pub fn subscribe_to_session_changes(&self) -> SessionSubscription {
        let mut events = self.auth.on_session_change();
        let manager = self.clone();

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => manager.apply_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("⚠️ Session listener skipped {} events, resyncing", skipped);
                        manager.resync().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        SessionSubscription {
            handle: Some(handle),
        }
    }

    /// Submit credentials. The identity is filled in by the session listener
    /// once the provider announces the new session.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        validate_email(email)?;
        validate_password(password)?;

        match self.auth.sign_in_with_password(email, password).await {
            Ok(session) => {
                tracing::info!("✅ Signed in as {}", session.user.id);
                Ok(())
            }
            Err(e) => {
                tracing::error!("❌ Login error: {}", e);
                Err(e.into_auth_failure())
            }
        }
    }

    /// 兩階段註冊：先建立認證身分，再寫入會員資料（初始 2 小時）
    ///
    /// When the profile insert fails the new auth identity is left behind
    /// without a profile. The manager then signs the fresh session out,
    /// clears the identity, logs the orphaned id and returns
    /// [`WaqtiError::ProfileWriteFailed`].
    pub async fn register(&self, registration: &Registration) -> Result<()> {
        registration.validate()?;

        let outcome = self
            .auth
            .sign_up(&registration.email, &registration.password)
            .await
            .map_err(|e| {
                tracing::error!("❌ Registration error: {}", e);
                e.into_auth_failure()
            })?;
        let user_id = outcome.user.id.clone();

        let record = ProfileRecord::new_member(
            &user_id,
            &registration.name,
            &registration.email,
            &registration.phone,
        );

        if let Err(e) = self.profiles.insert_profile(&record).await {
            tracing::warn!(
                "⚠️ Profile insert failed, auth identity {} is orphaned: {}",
                user_id,
                e
            );
            self.compensate_registration(outcome.session.is_some()).await;
            return Err(WaqtiError::ProfileWriteFailed {
                user_id,
                message: e.to_string(),
            });
        }

        tracing::info!("✅ Registered member {}", user_id);
        if outcome.session.is_some() {
            self.load_profile(&user_id).await;
        }
        Ok(())
    }

    /// Ask the provider to end the session; the local identity is cleared
    /// whatever the provider answers.
    pub async fn logout(&self) -> Result<()> {
        let result = self.auth.sign_out().await;
        self.identity.clear();

        match result {
            Ok(()) => {
                tracing::info!("👋 Signed out");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("⚠️ Provider sign-out failed, local session cleared anyway: {}", e);
                Err(e.into_auth_failure())
            }
        }
    }

    async fn compensate_registration(&self, had_session: bool) {
        if had_session {
            if let Err(e) = self.auth.sign_out().await {
                tracing::warn!("⚠️ Could not sign out after failed registration: {}", e);
            }
        }
        self.identity.clear();
    }

    async fn apply_event(&self, event: SessionEvent) {
        match event.session() {
            Some(session) => {
                tracing::debug!("Session event for user {}", session.user.id);
                self.load_profile(&session.user.id).await;
            }
            None => {
                tracing::debug!("Session ended");
                self.identity.clear();
            }
        }
    }

    async fn resync(&self) {
        match self.auth.current_session().await {
            Ok(Some(session)) => self.load_profile(&session.user.id).await,
            Ok(None) => {
                self.identity.clear();
            }
            Err(e) => tracing::error!("❌ Session resync failed: {}", e),
        }
    }

    /// 取得會員資料並更新目前身分；找不到資料時清空
    ///
    /// The ticket is taken before the fetch, so the result of a lookup that
    /// started earlier loses to any write made after it started.
    async fn load_profile(&self, user_id: &str) {
        let ticket = self.identity.ticket();
        match self.profiles.fetch_profile(user_id).await {
            Ok(Some(record)) => match Identity::try_from(record) {
                Ok(identity) => {
                    self.identity.publish(ticket, Some(identity));
                }
                Err(e) => {
                    tracing::error!("❌ Error reading user profile: {}", e);
                    self.identity.publish(ticket, None);
                }
            },
            Ok(None) => {
                tracing::warn!("⚠️ No profile row for user {}", user_id);
                self.identity.publish(ticket, None);
            }
            // 暫時性錯誤：保留目前狀態
            Err(e) => tracing::error!("❌ Error fetching user profile: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AuthSession, AuthUser, SignUpOutcome};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::broadcast;

    fn session_for(user_id: &str) -> AuthSession {
        AuthSession {
            access_token: format!("access-{}", user_id),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            user: AuthUser {
                id: user_id.to_string(),
                email: None,
            },
        }
    }

    /// In-memory provider: accepts one password per email.
    struct FakeAuth {
        accounts: Mutex<HashMap<String, (String, String)>>,
        session: Mutex<Option<AuthSession>>,
        events: broadcast::Sender<SessionEvent>,
        auto_confirm: bool,
        sign_outs: Mutex<usize>,
    }

    impl FakeAuth {
        fn new(auto_confirm: bool) -> Self {
            let (events, _) = broadcast::channel(16);
            Self {
                accounts: Mutex::new(HashMap::new()),
                session: Mutex::new(None),
                events,
                auto_confirm,
                sign_outs: Mutex::new(0),
            }
        }

        fn with_account(self, email: &str, password: &str, user_id: &str) -> Self {
            self.accounts
                .lock()
                .unwrap()
                .insert(email.to_string(), (password.to_string(), user_id.to_string()));
            self
        }

        fn open(&self, session: AuthSession) {
            *self.session.lock().unwrap() = Some(session.clone());
            let _ = self.events.send(SessionEvent::SignedIn(session));
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeAuth {
        async fn current_session(&self) -> Result<Option<AuthSession>> {
            Ok(self.session.lock().unwrap().clone())
        }

        fn on_session_change(&self) -> broadcast::Receiver<SessionEvent> {
            self.events.subscribe()
        }

        async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
            let user_id = match self.accounts.lock().unwrap().get(email) {
                Some((expected, user_id)) if expected == password => user_id.clone(),
                _ => return Err(WaqtiError::auth_rejected("Invalid login credentials")),
            };
            let session = session_for(&user_id);
            self.open(session.clone());
            Ok(session)
        }

        async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
            let user_id = format!("u-{}", email);
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(WaqtiError::auth_rejected("User already registered"));
            }
            accounts.insert(email.to_string(), (password.to_string(), user_id.clone()));
            drop(accounts);

            let session = self.auto_confirm.then(|| session_for(&user_id));
            if let Some(session) = &session {
                self.open(session.clone());
            }
            Ok(SignUpOutcome {
                user: AuthUser {
                    id: user_id,
                    email: Some(email.to_string()),
                },
                session,
            })
        }

        async fn sign_out(&self) -> Result<()> {
            *self.sign_outs.lock().unwrap() += 1;
            *self.session.lock().unwrap() = None;
            let _ = self.events.send(SessionEvent::SignedOut);
            Ok(())
        }
    }

    struct FakeProfiles {
        rows: Mutex<HashMap<String, ProfileRecord>>,
        fail_inserts: bool,
    }

    impl FakeProfiles {
        fn new(fail_inserts: bool) -> Self {
            Self {
                rows: Mutex::new(HashMap::new()),
                fail_inserts,
            }
        }

        fn with_member(self, user_id: &str, name: &str) -> Self {
            self.rows.lock().unwrap().insert(
                user_id.to_string(),
                ProfileRecord::new_member(user_id, name, "member@waqti.com", "0500000000"),
            );
            self
        }
    }

    #[async_trait]
    impl ProfileStore for FakeProfiles {
        async fn fetch_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>> {
            Ok(self.rows.lock().unwrap().get(user_id).cloned())
        }

        async fn insert_profile(&self, record: &ProfileRecord) -> Result<()> {
            if self.fail_inserts {
                return Err(WaqtiError::BackendError {
                    status: 403,
                    message: "row-level security violation".to_string(),
                });
            }
            self.rows
                .lock()
                .unwrap()
                .insert(record.id.clone(), record.clone());
            Ok(())
        }
    }

    /// The first lookup sees the table as it was when the call started and
    /// answers slowly; inserts take a moment so a lookup can overlap them.
    struct SlowFirstFetch {
        rows: Mutex<HashMap<String, ProfileRecord>>,
        fetches: Mutex<usize>,
    }

    impl SlowFirstFetch {
        fn new() -> Self {
            Self {
                rows: Mutex::new(HashMap::new()),
                fetches: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ProfileStore for SlowFirstFetch {
        async fn fetch_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>> {
            let snapshot = self.rows.lock().unwrap().get(user_id).cloned();
            let delay = {
                let mut fetches = self.fetches.lock().unwrap();
                *fetches += 1;
                if *fetches == 1 { 100 } else { 5 }
            };
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            Ok(snapshot)
        }

        async fn insert_profile(&self, record: &ProfileRecord) -> Result<()> {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.rows
                .lock()
                .unwrap()
                .insert(record.id.clone(), record.clone());
            Ok(())
        }
    }

    fn registration(email: &str) -> Registration {
        Registration {
            name: "Sara".to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
            phone: "0500000000".to_string(),
        }
    }

    async fn wait_for_identity(
        manager: &SessionManager<FakeAuth, FakeProfiles>,
        logged_in: bool,
    ) -> Option<Identity> {
        let mut rx = manager.watch_identity();
        let identity = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            rx.wait_for(|identity| identity.is_some() == logged_in),
        )
        .await
        .expect("identity change timed out")
        .expect("identity channel closed")
        .clone();
        identity
    }

    #[tokio::test]
    async fn test_resolve_existing_session_populates_identity() {
        let auth = FakeAuth::new(true);
        *auth.session.lock().unwrap() = Some(session_for("u-1"));
        let profiles = FakeProfiles::new(false).with_member("u-1", "Sara");
        let manager = SessionManager::new(Arc::new(auth), Arc::new(profiles));

        let identity = manager.resolve_existing_session().await.unwrap();
        assert_eq!(identity.name, "Sara");
        assert_eq!(manager.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_resolve_without_session_stays_anonymous() {
        let manager = SessionManager::new(
            Arc::new(FakeAuth::new(true)),
            Arc::new(FakeProfiles::new(false)),
        );
        assert!(manager.resolve_existing_session().await.is_none());
        assert_eq!(manager.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_login_populates_identity_through_listener() {
        let auth = FakeAuth::new(true).with_account("sara@waqti.com", "secret123", "u-1");
        let profiles = FakeProfiles::new(false).with_member("u-1", "Sara");
        let manager = SessionManager::new(Arc::new(auth), Arc::new(profiles));
        let _subscription = manager.subscribe_to_session_changes();

        manager.login("sara@waqti.com", "secret123").await.unwrap();

        let identity = wait_for_identity(&manager, true).await.unwrap();
        assert_eq!(identity.id, "u-1");
    }

    #[tokio::test]
    async fn test_rejected_login_leaves_identity_empty() {
        let auth = FakeAuth::new(true).with_account("sara@waqti.com", "secret123", "u-1");
        let manager = SessionManager::new(Arc::new(auth), Arc::new(FakeProfiles::new(false)));
        let _subscription = manager.subscribe_to_session_changes();

        let err = manager.login("bad@x.com", "wrong").await.unwrap_err();
        assert!(matches!(err, WaqtiError::AuthRejected { .. }));
        assert!(manager.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_invalid_login_input_never_reaches_provider() {
        let manager = SessionManager::new(
            Arc::new(FakeAuth::new(true)),
            Arc::new(FakeProfiles::new(false)),
        );

        for (email, password) in [("", "pw"), ("sara@waqti.com", ""), ("not-an-email", "pw")] {
            let err = manager.login(email, password).await.unwrap_err();
            assert!(matches!(err, WaqtiError::ValidationError { .. }));
        }
    }

    #[tokio::test]
    async fn test_logout_clears_identity() {
        let auth = FakeAuth::new(true);
        *auth.session.lock().unwrap() = Some(session_for("u-1"));
        let profiles = FakeProfiles::new(false).with_member("u-1", "Sara");
        let manager = SessionManager::new(Arc::new(auth), Arc::new(profiles));
        manager.resolve_existing_session().await;
        assert!(manager.is_logged_in());

        manager.logout().await.unwrap();
        assert!(manager.current_identity().is_none());

        // logging out again while anonymous is harmless
        manager.logout().await.unwrap();
        assert!(manager.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_register_inserts_profile_with_starting_balance() {
        let profiles = Arc::new(FakeProfiles::new(false));
        let manager = SessionManager::new(Arc::new(FakeAuth::new(true)), Arc::clone(&profiles));

        manager.register(&registration("new@waqti.com")).await.unwrap();

        let row = profiles.rows.lock().unwrap().get("u-new@waqti.com").cloned().unwrap();
        assert_eq!(row.balance, 2.0);
        assert_eq!(row.phone, "0500000000");

        let identity = manager.current_identity().unwrap();
        assert_eq!(identity.balance, 2.0);
    }

    #[tokio::test]
    async fn test_register_keeps_identity_when_listener_lookup_answers_late() {
        let profiles = Arc::new(SlowFirstFetch::new());
        let manager = SessionManager::new(Arc::new(FakeAuth::new(true)), Arc::clone(&profiles));
        let _subscription = manager.subscribe_to_session_changes();

        manager.register(&registration("new@waqti.com")).await.unwrap();
        assert_eq!(
            manager.current_identity().map(|i| i.id),
            Some("u-new@waqti.com".to_string())
        );

        // 等 listener 較早發出的查詢回來
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(*profiles.fetches.lock().unwrap(), 2);
        assert_eq!(
            manager.current_identity().map(|i| i.id),
            Some("u-new@waqti.com".to_string())
        );
    }

    #[tokio::test]
    async fn test_logout_wins_over_lookup_in_flight() {
        let auth = FakeAuth::new(true);
        *auth.session.lock().unwrap() = Some(session_for("u-1"));
        let profiles = Arc::new(SlowFirstFetch::new());
        profiles.rows.lock().unwrap().insert(
            "u-1".to_string(),
            ProfileRecord::new_member("u-1", "Sara", "sara@waqti.com", "0500000000"),
        );
        let manager = SessionManager::new(Arc::new(auth), Arc::clone(&profiles));

        let resolving = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.resolve_existing_session().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        manager.logout().await.unwrap();

        resolving.await.unwrap();
        assert!(manager.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_register_without_session_stays_anonymous() {
        let profiles = Arc::new(FakeProfiles::new(false));
        let manager = SessionManager::new(Arc::new(FakeAuth::new(false)), Arc::clone(&profiles));

        manager.register(&registration("new@waqti.com")).await.unwrap();

        assert!(profiles.rows.lock().unwrap().contains_key("u-new@waqti.com"));
        assert!(manager.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_register_profile_failure_signs_out_and_reports_orphan() {
        let auth = Arc::new(FakeAuth::new(true));
        let manager = SessionManager::new(Arc::clone(&auth), Arc::new(FakeProfiles::new(true)));
        let _subscription = manager.subscribe_to_session_changes();

        let err = manager.register(&registration("new@waqti.com")).await.unwrap_err();

        match err {
            WaqtiError::ProfileWriteFailed { user_id, .. } => assert_eq!(user_id, "u-new@waqti.com"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(*auth.sign_outs.lock().unwrap(), 1);
        assert!(auth.session.lock().unwrap().is_none());
        assert!(manager.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let auth = FakeAuth::new(true).with_account("taken@waqti.com", "pw", "u-1");
        let manager = SessionManager::new(Arc::new(auth), Arc::new(FakeProfiles::new(false)));

        let err = manager.register(&registration("taken@waqti.com")).await.unwrap_err();
        assert!(matches!(err, WaqtiError::AuthRejected { .. }));
    }

    #[tokio::test]
    async fn test_external_sign_out_clears_identity() {
        let auth = Arc::new(FakeAuth::new(true).with_account("sara@waqti.com", "secret123", "u-1"));
        let profiles = FakeProfiles::new(false).with_member("u-1", "Sara");
        let manager = SessionManager::new(Arc::clone(&auth), Arc::new(profiles));
        let _subscription = manager.subscribe_to_session_changes();

        manager.login("sara@waqti.com", "secret123").await.unwrap();
        wait_for_identity(&manager, true).await;

        // 模擬其他裝置登出
        auth.sign_out().await.unwrap();
        assert!(wait_for_identity(&manager, false).await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscription_stops_listening() {
        let auth = Arc::new(FakeAuth::new(true).with_account("sara@waqti.com", "secret123", "u-1"));
        let profiles = FakeProfiles::new(false).with_member("u-1", "Sara");
        let manager = SessionManager::new(Arc::clone(&auth), Arc::new(profiles));

        let subscription = manager.subscribe_to_session_changes();
        assert!(subscription.is_active());
        subscription.unsubscribe();
        tokio::task::yield_now().await;

        manager.login("sara@waqti.com", "secret123").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(manager.current_identity().is_none());
    }
}
