use crate::domain::model::{AuthSession, ProfileRecord, SessionEvent, SignUpOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// 本機持久化（保存 session token 用）
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Remote identity service: owns credentials and sessions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<AuthSession>>;

    /// Every call returns an independent receiver; dropping it unsubscribes.
    fn on_session_change(&self) -> broadcast::Receiver<SessionEvent>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome>;
    async fn sign_out(&self) -> Result<()>;
}

/// Remote table holding one profile row per member.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>>;
    async fn insert_profile(&self, record: &ProfileRecord) -> Result<()>;
}

pub trait BackendSettings: Send + Sync {
    fn backend_url(&self) -> &str;
    fn anon_key(&self) -> &str;
    fn profile_table(&self) -> &str;
    fn timeout_seconds(&self) -> u64;
}
