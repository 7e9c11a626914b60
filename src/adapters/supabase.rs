use crate::domain::model::{AuthSession, AuthUser, ProfileRecord, SessionEvent, SignUpOutcome};
use crate::domain::ports::{BackendSettings, IdentityProvider, ProfileStore, Storage};
use crate::utils::error::{Result, WaqtiError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::{broadcast, RwLock};

const SESSION_FILE: &str = "session.json";
const EVENT_CAPACITY: usize = 16;
const DEFAULT_EXPIRES_IN: i64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(|| {
                Utc::now() + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN))
            });

        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Supabase 後端：GoTrue 認證 + PostgREST 會員資料表
///
/// The client keeps the current session in memory, persists it through
/// [`Storage`] so it survives restarts, and broadcasts a [`SessionEvent`]
/// whenever the session changes.
pub struct SupabaseClient<C: BackendSettings, S: Storage> {
    settings: C,
    storage: S,
    client: Client,
    session: RwLock<Option<AuthSession>>,
    events: broadcast::Sender<SessionEvent>,
}

impl<C: BackendSettings, S: Storage> SupabaseClient<C, S> {
    pub fn new(settings: C, storage: S) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_seconds()))
            .build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            settings,
            storage,
            client,
            session: RwLock::new(None),
            events,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.settings.backend_url(), path)
    }

    fn rest_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.settings.backend_url(),
            self.settings.profile_table()
        )
    }

    fn with_headers(&self, request: RequestBuilder, bearer: &str) -> RequestBuilder {
        request
            .header("apikey", self.settings.anon_key())
            .bearer_auth(bearer)
    }

    /// 有 session 用 access token，否則用匿名金鑰
    async fn bearer(&self) -> String {
        match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.settings.anon_key().to_string(),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // Err only means nobody is subscribed
        let _ = self.events.send(event);
    }

    /// `session.json` holds live access and refresh tokens; [`LocalStorage`]
    /// creates it owner-only on unix.
    ///
    /// [`LocalStorage`]: crate::adapters::LocalStorage
    async fn store_session(&self, session: &AuthSession) {
        *self.session.write().await = Some(session.clone());

        match serde_json::to_vec(session) {
            Ok(data) => {
                if let Err(e) = self.storage.write_file(SESSION_FILE, &data).await {
                    tracing::warn!("⚠️ Failed to persist session: {}", e);
                }
            }
            Err(e) => tracing::warn!("⚠️ Failed to serialize session: {}", e),
        }
    }

    async fn drop_session(&self) {
        *self.session.write().await = None;
        if let Err(e) = self.storage.remove_file(SESSION_FILE).await {
            tracing::warn!("⚠️ Failed to remove persisted session: {}", e);
        }
    }

    async fn restore_session(&self) -> Option<AuthSession> {
        let data = match self.storage.read_file(SESSION_FILE).await {
            Ok(data) => data,
            Err(WaqtiError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("⚠️ Could not read persisted session: {}", e);
                return None;
            }
        };

        match serde_json::from_slice::<AuthSession>(&data) {
            Ok(session) => {
                tracing::debug!("Restored persisted session for user {}", session.user.id);
                *self.session.write().await = Some(session.clone());
                Some(session)
            }
            Err(e) => {
                tracing::warn!("⚠️ Discarding unreadable session file: {}", e);
                self.drop_session().await;
                None
            }
        }
    }

    async fn cached_session(&self) -> Option<AuthSession> {
        let cached = self.session.read().await.clone();
        match cached {
            Some(session) => Some(session),
            None => self.restore_session().await,
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        tracing::debug!("Refreshing access token");
        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }));

        let response = self
            .with_headers(request, self.settings.anon_key())
            .send()
            .await?;
        Self::parse_token(response).await
    }

    async fn parse_token(response: Response) -> Result<AuthSession> {
        if !response.status().is_success() {
            return Err(Self::auth_error(response).await);
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.into_session())
    }

    /// 4xx 代表憑證被拒；其他狀態視為後端錯誤
    async fn auth_error(response: Response) -> WaqtiError {
        let (status, message) = error_details(response).await;
        if status.is_client_error() {
            WaqtiError::AuthRejected { message }
        } else {
            WaqtiError::BackendError {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Pull a human-readable message out of a GoTrue / PostgREST error body.
async fn error_details(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        });

    (status, message)
}

#[async_trait]
impl<C: BackendSettings, S: Storage> IdentityProvider for SupabaseClient<C, S> {
    async fn current_session(&self) -> Result<Option<AuthSession>> {
        let Some(session) = self.cached_session().await else {
            return Ok(None);
        };

        if !session.is_expired() {
            return Ok(Some(session));
        }

        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                self.store_session(&refreshed).await;
                self.emit(SessionEvent::TokenRefreshed(refreshed.clone()));
                Ok(Some(refreshed))
            }
            // 連線失敗或 5xx：保留 session，下次再試
            Err(e @ (WaqtiError::HttpError(_) | WaqtiError::BackendError { .. })) => {
                tracing::warn!("⚠️ Session refresh failed, keeping stored session: {}", e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("⚠️ Session refresh rejected, signing out: {}", e);
                self.drop_session().await;
                self.emit(SessionEvent::SignedOut);
                Ok(None)
            }
        }
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        tracing::debug!("Signing in {}", email);
        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));

        let response = self
            .with_headers(request, self.settings.anon_key())
            .send()
            .await?;
        let session = Self::parse_token(response).await?;

        self.store_session(&session).await;
        self.emit(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        tracing::debug!("Creating auth identity for {}", email);
        let request = self
            .client
            .post(self.auth_url("signup"))
            .json(&serde_json::json!({ "email": email, "password": password }));

        let response = self
            .with_headers(request, self.settings.anon_key())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::auth_error(response).await);
        }

        // 專案啟用自動確認時回傳完整 token，否則只回傳使用者
        let body: serde_json::Value = response.json().await?;
        if body.get("access_token").is_some() {
            let session = serde_json::from_value::<TokenResponse>(body)?.into_session();
            self.store_session(&session).await;
            self.emit(SessionEvent::SignedIn(session.clone()));
            Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            })
        } else {
            let user: AuthUser = serde_json::from_value(body)?;
            Ok(SignUpOutcome {
                user,
                session: None,
            })
        }
    }

    async fn sign_out(&self) -> Result<()> {
        let result = match self.cached_session().await {
            Some(session) => {
                let request = self.client.post(self.auth_url("logout"));
                match self
                    .with_headers(request, &session.access_token)
                    .send()
                    .await
                {
                    Ok(response)
                        if response.status().is_success()
                            || response.status() == StatusCode::UNAUTHORIZED
                            || response.status() == StatusCode::NOT_FOUND =>
                    {
                        Ok(())
                    }
                    Ok(response) => {
                        let (status, message) = error_details(response).await;
                        Err(WaqtiError::BackendError {
                            status: status.as_u16(),
                            message,
                        })
                    }
                    Err(e) => Err(e.into()),
                }
            }
            None => Ok(()),
        };

        // 不論遠端結果如何，本機 session 一律清除
        self.drop_session().await;
        self.emit(SessionEvent::SignedOut);
        result
    }
}

#[async_trait]
impl<C: BackendSettings, S: Storage> ProfileStore for SupabaseClient<C, S> {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>> {
        let bearer = self.bearer().await;
        let request = self.client.get(self.rest_url()).query(&[
            ("id", format!("eq.{}", user_id)),
            ("select", "*".to_string()),
        ]);

        let response = self.with_headers(request, &bearer).send().await?;
        tracing::debug!("Profile fetch status: {}", response.status());

        if !response.status().is_success() {
            let (status, message) = error_details(response).await;
            return Err(WaqtiError::BackendError {
                status: status.as_u16(),
                message,
            });
        }

        let rows: Vec<ProfileRecord> = response.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, record: &ProfileRecord) -> Result<()> {
        let bearer = self.bearer().await;
        let request = self
            .client
            .post(self.rest_url())
            .header("Prefer", "return=minimal")
            .json(&[record]);

        let response = self.with_headers(request, &bearer).send().await?;
        if !response.status().is_success() {
            let (status, message) = error_details(response).await;
            return Err(WaqtiError::BackendError {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!("Inserted profile {}", record.id);
        Ok(())
    }
}
