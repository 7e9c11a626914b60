use crate::utils::error::{Result, WaqtiError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 新會員註冊時贈送的時數
pub const STARTING_BALANCE_HOURS: f64 = 2.0;

/// 時薪篩選滑桿的上限；等於上限時不篩選
pub const MAX_HOURLY_RATE_BOUND: u32 = 10;

pub const MAX_RATING: u8 = 5;

/// A signed-in member, derived from a profile row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub balance: f64,
    pub joined_at: DateTime<Utc>,
    pub avatar_url: Option<String>,
}

/// Row of the profile table, as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl ProfileRecord {
    pub fn new_member(id: &str, name: &str, email: &str, phone: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            balance: STARTING_BALANCE_HOURS,
            created_at: Utc::now(),
            avatar_url: None,
        }
    }
}

impl TryFrom<ProfileRecord> for Identity {
    type Error = WaqtiError;

    fn try_from(record: ProfileRecord) -> Result<Self> {
        if !record.balance.is_finite() || record.balance < 0.0 {
            return Err(WaqtiError::InvalidProfile {
                reason: format!("balance must be non-negative, got {}", record.balance),
                user_id: record.id,
            });
        }

        Ok(Self {
            id: record.id,
            name: record.name,
            email: record.email,
            phone: record.phone,
            balance: record.balance,
            joined_at: record.created_at,
            avatar_url: record.avatar_url,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl AuthSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Result of creating an auth identity. Projects that require email
/// confirmation return no session.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn(AuthSession),
    TokenRefreshed(AuthSession),
    SignedOut,
}

impl SessionEvent {
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            Self::SignedIn(session) | Self::TokenRefreshed(session) => Some(session),
            Self::SignedOut => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Design,
    Teaching,
    Programming,
    Translation,
    Writing,
    Music,
    Cooking,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Design,
        Category::Teaching,
        Category::Programming,
        Category::Translation,
        Category::Writing,
        Category::Music,
        Category::Cooking,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Design => "design",
            Category::Teaching => "teaching",
            Category::Programming => "programming",
            Category::Translation => "translation",
            Category::Writing => "writing",
            Category::Music => "music",
            Category::Cooking => "cooking",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = WaqtiError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| WaqtiError::validation(format!("Unknown category: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRef {
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceListing {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub hourly_rate: u32,
    pub provider: ProviderRef,
    pub rating: u8,
    pub reviews: u32,
    pub location: String,
    pub image: String,
}

/// Services page filter state. The default value filters nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search: String,
    pub category: Option<Category>,
    pub location: Option<String>,
    pub min_rating: u8,
    pub max_hourly_rate: u32,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: None,
            location: None,
            min_rating: 0,
            max_hourly_rate: MAX_HOURLY_RATE_BOUND,
        }
    }
}

impl FilterCriteria {
    pub fn matches(&self, listing: &ServiceListing) -> bool {
        if !self.search.is_empty() {
            let needle = self.search.to_lowercase();
            if !listing.title.to_lowercase().contains(&needle)
                && !listing.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if let Some(category) = self.category {
            if listing.category != category {
                return false;
            }
        }

        if let Some(location) = &self.location {
            if &listing.location != location {
                return false;
            }
        }

        if self.min_rating > 0 && listing.rating < self.min_rating {
            return false;
        }

        if self.max_hourly_rate < MAX_HOURLY_RATE_BOUND && listing.hourly_rate > self.max_hourly_rate {
            return false;
        }

        true
    }

    /// Whether any filter other than the search box is narrowing results.
    pub fn is_active(&self) -> bool {
        self.category.is_some()
            || self.location.is_some()
            || self.min_rating > 0
            || self.max_hourly_rate < MAX_HOURLY_RATE_BOUND
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
