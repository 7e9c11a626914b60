pub mod catalog;
pub mod router;
pub mod session;

pub use crate::domain::model::{FilterCriteria, Identity, ServiceListing};
pub use crate::domain::ports::{IdentityProvider, ProfileStore, Storage};
pub use crate::utils::error::Result;
pub use catalog::{filter_listings, Catalog};
pub use router::{Page, Router};
pub use session::{Registration, SessionManager, SessionState, SessionSubscription};
