pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{LocalStorage, SupabaseClient};
pub use app::{App, ServicesView};
pub use config::AppConfig;
pub use core::{Catalog, Page, Registration, Router, SessionManager, SessionState};
pub use utils::error::{Result, WaqtiError};
