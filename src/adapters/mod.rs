// Adapters layer: concrete implementations for external systems (storage, http backend).

pub mod storage;
pub mod supabase;

pub use storage::LocalStorage;
pub use supabase::SupabaseClient;
