//! Supabase-compatible backend: password auth, profile rows and generic
//! table inserts over HTTP.

mod client;
mod config;
mod error;
mod wire;

pub use client::BackendClient;
pub use config::BackendSettings;
pub use error::BackendError;
pub use wire::StoredSession;
