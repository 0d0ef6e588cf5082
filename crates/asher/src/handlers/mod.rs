//! HTTP request handlers.

pub mod api;
mod asher;
mod health;
mod version;

pub use asher::{batch, list_providers, status, test_provider};
pub use health::{livez, readyz};
pub use version::version;
