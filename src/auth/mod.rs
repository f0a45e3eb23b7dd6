//! API key authentication.
//!
//! Every request must carry the process-wide secret in `X-API-Key`; see
//! [`ApiKeyGuard`].

mod api_key;

pub use api_key::{API_KEY_HEADER, ApiKeyGuard};
