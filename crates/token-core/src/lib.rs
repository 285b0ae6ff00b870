//! # Token-Core
//!
//! Bearer credential primitives for Authgate.
//!
//! This crate provides:
//! - Compact HS256 token issuance and verification with typed claims
//! - Full-hash token fingerprints for revocation keys
//! - A TTL-capable key-value abstraction with an in-memory backend
//! - Refresh-session and revocation storage
//!
//! ## Architecture
//!
//! Token-core is a leaf: it knows nothing about accounts or providers.
//! Auth-core layers registration, login, federation and the per-request gate
//! on top of the codec and store defined here.

pub mod codec;
pub mod error;
pub mod fingerprint;
pub mod kv;
pub mod store;

pub use codec::{Role, TokenClaims, TokenCodec, TokenConfig};
pub use error::{StoreError, TokenError};
pub use fingerprint::token_fingerprint;
pub use kv::{KeyValueStore, MemoryStore};
pub use store::TokenStore;
