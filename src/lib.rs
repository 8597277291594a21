//! # wsse-auth
//!
//! A Rust library for **WSSE UsernameToken digest authentication** with **nonce replay protection**.
//! Clients prove knowledge of a shared secret by sending `base64(SHA-1(nonce ‖ created ‖ secret))`
//! in an `X-WSSE` header; the secret itself never crosses the wire.
//!
//! ## Features
//!
//! - **Digest Engine** - Compute and compare WSSE password digests
//! - **Secure Nonce Generation** - 128-bit random nonces, hex encoded and filename safe
//! - **Replay Protection** - Atomic check-and-record of nonces over an in-memory or directory-backed ledger
//! - **Freshness Checks** - Expired and future timestamps are rejected, with optional clock skew
//! - **Uniform Failures** - Rejection reasons are kept for logs; clients only see a generic failure
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use wsse_auth::{
//!     build_credential_header, AuthResult, NonceStoreLocation, UserRecord, WsseAuthenticator,
//!     WsseConfig,
//! };
//!
//! let config = WsseConfig {
//!     validity_window_seconds: 300, // 5 minutes
//!     nonce_store_location: NonceStoreLocation::Memory,
//!     clock_skew_seconds: 0,
//! };
//!
//! let mut users = HashMap::new();
//! users.insert("bob".to_string(), UserRecord::new("bob", "s3cret", vec!["ROLE_API".to_string()]));
//! let authenticator = WsseAuthenticator::from_config(&config, users).unwrap();
//!
//! // Client side
//! let header = build_credential_header("bob", "s3cret").unwrap();
//!
//! // Server side
//! match authenticator.authenticate(&header) {
//!     AuthResult::Authenticated(user) => println!("Authenticated {} {:?}", user.username, user.roles),
//!     AuthResult::Rejected(reason) => println!("Rejected: {}", reason),
//! }
//!
//! // The same header cannot be used twice
//! assert!(!authenticator.authenticate(&header).is_authenticated());
//! ```
//!
//! ## Examples
//!
//! See the [basic_workflow example](demos/basic_workflow.rs) for a complete flow:
//!
//! ```bash
//! cargo run --example basic_workflow
//! ```

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod token;
pub mod user;

// Re-export main types for easier access
pub use auth::{AuthResult, AuthenticatedUser, AuthenticationProvider, WsseAuthenticator};
pub use config::{NonceStoreLocation, WsseConfig};
pub use crypto::digest::{compare_digest, compute_digest, compute_digest_b64};
pub use crypto::nonce::generate_nonce;
pub use error::{AuthError, AuthenticationFailed, RejectReason, Result};
pub use ledger::{file::FileNonceLedger, memory::MemoryNonceLedger, NonceCheck, NonceLedger};
pub use token::{build_credential_header, build_credential_header_at, CredentialKind, UsernameToken};
pub use user::{UserProvider, UserRecord};
