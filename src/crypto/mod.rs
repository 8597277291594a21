pub mod digest;
pub mod nonce;

// Re-export main functions for easier access
pub use digest::{compare_digest, compute_digest, compute_digest_b64};
pub use nonce::generate_nonce;
