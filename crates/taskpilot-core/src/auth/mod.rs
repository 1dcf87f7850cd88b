//! Authentication types and claim decoding.

pub mod claims;

pub use claims::{TokenClaims, decode_claims};
