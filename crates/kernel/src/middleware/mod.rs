//! HTTP middleware components.

pub mod identity;

pub use identity::{Identity, Role, TokenVerifier, authenticate_identity};
