//! Kernel services.
//!
//! Logic that sits beside the feed engine: slug resolution, suggestion
//! sampling, and the two external collaborators (media host, identity
//! provider webhooks).

pub mod identity_webhook;
pub mod media;
pub mod slug;
pub mod suggestion;
