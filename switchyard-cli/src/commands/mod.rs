pub mod auth;
pub mod chat;
pub mod models;

/// Keyring service under which API keys are stored.
pub const KEYRING_SERVICE: &str = "switchyard";
