//! Provider registry and streaming chat dispatch for switchyard.
//!
//! This crate provides:
//! - Model providers, one per upstream vendor, behind a shared trait
//! - Credential resolution across overrides, explicit keys, and the environment
//! - A registry that indexes providers by name
//! - A dispatcher that turns any provider's response into one event stream
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Dispatcher                       │
//! │   DispatchRequest + CredentialBundle → EventStream   │
//! └─────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                   ModelRegistry                      │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  │
//! │  │  Anthropic  │  │   OpenAI    │  │   Ollama    │  │
//! │  │  Provider   │  │  Provider   │  │  Provider   │  │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  │
//! └─────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                 Credential Resolver                  │
//! │       (override > explicit key > environment)        │
//! └─────────────────────────────────────────────────────┘
//! ```

mod error;
mod types;

pub mod auth;
pub mod dispatch;
pub mod providers;
pub mod registry;

pub use dispatch::{DispatchRequest, Dispatcher, EventStream, StreamEvent};
pub use error::{Error, ErrorKind, Result};
pub use registry::ModelRegistry;
pub use types::{ModelInfo, ModelInfoBuilder};
