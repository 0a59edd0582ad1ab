//! Model provider trait and implementations.
//!
//! The [`ModelProvider`] trait defines the shared capability set of every
//! upstream vendor: list models, resolve credentials, and build a
//! [`ModelHandle`] for one model. Built-in vendors are all [`VendorProvider`]
//! values that differ only in their [`Wire`] protocol, credential variable
//! names, and fixed headers.
//!
//! # Example
//!
//! ```ignore
//! use switchyard_models::auth::CredentialBundle;
//! use switchyard_models::providers::{builtin, ChatRequest, InstanceOptions, Message};
//!
//! async fn chat(bundle: &CredentialBundle) -> switchyard_models::Result<()> {
//!     let provider = builtin::openai();
//!     let credentials = provider.credentials(bundle)?;
//!     let handle = provider.model_instance(InstanceOptions::new("gpt-4o", &credentials))?;
//!     let mut stream = handle
//!         .stream(ChatRequest::new("gpt-4o", vec![Message::user("Hello!")]))
//!         .await?;
//!     // ...
//!     Ok(())
//! }
//! ```

mod anthropic;
mod framing;
mod ollama;
mod openai;
mod scripted;
mod types;
mod vendor;

pub mod builtin;

use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::Stream;

pub use scripted::{ScriptedProvider, ScriptedReply};
pub use types::*;
pub use vendor::{VendorProvider, VendorProviderBuilder, Wire};

use crate::auth::{self, CredentialBundle, CredentialKeys, ResolvedCredentials};
use crate::{Error, ModelInfo, Result};

/// A stream of decoded chunks from one upstream response.
///
/// This is a pinned, boxed stream that yields [`Chunk`] items or errors.
/// Dropping it releases the underlying connection.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<Chunk>> + Send>>;

/// Options for building a model handle.
#[derive(Debug, Clone)]
pub struct InstanceOptions<'a> {
    /// Model name to build a handle for.
    pub model: &'a str,
    /// Credentials resolved for the provider.
    pub credentials: &'a ResolvedCredentials,
    /// Extra headers sent with every request, after the provider's own.
    pub headers: &'a [(String, String)],
}

impl<'a> InstanceOptions<'a> {
    /// Options without extra headers.
    pub fn new(model: &'a str, credentials: &'a ResolvedCredentials) -> Self {
        Self {
            model,
            credentials,
            headers: &[],
        }
    }

    /// Attach extra headers.
    pub fn headers(mut self, headers: &'a [(String, String)]) -> Self {
        self.headers = headers;
        self
    }
}

/// A callable model from one provider, ready to accept requests.
#[async_trait]
pub trait ModelHandle: Send + Sync {
    /// The model this handle calls.
    fn model(&self) -> &str;

    /// Open a streaming completion.
    ///
    /// Failures before any response data arrives (connection, HTTP status)
    /// are returned as `Err`; failures after that surface inside the stream.
    async fn stream(&self, request: ChatRequest) -> Result<ChatStream>;
}

/// Trait for model providers.
///
/// # Required Methods
///
/// - [`name`](ModelProvider::name) - Provider identifier (e.g., "OpenAI", "Claude Code")
/// - [`credential_keys`](ModelProvider::credential_keys) - Where credentials come from
/// - [`static_models`](ModelProvider::static_models) - Models known at startup
/// - [`create_handle`](ModelProvider::create_handle) - Vendor-specific handle construction
///
/// # Provided Methods
///
/// - [`credentials`](ModelProvider::credentials) - Resolve credentials from a bundle
/// - [`model_instance`](ModelProvider::model_instance) - Validate the model, then build a handle
pub trait ModelProvider: Send + Sync {
    /// Returns the provider name.
    fn name(&self) -> &str;

    /// Environment variables and defaults used to resolve credentials.
    fn credential_keys(&self) -> &CredentialKeys;

    /// Models this provider declares statically.
    fn static_models(&self) -> &[ModelInfo];

    /// Whether models outside [`static_models`](ModelProvider::static_models)
    /// are accepted, for vendors that list models at runtime.
    fn accepts_any_model(&self) -> bool {
        false
    }

    /// Build a handle for an already validated model.
    fn create_handle(&self, options: InstanceOptions<'_>) -> Result<Box<dyn ModelHandle>>;

    /// Look up a static model by name.
    fn find_model(&self, model: &str) -> Option<&ModelInfo> {
        self.static_models().iter().find(|m| m.name == model)
    }

    /// Resolve this provider's credentials from a bundle.
    fn credentials(&self, bundle: &CredentialBundle) -> Result<ResolvedCredentials> {
        auth::resolve(self.name(), self.credential_keys(), bundle)
    }

    /// Build a handle for `options.model`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownModel` if the model is not declared and the
    /// provider does not accept arbitrary models.
    fn model_instance(&self, options: InstanceOptions<'_>) -> Result<Box<dyn ModelHandle>> {
        if !self.accepts_any_model() && self.find_model(options.model).is_none() {
            return Err(Error::UnknownModel {
                provider: self.name().to_string(),
                model: options.model.to_string(),
            });
        }
        self.create_handle(options)
    }
}
