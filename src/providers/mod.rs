/*!
 * Provider implementations for LLM services.
 *
 * The semantic split oracle talks to a language model through the
 * [`Provider`] trait:
 * - Ollama: local LLM server
 * - Mock: scripted behaviors for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably behind the split oracle.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Provider-neutral completion prompt.
///
/// Every provider request type converts from this, so callers can build one
/// prompt and hand it to any provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionPrompt {
    /// Model name
    pub model: String,
    /// Optional system message
    pub system: Option<String>,
    /// User prompt
    pub prompt: String,
    /// The text the prompt is about, kept for logging and mocks
    pub subject: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Ask the model for JSON output
    pub json_output: bool,
}

impl CompletionPrompt {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: prompt.into(),
            subject: subject.into(),
            temperature: 0.3,
            json_output: false,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }
}

pub mod mock;
pub mod ollama;
