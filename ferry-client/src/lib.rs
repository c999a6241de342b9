//! Ferry HTTP Client
//!
//! A simple, type-safe HTTP client for the Ferry orchestrator API, plus the
//! status poller used to follow a run to completion.
//!
//! # Example
//!
//! ```no_run
//! use ferry_client::FerryClient;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = FerryClient::new("http://localhost:8080");
//!
//!     let run = client.get_run(Uuid::new_v4()).await?;
//!     println!("run status: {:?}", run.status);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod poller;
mod runs;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use poller::{PollHandle, RunPoller};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Ferry orchestrator API
#[derive(Debug, Clone)]
pub struct FerryClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl FerryClient {
    /// Create a new orchestrator client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the orchestrator API (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Create a new orchestrator client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Handle an API response and deserialize JSON
    ///
    /// Checks the status code and returns an appropriate error if the request
    /// failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
