use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Failures talking to the Ollama server. `Display` is the text shown in the
/// error banner.
#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("Ollama API URL is not configured. Please set OLLAMA_HOST in your environment variables.")]
    NotConfigured,

    #[error("Ollama API returned status {0}")]
    VersionStatus(u16),

    #[error("Model {0} is not available. Please ensure it's installed on the Ollama server.")]
    ModelUnavailable(String),

    #[error("API responded with status: {0}")]
    GenerateStatus(u16),

    #[error("Cannot connect to Ollama API. Please check the API configuration and ensure the server is running. ({0})")]
    Http(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct ShowRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct VersionResponse {
    version: String,
}

/// What a successful probe learned about the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    pub version: Option<String>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Health check: any 2xx from `/api/version` counts. The version string
    /// is read if the body has one.
    pub async fn version(&self) -> Result<Option<String>, OllamaError> {
        let url = format!("{}/api/version", self.base_url);

        let response = self.client.get(&url).send().await?;
        debug!(status = %response.status(), "version probe");

        if !response.status().is_success() {
            return Err(OllamaError::VersionStatus(response.status().as_u16()));
        }

        let version = response
            .json::<VersionResponse>()
            .await
            .ok()
            .map(|v| v.version);
        Ok(version)
    }

    /// Checks that `model` is installed on the server
    pub async fn show(&self, model: &str) -> Result<(), OllamaError> {
        let url = format!("{}/api/show", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ShowRequest { name: model })
            .send()
            .await?;
        debug!(status = %response.status(), model, "show probe");

        if !response.status().is_success() {
            return Err(OllamaError::ModelUnavailable(model.to_string()));
        }
        Ok(())
    }

    /// Version check followed by the model existence check
    pub async fn probe(&self, model: &str) -> Result<ServerInfo, OllamaError> {
        let version = self.version().await?;
        self.show(model).await?;
        Ok(ServerInfo { version })
    }

    /// Single non-streaming generation request
    pub async fn generate(&self, model: &str, prompt: &str) -> Result<String, OllamaError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;
        debug!(status = %response.status(), model, "generate");

        if !response.status().is_success() {
            return Err(OllamaError::GenerateStatus(response.status().as_u16()));
        }

        let generated: GenerateResponse = response.json().await?;
        Ok(generated.response)
    }
}
