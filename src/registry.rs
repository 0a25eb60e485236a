//! Client for the institution tools registry.
//!
//! The registry publishes, per university, the list of tool descriptors the
//! agent may use: `GET {base}/api/institutionInformationsTools/{universityId}`.

use std::time::Duration;

use crate::tools::ToolDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry request for '{tenant}' failed: {source}")]
    Http {
        tenant: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Registry returned status {status} for '{tenant}'")]
    Status {
        tenant: String,
        status: reqwest::StatusCode,
    },

    #[error("Registry response for '{tenant}' is not a descriptor list: {source}")]
    Decode {
        tenant: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Anything that can produce the tool descriptors of a tenant.
#[async_trait::async_trait]
pub trait DescriptorSource: Send + Sync {
    async fn fetch(&self, tenant: &str) -> Result<Vec<ToolDescriptor>, RegistryError>;
}

#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a client with its own connection pool and an optional timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(builder.build()?, base_url))
    }

    pub fn tools_url(&self, tenant: &str) -> String {
        format!(
            "{}/api/institutionInformationsTools/{}",
            self.base_url,
            urlencoding::encode(tenant)
        )
    }
}

#[async_trait::async_trait]
impl DescriptorSource for RegistryClient {
    async fn fetch(&self, tenant: &str) -> Result<Vec<ToolDescriptor>, RegistryError> {
        let url = self.tools_url(tenant);
        tracing::debug!(tenant, %url, "fetching tool descriptors");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|source| RegistryError::Http {
                tenant: tenant.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                tenant: tenant.to_string(),
                status,
            });
        }

        let tools: Vec<ToolDescriptor> =
            response.json().await.map_err(|source| RegistryError::Decode {
                tenant: tenant.to_string(),
                source,
            })?;
        tracing::debug!(tenant, count = tools.len(), "fetched tool descriptors");
        Ok(tools)
    }
}
