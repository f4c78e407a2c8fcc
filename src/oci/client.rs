use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use log::debug;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};

use super::reference::ImageReference;
use super::types::{Descriptor, ImageIndex, media_type};
use crate::http::{check_retryable, with_retry};

/// Capability for reading image manifests from a container registry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Resolves a reference to its top-level descriptor without
    /// fetching the manifest body.
    async fn head_descriptor(&self, reference: &ImageReference) -> Result<Descriptor>;

    /// Fetches the image index behind a reference and returns its
    /// child manifest descriptors.
    async fn fetch_index(&self, reference: &ImageReference) -> Result<Vec<Descriptor>>;
}

/// Registry v2 manifest client for ghcr.io (or any compatible registry).
pub struct GhcrImages {
    client: Client,
    registry_url: String,
    token: Option<String>,
}

impl GhcrImages {
    #[tracing::instrument(skip(client, registry_url, token))]
    pub fn new(client: Client, registry_url: Option<String>, token: Option<String>) -> Self {
        let registry_url = registry_url.unwrap_or_else(|| "https://ghcr.io".to_string());
        Self {
            client,
            registry_url,
            token,
        }
    }

    fn manifest_url(&self, reference: &ImageReference) -> String {
        format!(
            "{}/v2/{}/manifests/{}",
            self.registry_url, reference.repository, reference.tag
        )
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header(
            ACCEPT,
            format!(
                "{}, {}, {}, {}",
                media_type::OCI_IMAGE_INDEX,
                media_type::OCI_IMAGE_MANIFEST,
                media_type::DOCKER_MANIFEST_LIST,
                media_type::DOCKER_MANIFEST
            ),
        );

        // ghcr.io accepts the PAT base64-encoded as a bearer token.
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", BASE64.encode(token))),
            None => builder,
        }
    }
}

#[async_trait]
impl ImageRegistry for GhcrImages {
    #[tracing::instrument(skip(self, reference), fields(reference = %reference))]
    async fn head_descriptor(&self, reference: &ImageReference) -> Result<Descriptor> {
        let url = self.manifest_url(reference);

        debug!("HEAD manifest {}...", url);

        with_retry("Resolving image descriptor", || async {
            let response = self
                .request(self.client.head(&url))
                .send()
                .await
                .context("Failed to send request to container registry")?;

            let response = response.error_for_status().map_err(check_retryable)?;

            let media_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| anyhow!("Registry response for {} has no content type", reference))?
                .to_string();

            let digest = response
                .headers()
                .get("docker-content-digest")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    anyhow!("Registry response for {} has no content digest", reference)
                })?
                .to_string();

            Ok(Descriptor {
                media_type,
                digest,
                size: 0,
                platform: None,
            })
        })
        .await
    }

    #[tracing::instrument(skip(self, reference), fields(reference = %reference))]
    async fn fetch_index(&self, reference: &ImageReference) -> Result<Vec<Descriptor>> {
        let url = self.manifest_url(reference);

        debug!("GET index manifest {}...", url);

        let index: ImageIndex = with_retry("Fetching image index", || async {
            let response = self
                .request(self.client.get(&url))
                .send()
                .await
                .context("Failed to send request to container registry")?;

            let response = response.error_for_status().map_err(check_retryable)?;

            response
                .json::<ImageIndex>()
                .await
                .with_context(|| format!("Failed to parse image index for {}", reference))
        })
        .await?;

        Ok(index.manifests)
    }
}
