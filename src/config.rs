//! Construction of the authenticated registry clients.

use anyhow::Result;
use log::debug;
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue},
};

use crate::github::GitHubPackages;
use crate::oci::GhcrImages;

const USER_AGENT: &str = "ghprune-cli";

/// The two external collaborators of the retention pipeline, built from
/// one token and the optional endpoint overrides.
pub struct Config {
    pub packages: GitHubPackages,
    pub images: GhcrImages,
}

impl Config {
    pub fn new(
        token: Option<String>,
        api_url: Option<String>,
        registry_url: Option<String>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        if let Some(token) = &token {
            let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            auth_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_value);
            debug!("Using a token for authentication ({} characters)", token.len());
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        let packages = GitHubPackages::new(client, api_url);

        // The container registry speaks its own auth scheme; it gets a
        // client without the GitHub API headers.
        let registry_client = Client::builder().user_agent(USER_AGENT).build()?;
        let images = GhcrImages::new(registry_client, registry_url, token);

        Ok(Self { packages, images })
    }
}
