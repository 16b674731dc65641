//! Tabsdata server API client.
//!
//! A thin wrapper around a configured `reqwest::Client` for the apiserver's
//! REST surface. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults and timeouts
//! - Authenticating with the role-based login endpoint
//! - Listing collections, and the functions/tables inside a collection
//! - Assembling a whole-catalog snapshot for the completion resolver
//!
//! The primary entry point is [`TabsdataClient`]. Create one via
//! [`TabsdataClient::connect`], which logs in and stores the bearer token
//! for subsequent calls.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::{Client, RequestBuilder, StatusCode, header};
use serde::Deserialize;
use tdconsole_types::{CatalogSnapshot, Credentials};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct NamedItem {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: Vec<NamedItem>,
}

/// Authenticated client for one instance's public API.
#[derive(Debug, Clone)]
pub struct TabsdataClient {
    base_url: String,
    http: Client,
    token: String,
}

impl TabsdataClient {
    /// Connect to the apiserver at `base_url` (e.g. `http://127.0.0.1:2457`)
    /// and perform the role login, retaining the bearer token.
    pub async fn connect(base_url: &str, credentials: &Credentials) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;

        let login_url = format!("{}/api/v1/auth/login", base_url);
        debug!(%login_url, user = %credentials.user, "logging in");
        let response = http
            .post(&login_url)
            .json(&serde_json::json!({
                "name": credentials.user,
                "password": credentials.password,
                "role": credentials.role,
            }))
            .send()
            .await
            .context("send login request")?;
        if response.status() == StatusCode::UNAUTHORIZED {
            bail!("login rejected for user '{}'", credentials.user);
        }
        let login: LoginResponse = response
            .error_for_status()
            .context("login request failed")?
            .json()
            .await
            .context("decode login response")?;

        Ok(Self {
            base_url,
            http,
            token: login.access_token,
        })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the stored token is still accepted by the server.
    pub async fn auth_info(&self) -> Result<()> {
        self.request(reqwest::Method::GET, "/api/v1/auth/info")
            .send()
            .await
            .context("send auth info request")?
            .error_for_status()
            .context("auth info rejected")?;
        Ok(())
    }

    /// Names of all collections on the server.
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.list_names("/api/v1/collections".to_string()).await
    }

    /// Names of the functions registered in `collection`.
    pub async fn list_functions(&self, collection: &str) -> Result<Vec<String>> {
        self.list_names(format!("/api/v1/collections/{collection}/functions")).await
    }

    /// Names of the tables present in `collection`.
    pub async fn list_tables(&self, collection: &str) -> Result<Vec<String>> {
        self.list_names(format!("/api/v1/collections/{collection}/tables")).await
    }

    /// Pull the full entity catalog: every collection with its tables and
    /// functions. Collection names come back sorted so the snapshot is
    /// stable across refreshes.
    pub async fn fetch_catalog(&self) -> Result<CatalogSnapshot> {
        let mut snapshot = CatalogSnapshot::default();
        let mut collections = self.list_collections().await?;
        collections.sort();
        for collection in &collections {
            let tables = self.list_tables(collection).await?;
            let functions = self.list_functions(collection).await?;
            snapshot.tables.insert(collection.clone(), tables);
            snapshot.functions.insert(collection.clone(), functions);
        }
        snapshot.collections = collections;
        Ok(snapshot)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "building request");
        self.http.request(method, url).bearer_auth(&self.token)
    }

    async fn list_names(&self, path: String) -> Result<Vec<String>> {
        let response: ListResponse = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .with_context(|| format!("send request to {path}"))?
            .error_for_status()
            .with_context(|| format!("request to {path} failed"))?
            .json()
            .await
            .with_context(|| format!("decode response from {path}"))?;
        Ok(response.data.into_iter().map(|item| item.name).collect())
    }
}

/// Accept `host:port` or a full `http(s)://` URL; reject anything without a
/// host and strip a trailing slash.
fn normalize_base_url(base: &str) -> Result<String> {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("server address is empty");
    }
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let rest = with_scheme.splitn(2, "://").nth(1).unwrap_or("");
    if rest.is_empty() {
        bail!("server address '{base}' has no host");
    }
    Ok(with_scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_socket_gets_http_scheme() {
        assert_eq!(normalize_base_url("127.0.0.1:2457").unwrap(), "http://127.0.0.1:2457");
    }

    #[test]
    fn explicit_scheme_and_trailing_slash_are_preserved_and_trimmed() {
        assert_eq!(normalize_base_url("https://td.example:2457/").unwrap(), "https://td.example:2457");
    }

    #[test]
    fn empty_addresses_are_rejected() {
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("http://").is_err());
    }
}
