/*
 * nayur - A small helper for the Arch User Repository.
 * Copyright (C) 2025  nayur contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! AUR RPC v5 client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::resolver::PackageSource;
use super::AurRpcResponse;
use crate::config::Config;
use crate::error::{NayurError, NayurResult};

/// Most names sent in one info request
pub const INFO_CHUNK_SIZE: usize = 250;

/// AUR package information from the RPC API.
///
/// Search results only carry the summary fields, so everything that
/// `info` adds on top defaults to empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AurPackage {
    pub name: String,
    #[serde(default)]
    pub package_base: Option<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
    #[serde(default)]
    pub num_votes: u32,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub out_of_date: Option<u64>,
    #[serde(default)]
    pub maintainer: Option<String>,

    // Dependencies
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub make_depends: Vec<String>,
    #[serde(default)]
    pub opt_depends: Vec<String>,
}

impl AurPackage {
    /// First line of the description, if any
    pub fn summary(&self) -> Option<&str> {
        self.description.as_deref().and_then(|d| d.lines().next())
    }
}

/// AUR RPC client
pub struct AurClient {
    client: reqwest::Client,
    base_url: String,
}

impl AurClient {
    /// Create a client from configuration
    pub fn from_config(config: &Config) -> NayurResult<Self> {
        Self::with_config(config.rpc_url.clone(), config.request_timeout())
    }

    /// Create a client against an arbitrary RPC base URL
    pub fn with_config(base_url: String, timeout: Duration) -> NayurResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("nayur/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NayurError::network(base_url.as_str(), e))?;

        let base_url = if base_url.ends_with('/') {
            base_url
        } else {
            format!("{}/", base_url)
        };

        Ok(Self { client, base_url })
    }

    /// URL of a batched info query
    pub fn info_url<S: AsRef<str>>(&self, names: &[S]) -> String {
        let args: Vec<String> = names
            .iter()
            .map(|n| format!("arg[]={}", urlencoding::encode(n.as_ref())))
            .collect();
        format!("{}info?{}", self.base_url, args.join("&"))
    }

    /// URL of a search query
    pub fn search_url(&self, query: &str) -> String {
        format!("{}search/{}", self.base_url, urlencoding::encode(query))
    }

    /// Fetch several packages at once.
    ///
    /// Names the AUR does not know are simply absent from the result.
    /// Long lists are sent in chunks of [`INFO_CHUNK_SIZE`] to stay under
    /// the AUR's URL length limit; the first failing chunk fails the call.
    pub async fn info<S: AsRef<str>>(&self, names: &[S]) -> NayurResult<Vec<AurPackage>> {
        let mut results = Vec::new();
        for chunk in names.chunks(INFO_CHUNK_SIZE) {
            let url = self.info_url(chunk);
            let response = self.get(&url).await?;
            results.extend(response.results);
        }
        Ok(results)
    }

    /// Fetch one package, `None` when the AUR has no such package
    pub async fn info_one(&self, name: &str) -> NayurResult<Option<AurPackage>> {
        let url = self.info_url(&[name]);
        let response = self.get(&url).await?;
        if response.resultcount == 0 {
            return Ok(None);
        }
        Ok(response.results.into_iter().next())
    }

    /// Search for packages by keyword
    pub async fn search(&self, query: &str) -> NayurResult<Vec<AurPackage>> {
        let url = self.search_url(query);
        let response = self.get(&url).await?;
        Ok(response.results)
    }

    async fn get(&self, url: &str) -> NayurResult<AurRpcResponse> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NayurError::network(url, e))?;

        let status = response.status();
        tracing::debug!("HTTP {} for {}", status, url);
        if !status.is_success() {
            return Err(NayurError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body: AurRpcResponse = response
            .json()
            .await
            .map_err(|e| NayurError::network(url, e))?;

        if let Some(error) = body.error {
            return Err(NayurError::Rpc { message: error });
        }

        tracing::debug!("{} result(s) from {}", body.resultcount, url);
        Ok(body)
    }
}

#[async_trait]
impl PackageSource for AurClient {
    async fn fetch(&self, names: &[String]) -> NayurResult<Vec<AurPackage>> {
        self.info(names).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AurClient {
        AurClient::with_config(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_info_url() {
        let client = AurClient::with_config(
            "https://aur.archlinux.org/rpc/v5".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            client.info_url(&["yay", "paru"]),
            "https://aur.archlinux.org/rpc/v5/info?arg[]=yay&arg[]=paru"
        );
        assert_eq!(
            client.info_url(&["libc++"]),
            "https://aur.archlinux.org/rpc/v5/info?arg[]=libc%2B%2B"
        );
        assert_eq!(
            client.search_url("google chrome"),
            "https://aur.archlinux.org/rpc/v5/search/google%20chrome"
        );
    }

    #[test]
    fn test_package_deserialize() {
        let pkg: AurPackage = serde_json::from_value(serde_json::json!({
            "Name": "yay",
            "PackageBase": "yay",
            "Version": "12.4.2-1",
            "Description": "Yet another yogurt.\nSecond line",
            "URL": "https://github.com/Jguer/yay",
            "NumVotes": 2000,
            "Popularity": 21.5,
            "OutOfDate": null,
            "Maintainer": "jguer",
            "Depends": ["pacman>6.1", "git"],
            "MakeDepends": ["go>=1.21"]
        }))
        .unwrap();

        assert_eq!(pkg.name, "yay");
        assert_eq!(pkg.depends, vec!["pacman>6.1", "git"]);
        assert_eq!(pkg.make_depends, vec!["go>=1.21"]);
        assert!(pkg.opt_depends.is_empty());
        assert_eq!(pkg.summary(), Some("Yet another yogurt."));
    }

    #[tokio::test]
    async fn test_info_batches_names() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/info"))
            .and(query_param("arg[]", "foo"))
            .and(query_param("arg[]", "bar"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "version": 5,
                "type": "multiinfo",
                "resultcount": 2,
                "results": [
                    {"Name": "foo", "Version": "1.0-1", "Depends": ["bar"]},
                    {"Name": "bar", "Version": "2.0-1"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let results = client.info(&["foo", "bar"]).await.unwrap();

        let names: Vec<&str> = results.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["foo", "bar"]);
        assert_eq!(results[0].depends, vec!["bar"]);
    }

    #[tokio::test]
    async fn test_info_splits_long_lists() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "version": 5,
                "type": "multiinfo",
                "resultcount": 1,
                "results": [{"Name": "pkg-0", "Version": "1.0-1"}]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let names: Vec<String> = (0..INFO_CHUNK_SIZE + 50).map(|i| format!("pkg-{}", i)).collect();
        let results = client.info(&names).await.unwrap();
        assert_eq!(results.len(), 2);

        let requests = server.received_requests().await.unwrap();
        let sizes: Vec<usize> = requests
            .iter()
            .map(|r| r.url.query_pairs().filter(|(k, _)| k == "arg[]").count())
            .collect();
        assert_eq!(sizes, vec![INFO_CHUNK_SIZE, 50]);
    }

    #[tokio::test]
    async fn test_info_empty_input_skips_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let names: Vec<String> = vec![];
        assert!(client.info(&names).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_info_one_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "version": 5,
                "type": "multiinfo",
                "resultcount": 0,
                "results": []
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.info_one("does-not-exist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.info(&["foo"]).await.unwrap_err();
        assert!(matches!(err, NayurError::HttpStatus { status: 503, .. }));
        assert!(err.is_remote());
    }

    #[tokio::test]
    async fn test_rpc_error_field() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "version": 5,
                "type": "error",
                "resultcount": 0,
                "results": [],
                "error": "Too many package results."
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.search("a").await.unwrap_err();
        assert!(matches!(err, NayurError::Rpc { .. }));
    }

    #[tokio::test]
    async fn test_search() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/yay"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "version": 5,
                "type": "search",
                "resultcount": 2,
                "results": [
                    {"Name": "yay", "Version": "12.4.2-1", "Popularity": 20.1, "Description": "AUR helper"},
                    {"Name": "yay-bin", "Version": "12.4.2-1", "Popularity": 5.3, "Description": null}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let results = client.search("yay").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].summary(), None);
    }
}
