//! Nextcloud WebDAV + OCS client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, warn};

use crate::config::RemoteConfig;

use super::propfind::{parse_multistatus, parse_share_url, PROPFIND_BODY};
use super::{RemoteError, RemoteFile, RemoteFileClient};

const SHARES_ENDPOINT: &str = "ocs/v2.php/apps/files_sharing/api/v1/shares";

/// Public link share.
const SHARE_TYPE_PUBLIC_LINK: &str = "3";
/// Read-only.
const SHARE_PERMISSIONS_READ: &str = "1";

/// Nextcloud client using basic auth.
pub struct NextcloudClient {
    client: Client,
    config: RemoteConfig,
}

impl NextcloudClient {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// WebDAV href of the user's file root, without trailing slash.
    fn dav_root(&self) -> String {
        format!("/remote.php/dav/files/{}", self.config.username)
    }

    fn dav_url(&self, path: &str) -> String {
        let encoded: Vec<_> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}{}{}", self.base_url(), self.dav_root(), encoded.join("/"))
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password))
    }
}

#[async_trait]
impl RemoteFileClient for NextcloudClient {
    async fn list(&self, root: &str, depth: u32) -> Result<Vec<RemoteFile>, RemoteError> {
        let root_path = format!("/{}/", root.trim_matches('/'));
        let url = self.dav_url(&root_path);
        let method = Method::from_bytes(b"PROPFIND")
            .map_err(|e| RemoteError::Protocol(e.to_string()))?;

        debug!(url = %url, depth, "Listing remote folder");
        let response = self
            .request(method, &url)
            .header("Depth", depth.to_string())
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(PROPFIND_BODY)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(root_path));
        }
        if status != StatusCode::MULTI_STATUS && !status.is_success() {
            return Err(RemoteError::Protocol(format!("PROPFIND returned HTTP {}", status)));
        }

        let body = response.text().await?;
        let prefix = format!("{}/{}", self.dav_root(), root.trim_matches('/'));
        let files = parse_multistatus(&body, &prefix)?;
        debug!(count = files.len(), "Remote listing parsed");
        Ok(files)
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        let url = self.dav_url(path);
        debug!(path, "Deleting remote file");

        let response = self.request(Method::DELETE, &url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(path, "Remote file already gone");
            return Ok(());
        }
        if !status.is_success() {
            return Err(RemoteError::Protocol(format!("DELETE returned HTTP {}", status)));
        }
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let url = self.dav_url(path);
        let response = self.request(Method::GET, &url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(RemoteError::Protocol(format!("GET returned HTTP {}", status)));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn create_share(&self, path: &str, expiry: NaiveDate) -> Result<String, RemoteError> {
        let url = format!("{}/{}", self.base_url(), SHARES_ENDPOINT);
        let expire_date = expiry.format("%Y-%m-%d").to_string();
        let params = [
            ("path", path),
            ("shareType", SHARE_TYPE_PUBLIC_LINK),
            ("permissions", SHARE_PERMISSIONS_READ),
            ("expireDate", expire_date.as_str()),
        ];

        debug!(path, expiry = %expire_date, "Creating public share");
        let response = self
            .request(Method::POST, &url)
            .header("OCS-APIRequest", "true")
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return match parse_share_url(&body) {
                Err(RemoteError::ShareCreation(message)) => Err(RemoteError::ShareCreation(
                    format!("HTTP {}: {}", status, message),
                )),
                _ => Err(RemoteError::ShareCreation(format!("HTTP {}", status))),
            };
        }

        parse_share_url(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> NextcloudClient {
        NextcloudClient::new(RemoteConfig {
            url: "https://cloud.example.com/".to_string(),
            username: "media".to_string(),
            password: "secret".to_string(),
            root_folder: "recording".to_string(),
            depth: 4,
            content_types: vec![],
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_dav_url_encodes_segments() {
        let client = client();
        assert_eq!(
            client.dav_url("/recording/2024/a b.mp4"),
            "https://cloud.example.com/remote.php/dav/files/media/recording/2024/a%20b.mp4"
        );
        assert_eq!(
            client.dav_url("/recording/"),
            "https://cloud.example.com/remote.php/dav/files/media/recording/"
        );
    }
}
