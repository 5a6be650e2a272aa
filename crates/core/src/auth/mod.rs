//! Admin authentication.
//!
//! Storefront routes are public. Everything that changes inventory or shows
//! sales goes through an [`Authenticator`].

mod api_key;

pub use api_key::ApiKeyAuthenticator;

use std::collections::HashMap;
use std::net::IpAddr;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::{AuthConfig, AuthMethod};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// The parts of an HTTP request an authenticator looks at.
/// Header names are lowercase.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// Who is calling an admin route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operator {
    pub name: String,
    pub method: &'static str,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Operator, AuthError>;

    /// Name of this authentication method
    fn method_name(&self) -> &'static str;
}

/// Lets every request through. Only used when `auth.method = "none"`.
#[derive(Debug, Default)]
pub struct OpenAccess;

#[async_trait]
impl Authenticator for OpenAccess {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Operator, AuthError> {
        Ok(Operator {
            name: "anonymous".to_string(),
            method: "none",
        })
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}

/// Factory function to create authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(OpenAccess)),
        AuthMethod::ApiKey => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    AuthError::ConfigurationError(
                        "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
                    )
                })?;
            Ok(Box::new(ApiKeyAuthenticator::new(api_key)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_access_is_anonymous() {
        let auth = create_authenticator(&AuthConfig {
            method: AuthMethod::None,
            api_key: None,
        })
        .unwrap();
        let request = AuthRequest {
            headers: HashMap::new(),
            source_ip: IpAddr::from([127, 0, 0, 1]),
        };

        let operator = auth.authenticate(&request).await.unwrap();
        assert_eq!(operator.name, "anonymous");
        assert_eq!(auth.method_name(), "none");
    }

    #[test]
    fn test_api_key_method() {
        let auth = create_authenticator(&AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some("secret-key".to_string()),
        })
        .unwrap();
        assert_eq!(auth.method_name(), "api_key");
    }

    #[test]
    fn test_api_key_missing_or_empty() {
        for api_key in [None, Some(String::new())] {
            let result = create_authenticator(&AuthConfig {
                method: AuthMethod::ApiKey,
                api_key,
            });
            assert!(matches!(result, Err(AuthError::ConfigurationError(_))));
        }
    }
}
