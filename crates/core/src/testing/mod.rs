//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits
//! (file host, payment processor, notifier), so sync and purchase flows can be
//! exercised end to end without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediastore_core::testing::{fixtures, MockPaymentClient, MockRemoteFiles};
//!
//! let remote = MockRemoteFiles::new();
//! remote.add_file(fixtures::remote_file("/2024/2024-03-01_20-00_22-30.mp4")).await;
//!
//! let payments = MockPaymentClient::new();
//! payments.mark_paid("cs_test_1", "Ada", "ada@example.com").await;
//! ```

mod mock_notifier;
mod mock_payment_client;
mod mock_remote_files;

pub use mock_notifier::MockNotifier;
pub use mock_payment_client::{
    MockPaymentClient, RecordedPrice, RecordedProduct, RecordedSession,
};
pub use mock_remote_files::{MockRemoteFiles, RecordedShare};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::time::Duration;

    use crate::config::{load_config_from_str, Config};
    use crate::remote::RemoteFile;
    use crate::sync::SyncSettings;

    /// A 100 MB mp4 at `path` (relative to the root folder).
    pub fn remote_file(path: &str) -> RemoteFile {
        RemoteFile {
            path: path.to_string(),
            content_type: "video/mp4".to_string(),
            size_bytes: 100 * 1024 * 1024,
            is_directory: false,
        }
    }

    /// Sync settings matching [`config`], with the given request timeout.
    pub fn sync_settings(request_timeout: Duration) -> SyncSettings {
        SyncSettings {
            root_folder: "recording".to_string(),
            depth: 4,
            content_types: vec!["video/mp4".to_string()],
            request_timeout,
            thumbnail_base_url: "http://localhost:8080/thumbs".to_string(),
            storefront_url: "http://localhost:8080/store".to_string(),
            currency: "hkd".to_string(),
        }
    }

    /// A minimal valid config: no auth, test mode with a key.
    pub fn config() -> Config {
        load_config_from_str(
            r#"
[auth]
method = "none"

[remote]
url = "https://cloud.example.com/"
username = "media"
password = "secret"

[payment]
test_secret_key = "rk_test_fixture"
"#,
        )
        .expect("fixture config parses")
    }
}
