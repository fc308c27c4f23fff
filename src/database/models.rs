//! Persisted record types.
//!
//! Every record is stored as a JSON document. Fields added by later schema
//! versions are absent on older rows, so all records deserialize with
//! `#[serde(default)]` and fall back to the type's default value.

use crate::logging::mask_secret;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const BUCKETS_TABLE: &str = "buckets";
pub const LEGACY_TARGETS_TABLE: &str = "uploadTargets";
pub const HISTORY_TABLE: &str = "uploadHistory";
pub const APP_SETTINGS_TABLE: &str = "appSettings";
pub const PROXY_SETTINGS_TABLE: &str = "proxySettings";

/// Key of singleton rows (settings tables)
pub const SINGLETON_KEY: i64 = 1;

/// A document stored in one table of the store
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    const TABLE: &'static str;

    /// Primary key, `None` for records not yet inserted
    fn key(&self) -> Option<i64>;

    fn set_key(&mut self, key: i64);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketKind {
    #[default]
    R2,
    S3,
}

/// Credentials and endpoint for one remote storage destination
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BucketConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: BucketKind,
    pub bucket_name: String,
    pub account_id: String,
    pub access_key: String,
    pub secret_key: String,
    pub custom_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_api: Option<String>,
}

impl BucketConfig {
    /// S3 API endpoint: explicit override first, then the R2 account endpoint
    pub fn endpoint(&self) -> Option<String> {
        if let Some(api) = self.s3_api.as_deref().filter(|api| !api.trim().is_empty()) {
            return Some(api.trim_end_matches('/').to_string());
        }

        match self.kind {
            BucketKind::R2 if !self.account_id.is_empty() => Some(format!(
                "https://{}.r2.cloudflarestorage.com",
                self.account_id
            )),
            _ => None,
        }
    }

    /// Public URL of an object, through the custom domain when one is set
    pub fn public_url(&self, remote_key: &str) -> Option<String> {
        let base = if self.custom_domain.trim().is_empty() {
            self.endpoint()?
        } else {
            let domain = self.custom_domain.trim().trim_end_matches('/');
            if domain.starts_with("http://") || domain.starts_with("https://") {
                domain.to_string()
            } else {
                format!("https://{}", domain)
            }
        };

        Some(format!("{}/{}", base, remote_key.trim_start_matches('/')))
    }

    /// Display-safe view with masked credentials
    pub fn summary(&self) -> BucketSummary {
        BucketSummary {
            id: self.id,
            kind: self.kind,
            bucket_name: self.bucket_name.clone(),
            account_id: self.account_id.clone(),
            access_key: mask_secret(&self.access_key),
            secret_key: mask_secret(&self.secret_key),
            custom_domain: self.custom_domain.clone(),
            s3_api: self.s3_api.clone(),
        }
    }
}

impl fmt::Debug for BucketConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketConfig")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("bucket_name", &self.bucket_name)
            .field("account_id", &self.account_id)
            .field("access_key", &mask_secret(&self.access_key))
            .field("secret_key", &"<redacted>")
            .field("custom_domain", &self.custom_domain)
            .field("s3_api", &self.s3_api)
            .finish()
    }
}

impl Record for BucketConfig {
    const TABLE: &'static str = BUCKETS_TABLE;

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn set_key(&mut self, key: i64) {
        self.id = Some(key);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: BucketKind,
    pub bucket_name: String,
    pub account_id: String,
    pub access_key: String,
    pub secret_key: String,
    pub custom_domain: String,
    pub s3_api: Option<String>,
}

/// One completed upload. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadHistoryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub remote_file_name: String,
    #[serde(default)]
    pub target: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl UploadHistoryRecord {
    pub fn new(file_name: &str, remote_file_name: &str, target: &str) -> Self {
        Self {
            id: None,
            file_name: file_name.to_string(),
            remote_file_name: remote_file_name.to_string(),
            target: target.to_string(),
            timestamp: Utc::now(),
            url: None,
        }
    }
}

impl Record for UploadHistoryRecord {
    const TABLE: &'static str = HISTORY_TABLE;

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn set_key(&mut self, key: i64) {
        self.id = Some(key);
    }
}

/// Singleton application settings (row id 1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub sidebar_collapsed: bool,
    pub use_system_proxy: bool,
    pub locale: String,
    pub default_bucket_id: Option<i64>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            sidebar_collapsed: false,
            use_system_proxy: true,
            locale: "en".to_string(),
            default_bucket_id: None,
        }
    }
}

impl Record for AppSettings {
    const TABLE: &'static str = APP_SETTINGS_TABLE;

    fn key(&self) -> Option<i64> {
        Some(SINGLETON_KEY)
    }

    fn set_key(&mut self, key: i64) {
        debug_assert_eq!(key, SINGLETON_KEY, "app settings is a singleton row");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    System,
    Custom,
    None,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomProxy {
    pub id: String,
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl CustomProxy {
    /// Proxy URL for the network layer, credentials included
    pub fn url(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => {
                format!("http://{}:{}@{}:{}", user, pass, self.host, self.port)
            }
            (Some(user), None) => format!("http://{}@{}:{}", user, self.host, self.port),
            _ => format!("http://{}:{}", self.host, self.port),
        }
    }
}

impl fmt::Debug for CustomProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomProxy")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Proxy configuration consumed by the external network layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxySettings {
    pub proxy_type: ProxyType,
    pub custom_proxies: Vec<CustomProxy>,
    pub selected_custom_proxy_id: Option<String>,
}

impl Record for ProxySettings {
    const TABLE: &'static str = PROXY_SETTINGS_TABLE;

    fn key(&self) -> Option<i64> {
        Some(SINGLETON_KEY)
    }

    fn set_key(&mut self, key: i64) {
        debug_assert_eq!(key, SINGLETON_KEY, "proxy settings is a singleton row");
    }
}
