//! Build configuration supplied by the user.
//!
//! The configuration is read once, validated, and then treated as an
//! immutable snapshot by every pipeline step.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use url::Url;

/// IAM token endpoint used when the configuration does not override it.
pub const DEFAULT_IAM_ENDPOINT: &str = "https://iam.cloud.ibm.com/identity/token";

/// Resource manager base URL used when the configuration does not override it.
pub const DEFAULT_RESOURCE_MANAGER_ENDPOINT: &str = "https://resource-controller.cloud.ibm.com/v2";

/// Longest image name the control plane accepts.
pub const MAX_IMAGE_NAME_LEN: usize = 63;

static IMAGE_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?([a-z]|[a-z][-a-z0-9]*[a-z0-9]|[0-9][-a-z0-9]*([a-z]|[-a-z][-a-z0-9]*[a-z0-9]))$")
        .expect("image name pattern compiles")
});

/// Regional VPC API base URL for `region`.
pub fn default_vpc_endpoint(region: &str) -> String {
    format!("https://{region}.iaas.cloud.ibm.com/v1")
}

/// Same rule as the VPC API: up to 63 lowercase letters, digits and hyphens,
/// not ending with a hyphen. A name starting with a digit must contain a letter.
pub fn is_valid_image_name(name: &str) -> bool {
    name.len() <= MAX_IMAGE_NAME_LEN && IMAGE_NAME_PATTERN.is_match(name)
}

/// Errors raised while validating a [`BuildConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more fields are missing or malformed.
    #[error("invalid build configuration: {}", .problems.join("; "))]
    Invalid { problems: Vec<String> },
}

/// User-supplied build parameters.
///
/// Optional identifiers are `None` when absent; empty strings in the source
/// document are normalized to `None` during deserialization.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub region: String,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub resource_group_id: Option<String>,
    #[serde(default)]
    pub image_name: String,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub vsi_boot_volume_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub vsi_boot_snapshot_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,
    #[serde(default = "default_iam_endpoint")]
    pub iam_endpoint: String,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub vpc_endpoint: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub resource_manager_endpoint: Option<String>,
    /// Never written back out; usually injected from the environment.
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            resource_group_id: None,
            image_name: String::new(),
            vsi_boot_volume_id: None,
            vsi_boot_snapshot_id: None,
            security_group_id: None,
            iam_endpoint: default_iam_endpoint(),
            vpc_endpoint: None,
            resource_manager_endpoint: None,
            api_key: None,
        }
    }
}

impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildConfig")
            .field("region", &self.region)
            .field("resource_group_id", &self.resource_group_id)
            .field("image_name", &self.image_name)
            .field("vsi_boot_volume_id", &self.vsi_boot_volume_id)
            .field("vsi_boot_snapshot_id", &self.vsi_boot_snapshot_id)
            .field("security_group_id", &self.security_group_id)
            .field("iam_endpoint", &self.iam_endpoint)
            .field("vpc_endpoint", &self.vpc_endpoint)
            .field("resource_manager_endpoint", &self.resource_manager_endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl BuildConfig {
    /// VPC API base URL: the explicit override, or the regional default.
    pub fn vpc_endpoint(&self) -> String {
        self.vpc_endpoint
            .clone()
            .unwrap_or_else(|| default_vpc_endpoint(&self.region))
    }

    /// Resource manager base URL: the explicit override, or the public default.
    pub fn resource_manager_endpoint(&self) -> &str {
        self.resource_manager_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_RESOURCE_MANAGER_ENDPOINT)
    }

    /// API key with surrounding whitespace removed, if one was supplied.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }

    /// Checks every field and reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.region.trim().is_empty() {
            problems.push("region is required".to_string());
        }

        if self.image_name.trim().is_empty() {
            problems.push("image_name is required".to_string());
        } else if !is_valid_image_name(&self.image_name) {
            problems.push(format!(
                "image_name '{}' must be 1-63 lowercase letters, digits or hyphens, not end with a hyphen and contain a letter",
                self.image_name
            ));
        }

        if self.api_key().is_none() {
            problems.push("api_key is required (set IBM_API_KEY)".to_string());
        }

        let endpoints = [
            ("iam_endpoint", Some(self.iam_endpoint.as_str())),
            ("vpc_endpoint", self.vpc_endpoint.as_deref()),
            ("resource_manager_endpoint", self.resource_manager_endpoint.as_deref()),
        ];
        for (field, value) in endpoints {
            if let Some(value) = value
                && let Err(error) = Url::parse(value)
            {
                problems.push(format!("{field} '{value}' is not a valid URL: {error}"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { problems })
        }
    }
}

fn default_iam_endpoint() -> String {
    DEFAULT_IAM_ENDPOINT.to_string()
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty()))
}
