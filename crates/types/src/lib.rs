//! Shared type definitions for vpcimage.
//!
//! Two families of types live here:
//!
//! - [`BuildConfig`]: the immutable snapshot of user-supplied build parameters
//! - resource records ([`Region`], [`Volume`], [`SecurityGroup`], ...) returned by
//!   the VPC control plane and the resource-group manager
//!
//! Everything derives `serde` so the same records are used for configuration
//! files, HTTP payloads and test fixtures.

pub mod config;
pub mod resources;

pub use config::{
    BuildConfig, ConfigError, DEFAULT_IAM_ENDPOINT, DEFAULT_RESOURCE_MANAGER_ENDPOINT, MAX_IMAGE_NAME_LEN, default_vpc_endpoint,
    is_valid_image_name,
};
pub use resources::{
    ATTACHMENT_STATE_UNATTACHED, Image, ImageCollection, OperatingSystem, Region, ResourceGroup, SecurityGroup, Snapshot, Volume,
    VpcReference,
};
