//! Cloud control-plane clients used by the vpcimage pipeline.
//!
//! This crate exposes the resource lookups the pipeline depends on as traits,
//! together with HTTP implementations:
//!
//! - [`VpcLookup`] / [`VpcClient`]: regions, volumes, snapshots, images and
//!   security groups from the regional VPC API
//! - [`ResourceGroupLookup`] / [`ResourceManagerClient`]: resource groups from
//!   the resource manager
//! - [`ResourceGroupConnector`] / [`ResourceManagerConnector`]: builds an
//!   authenticated resource-group client from an API key on demand
//! - [`IamAuthenticator`]: exchanges an API key for a bearer token
//!
//! Every lookup reports failures as [`ApiError`], which distinguishes an
//! explicit "not found" (HTTP 404) from other failures via
//! [`ApiError::is_not_found`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vpcimage_api::{IamAuthenticator, VpcClient, VpcLookup};
//!
//! # async fn demo() -> Result<(), vpcimage_api::ApiError> {
//! let auth = Arc::new(IamAuthenticator::new("my-api-key", "https://iam.cloud.ibm.com/identity/token")?);
//! let client = VpcClient::new("https://us-south.iaas.cloud.ibm.com/v1", auth)?;
//! let region = client.get_region("us-south").await?;
//! println!("region status: {:?}", region.status);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use vpcimage_types::{Image, Region, ResourceGroup, SecurityGroup, Snapshot, Volume};

pub mod endpoint;
pub mod error;
mod http;
pub mod iam;
pub mod resource_manager;
pub mod vpc;

#[cfg(test)]
mod test_support;

pub use endpoint::validate_base_url;
pub use error::ApiError;
pub use iam::IamAuthenticator;
pub use resource_manager::{ResourceManagerClient, ResourceManagerConnector};
pub use vpc::{VPC_API_VERSION, VpcClient};

/// Read-only lookups against the regional VPC API.
#[async_trait]
pub trait VpcLookup: Send + Sync {
    /// Fetch a region by name.
    async fn get_region(&self, name: &str) -> Result<Region, ApiError>;

    /// Fetch a block storage volume by identifier.
    async fn get_volume(&self, id: &str) -> Result<Volume, ApiError>;

    /// Fetch a snapshot by identifier.
    async fn get_snapshot(&self, id: &str) -> Result<Snapshot, ApiError>;

    /// List images whose name matches `name` exactly.
    async fn list_images(&self, name: &str) -> Result<Vec<Image>, ApiError>;

    /// Fetch a security group by identifier.
    async fn get_security_group(&self, id: &str) -> Result<SecurityGroup, ApiError>;
}

/// Lookups against the resource manager.
#[async_trait]
pub trait ResourceGroupLookup: Send + Sync {
    /// Fetch a resource group by identifier.
    ///
    /// `Ok(None)` means the service answered successfully but returned no
    /// resource group.
    async fn get_resource_group(&self, id: &str) -> Result<Option<ResourceGroup>, ApiError>;
}

/// Builds an authenticated [`ResourceGroupLookup`] from caller credentials.
pub trait ResourceGroupConnector: Send + Sync {
    /// Construct a client authenticated with `api_key` against the IAM token
    /// endpoint `iam_endpoint`.
    fn connect(&self, api_key: &str, iam_endpoint: &str) -> Result<Arc<dyn ResourceGroupLookup>, ApiError>;
}
