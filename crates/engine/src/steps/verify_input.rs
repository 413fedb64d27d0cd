//! Pre-flight verification of user-supplied cloud references.
//!
//! [`verify_inputs`] is the decision logic: a fixed sequence of lookups that
//! stops at the first failure. [`VerifyInputStep`] adapts it to the pipeline
//! by routing the outcome into [`BuildState`] and the user's [`Ui`](crate::Ui).
//!
//! Checks, in order:
//! 1. the region exists
//! 2. the resource group exists, when one is configured
//! 3. the boot volume exists, is bootable and is unattached, when configured
//! 4. the boot snapshot exists and is bootable, when configured
//! 5. no image already carries the target name
//! 6. the security group resolves, when configured; its VPC is published

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vpcimage_api::{ApiError, ResourceGroupConnector, VpcLookup};
use vpcimage_types::BuildConfig;

use crate::{
    state::{BuildState, CloudClients},
    step::{Step, StepAction},
};

/// Broad category of a verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The remote call itself failed.
    Lookup,
    /// The service reported that the resource does not exist.
    NotFound,
    /// The resource exists but cannot serve its intended role.
    Invalid,
    /// The target image name is already in use.
    NameCollision,
    /// An authenticated auxiliary client could not be built.
    ClientConstruction,
}

/// First failed check of an input verification run.
#[derive(Debug, Error)]
pub enum VerifyInputError {
    #[error("error fetching region {region}: {cause}")]
    RegionLookup { region: String, cause: ApiError },

    #[error("error creating resource manager client for resource group {resource_group_id}: {cause}")]
    ResourceManagerClient { resource_group_id: String, cause: ApiError },

    #[error("error fetching resource group {resource_group_id}: {cause}")]
    ResourceGroupLookup { resource_group_id: String, cause: ApiError },

    #[error("resource group {resource_group_id} not found")]
    ResourceGroupNotFound { resource_group_id: String },

    #[error("boot volume {volume_id} not found")]
    VolumeNotFound { volume_id: String },

    #[error("error fetching volume {volume_id}: {cause}")]
    VolumeLookup { volume_id: String, cause: ApiError },

    #[error("volume {volume_id} is not a bootable volume; provide an unattached bootable volume")]
    VolumeNotBootable { volume_id: String },

    #[error("volume {volume_id} is either already attached or unusable; provide an unattached bootable volume")]
    VolumeAttached { volume_id: String },

    #[error("boot snapshot {snapshot_id} not found")]
    SnapshotNotFound { snapshot_id: String },

    #[error("error fetching snapshot {snapshot_id}: {cause}")]
    SnapshotLookup { snapshot_id: String, cause: ApiError },

    #[error("snapshot {snapshot_id} is not a bootable snapshot; provide a bootable snapshot")]
    SnapshotNotBootable { snapshot_id: String },

    #[error("error fetching images named {image_name}: {cause}")]
    ImageLookup { image_name: String, cause: ApiError },

    #[error("an image with the name {image_name} already exists")]
    ImageNameTaken { image_name: String, existing_image_id: String },

    #[error("error fetching security group {security_group_id}: {cause}")]
    SecurityGroupLookup { security_group_id: String, cause: ApiError },
}

impl VerifyInputError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            Self::RegionLookup { .. }
            | Self::ResourceGroupLookup { .. }
            | Self::VolumeLookup { .. }
            | Self::SnapshotLookup { .. }
            | Self::ImageLookup { .. }
            | Self::SecurityGroupLookup { .. } => ValidationErrorKind::Lookup,
            Self::ResourceGroupNotFound { .. } | Self::VolumeNotFound { .. } | Self::SnapshotNotFound { .. } => {
                ValidationErrorKind::NotFound
            }
            Self::VolumeNotBootable { .. } | Self::VolumeAttached { .. } | Self::SnapshotNotBootable { .. } => {
                ValidationErrorKind::Invalid
            }
            Self::ImageNameTaken { .. } => ValidationErrorKind::NameCollision,
            Self::ResourceManagerClient { .. } => ValidationErrorKind::ClientConstruction,
        }
    }

    /// The configured value the failure is about.
    pub fn subject(&self) -> &str {
        match self {
            Self::RegionLookup { region, .. } => region,
            Self::ResourceManagerClient { resource_group_id, .. }
            | Self::ResourceGroupLookup { resource_group_id, .. }
            | Self::ResourceGroupNotFound { resource_group_id } => resource_group_id,
            Self::VolumeNotFound { volume_id }
            | Self::VolumeLookup { volume_id, .. }
            | Self::VolumeNotBootable { volume_id }
            | Self::VolumeAttached { volume_id } => volume_id,
            Self::SnapshotNotFound { snapshot_id }
            | Self::SnapshotLookup { snapshot_id, .. }
            | Self::SnapshotNotBootable { snapshot_id } => snapshot_id,
            Self::ImageLookup { image_name, .. } | Self::ImageNameTaken { image_name, .. } => image_name,
            Self::SecurityGroupLookup { security_group_id, .. } => security_group_id,
        }
    }
}

/// Facts derived by a successful verification, for later steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedInputs {
    /// VPC owning the configured security group.
    pub security_group_vpc: Option<String>,
}

/// Run every check against `clients`, stopping at the first failure.
///
/// Performs lookups only; nothing is created or modified remotely.
pub async fn verify_inputs(config: &BuildConfig, clients: &CloudClients) -> Result<VerifiedInputs, VerifyInputError> {
    let vpc = clients.vpc.as_ref();

    verify_region(vpc, &config.region).await?;

    if let Some(resource_group_id) = supplied(&config.resource_group_id) {
        verify_resource_group(clients.resource_groups.as_ref(), config, resource_group_id).await?;
    }

    if let Some(volume_id) = supplied(&config.vsi_boot_volume_id) {
        verify_boot_volume(vpc, volume_id).await?;
    }

    // Volume and snapshot are checked independently; both may be configured.
    if let Some(snapshot_id) = supplied(&config.vsi_boot_snapshot_id) {
        verify_boot_snapshot(vpc, snapshot_id).await?;
    }

    verify_image_name_free(vpc, &config.image_name).await?;

    let security_group_vpc = match supplied(&config.security_group_id) {
        Some(security_group_id) => security_group_vpc(vpc, security_group_id).await?,
        None => None,
    };

    Ok(VerifiedInputs { security_group_vpc })
}

/// A configured identifier, trimmed; blank values count as absent.
fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

async fn verify_region(vpc: &dyn VpcLookup, region: &str) -> Result<(), VerifyInputError> {
    debug!(region, "verifying region");
    vpc.get_region(region)
        .await
        .map_err(|cause| VerifyInputError::RegionLookup {
            region: region.to_string(),
            cause,
        })?;
    Ok(())
}

async fn verify_resource_group(
    connector: &dyn ResourceGroupConnector,
    config: &BuildConfig,
    resource_group_id: &str,
) -> Result<(), VerifyInputError> {
    debug!(resource_group_id, "verifying resource group");
    let lookup = connector
        .connect(config.api_key().unwrap_or_default(), &config.iam_endpoint)
        .map_err(|cause| VerifyInputError::ResourceManagerClient {
            resource_group_id: resource_group_id.to_string(),
            cause,
        })?;

    match lookup.get_resource_group(resource_group_id).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(VerifyInputError::ResourceGroupNotFound {
            resource_group_id: resource_group_id.to_string(),
        }),
        Err(cause) => Err(VerifyInputError::ResourceGroupLookup {
            resource_group_id: resource_group_id.to_string(),
            cause,
        }),
    }
}

async fn verify_boot_volume(vpc: &dyn VpcLookup, volume_id: &str) -> Result<(), VerifyInputError> {
    debug!(volume_id, "verifying boot volume");
    let volume = vpc.get_volume(volume_id).await.map_err(|cause| {
        if cause.is_not_found() {
            VerifyInputError::VolumeNotFound {
                volume_id: volume_id.to_string(),
            }
        } else {
            VerifyInputError::VolumeLookup {
                volume_id: volume_id.to_string(),
                cause,
            }
        }
    })?;

    if !volume.is_bootable() {
        return Err(VerifyInputError::VolumeNotBootable {
            volume_id: volume_id.to_string(),
        });
    }
    if !volume.is_unattached() {
        return Err(VerifyInputError::VolumeAttached {
            volume_id: volume_id.to_string(),
        });
    }
    Ok(())
}

async fn verify_boot_snapshot(vpc: &dyn VpcLookup, snapshot_id: &str) -> Result<(), VerifyInputError> {
    debug!(snapshot_id, "verifying boot snapshot");
    let snapshot = vpc.get_snapshot(snapshot_id).await.map_err(|cause| {
        if cause.is_not_found() {
            VerifyInputError::SnapshotNotFound {
                snapshot_id: snapshot_id.to_string(),
            }
        } else {
            VerifyInputError::SnapshotLookup {
                snapshot_id: snapshot_id.to_string(),
                cause,
            }
        }
    })?;

    if !snapshot.is_bootable() {
        return Err(VerifyInputError::SnapshotNotBootable {
            snapshot_id: snapshot_id.to_string(),
        });
    }
    Ok(())
}

async fn verify_image_name_free(vpc: &dyn VpcLookup, image_name: &str) -> Result<(), VerifyInputError> {
    debug!(image_name, "checking for an existing image with the target name");
    let images = vpc
        .list_images(image_name)
        .await
        .map_err(|cause| VerifyInputError::ImageLookup {
            image_name: image_name.to_string(),
            cause,
        })?;

    match images.into_iter().next() {
        Some(existing) => Err(VerifyInputError::ImageNameTaken {
            image_name: image_name.to_string(),
            existing_image_id: existing.id,
        }),
        None => Ok(()),
    }
}

async fn security_group_vpc(vpc: &dyn VpcLookup, security_group_id: &str) -> Result<Option<String>, VerifyInputError> {
    debug!(security_group_id, "verifying security group");
    let group = vpc
        .get_security_group(security_group_id)
        .await
        .map_err(|cause| VerifyInputError::SecurityGroupLookup {
            security_group_id: security_group_id.to_string(),
            cause,
        })?;

    // Subnet and VPC consistency is checked when the network is resolved.
    if group.id.is_empty() {
        return Ok(None);
    }
    Ok(Some(group.vpc.id))
}

/// Pipeline step wrapping [`verify_inputs`]. Creates nothing, so cleanup is
/// a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct VerifyInputStep;

#[async_trait]
impl Step for VerifyInputStep {
    fn name(&self) -> &str {
        "verify-input"
    }

    // The token is not consulted; in-flight lookups run to completion.
    async fn run(&self, _cancel: &CancellationToken, state: &mut BuildState) -> StepAction {
        state.ui.say("Verifying build inputs...");

        match verify_inputs(&state.config, &state.clients).await {
            Ok(verified) => {
                if let Some(vpc_id) = verified.security_group_vpc {
                    debug!(vpc_id = %vpc_id, "security group VPC recorded");
                    state.security_group_vpc = Some(vpc_id);
                }
                StepAction::Continue
            }
            Err(error) => {
                warn!(kind = ?error.kind(), subject = error.subject(), error = %error, "input verification failed");
                state.halt(error)
            }
        }
    }
}
