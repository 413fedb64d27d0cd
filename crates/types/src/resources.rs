//! Resource records returned by the cloud control plane.
//!
//! Only the attributes the pipeline reads are modelled; unknown fields in the
//! service payloads are ignored during deserialization.

use serde::{Deserialize, Serialize};

/// Attachment state reported by a volume that no instance is using.
pub const ATTACHMENT_STATE_UNATTACHED: &str = "unattached";

/// A region of the VPC control plane (e.g. `us-south`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Administrative grouping of resources, owned by the resource manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Operating system declared on a volume or snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperatingSystem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
}

impl OperatingSystem {
    fn has_architecture(&self) -> bool {
        self.architecture.is_some()
    }
}

/// A block storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub operating_system: Option<OperatingSystem>,
    #[serde(default)]
    pub attachment_state: Option<String>,
}

impl Volume {
    /// A volume can boot an instance only when it declares an operating system
    /// with a known architecture.
    pub fn is_bootable(&self) -> bool {
        self.operating_system.as_ref().is_some_and(OperatingSystem::has_architecture)
    }

    /// Absent attachment state counts as unattached; any other value does not.
    pub fn is_unattached(&self) -> bool {
        self.attachment_state
            .as_deref()
            .is_none_or(|state| state == ATTACHMENT_STATE_UNATTACHED)
    }
}

/// A point-in-time copy of a volume. Snapshots are never attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub operating_system: Option<OperatingSystem>,
}

impl Snapshot {
    /// Same rule as [`Volume::is_bootable`].
    pub fn is_bootable(&self) -> bool {
        self.operating_system.as_ref().is_some_and(OperatingSystem::has_architecture)
    }
}

/// A machine image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// One page of the image listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageCollection {
    #[serde(default)]
    pub images: Vec<Image>,
}

/// Reference to a VPC embedded in other resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcReference {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub crn: Option<String>,
}

/// Traffic filtering policy, scoped to the VPC that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub vpc: VpcReference,
}
