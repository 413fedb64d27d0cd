//! In-memory fakes for the lookup capabilities.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vpcimage_api::{ApiError, ResourceGroupConnector, ResourceGroupLookup, VpcLookup};
use vpcimage_types::{BuildConfig, Image, OperatingSystem, Region, ResourceGroup, SecurityGroup, Snapshot, Volume, VpcReference};

use crate::{
    state::{BuildState, CloudClients},
    ui::RecordingUi,
};

pub(crate) const TEST_API_KEY: &str = "test-api-key";

pub(crate) fn test_config() -> BuildConfig {
    BuildConfig {
        region: "us-south".into(),
        image_name: "my-new-image".into(),
        api_key: Some(TEST_API_KEY.into()),
        ..BuildConfig::default()
    }
}

pub(crate) fn bootable_os() -> Option<OperatingSystem> {
    Some(OperatingSystem {
        name: Some("ubuntu-22-04-amd64".into()),
        architecture: Some("amd64".into()),
    })
}

/// VPC fake. Unknown identifiers answer 404; identifiers in `failing`
/// answer 500. Every call is journaled as `kind:argument`.
#[derive(Default)]
pub(crate) struct FakeVpc {
    regions: HashMap<String, Region>,
    volumes: HashMap<String, Volume>,
    snapshots: HashMap<String, Snapshot>,
    images: Vec<Image>,
    security_groups: HashMap<String, SecurityGroup>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeVpc {
    pub(crate) fn us_south() -> Self {
        Self::default().with_region("us-south")
    }

    pub(crate) fn with_region(mut self, name: &str) -> Self {
        self.regions.insert(
            name.into(),
            Region {
                name: name.into(),
                endpoint: Some(format!("https://{name}.iaas.cloud.ibm.com")),
                status: Some("available".into()),
            },
        );
        self
    }

    pub(crate) fn with_volume(mut self, volume: Volume) -> Self {
        self.volumes.insert(volume.id.clone(), volume);
        self
    }

    pub(crate) fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshots.insert(snapshot.id.clone(), snapshot);
        self
    }

    pub(crate) fn with_image(mut self, id: &str, name: &str) -> Self {
        self.images.push(Image {
            id: id.into(),
            name: name.into(),
            status: Some("available".into()),
        });
        self
    }

    pub(crate) fn with_security_group(mut self, id: &str, vpc_id: &str) -> Self {
        self.security_groups.insert(
            id.into(),
            SecurityGroup {
                id: id.into(),
                name: Some("build-sg".into()),
                vpc: VpcReference {
                    id: vpc_id.into(),
                    name: None,
                    crn: None,
                },
            },
        );
        self
    }

    /// Make lookups of `key` (an identifier or image name) fail with a 500.
    pub(crate) fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.into());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    fn lookup<T: Clone>(&self, kind: &str, key: &str, records: &HashMap<String, T>) -> Result<T, ApiError> {
        self.record(kind, key);
        if self.failing.contains(key) {
            return Err(ApiError::status(500, "internal error"));
        }
        records
            .get(key)
            .cloned()
            .ok_or_else(|| ApiError::status(404, format!("{kind} not found")))
    }

    fn record(&self, kind: &str, key: &str) {
        self.calls.lock().expect("calls").push(format!("{kind}:{key}"));
    }
}

#[async_trait]
impl VpcLookup for FakeVpc {
    async fn get_region(&self, name: &str) -> Result<Region, ApiError> {
        self.lookup("region", name, &self.regions)
    }

    async fn get_volume(&self, id: &str) -> Result<Volume, ApiError> {
        self.lookup("volume", id, &self.volumes)
    }

    async fn get_snapshot(&self, id: &str) -> Result<Snapshot, ApiError> {
        self.lookup("snapshot", id, &self.snapshots)
    }

    async fn list_images(&self, name: &str) -> Result<Vec<Image>, ApiError> {
        self.record("images", name);
        if self.failing.contains(name) {
            return Err(ApiError::status(500, "internal error"));
        }
        Ok(self.images.iter().filter(|image| image.name == name).cloned().collect())
    }

    async fn get_security_group(&self, id: &str) -> Result<SecurityGroup, ApiError> {
        self.lookup("security_group", id, &self.security_groups)
    }
}

/// What the resource-group fake does when asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupOutcome {
    Found,
    Empty,
    LookupFails,
    ConnectFails,
}

pub(crate) struct FakeConnector {
    outcome: GroupOutcome,
    connections: Mutex<Vec<(String, String)>>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    pub(crate) fn new(outcome: GroupOutcome) -> Self {
        Self {
            outcome,
            connections: Mutex::default(),
            lookups: Arc::default(),
        }
    }

    /// `(api_key, iam_endpoint)` pairs passed to `connect`.
    pub(crate) fn connections(&self) -> Vec<(String, String)> {
        self.connections.lock().expect("connections").clone()
    }

    pub(crate) fn lookups(&self) -> Vec<String> {
        self.lookups.lock().expect("lookups").clone()
    }
}

impl ResourceGroupConnector for FakeConnector {
    fn connect(&self, api_key: &str, iam_endpoint: &str) -> Result<Arc<dyn ResourceGroupLookup>, ApiError> {
        self.connections
            .lock()
            .expect("connections")
            .push((api_key.into(), iam_endpoint.into()));
        if self.outcome == GroupOutcome::ConnectFails {
            return Err(ApiError::Authentication("invalid api key".into()));
        }
        Ok(Arc::new(FakeGroups {
            outcome: self.outcome,
            lookups: Arc::clone(&self.lookups),
        }))
    }
}

struct FakeGroups {
    outcome: GroupOutcome,
    lookups: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ResourceGroupLookup for FakeGroups {
    async fn get_resource_group(&self, id: &str) -> Result<Option<ResourceGroup>, ApiError> {
        self.lookups.lock().expect("lookups").push(id.into());
        match self.outcome {
            GroupOutcome::Found => Ok(Some(ResourceGroup {
                id: id.into(),
                name: Some("default".into()),
                state: Some("ACTIVE".into()),
            })),
            GroupOutcome::Empty => Ok(None),
            GroupOutcome::LookupFails | GroupOutcome::ConnectFails => Err(ApiError::status(403, "Forbidden")),
        }
    }
}

pub(crate) fn state_with(config: BuildConfig, clients: CloudClients) -> (BuildState, Arc<RecordingUi>) {
    let ui = Arc::new(RecordingUi::new());
    (BuildState::new(config, clients, ui.clone()), ui)
}

pub(crate) fn recording_state(vpc: FakeVpc) -> (BuildState, Arc<RecordingUi>) {
    let clients = CloudClients::new(Arc::new(vpc), Arc::new(FakeConnector::new(GroupOutcome::Found)));
    state_with(test_config(), clients)
}
