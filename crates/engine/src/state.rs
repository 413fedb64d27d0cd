//! Typed execution state shared by the steps of a pipeline run.

use std::fmt;
use std::sync::Arc;

use vpcimage_api::{ApiError, ResourceGroupConnector, ResourceManagerConnector, VpcClient, VpcLookup};
use vpcimage_types::BuildConfig;

use crate::{step::StepAction, ui::Ui};

/// Remote capabilities available to steps.
#[derive(Clone)]
pub struct CloudClients {
    /// Authenticated VPC control-plane client.
    pub vpc: Arc<dyn VpcLookup>,
    /// Builds resource-group clients from caller credentials on demand.
    pub resource_groups: Arc<dyn ResourceGroupConnector>,
}

impl CloudClients {
    pub fn new(vpc: Arc<dyn VpcLookup>, resource_groups: Arc<dyn ResourceGroupConnector>) -> Self {
        Self { vpc, resource_groups }
    }

    /// HTTP clients for the endpoints named in `config`.
    pub fn from_config(config: &BuildConfig) -> Result<Self, ApiError> {
        let vpc = VpcClient::from_config(config)?;
        let resource_groups = ResourceManagerConnector::new(config.resource_manager_endpoint());
        Ok(Self::new(Arc::new(vpc), Arc::new(resource_groups)))
    }
}

impl fmt::Debug for CloudClients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudClients").finish_non_exhaustive()
    }
}

/// Mutable state for one pipeline run.
///
/// Created once per run, filled in by steps as they execute, and dropped when
/// the run ends.
pub struct BuildState {
    /// Immutable user configuration.
    pub config: BuildConfig,
    /// Remote service clients.
    pub clients: CloudClients,
    /// Interactive output sink.
    pub ui: Arc<dyn Ui>,
    /// The error that halted the run, if any.
    pub error: Option<anyhow::Error>,
    /// VPC owning the user-supplied security group, once verified.
    pub security_group_vpc: Option<String>,
}

impl BuildState {
    pub fn new(config: BuildConfig, clients: CloudClients, ui: Arc<dyn Ui>) -> Self {
        Self {
            config,
            clients,
            ui,
            error: None,
            security_group_vpc: None,
        }
    }

    /// Record `error` in the error slot, show it to the user and halt.
    pub fn halt<E>(&mut self, error: E) -> StepAction
    where
        E: Into<anyhow::Error>,
    {
        let error = error.into();
        self.ui.error(&error.to_string());
        self.error = Some(error);
        StepAction::Halt
    }
}

impl fmt::Debug for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildState")
            .field("config", &self.config)
            .field("error", &self.error.as_ref().map(ToString::to_string))
            .field("security_group_vpc", &self.security_group_vpc)
            .finish_non_exhaustive()
    }
}
