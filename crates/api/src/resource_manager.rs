//! Resource manager client for resource-group lookups.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;
use vpcimage_types::ResourceGroup;

use crate::{
    ApiError, IamAuthenticator, ResourceGroupConnector, ResourceGroupLookup,
    http::{JsonHttp, encode_segment},
};

/// HTTP implementation of [`ResourceGroupLookup`].
#[derive(Debug, Clone)]
pub struct ResourceManagerClient {
    http: JsonHttp,
    auth: Arc<IamAuthenticator>,
}

impl ResourceManagerClient {
    /// Create a client for the resource manager rooted at `base_url`.
    pub fn new(base_url: &str, auth: Arc<IamAuthenticator>) -> Result<Self, ApiError> {
        Ok(Self {
            http: JsonHttp::new(base_url)?,
            auth,
        })
    }
}

#[async_trait]
impl ResourceGroupLookup for ResourceManagerClient {
    async fn get_resource_group(&self, id: &str) -> Result<Option<ResourceGroup>, ApiError> {
        let path = format!("/resource_groups/{}", encode_segment(id));
        let request = self.auth.authorize(self.http.request(Method::GET, &path)).await?;
        self.http.send_json(request, &Method::GET, &path).await
    }
}

/// Builds a fresh [`ResourceManagerClient`] per connection request.
#[derive(Debug, Clone)]
pub struct ResourceManagerConnector {
    base_url: String,
}

impl ResourceManagerConnector {
    /// Connector for the resource manager rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }
}

impl ResourceGroupConnector for ResourceManagerConnector {
    fn connect(&self, api_key: &str, iam_endpoint: &str) -> Result<Arc<dyn ResourceGroupLookup>, ApiError> {
        debug!(base_url = %self.base_url, iam_endpoint = %iam_endpoint, "connecting resource manager client");
        let auth = Arc::new(IamAuthenticator::new(api_key, iam_endpoint)?);
        let client = ResourceManagerClient::new(&self.base_url, auth)?;
        Ok(Arc::new(client))
    }
}
