//! Regional VPC API client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;
use vpcimage_types::{BuildConfig, Image, ImageCollection, Region, SecurityGroup, Snapshot, Volume};

use crate::{
    ApiError, IamAuthenticator, VpcLookup,
    http::{JsonHttp, encode_segment},
};

/// API version date sent with every VPC request.
pub const VPC_API_VERSION: &str = "2024-04-30";
/// VPC API generation sent with every request.
const VPC_API_GENERATION: &str = "2";

/// HTTP implementation of [`VpcLookup`].
#[derive(Debug, Clone)]
pub struct VpcClient {
    http: JsonHttp,
    auth: Arc<IamAuthenticator>,
}

impl VpcClient {
    /// Create a client for the VPC API rooted at `base_url` (e.g.
    /// `https://us-south.iaas.cloud.ibm.com/v1`).
    pub fn new(base_url: &str, auth: Arc<IamAuthenticator>) -> Result<Self, ApiError> {
        Ok(Self {
            http: JsonHttp::new(base_url)?,
            auth,
        })
    }

    /// Create a client from the endpoint and credentials in a build configuration.
    pub fn from_config(config: &BuildConfig) -> Result<Self, ApiError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| ApiError::Authentication("API key is missing".into()))?;
        let auth = Arc::new(IamAuthenticator::new(api_key, &config.iam_endpoint)?);
        Self::new(&config.vpc_endpoint(), auth)
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<T>, ApiError> {
        let request = self
            .http
            .request(Method::GET, path)
            .query(&[("version", VPC_API_VERSION), ("generation", VPC_API_GENERATION)])
            .query(query);
        let request = self.auth.authorize(request).await?;
        self.http.send_json(request, &Method::GET, path).await
    }

    async fn get_record<T: DeserializeOwned>(&self, path: String) -> Result<T, ApiError> {
        self.get(&path, &[]).await?.ok_or(ApiError::EmptyResponse { path })
    }
}

#[async_trait]
impl VpcLookup for VpcClient {
    async fn get_region(&self, name: &str) -> Result<Region, ApiError> {
        self.get_record(format!("/regions/{}", encode_segment(name))).await
    }

    async fn get_volume(&self, id: &str) -> Result<Volume, ApiError> {
        self.get_record(format!("/volumes/{}", encode_segment(id))).await
    }

    async fn get_snapshot(&self, id: &str) -> Result<Snapshot, ApiError> {
        self.get_record(format!("/snapshots/{}", encode_segment(id))).await
    }

    async fn list_images(&self, name: &str) -> Result<Vec<Image>, ApiError> {
        let collection: Option<ImageCollection> = self.get("/images", &[("name", name)]).await?;
        let images = collection.unwrap_or_default().images;
        debug!(name = %name, count = images.len(), "listed images by name");
        Ok(images)
    }

    async fn get_security_group(&self, id: &str) -> Result<SecurityGroup, ApiError> {
        self.get_record(format!("/security_groups/{}", encode_segment(id))).await
    }
}
