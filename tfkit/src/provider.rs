//! Provider trait and request/response types
//!
//! The provider owns configuration (endpoint, credentials) and hands out
//! resource and data source instances through factories. `configure` runs
//! once per Terraform session; whatever it returns as provider data is
//! passed to every resource/data source the factories build afterwards.

use crate::context::Context;
use crate::data_source::DataSourceWithConfigure;
use crate::error::Result;
use crate::resource::ResourceWithConfigure;
use crate::schema::Schema;
use crate::types::{ClientCapabilities, Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name without a type suffix, e.g. "nimbus".
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse;

    /// Schema of the provider's own configuration block.
    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    async fn validate(
        &self,
        ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse;

    /// Resolves configuration and builds whatever clients the resources
    /// need. The returned provider data is delivered to every resource
    /// and data source via their configure hook.
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Factory for resource instances; must answer every name in
    /// `resource_types`.
    fn create_resource(&self, type_name: &str) -> Result<Box<dyn ResourceWithConfigure>>;

    /// Factory for data source instances; must answer every name in
    /// `data_source_types`.
    fn create_data_source(&self, type_name: &str) -> Result<Box<dyn DataSourceWithConfigure>>;

    fn resource_types(&self) -> Vec<String>;

    fn data_source_types(&self) -> Vec<String>;
}

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    pub type_name: String,
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ValidateProviderConfigRequest {
    pub config: DynamicValue,
}

pub struct ValidateProviderConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
    pub client_capabilities: ClientCapabilities,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    /// Handed to every resource/data source configure hook
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}
