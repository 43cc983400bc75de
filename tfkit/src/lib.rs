//! tfkit - Terraform Plugin Framework for Rust
//!
//! A framework for building Terraform providers in Rust, implementing the
//! Terraform Plugin Protocol v6.9. Providers implement the [`Provider`],
//! [`Resource`] and [`DataSource`] traits and hand the provider to
//! [`serve`], which speaks the go-plugin handshake and serves the gRPC
//! protocol to Terraform.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod validator;

// Framework implementation modules
pub mod grpc;
pub mod proto;
pub mod server;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfkitError};
pub use grpc::ProviderHandler;
pub use import::{
    import_state_composite_id, import_state_passthrough_id,
    import_state_passthrough_with_identity,
};
pub use provider::{Provider, ProviderMetadataRequest, ProviderMetadataResponse};
pub use resource::{Resource, ResourceWithConfigure};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use server::{serve, ServerConfig};
pub use types::{Config, Diagnostic, Dynamic, DynamicValue, State};
