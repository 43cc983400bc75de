//! Protocol buffer types for Terraform Plugin Protocol v6.9
//!
//! The types are generated at build time by tonic_build from
//! `proto/tfplugin6.proto` and included here verbatim.
//!
//! Naming follows the usual prost conventions: top-level messages become
//! structs (`DynamicValue`, `Schema`), RPC request/response pairs live in
//! snake_case modules (`get_provider_schema::Request`), nested messages get
//! sub-modules (`diagnostic::Severity`), and the gRPC service trait is
//! `provider_server::Provider`.
//!
//! Several protobuf types share names with framework types in
//! [`crate::types`] and [`crate::schema`]. Always refer to the wire types
//! through the `proto::` prefix.

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProviderService, ProviderServer};
