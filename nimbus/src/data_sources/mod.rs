//! Read-only lookups over the Nimbus services

pub mod bucket;
pub mod database_instance;
pub mod network;
pub mod secrets_instance;

pub use bucket::BucketDataSource;
pub use database_instance::DatabaseInstanceDataSource;
pub use network::NetworkDataSource;
pub use secrets_instance::SecretsInstanceDataSource;
