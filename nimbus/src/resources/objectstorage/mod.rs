pub mod resource_bucket;
pub mod resource_credential;
pub mod resource_credentials_group;

pub use resource_bucket::BucketResource;
pub use resource_credential::ObjectStorageCredentialResource;
pub use resource_credentials_group::CredentialsGroupResource;
