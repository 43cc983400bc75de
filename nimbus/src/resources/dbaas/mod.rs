pub mod resource_credential;
pub mod resource_instance;

pub use resource_credential::DatabaseCredentialResource;
pub use resource_instance::DatabaseInstanceResource;
