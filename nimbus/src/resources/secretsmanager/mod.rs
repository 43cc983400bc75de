pub mod resource_instance;
pub mod resource_user;

pub use resource_instance::SecretsInstanceResource;
pub use resource_user::SecretsUserResource;
