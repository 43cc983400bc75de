pub mod resource_network;
pub mod resource_server;

pub use resource_network::NetworkResource;
pub use resource_server::ServerResource;
