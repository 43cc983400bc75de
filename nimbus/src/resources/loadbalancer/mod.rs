pub mod resource_loadbalancer;

pub use resource_loadbalancer::LoadBalancerResource;
