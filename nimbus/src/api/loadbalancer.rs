//! Load balancer service

use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::Client;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listener {
    pub name: String,
    pub port: u16,
    pub protocol: String,
    #[serde(rename = "targetPool")]
    pub target_pool: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub ip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPool {
    pub name: String,
    #[serde(rename = "targetPort")]
    pub target_port: u16,
    #[serde(default)]
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancer {
    pub name: String,
    pub plan: Option<String>,
    #[serde(rename = "externalAddress")]
    pub external_address: Option<String>,
    #[serde(default)]
    pub listeners: Vec<Listener>,
    #[serde(rename = "targetPools", default)]
    pub target_pools: Vec<TargetPool>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CreateLoadBalancerRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    pub listeners: Vec<Listener>,
    #[serde(rename = "targetPools")]
    pub target_pools: Vec<TargetPool>,
}

#[derive(Debug, Serialize)]
pub struct UpdateTargetPoolRequest {
    #[serde(rename = "targetPort")]
    pub target_port: u16,
    pub targets: Vec<Target>,
}

fn load_balancers_path(project_id: &str) -> String {
    format!("/loadbalancer/v1/projects/{}/load-balancers", project_id)
}

fn load_balancer_path(project_id: &str, name: &str) -> String {
    format!("{}/{}", load_balancers_path(project_id), name)
}

impl Client {
    /// GET /loadbalancer/v1/projects/{p}/load-balancers/{name}
    pub async fn get_load_balancer(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<LoadBalancer, ApiError> {
        self.get(&load_balancer_path(project_id, name)).await
    }

    /// POST /loadbalancer/v1/projects/{p}/load-balancers
    pub async fn create_load_balancer(
        &self,
        project_id: &str,
        request: &CreateLoadBalancerRequest,
    ) -> Result<LoadBalancer, ApiError> {
        self.post(&load_balancers_path(project_id), request).await
    }

    /// PUT /loadbalancer/v1/projects/{p}/load-balancers/{name}/target-pools/{pool}
    pub async fn update_target_pool(
        &self,
        project_id: &str,
        name: &str,
        pool_name: &str,
        request: &UpdateTargetPoolRequest,
    ) -> Result<TargetPool, ApiError> {
        let path = format!(
            "{}/target-pools/{}",
            load_balancer_path(project_id, name),
            pool_name
        );
        self.put(&path, request).await
    }

    /// DELETE /loadbalancer/v1/projects/{p}/load-balancers/{name}
    pub async fn delete_load_balancer(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        self.delete(&load_balancer_path(project_id, name)).await
    }
}
