//! IaaS service: networks and servers

use serde::{Deserialize, Serialize};

use super::common::deserialize_id_string;
use super::error::ApiError;
use super::Client;

#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    #[serde(rename = "networkId", deserialize_with = "deserialize_id_string")]
    pub network_id: String,
    pub name: String,
    #[serde(rename = "ipv4PrefixLength")]
    pub ipv4_prefix_length: Option<u8>,
    #[serde(rename = "nameservers", default)]
    pub nameservers: Vec<String>,
    #[serde(rename = "routed", default)]
    pub routed: bool,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct CreateNetworkRequest {
    pub name: String,
    #[serde(rename = "ipv4PrefixLength", skip_serializing_if = "Option::is_none")]
    pub ipv4_prefix_length: Option<u8>,
    #[serde(rename = "nameservers", skip_serializing_if = "Vec::is_empty", default)]
    pub nameservers: Vec<String>,
    #[serde(rename = "routed", skip_serializing_if = "Option::is_none")]
    pub routed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UpdateNetworkRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "nameservers", skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct NetworkList {
    pub items: Vec<Network>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootVolume {
    #[serde(rename = "sizeGb")]
    pub size_gb: u32,
    #[serde(rename = "performanceClass")]
    pub performance_class: Option<String>,
    #[serde(rename = "imageId")]
    pub image_id: String,
}

#[derive(Debug, Serialize)]
pub struct BootVolumeRequest {
    #[serde(rename = "sizeGb")]
    pub size_gb: u32,
    #[serde(rename = "performanceClass", skip_serializing_if = "Option::is_none")]
    pub performance_class: Option<String>,
    #[serde(rename = "imageId")]
    pub image_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    #[serde(rename = "serverId", deserialize_with = "deserialize_id_string")]
    pub server_id: String,
    pub name: String,
    #[serde(rename = "machineType")]
    pub machine_type: String,
    #[serde(rename = "availabilityZone")]
    pub availability_zone: Option<String>,
    #[serde(rename = "bootVolume")]
    pub boot_volume: Option<BootVolume>,
    #[serde(rename = "networkInterfaces", default)]
    pub network_interfaces: Vec<String>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CreateServerRequest {
    pub name: String,
    #[serde(rename = "machineType")]
    pub machine_type: String,
    #[serde(rename = "availabilityZone", skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(rename = "bootVolume")]
    pub boot_volume: BootVolumeRequest,
    #[serde(rename = "userData", skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(
        rename = "networkInterfaces",
        skip_serializing_if = "Vec::is_empty",
        default
    )]
    pub network_interfaces: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateServerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "machineType", skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
}

fn networks_path(project_id: &str) -> String {
    format!("/iaas/v1/projects/{}/networks", project_id)
}

fn network_path(project_id: &str, network_id: &str) -> String {
    format!("{}/{}", networks_path(project_id), network_id)
}

fn servers_path(project_id: &str) -> String {
    format!("/iaas/v1/projects/{}/servers", project_id)
}

fn server_path(project_id: &str, server_id: &str) -> String {
    format!("{}/{}", servers_path(project_id), server_id)
}

impl Client {
    /// GET /iaas/v1/projects/{p}/networks
    pub async fn list_networks(&self, project_id: &str) -> Result<Vec<Network>, ApiError> {
        let response: NetworkList = self.get(&networks_path(project_id)).await?;
        Ok(response.items)
    }

    /// GET /iaas/v1/projects/{p}/networks/{id}
    pub async fn get_network(
        &self,
        project_id: &str,
        network_id: &str,
    ) -> Result<Network, ApiError> {
        self.get(&network_path(project_id, network_id)).await
    }

    /// POST /iaas/v1/projects/{p}/networks
    pub async fn create_network(
        &self,
        project_id: &str,
        request: &CreateNetworkRequest,
    ) -> Result<Network, ApiError> {
        self.post(&networks_path(project_id), request).await
    }

    /// PATCH /iaas/v1/projects/{p}/networks/{id}
    pub async fn update_network(
        &self,
        project_id: &str,
        network_id: &str,
        request: &UpdateNetworkRequest,
    ) -> Result<Network, ApiError> {
        self.patch(&network_path(project_id, network_id), request)
            .await
    }

    /// DELETE /iaas/v1/projects/{p}/networks/{id}
    pub async fn delete_network(
        &self,
        project_id: &str,
        network_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(&network_path(project_id, network_id)).await
    }

    /// GET /iaas/v1/projects/{p}/servers/{id}
    pub async fn get_server(&self, project_id: &str, server_id: &str) -> Result<Server, ApiError> {
        self.get(&server_path(project_id, server_id)).await
    }

    /// POST /iaas/v1/projects/{p}/servers
    pub async fn create_server(
        &self,
        project_id: &str,
        request: &CreateServerRequest,
    ) -> Result<Server, ApiError> {
        self.post(&servers_path(project_id), request).await
    }

    /// PATCH /iaas/v1/projects/{p}/servers/{id}
    pub async fn update_server(
        &self,
        project_id: &str,
        server_id: &str,
        request: &UpdateServerRequest,
    ) -> Result<Server, ApiError> {
        self.patch(&server_path(project_id, server_id), request)
            .await
    }

    /// DELETE /iaas/v1/projects/{p}/servers/{id}
    pub async fn delete_server(&self, project_id: &str, server_id: &str) -> Result<(), ApiError> {
        self.delete(&server_path(project_id, server_id)).await
    }
}
