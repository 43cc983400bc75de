//! DBaaS service: managed database instances and credentials
//!
//! The `acl` parameter is a single comma-joined string of CIDRs on the
//! wire; the resource layer exposes it as a list.

use serde::{Deserialize, Serialize};

use super::common::deserialize_id_string;
use super::error::ApiError;
use super::Client;

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub class: String,
    #[serde(rename = "sizeGb")]
    pub size_gb: u32,
}

#[derive(Debug, Serialize)]
pub struct StorageRequest {
    pub class: String,
    #[serde(rename = "sizeGb")]
    pub size_gb: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseInstance {
    #[serde(rename = "instanceId", deserialize_with = "deserialize_id_string")]
    pub instance_id: String,
    pub name: String,
    pub engine: String,
    pub version: String,
    #[serde(rename = "planId")]
    pub plan_id: String,
    pub replicas: Option<u32>,
    pub storage: Option<Storage>,
    /// Comma-joined CIDR list, may be empty
    #[serde(default)]
    pub acl: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CreateDatabaseInstanceRequest {
    pub name: String,
    pub engine: String,
    pub version: String,
    #[serde(rename = "planId")]
    pub plan_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageRequest>,
    pub acl: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateDatabaseInstanceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "planId", skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseCredential {
    #[serde(rename = "credentialId", deserialize_with = "deserialize_id_string")]
    pub credential_id: String,
    pub username: Option<String>,
    /// Only present in the create response
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub uri: Option<String>,
}

fn instances_path(project_id: &str) -> String {
    format!("/dbaas/v1/projects/{}/instances", project_id)
}

fn instance_path(project_id: &str, instance_id: &str) -> String {
    format!("{}/{}", instances_path(project_id), instance_id)
}

fn credentials_path(project_id: &str, instance_id: &str) -> String {
    format!("{}/credentials", instance_path(project_id, instance_id))
}

fn credential_path(project_id: &str, instance_id: &str, credential_id: &str) -> String {
    format!(
        "{}/{}",
        credentials_path(project_id, instance_id),
        credential_id
    )
}

impl Client {
    /// GET /dbaas/v1/projects/{p}/instances/{id}
    pub async fn get_database_instance(
        &self,
        project_id: &str,
        instance_id: &str,
    ) -> Result<DatabaseInstance, ApiError> {
        self.get(&instance_path(project_id, instance_id)).await
    }

    /// POST /dbaas/v1/projects/{p}/instances
    pub async fn create_database_instance(
        &self,
        project_id: &str,
        request: &CreateDatabaseInstanceRequest,
    ) -> Result<DatabaseInstance, ApiError> {
        self.post(&instances_path(project_id), request).await
    }

    /// PATCH /dbaas/v1/projects/{p}/instances/{id}
    pub async fn update_database_instance(
        &self,
        project_id: &str,
        instance_id: &str,
        request: &UpdateDatabaseInstanceRequest,
    ) -> Result<DatabaseInstance, ApiError> {
        self.patch(&instance_path(project_id, instance_id), request)
            .await
    }

    /// DELETE /dbaas/v1/projects/{p}/instances/{id}
    pub async fn delete_database_instance(
        &self,
        project_id: &str,
        instance_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(&instance_path(project_id, instance_id)).await
    }

    /// POST /dbaas/v1/projects/{p}/instances/{id}/credentials
    pub async fn create_database_credential(
        &self,
        project_id: &str,
        instance_id: &str,
    ) -> Result<DatabaseCredential, ApiError> {
        self.post(&credentials_path(project_id, instance_id), &serde_json::json!({}))
            .await
    }

    /// GET /dbaas/v1/projects/{p}/instances/{id}/credentials/{cid}
    pub async fn get_database_credential(
        &self,
        project_id: &str,
        instance_id: &str,
        credential_id: &str,
    ) -> Result<DatabaseCredential, ApiError> {
        self.get(&credential_path(project_id, instance_id, credential_id))
            .await
    }

    /// DELETE /dbaas/v1/projects/{p}/instances/{id}/credentials/{cid}
    pub async fn delete_database_credential(
        &self,
        project_id: &str,
        instance_id: &str,
        credential_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(&credential_path(project_id, instance_id, credential_id))
            .await
    }
}
