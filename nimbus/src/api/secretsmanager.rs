//! Secrets Manager service: vault instances and users

use serde::{Deserialize, Serialize};

use super::common::deserialize_id_string;
use super::error::ApiError;
use super::Client;

#[derive(Debug, Clone, Deserialize)]
pub struct SecretsInstance {
    #[serde(rename = "instanceId", deserialize_with = "deserialize_id_string")]
    pub instance_id: String,
    pub name: String,
    #[serde(rename = "engineVersion")]
    pub engine_version: Option<String>,
    #[serde(rename = "acl", default)]
    pub acl: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSecretsInstanceRequest {
    pub name: String,
    #[serde(rename = "acl", skip_serializing_if = "Vec::is_empty")]
    pub acl: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateSecretsInstanceRequest {
    pub acl: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecretsUser {
    #[serde(rename = "userId", deserialize_with = "deserialize_id_string")]
    pub user_id: String,
    pub username: Option<String>,
    /// Only present in the create response
    pub password: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "writeEnabled", default)]
    pub write_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateSecretsUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "writeEnabled")]
    pub write_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct UpdateSecretsUserRequest {
    #[serde(rename = "writeEnabled")]
    pub write_enabled: bool,
}

fn instances_path(project_id: &str) -> String {
    format!("/secretsmanager/v1/projects/{}/instances", project_id)
}

fn instance_path(project_id: &str, instance_id: &str) -> String {
    format!("{}/{}", instances_path(project_id), instance_id)
}

fn users_path(project_id: &str, instance_id: &str) -> String {
    format!("{}/users", instance_path(project_id, instance_id))
}

fn user_path(project_id: &str, instance_id: &str, user_id: &str) -> String {
    format!("{}/{}", users_path(project_id, instance_id), user_id)
}

impl Client {
    /// GET /secretsmanager/v1/projects/{p}/instances/{id}
    pub async fn get_secrets_instance(
        &self,
        project_id: &str,
        instance_id: &str,
    ) -> Result<SecretsInstance, ApiError> {
        self.get(&instance_path(project_id, instance_id)).await
    }

    /// POST /secretsmanager/v1/projects/{p}/instances
    pub async fn create_secrets_instance(
        &self,
        project_id: &str,
        request: &CreateSecretsInstanceRequest,
    ) -> Result<SecretsInstance, ApiError> {
        self.post(&instances_path(project_id), request).await
    }

    /// PUT /secretsmanager/v1/projects/{p}/instances/{id}
    pub async fn update_secrets_instance(
        &self,
        project_id: &str,
        instance_id: &str,
        request: &UpdateSecretsInstanceRequest,
    ) -> Result<(), ApiError> {
        self.put_no_content(&instance_path(project_id, instance_id), request)
            .await
    }

    /// DELETE /secretsmanager/v1/projects/{p}/instances/{id}
    pub async fn delete_secrets_instance(
        &self,
        project_id: &str,
        instance_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(&instance_path(project_id, instance_id)).await
    }

    /// POST /secretsmanager/v1/projects/{p}/instances/{id}/users
    pub async fn create_secrets_user(
        &self,
        project_id: &str,
        instance_id: &str,
        request: &CreateSecretsUserRequest,
    ) -> Result<SecretsUser, ApiError> {
        self.post(&users_path(project_id, instance_id), request)
            .await
    }

    /// GET /secretsmanager/v1/projects/{p}/instances/{id}/users/{uid}
    pub async fn get_secrets_user(
        &self,
        project_id: &str,
        instance_id: &str,
        user_id: &str,
    ) -> Result<SecretsUser, ApiError> {
        self.get(&user_path(project_id, instance_id, user_id)).await
    }

    /// PUT /secretsmanager/v1/projects/{p}/instances/{id}/users/{uid}
    pub async fn update_secrets_user(
        &self,
        project_id: &str,
        instance_id: &str,
        user_id: &str,
        request: &UpdateSecretsUserRequest,
    ) -> Result<(), ApiError> {
        self.put_no_content(&user_path(project_id, instance_id, user_id), request)
            .await
    }

    /// DELETE /secretsmanager/v1/projects/{p}/instances/{id}/users/{uid}
    pub async fn delete_secrets_user(
        &self,
        project_id: &str,
        instance_id: &str,
        user_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(&user_path(project_id, instance_id, user_id))
            .await
    }
}
