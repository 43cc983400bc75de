//! Object storage service: buckets, credentials groups and access keys

use serde::{Deserialize, Serialize};

use super::common::deserialize_id_string;
use super::error::ApiError;
use super::Client;

#[derive(Debug, Clone, Deserialize)]
pub struct BucketEndpoints {
    pub url: Option<String>,
    #[serde(rename = "urlPathStyle")]
    pub url_path_style: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub region: Option<String>,
    pub endpoints: Option<BucketEndpoints>,
}

#[derive(Debug, Serialize)]
pub struct CreateBucketRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsGroup {
    #[serde(
        rename = "credentialsGroupId",
        deserialize_with = "deserialize_id_string"
    )]
    pub credentials_group_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub urn: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateCredentialsGroupRequest {
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct CredentialsGroupList {
    #[serde(rename = "credentialsGroups")]
    pub credentials_groups: Vec<CredentialsGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessKey {
    #[serde(rename = "keyId", deserialize_with = "deserialize_id_string")]
    pub key_id: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "accessKey")]
    pub access_key: Option<String>,
    /// Only present in the create response
    #[serde(rename = "secretAccessKey")]
    pub secret_access_key: Option<String>,
    pub expires: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateAccessKeyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
}

fn buckets_path(project_id: &str) -> String {
    format!("/objectstorage/v1/projects/{}/buckets", project_id)
}

fn bucket_path(project_id: &str, name: &str) -> String {
    format!("{}/{}", buckets_path(project_id), name)
}

fn credentials_groups_path(project_id: &str) -> String {
    format!("/objectstorage/v1/projects/{}/credentials-groups", project_id)
}

fn credentials_group_path(project_id: &str, group_id: &str) -> String {
    format!("{}/{}", credentials_groups_path(project_id), group_id)
}

fn access_keys_path(project_id: &str, group_id: &str) -> String {
    format!("{}/access-keys", credentials_group_path(project_id, group_id))
}

fn access_key_path(project_id: &str, group_id: &str, key_id: &str) -> String {
    format!("{}/{}", access_keys_path(project_id, group_id), key_id)
}

impl Client {
    /// POST /objectstorage/v1/projects/{p}/enable
    pub async fn enable_object_storage(&self, project_id: &str) -> Result<(), ApiError> {
        let path = format!("/objectstorage/v1/projects/{}/enable", project_id);
        self.post_no_content(&path, &serde_json::json!({})).await
    }

    /// GET /objectstorage/v1/projects/{p}/buckets/{name}
    pub async fn get_bucket(&self, project_id: &str, name: &str) -> Result<Bucket, ApiError> {
        self.get(&bucket_path(project_id, name)).await
    }

    /// POST /objectstorage/v1/projects/{p}/buckets/{name}
    pub async fn create_bucket(
        &self,
        project_id: &str,
        name: &str,
        request: &CreateBucketRequest,
    ) -> Result<(), ApiError> {
        self.post_no_content(&bucket_path(project_id, name), request)
            .await
    }

    /// DELETE /objectstorage/v1/projects/{p}/buckets/{name}
    pub async fn delete_bucket(&self, project_id: &str, name: &str) -> Result<(), ApiError> {
        self.delete(&bucket_path(project_id, name)).await
    }

    /// GET /objectstorage/v1/projects/{p}/credentials-groups
    pub async fn list_credentials_groups(
        &self,
        project_id: &str,
    ) -> Result<Vec<CredentialsGroup>, ApiError> {
        let response: CredentialsGroupList = self.get(&credentials_groups_path(project_id)).await?;
        Ok(response.credentials_groups)
    }

    /// POST /objectstorage/v1/projects/{p}/credentials-groups
    pub async fn create_credentials_group(
        &self,
        project_id: &str,
        request: &CreateCredentialsGroupRequest,
    ) -> Result<(), ApiError> {
        self.post_no_content(&credentials_groups_path(project_id), request)
            .await
    }

    /// DELETE /objectstorage/v1/projects/{p}/credentials-groups/{id}
    pub async fn delete_credentials_group(
        &self,
        project_id: &str,
        group_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(&credentials_group_path(project_id, group_id))
            .await
    }

    /// POST /objectstorage/v1/projects/{p}/credentials-groups/{id}/access-keys
    pub async fn create_access_key(
        &self,
        project_id: &str,
        group_id: &str,
        request: &CreateAccessKeyRequest,
    ) -> Result<AccessKey, ApiError> {
        self.post(&access_keys_path(project_id, group_id), request)
            .await
    }

    /// GET /objectstorage/v1/projects/{p}/credentials-groups/{id}/access-keys/{kid}
    pub async fn get_access_key(
        &self,
        project_id: &str,
        group_id: &str,
        key_id: &str,
    ) -> Result<AccessKey, ApiError> {
        self.get(&access_key_path(project_id, group_id, key_id))
            .await
    }

    /// DELETE /objectstorage/v1/projects/{p}/credentials-groups/{id}/access-keys/{kid}
    pub async fn delete_access_key(
        &self,
        project_id: &str,
        group_id: &str,
        key_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(&access_key_path(project_id, group_id, key_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bucket_create_accepts_object_acknowledgement() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/objectstorage/v1/projects/proj-1/enable")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("POST", "/objectstorage/v1/projects/proj-1/buckets/logs")
            .with_status(201)
            .with_body(r#"{"status": "pending"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "test-token", false).unwrap();
        client.enable_object_storage("proj-1").await.unwrap();
        client
            .create_bucket("proj-1", "logs", &CreateBucketRequest { region: None })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_credentials_groups_unwraps_items() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/objectstorage/v1/projects/proj-1/credentials-groups")
            .with_status(200)
            .with_body(
                r#"{
                    "credentialsGroups": [
                        {"credentialsGroupId": "cg-1", "displayName": "backups", "urn": null},
                        {"credentialsGroupId": "cg-2", "displayName": "exports", "urn": null}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "test-token", false).unwrap();
        let groups = client.list_credentials_groups("proj-1").await.unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].display_name, "exports");
    }

    #[tokio::test]
    async fn access_key_create_carries_secret() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                "/objectstorage/v1/projects/proj-1/credentials-groups/cg-1/access-keys",
            )
            .with_status(201)
            .with_body(
                r#"{
                    "keyId": "key-77",
                    "displayName": "key-77",
                    "accessKey": "AKNIMBUS77",
                    "secretAccessKey": "wJalrXUtnFEMI",
                    "expires": "2027-01-01T00:00:00Z"
                }"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "test-token", false).unwrap();
        let key = client
            .create_access_key(
                "proj-1",
                "cg-1",
                &CreateAccessKeyRequest {
                    expires: Some("2027-01-01T00:00:00Z".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(key.key_id, "key-77");
        assert_eq!(key.secret_access_key.as_deref(), Some("wJalrXUtnFEMI"));
    }
}
