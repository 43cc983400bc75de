//! SKE service: Kubernetes enablement per project

use serde::Deserialize;

use super::error::ApiError;
use super::Client;

pub const STATE_CREATING: &str = "STATE_CREATING";
pub const STATE_CREATED: &str = "STATE_CREATED";
pub const STATE_DELETING: &str = "STATE_DELETING";
pub const STATE_FAILED: &str = "STATE_FAILED";

#[derive(Debug, Clone, Deserialize)]
pub struct KubernetesProject {
    #[serde(rename = "projectId")]
    pub project_id: String,
    pub state: String,
}

fn project_path(project_id: &str) -> String {
    format!("/ske/v1/projects/{}", project_id)
}

impl Client {
    /// PUT /ske/v1/projects/{p}
    pub async fn enable_kubernetes(&self, project_id: &str) -> Result<(), ApiError> {
        self.put_no_content(&project_path(project_id), &serde_json::json!({}))
            .await
    }

    /// GET /ske/v1/projects/{p}
    pub async fn get_kubernetes_project(
        &self,
        project_id: &str,
    ) -> Result<KubernetesProject, ApiError> {
        self.get(&project_path(project_id)).await
    }

    /// DELETE /ske/v1/projects/{p}
    pub async fn disable_kubernetes(&self, project_id: &str) -> Result<(), ApiError> {
        self.delete(&project_path(project_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enablement_state_round_trips() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ske/v1/projects/proj-1")
            .with_status(200)
            .with_body(r#"{"projectId": "proj-1", "state": "STATE_CREATED"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "test-token", false).unwrap();
        let project = client.get_kubernetes_project("proj-1").await.unwrap();

        assert_eq!(project.project_id, "proj-1");
        assert_eq!(project.state, STATE_CREATED);
    }

    #[tokio::test]
    async fn enable_accepts_empty_object_acknowledgement() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/ske/v1/projects/proj-1")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = Client::new(&server.url(), "test-token", false).unwrap();
        client.enable_kubernetes("proj-1").await.unwrap();
    }
}
