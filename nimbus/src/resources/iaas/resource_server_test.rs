use super::*;
use crate::api::Client;
use tfkit::types::ClientCapabilities;

fn provider_data(url: &str) -> NimbusProviderData {
    NimbusProviderData::new(Client::new(url, "test-token", false).unwrap())
}

async fn configured_resource(url: &str) -> ServerResource {
    let mut resource = ServerResource::new();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(std::sync::Arc::new(provider_data(url))),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

fn server_config(project_id: &str) -> DynamicValue {
    DynamicValue::new(Dynamic::Map(HashMap::from([
        (
            "project_id".to_string(),
            Dynamic::String(project_id.to_string()),
        ),
        ("name".to_string(), Dynamic::String("web-1".to_string())),
        (
            "machine_type".to_string(),
            Dynamic::String("c1.4".to_string()),
        ),
        (
            "boot_volume".to_string(),
            Dynamic::Map(HashMap::from([
                ("size_gb".to_string(), Dynamic::Number(50.0)),
                (
                    "image_id".to_string(),
                    Dynamic::String("img-ubuntu".to_string()),
                ),
            ])),
        ),
    ])))
}

fn server_body(status: &str) -> String {
    format!(
        r#"{{
            "serverId": "srv-001",
            "name": "web-1",
            "machineType": "c1.4",
            "availabilityZone": "eu01-1",
            "bootVolume": {{"sizeGb": 50, "performanceClass": null, "imageId": "img-ubuntu"}},
            "status": "{}"
        }}"#,
        status
    )
}

#[tokio::test]
async fn create_waits_for_active_and_maps_state() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/iaas/v1/projects/proj-1/servers")
        .with_status(201)
        .with_body(server_body("CREATING"))
        .create_async()
        .await;
    server
        .mock("GET", "/iaas/v1/projects/proj-1/servers/srv-001")
        .with_status(200)
        .with_body(server_body("ACTIVE"))
        .create_async()
        .await;

    let resource = configured_resource(&server.url()).await;
    let config = server_config("proj-1");
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "nimbus_server".to_string(),
                planned_state: config.clone(),
                config,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    assert_eq!(
        response
            .new_state
            .get_string(&AttributePath::new("server_id"))
            .unwrap(),
        "srv-001"
    );
    assert_eq!(
        response
            .new_state
            .get_string(&AttributePath::new("status"))
            .unwrap(),
        "ACTIVE"
    );
}

#[tokio::test]
async fn create_without_boot_volume_reports_diagnostic() {
    let server = mockito::Server::new_async().await;
    let resource = configured_resource(&server.url()).await;

    let config = DynamicValue::new(Dynamic::Map(HashMap::from([
        (
            "project_id".to_string(),
            Dynamic::String("proj-1".to_string()),
        ),
        ("name".to_string(), Dynamic::String("web-1".to_string())),
        (
            "machine_type".to_string(),
            Dynamic::String("c1.4".to_string()),
        ),
    ])));

    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "nimbus_server".to_string(),
                planned_state: config.clone(),
                config,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0]
        .summary
        .contains("Missing boot volume size"));
}

#[tokio::test]
async fn read_gone_server_removes_state() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/iaas/v1/projects/proj-1/servers/srv-001")
        .with_status(404)
        .with_body(r#"{"message": "server not found"}"#)
        .create_async()
        .await;

    let resource = configured_resource(&server.url()).await;
    let mut state = server_config("proj-1");
    state
        .set_string(&AttributePath::new("server_id"), "srv-001".to_string())
        .unwrap();

    let response = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "nimbus_server".to_string(),
                current_state: state,
                private: vec![],
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
                current_identity: None,
            },
        )
        .await;

    assert!(response.new_state.is_none());
    assert!(response.diagnostics.is_empty());
}

#[tokio::test]
async fn update_resize_waits_for_active() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PATCH", "/iaas/v1/projects/proj-1/servers/srv-001")
        .with_status(200)
        .with_body(server_body("RESIZING"))
        .create_async()
        .await;
    server
        .mock("GET", "/iaas/v1/projects/proj-1/servers/srv-001")
        .with_status(200)
        .with_body(server_body("ACTIVE"))
        .create_async()
        .await;

    let resource = configured_resource(&server.url()).await;

    let mut prior = server_config("proj-1");
    prior
        .set_string(&AttributePath::new("server_id"), "srv-001".to_string())
        .unwrap();
    let mut planned = prior.clone();
    planned
        .set_string(&AttributePath::new("machine_type"), "c1.8".to_string())
        .unwrap();
    let config = planned.clone();

    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "nimbus_server".to_string(),
                prior_state: prior,
                planned_state: planned,
                config,
                planned_private: vec![],
                provider_meta: None,
                planned_identity: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    assert_eq!(
        response
            .new_state
            .get_string(&AttributePath::new("status"))
            .unwrap(),
        "ACTIVE"
    );
}

#[tokio::test]
async fn delete_treats_missing_server_as_success() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/iaas/v1/projects/proj-1/servers/srv-001")
        .with_status(404)
        .with_body(r#"{"message": "server not found"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/iaas/v1/projects/proj-1/servers/srv-001")
        .with_status(404)
        .with_body(r#"{"message": "server not found"}"#)
        .create_async()
        .await;

    let resource = configured_resource(&server.url()).await;
    let mut state = server_config("proj-1");
    state
        .set_string(&AttributePath::new("server_id"), "srv-001".to_string())
        .unwrap();

    let response = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "nimbus_server".to_string(),
                prior_state: state,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
}

#[tokio::test]
async fn import_splits_project_and_server_id() {
    let server = mockito::Server::new_async().await;
    let resource = configured_resource(&server.url()).await;

    let response = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "nimbus_server".to_string(),
                id: "proj-1,srv-001".to_string(),
                client_capabilities: ClientCapabilities::default(),
                identity: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    let state = &response.imported_resources[0].state;
    assert_eq!(
        state.get_string(&AttributePath::new("project_id")).unwrap(),
        "proj-1"
    );
    assert_eq!(
        state.get_string(&AttributePath::new("server_id")).unwrap(),
        "srv-001"
    );
}
