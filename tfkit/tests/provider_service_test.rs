//! Service-level tests: a small provider driven through the tfplugin6
//! handler the way Terraform would drive it, exercising schema conversion,
//! validation, planning with defaults and modifiers, the apply routing and
//! composite-ID import.

use async_trait::async_trait;
use std::sync::Arc;
use tfkit::context::Context;
use tfkit::data_source::*;
use tfkit::defaults::StaticDefault;
use tfkit::grpc::ProviderHandler;
use tfkit::import::import_state_composite_id;
use tfkit::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfkit::proto::{self, ProviderService};
use tfkit::provider::*;
use tfkit::resource::*;
use tfkit::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfkit::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfkit::validator::StringLengthValidator;
use tfkit::{Result, TfkitError};
use tonic::Request;

struct AcmeApi;

struct AcmeProvider;

#[async_trait]
impl Provider for AcmeProvider {
    fn type_name(&self) -> &str {
        "acme"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "acme".to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("endpoint", AttributeType::String)
                        .optional()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(AcmeApi)),
        }
    }

    fn create_resource(&self, type_name: &str) -> Result<Box<dyn ResourceWithConfigure>> {
        match type_name {
            "acme_widget" => Ok(Box::new(WidgetResource::default())),
            _ => Err(TfkitError::ResourceNotFound(type_name.to_string())),
        }
    }

    fn create_data_source(&self, type_name: &str) -> Result<Box<dyn DataSourceWithConfigure>> {
        Err(TfkitError::DataSourceNotFound(type_name.to_string()))
    }

    fn resource_types(&self) -> Vec<String> {
        vec!["acme_widget".to_string()]
    }

    fn data_source_types(&self) -> Vec<String> {
        vec![]
    }
}

#[derive(Default)]
struct WidgetResource {
    api: Option<Arc<AcmeApi>>,
}

#[async_trait]
impl Resource for WidgetResource {
    fn type_name(&self) -> &str {
        "acme_widget"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .plan_modifier(UseStateForUnknown::create())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("project_id", AttributeType::String)
                        .required()
                        .plan_modifier(RequiresReplace::create())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("name", AttributeType::String)
                        .required()
                        .validator(StringLengthValidator::between(3, 40))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("tier", AttributeType::String)
                        .optional()
                        .computed()
                        .default(StaticDefault::string("standard"))
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        if self.api.is_none() {
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Provider not configured",
                    "widget created before provider configure",
                )],
            };
        }

        let mut state = request.planned_state;
        state
            .set_string(&AttributePath::new("id"), "wgt-100".to_string())
            .ok();
        CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        ReadResourceResponse {
            new_state: Some(request.current_state),
            diagnostics: vec![],
            private: request.private,
            deferred: None,
            new_identity: None,
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
            new_identity: None,
        }
    }

    async fn delete(&self, _ctx: Context, _request: DeleteResourceRequest) -> DeleteResourceResponse {
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }

    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };
        import_state_composite_id(
            &ctx,
            &[AttributePath::new("project_id"), AttributePath::new("id")],
            &request,
            &mut response,
        );
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for WidgetResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        if let Some(data) = request.provider_data {
            if let Ok(api) = data.downcast::<AcmeApi>() {
                self.api = Some(api);
            }
        }
        ConfigureResourceResponse {
            diagnostics: vec![],
        }
    }
}

fn wire(value: Dynamic) -> Option<proto::DynamicValue> {
    Some(proto::DynamicValue {
        msgpack: DynamicValue::new(value).encode_msgpack().unwrap(),
        json: vec![],
    })
}

fn wire_map(entries: &[(&str, Dynamic)]) -> Option<proto::DynamicValue> {
    wire(Dynamic::Map(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    ))
}

fn decode(value: &Option<proto::DynamicValue>) -> DynamicValue {
    let value = value.as_ref().unwrap();
    DynamicValue::decode_msgpack(&value.msgpack).unwrap()
}

async fn configured() -> ProviderHandler<AcmeProvider> {
    let handler = ProviderHandler::new(AcmeProvider);
    handler
        .configure_provider(Request::new(proto::configure_provider::Request {
            terraform_version: "1.11.0".to_string(),
            config: wire_map(&[]),
            client_capabilities: None,
        }))
        .await
        .unwrap();
    handler
}

#[tokio::test]
async fn schema_round_trips_attribute_flags() {
    let handler = ProviderHandler::new(AcmeProvider);
    let response = handler
        .get_provider_schema(Request::new(proto::get_provider_schema::Request {}))
        .await
        .unwrap()
        .into_inner();

    let widget = &response.resource_schemas["acme_widget"];
    let attrs = &widget.block.as_ref().unwrap().attributes;

    let id = attrs.iter().find(|a| a.name == "id").unwrap();
    assert!(id.computed);
    assert!(!id.required);
    assert_eq!(id.r#type, b"\"string\"");

    let name = attrs.iter().find(|a| a.name == "name").unwrap();
    assert!(name.required);
}

#[tokio::test]
async fn plan_applies_default_and_marks_id_unknown() {
    let handler = configured().await;
    let response = handler
        .plan_resource_change(Request::new(proto::plan_resource_change::Request {
            type_name: "acme_widget".to_string(),
            prior_state: wire(Dynamic::Null),
            proposed_new_state: wire_map(&[
                ("project_id", Dynamic::String("proj-1".to_string())),
                ("name", Dynamic::String("conveyor".to_string())),
            ]),
            config: wire_map(&[
                ("project_id", Dynamic::String("proj-1".to_string())),
                ("name", Dynamic::String("conveyor".to_string())),
            ]),
            prior_private: vec![],
            provider_meta: None,
            client_capabilities: None,
            prior_identity: None,
        }))
        .await
        .unwrap()
        .into_inner();

    let planned = decode(&response.planned_state);
    assert_eq!(
        planned.get_string(&AttributePath::new("tier")).unwrap(),
        "standard"
    );
    assert!(matches!(
        planned.value,
        Dynamic::Map(ref m) if m["id"] == Dynamic::Unknown
    ));
}

#[tokio::test]
async fn plan_flags_project_change_as_replacement() {
    let handler = configured().await;
    let response = handler
        .plan_resource_change(Request::new(proto::plan_resource_change::Request {
            type_name: "acme_widget".to_string(),
            prior_state: wire_map(&[
                ("id", Dynamic::String("wgt-100".to_string())),
                ("project_id", Dynamic::String("proj-1".to_string())),
                ("name", Dynamic::String("conveyor".to_string())),
                ("tier", Dynamic::String("standard".to_string())),
            ]),
            proposed_new_state: wire_map(&[
                ("id", Dynamic::String("wgt-100".to_string())),
                ("project_id", Dynamic::String("proj-2".to_string())),
                ("name", Dynamic::String("conveyor".to_string())),
                ("tier", Dynamic::String("standard".to_string())),
            ]),
            config: wire_map(&[
                ("project_id", Dynamic::String("proj-2".to_string())),
                ("name", Dynamic::String("conveyor".to_string())),
            ]),
            prior_private: vec![],
            provider_meta: None,
            client_capabilities: None,
            prior_identity: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.requires_replace.len(), 1);
    assert_eq!(
        response.requires_replace[0].steps[0].selector,
        Some(proto::attribute_path::step::Selector::AttributeName(
            "project_id".to_string()
        ))
    );
}

#[tokio::test]
async fn full_lifecycle_create_read_update_delete() {
    let handler = configured().await;

    let created = handler
        .apply_resource_change(Request::new(proto::apply_resource_change::Request {
            type_name: "acme_widget".to_string(),
            prior_state: wire(Dynamic::Null),
            planned_state: wire_map(&[
                ("id", Dynamic::Unknown),
                ("project_id", Dynamic::String("proj-1".to_string())),
                ("name", Dynamic::String("conveyor".to_string())),
                ("tier", Dynamic::String("standard".to_string())),
            ]),
            config: wire_map(&[
                ("project_id", Dynamic::String("proj-1".to_string())),
                ("name", Dynamic::String("conveyor".to_string())),
            ]),
            planned_private: vec![],
            provider_meta: None,
            planned_identity: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(created.diagnostics.is_empty());
    let state = decode(&created.new_state);
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "wgt-100");

    let read = handler
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "acme_widget".to_string(),
            current_state: created.new_state.clone(),
            private: vec![],
            provider_meta: None,
            client_capabilities: None,
            current_identity: None,
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(read.new_state.is_some());

    let updated = handler
        .apply_resource_change(Request::new(proto::apply_resource_change::Request {
            type_name: "acme_widget".to_string(),
            prior_state: created.new_state.clone(),
            planned_state: wire_map(&[
                ("id", Dynamic::String("wgt-100".to_string())),
                ("project_id", Dynamic::String("proj-1".to_string())),
                ("name", Dynamic::String("conveyor-2".to_string())),
                ("tier", Dynamic::String("standard".to_string())),
            ]),
            config: wire_map(&[
                ("project_id", Dynamic::String("proj-1".to_string())),
                ("name", Dynamic::String("conveyor-2".to_string())),
            ]),
            planned_private: vec![],
            provider_meta: None,
            planned_identity: None,
        }))
        .await
        .unwrap()
        .into_inner();
    let updated_state = decode(&updated.new_state);
    assert_eq!(
        updated_state.get_string(&AttributePath::new("name")).unwrap(),
        "conveyor-2"
    );

    let deleted = handler
        .apply_resource_change(Request::new(proto::apply_resource_change::Request {
            type_name: "acme_widget".to_string(),
            prior_state: updated.new_state.clone(),
            planned_state: wire(Dynamic::Null),
            config: wire(Dynamic::Null),
            planned_private: vec![],
            provider_meta: None,
            planned_identity: None,
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(deleted.diagnostics.is_empty());
    assert!(deleted.new_state.is_none());
}

#[tokio::test]
async fn composite_import_splits_segments_into_state() {
    let handler = configured().await;
    let response = handler
        .import_resource_state(Request::new(proto::import_resource_state::Request {
            type_name: "acme_widget".to_string(),
            id: "proj-1,wgt-100".to_string(),
            client_capabilities: None,
            identity: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(response.diagnostics.is_empty());
    assert_eq!(response.imported_resources.len(), 1);
    let state = decode(&response.imported_resources[0].state);
    assert_eq!(
        state.get_string(&AttributePath::new("project_id")).unwrap(),
        "proj-1"
    );
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "wgt-100");
}

#[tokio::test]
async fn composite_import_rejects_malformed_id() {
    let handler = configured().await;
    let response = handler
        .import_resource_state(Request::new(proto::import_resource_state::Request {
            type_name: "acme_widget".to_string(),
            id: "only-one-segment".to_string(),
            client_capabilities: None,
            identity: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(response.imported_resources.is_empty());
    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].detail.contains("project_id,id"));
}

#[tokio::test]
async fn validate_runs_schema_validators() {
    let handler = configured().await;
    let response = handler
        .validate_resource_config(Request::new(proto::validate_resource_config::Request {
            type_name: "acme_widget".to_string(),
            config: wire_map(&[
                ("project_id", Dynamic::String("proj-1".to_string())),
                ("name", Dynamic::String("ab".to_string())),
            ]),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].summary.contains("minimum length"));
}
