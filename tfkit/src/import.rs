//! Import helpers for resource import implementations
//!
//! Most resources import either through a single opaque ID or through a
//! comma-delimited composite ID whose segments map onto attribute paths,
//! e.g. `terraform import nimbus_database_credential.main
//! project_id,instance_id,credential_id`.

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// Sets the import ID as the value of a single attribute in state.
///
/// Example: ID "net-5f2b" with path `network_id` produces a state where
/// `network_id = "net-5f2b"`.
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));

    if let Err(err) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                "Failed to set import ID",
                format!(
                    "Could not set attribute {} to value '{}': {}",
                    attr_path, request.id, err
                ),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
        identity: request.identity.clone(),
    });
}

/// Splits a comma-delimited import ID into one attribute per segment.
///
/// The segment order must match the order of `attr_paths`. A wrong segment
/// count or an empty segment rejects the whole import with a diagnostic
/// that spells out the expected format.
pub fn import_state_composite_id(
    _ctx: &Context,
    attr_paths: &[AttributePath],
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let expected_format = attr_paths
        .iter()
        .map(|path| path.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let parts: Vec<&str> = request.id.split(',').collect();
    if parts.len() != attr_paths.len() {
        response.diagnostics.push(Diagnostic::error(
            "Unexpected import identifier",
            format!(
                "Expected an identifier with format '{}', got '{}'",
                expected_format, request.id
            ),
        ));
        return;
    }
    if parts.iter().any(|part| part.is_empty()) {
        response.diagnostics.push(Diagnostic::error(
            "Unexpected import identifier",
            format!(
                "Identifier '{}' contains an empty segment, expected format '{}'",
                request.id, expected_format
            ),
        ));
        return;
    }

    let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));
    for (attr_path, part) in attr_paths.iter().zip(parts.iter()) {
        if let Err(err) = state.set_string(attr_path, part.to_string()) {
            response.diagnostics.push(
                Diagnostic::error(
                    "Failed to set import ID segment",
                    format!(
                        "Could not set attribute {} to value '{}': {}",
                        attr_path, part, err
                    ),
                )
                .with_attribute(attr_path.clone()),
            );
            return;
        }
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
        identity: request.identity.clone(),
    });
}

/// Copies an attribute from the import identity into state, falling back to
/// plain ID passthrough when Terraform sent no identity.
pub fn import_state_passthrough_with_identity(
    _ctx: &Context,
    state_attr_path: AttributePath,
    identity_attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));

    if let Some(ref identity) = request.identity {
        match identity.identity_data.get_string(&identity_attr_path) {
            Ok(value) => {
                if let Err(err) = state.set_string(&state_attr_path, value) {
                    response.diagnostics.push(
                        Diagnostic::error(
                            "Failed to copy identity value",
                            format!(
                                "Could not copy from identity {} to state {}: {}",
                                identity_attr_path, state_attr_path, err
                            ),
                        )
                        .with_attribute(state_attr_path),
                    );
                    return;
                }
            }
            Err(err) => {
                response.diagnostics.push(
                    Diagnostic::error(
                        "Failed to read identity value",
                        format!(
                            "Could not read attribute {} from identity: {}",
                            identity_attr_path, err
                        ),
                    )
                    .with_attribute(identity_attr_path),
                );
                return;
            }
        }
    } else if let Err(err) = state.set_string(&state_attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                "Failed to set import ID",
                format!(
                    "No identity provided and attribute {} could not be set to '{}': {}",
                    state_attr_path, request.id, err
                ),
            )
            .with_attribute(state_attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
        identity: request.identity.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import_request(type_name: &str, id: &str) -> ImportResourceStateRequest {
        ImportResourceStateRequest {
            type_name: type_name.to_string(),
            id: id.to_string(),
            client_capabilities: crate::types::ClientCapabilities::default(),
            identity: None,
        }
    }

    fn empty_response() -> ImportResourceStateResponse {
        ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        }
    }

    #[test]
    fn passthrough_sets_single_attribute() {
        let ctx = Context::new();
        let request = import_request("nimbus_network", "net-5f2b");
        let mut response = empty_response();

        import_state_passthrough_id(
            &ctx,
            AttributePath::new("network_id"),
            &request,
            &mut response,
        );

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("network_id")).unwrap(),
            "net-5f2b"
        );
    }

    #[test]
    fn composite_id_splits_into_attributes() {
        let ctx = Context::new();
        let request = import_request(
            "nimbus_database_credential",
            "proj-1234,inst-5678,cred-9abc",
        );
        let mut response = empty_response();

        import_state_composite_id(
            &ctx,
            &[
                AttributePath::new("project_id"),
                AttributePath::new("instance_id"),
                AttributePath::new("credential_id"),
            ],
            &request,
            &mut response,
        );

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("project_id")).unwrap(),
            "proj-1234"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("instance_id")).unwrap(),
            "inst-5678"
        );
        assert_eq!(
            state
                .get_string(&AttributePath::new("credential_id"))
                .unwrap(),
            "cred-9abc"
        );
    }

    #[test]
    fn composite_id_rejects_wrong_segment_count() {
        let ctx = Context::new();
        let request = import_request("nimbus_database_credential", "proj-1234,inst-5678");
        let mut response = empty_response();

        import_state_composite_id(
            &ctx,
            &[
                AttributePath::new("project_id"),
                AttributePath::new("instance_id"),
                AttributePath::new("credential_id"),
            ],
            &request,
            &mut response,
        );

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .detail
            .contains("project_id,instance_id,credential_id"));
    }

    #[test]
    fn composite_id_rejects_empty_segment() {
        let ctx = Context::new();
        let request = import_request("nimbus_database_credential", "proj-1234,,cred-9abc");
        let mut response = empty_response();

        import_state_composite_id(
            &ctx,
            &[
                AttributePath::new("project_id"),
                AttributePath::new("instance_id"),
                AttributePath::new("credential_id"),
            ],
            &request,
            &mut response,
        );

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("empty segment"));
    }

    #[test]
    fn identity_passthrough_falls_back_to_id() {
        let ctx = Context::new();
        let request = import_request("nimbus_network", "net-5f2b");
        let mut response = empty_response();

        import_state_passthrough_with_identity(
            &ctx,
            AttributePath::new("network_id"),
            AttributePath::new("id"),
            &request,
            &mut response,
        );

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("network_id")).unwrap(),
            "net-5f2b"
        );
    }
}
