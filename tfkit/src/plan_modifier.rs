//! Stock plan modifiers
//!
//! Plan modifiers run per attribute while a resource change is planned.
//! They can adjust the planned value or flag the attribute as forcing
//! replacement of the whole resource.

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::{Diagnostic, Dynamic};

/// Forces resource replacement when the attribute's value changes.
///
/// Creation and destruction are not affected: the modifier only reacts when
/// both the prior and planned values are known and differ.
pub struct RequiresReplace;

impl RequiresReplace {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this attribute requires replacing the resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let state = &request.state_value.value;
        let plan = &request.plan_value.value;

        let requires_replace = !matches!(
            (state, plan),
            (Dynamic::Null, Dynamic::Null) | (Dynamic::Unknown, _) | (_, Dynamic::Unknown)
        ) && state != plan;

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// Carries the prior state value forward when the planned value is unknown.
///
/// Computed attributes such as server IDs or creation timestamps do not
/// change on update; without this modifier Terraform would show them as
/// "(known after apply)" on every plan.
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "keeps the prior state value when the planned value is unknown".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = match &request.plan_value.value {
            // Unknown may arrive decoded as Null for computed attributes.
            Dynamic::Unknown | Dynamic::Null => match &request.state_value.value {
                Dynamic::Null => request.plan_value,
                _ => request.state_value.clone(),
            },
            _ => request.plan_value,
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

/// Forces replacement when a caller-supplied predicate holds.
pub struct RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    predicate: F,
    description: String,
}

impl<F> RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync + 'static,
{
    pub fn create(predicate: F, description: impl Into<String>) -> Box<dyn PlanModifier> {
        Box::new(Self {
            predicate,
            description: description.into(),
        })
    }
}

impl<F> PlanModifier for RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    fn description(&self) -> String {
        format!("requires replacement if {}", self.description)
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = (self.predicate)(&request);
        let mut diagnostics = vec![];

        if requires_replace {
            diagnostics.push(
                Diagnostic::warning(
                    format!("Attribute {} requires resource replacement", request.path),
                    self.description.clone(),
                )
                .with_attribute(request.path.clone()),
            );
        }

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn request_for(state: Dynamic, plan: Dynamic, attribute: &str) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::new(plan.clone()),
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new(attribute),
        }
    }

    #[test]
    fn requires_replace_not_triggered_by_same_value() {
        let modifier = RequiresReplace::create();
        let response = modifier.modify(request_for(
            Dynamic::String("eu-central-1a".to_string()),
            Dynamic::String("eu-central-1a".to_string()),
            "availability_zone",
        ));

        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn requires_replace_triggered_by_changed_value() {
        let modifier = RequiresReplace::create();
        let response = modifier.modify(request_for(
            Dynamic::String("eu-central-1a".to_string()),
            Dynamic::String("eu-central-1b".to_string()),
            "availability_zone",
        ));

        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_creation() {
        let modifier = RequiresReplace::create();
        let response = modifier.modify(request_for(
            Dynamic::Null,
            Dynamic::Null,
            "availability_zone",
        ));

        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_unknown_values() {
        let modifier = RequiresReplace::create();

        let response = modifier.modify(request_for(
            Dynamic::Unknown,
            Dynamic::String("eu-central-1a".to_string()),
            "availability_zone",
        ));
        assert!(!response.requires_replace);

        let response = modifier.modify(request_for(
            Dynamic::String("eu-central-1a".to_string()),
            Dynamic::Unknown,
            "availability_zone",
        ));
        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_triggers_on_value_to_null() {
        let modifier = RequiresReplace::create();
        let response = modifier.modify(request_for(
            Dynamic::String("cloud-init config".to_string()),
            Dynamic::Null,
            "user_data",
        ));

        assert!(response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_preserves_state() {
        let modifier = UseStateForUnknown::create();
        let response = modifier.modify(request_for(
            Dynamic::String("srv-0f3e2a".to_string()),
            Dynamic::Unknown,
            "server_id",
        ));

        assert_eq!(
            response.plan_value.value,
            Dynamic::String("srv-0f3e2a".to_string())
        );
        assert!(!response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_keeps_known_plan_value() {
        let modifier = UseStateForUnknown::create();
        let response = modifier.modify(request_for(
            Dynamic::String("old".to_string()),
            Dynamic::String("new".to_string()),
            "machine_type",
        ));

        assert_eq!(response.plan_value.value, Dynamic::String("new".to_string()));
    }

    #[test]
    fn use_state_for_unknown_leaves_unknown_without_state() {
        let modifier = UseStateForUnknown::create();
        let response = modifier.modify(request_for(Dynamic::Null, Dynamic::Unknown, "server_id"));

        assert_eq!(response.plan_value.value, Dynamic::Unknown);
    }

    #[test]
    fn requires_replace_if_triggers_on_predicate() {
        // Volumes can grow in place but shrinking means a new disk.
        let modifier = RequiresReplaceIf::create(
            |req| {
                matches!(
                    (&req.state_value.value, &req.plan_value.value),
                    (Dynamic::Number(old), Dynamic::Number(new)) if new < old
                )
            },
            "volume size cannot shrink in place",
        );

        let response = modifier.modify(request_for(
            Dynamic::Number(100.0),
            Dynamic::Number(50.0),
            "boot_volume.size",
        ));
        assert!(response.requires_replace);
        assert_eq!(response.diagnostics.len(), 1);

        let response = modifier.modify(request_for(
            Dynamic::Number(50.0),
            Dynamic::Number(100.0),
            "boot_volume.size",
        ));
        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn custom_plan_modifier_can_rewrite_plan_value() {
        struct NormalizeCidr;

        impl PlanModifier for NormalizeCidr {
            fn description(&self) -> String {
                "normalizes a bare IP to /32 CIDR notation".to_string()
            }

            fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
                let plan_value = match &request.plan_value.value {
                    Dynamic::String(s) if !s.contains('/') => {
                        DynamicValue::new(Dynamic::String(format!("{}/32", s)))
                    }
                    _ => request.plan_value,
                };

                PlanModifierResponse {
                    plan_value,
                    requires_replace: false,
                    diagnostics: vec![],
                }
            }
        }

        let modifier = NormalizeCidr;
        let response = modifier.modify(request_for(
            Dynamic::Null,
            Dynamic::String("192.168.0.1".to_string()),
            "acl",
        ));

        assert_eq!(
            response.plan_value.value,
            Dynamic::String("192.168.0.1/32".to_string())
        );
    }
}
