//! Schema modeling for providers, resources and data sources
//!
//! A schema declares the shape Terraform enforces on configuration: the
//! attribute types, which attributes are required/optional/computed, and
//! the validators, plan modifiers and defaults attached to each attribute.
//! Build schemas with [`SchemaBuilder`] and [`AttributeBuilder`].

use crate::types::{AttributePath, Diagnostic, DynamicValue};
use std::collections::HashMap;

/// Terraform's attribute type system.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    /// Always f64 on the Rust side
    Number,
    Bool,
    /// Ordered, allows duplicates
    List(Box<AttributeType>),
    /// Unordered, no duplicates
    Set(Box<AttributeType>),
    /// String keys only
    Map(Box<AttributeType>),
    /// Fixed set of named fields
    Object(HashMap<String, AttributeType>),
}

/// Schema for a provider, resource or data source.
///
/// The version participates in state upgrades: bump it when a change to
/// the block requires migrating stored state.
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

/// A configuration block: attributes plus nested blocks.
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

/// A single attribute in a block.
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Box<dyn Validator>>,
    pub plan_modifiers: Vec<Box<dyn PlanModifier>>,
    pub default: Option<Box<dyn Default>>,
    pub nested_type: Option<NestedType>,
    pub deprecated: bool,
}

// Validators, plan modifiers and defaults are trait objects without Debug,
// so summarize them by count.
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("validators", &self.validators.len())
            .field("plan_modifiers", &self.plan_modifiers.len())
            .field("default", &self.default.is_some())
            .field("nested_type", &self.nested_type)
            .field("deprecated", &self.deprecated)
            .finish()
    }
}

// Clone carries the declarative parts only; attached behaviors are not
// clonable and a cloned attribute starts without them.
impl Clone for Attribute {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            r#type: self.r#type.clone(),
            description: self.description.clone(),
            required: self.required,
            optional: self.optional,
            computed: self.computed,
            sensitive: self.sensitive,
            validators: Vec::new(),
            plan_modifiers: Vec::new(),
            default: None,
            nested_type: self.nested_type.clone(),
            deprecated: self.deprecated,
        }
    }
}

/// A nested configuration block.
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
    Group,
}

/// Nested attribute structure for object-typed attributes.
#[derive(Debug, Clone)]
pub struct NestedType {
    pub attributes: Vec<Attribute>,
    pub nesting: ObjectNestingMode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectNestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
}

/// Format of description strings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// Validates one attribute's configured value.
///
/// Attached to attributes via [`AttributeBuilder::validator`]; run during
/// config validation before any API call is made.
pub trait Validator: Send + Sync {
    fn description(&self) -> String;
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

pub struct ValidatorRequest {
    pub config_value: DynamicValue,
    pub path: AttributePath,
}

pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Adjusts one attribute's planned value.
///
/// The stock modifiers cover the common cases: keeping known state for
/// computed attributes and forcing replacement on immutable ones.
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

pub struct PlanModifierRequest {
    pub config_value: DynamicValue,
    pub state_value: DynamicValue,
    pub plan_value: DynamicValue,
    pub path: AttributePath,
}

pub struct PlanModifierResponse {
    pub plan_value: DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Supplies a value for an optional attribute absent from configuration.
pub trait Default: Send + Sync {
    fn description(&self) -> String;
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

pub struct DefaultRequest {
    pub path: AttributePath,
}

pub struct DefaultResponse {
    pub value: DynamicValue,
}

/// Fluent builder for [`Attribute`].
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                nested_type: None,
                deprecated: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    /// Required and optional are mutually exclusive; setting one clears
    /// the other.
    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    pub fn default(mut self, default: Box<dyn Default>) -> Self {
        self.attribute.default = Some(default);
        self
    }

    pub fn nested_type(mut self, nested: NestedType) -> Self {
        self.attribute.nested_type = Some(nested);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// Fluent builder for [`Schema`].
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    version: 0,
                    attributes: Vec::new(),
                    block_types: Vec::new(),
                    description: String::new(),
                    description_kind: StringKind::Plain,
                    deprecated: false,
                },
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_clears_optional() {
        let attr = AttributeBuilder::new("project_id", AttributeType::String)
            .optional()
            .required()
            .build();

        assert!(attr.required);
        assert!(!attr.optional);
    }

    #[test]
    fn schema_collects_attributes_in_order() {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Network resource")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("nameservers", AttributeType::List(Box::new(AttributeType::String)))
                    .optional()
                    .build(),
            )
            .build();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.block.version, 1);
        let names: Vec<&str> = schema
            .block
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "name", "nameservers"]);
    }

    #[test]
    fn object_attribute_keeps_field_types() {
        let object_type = AttributeType::Object(HashMap::from([
            ("size_gb".to_string(), AttributeType::Number),
            ("performance_class".to_string(), AttributeType::String),
        ]));

        let attr = AttributeBuilder::new("boot_volume", object_type)
            .required()
            .build();

        match &attr.r#type {
            AttributeType::Object(fields) => {
                assert!(matches!(fields.get("size_gb"), Some(AttributeType::Number)));
                assert!(matches!(
                    fields.get("performance_class"),
                    Some(AttributeType::String)
                ));
            }
            other => panic!("expected object type, got {:?}", other),
        }
    }

    #[test]
    fn cloned_attribute_drops_attached_behaviors() {
        struct AlwaysOk;
        impl Validator for AlwaysOk {
            fn description(&self) -> String {
                "always ok".to_string()
            }
            fn validate(&self, _request: ValidatorRequest) -> ValidatorResponse {
                ValidatorResponse {
                    diagnostics: vec![],
                }
            }
        }

        let attr = AttributeBuilder::new("name", AttributeType::String)
            .validator(Box::new(AlwaysOk))
            .build();
        assert_eq!(attr.validators.len(), 1);

        let cloned = attr.clone();
        assert!(cloned.validators.is_empty());
    }
}
