//! Renders tool signatures for the structured-choice prompt.

use schemars::JsonSchema;
use schemars::schema::{InstanceType, Schema, SingleOrVec};

use crate::tool::{ParamSpec, ParamType, ToolRegistry};

/// Derives an ordered parameter list from a typed argument struct.
///
/// Property order follows field order. A field is `has_default` when the
/// schema does not list it as required (`#[serde(default)]` or `Option`).
pub fn params_from_schema<T: JsonSchema>() -> Vec<ParamSpec> {
    let root = schemars::schema_for!(T);
    let Some(object) = root.schema.object.as_ref() else {
        return Vec::new();
    };

    object
        .properties
        .iter()
        .map(|(name, schema)| ParamSpec {
            name: name.clone(),
            param_type: param_type_of(schema),
            has_default: !object.required.contains(name),
        })
        .collect()
}

fn param_type_of(schema: &Schema) -> Option<ParamType> {
    let Schema::Object(object) = schema else {
        return None;
    };

    let instance = match object.instance_type.as_ref()? {
        SingleOrVec::Single(single) => **single,
        SingleOrVec::Vec(types) => *types.iter().find(|t| **t != InstanceType::Null)?,
    };

    match instance {
        InstanceType::String => Some(ParamType::String),
        InstanceType::Integer => Some(ParamType::Integer),
        InstanceType::Number => Some(ParamType::Number),
        InstanceType::Boolean => Some(ParamType::Boolean),
        InstanceType::Array => Some(ParamType::Array),
        InstanceType::Object => Some(ParamType::Object),
        InstanceType::Null => None,
    }
}

/// Renders `name(param1: type1, param2: type2)`.
pub fn render_signature(name: &str, params: &[ParamSpec]) -> String {
    let params = params
        .iter()
        .map(|p| format!("{}: {}", p.name, p.type_name()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({})", name, params)
}

/// Renders one signature line per registered tool, in registration order.
pub fn render_signatures(registry: &ToolRegistry) -> String {
    registry
        .iter()
        .map(|(name, tool)| render_signature(name, &tool.parameters()))
        .collect::<Vec<_>>()
        .join("\n")
}
