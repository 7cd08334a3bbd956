use std::sync::Arc;

use futures::stream::BoxStream;
use graphql_parser::Pos;
use serde_json::{Map, Value};

use crate::context::OperationKind;
use crate::error::ResolverError;
use crate::path::Path;
use crate::resolved::{Resolved, ResolvedValue};
use crate::schema::{Schema, TypeDefinition, TypeRef};
use crate::TYPENAME_FIELD;

/// Per-field resolver. Receives the parent value, the coerced argument map
/// and the field metadata; the return value may be settled, an error, a list
/// of per-item outcomes or a future.
pub type FieldResolverFn =
    Arc<dyn Fn(&Value, &Map<String, Value>, &ResolveInfo) -> ResolvedValue + Send + Sync>;

/// Subscription root resolver producing the source event stream.
pub type SubscribeFn = Arc<
    dyn Fn(
            &Value,
            &Map<String, Value>,
            &ResolveInfo,
        ) -> Resolved<Result<SourceEventStream, ResolverError>>
        + Send
        + Sync,
>;

/// Resolves the concrete object type name for a value of an abstract type.
/// The third argument is the abstract type's name.
pub type TypeResolverFn = Arc<
    dyn Fn(&Value, &ResolveInfo, &str) -> Resolved<Result<Option<String>, ResolverError>>
        + Send
        + Sync,
>;

pub type SourceEventStream = BoxStream<'static, Result<Value, ResolverError>>;

/// Everything a resolver may want to know about the field it is resolving
/// and the operation around it. Shared per field invocation.
pub struct ResolveInfo {
    pub field_name: String,
    pub parent_type: String,
    pub return_type: TypeRef,
    pub path: Arc<Path>,
    pub positions: Vec<Pos>,
    pub schema: Arc<Schema>,
    pub operation: OperationKind,
    pub variable_values: Arc<Map<String, Value>>,
    pub root_value: Arc<Value>,
    pub context_value: Arc<Value>,
}

/// Property lookup on the parent value; the fallback when a field carries no
/// resolver of its own.
pub fn default_field_resolver(
    source: &Value,
    _arguments: &Map<String, Value>,
    info: &ResolveInfo,
) -> ResolvedValue {
    match source {
        Value::Object(object) => ResolvedValue::Ready(
            object.get(&info.field_name).cloned().unwrap_or(Value::Null),
        ),
        _ => ResolvedValue::null(),
    }
}

/// Reads a `__typename` property off the value, then probes the `is_type_of`
/// predicates of the abstract type's possible object types in declaration
/// order.
pub fn default_type_resolver(
    value: &Value,
    info: &ResolveInfo,
    abstract_type: &str,
) -> Resolved<Result<Option<String>, ResolverError>> {
    if let Value::Object(object) = value {
        if let Some(Value::String(type_name)) = object.get(TYPENAME_FIELD) {
            return Resolved::Ready(Ok(Some(type_name.clone())));
        }
    }

    if let Some(members) = info.schema.possible_types(abstract_type) {
        for member in members {
            if let Some(TypeDefinition::Object(object)) = info.schema.get_type(member) {
                if let Some(is_type_of) = &object.is_type_of {
                    if is_type_of(value) {
                        return Resolved::Ready(Ok(Some(member.clone())));
                    }
                }
            }
        }
    }

    Resolved::Ready(Ok(None))
}

/// Rejects subscription roots that have no subscriber attached.
pub fn default_subscribe_resolver(
    source: &Value,
    _arguments: &Map<String, Value>,
    _info: &ResolveInfo,
) -> Resolved<Result<SourceEventStream, ResolverError>> {
    Resolved::Ready(Err(ResolverError::new(format!(
        "Subscription field must return an event stream. Received: {}.",
        source
    ))))
}
