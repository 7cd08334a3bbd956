use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::collect::{collect_fields, collect_subfields, FieldGroup};
use crate::context::{ExecutionArgs, ExecutionContext, OperationKind};
use crate::error::GraphQLError;
use crate::path::Path;
use crate::resolved::{Resolved, ResolvedValue};
use crate::resolver::ResolveInfo;
use crate::schema::types::serialize_builtin_scalar;
use crate::schema::{TypeDefinition, TypeRef};
use crate::values::get_argument_values;
use crate::TYPENAME_FIELD;

/// The response of one operation execution: `data` plus any field errors.
/// `data` is absent entirely when execution never started.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQLError>>,
}

impl ExecutionResult {
    pub fn new(data: Option<Value>, errors: Vec<GraphQLError>) -> ExecutionResult {
        ExecutionResult {
            data,
            errors: if errors.is_empty() { None } else { Some(errors) },
        }
    }

    pub fn from_errors(errors: Vec<GraphQLError>) -> ExecutionResult {
        ExecutionResult {
            data: None,
            errors: Some(errors),
        }
    }
}

/// Marker for a position whose value was discarded after an error. The error
/// itself is recorded exactly once, at the point of detection; this marker
/// only carries the nulling upward until a nullable position absorbs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nullified;

pub(crate) type CompletedValue = Result<Value, Nullified>;

/// Executes a query or mutation operation against the schema. The result is
/// `Ready` whenever every resolver on the path settled synchronously.
#[tracing::instrument(level = "trace", skip_all)]
pub fn execute(args: ExecutionArgs<'_>) -> Resolved<ExecutionResult> {
    let ctx = match ExecutionContext::build(args) {
        Ok(ctx) => Arc::new(ctx),
        Err(errors) => return Resolved::Ready(ExecutionResult::from_errors(errors)),
    };
    execute_operation(ctx.clone()).map(move |completed| {
        let data = match completed {
            Ok(value) => value,
            Err(Nullified) => Value::Null,
        };
        ExecutionResult::new(Some(data), ctx.take_errors())
    })
}

#[tracing::instrument(level = "trace", skip_all, fields(operation = %ctx.operation.kind))]
pub(crate) fn execute_operation(ctx: Arc<ExecutionContext>) -> Resolved<CompletedValue> {
    let groups = collect_fields(
        &ctx.schema,
        &ctx.fragments,
        &ctx.variable_values,
        &ctx.root_type_name,
        &ctx.operation.selection_set,
    );
    let root_type = ctx.root_type_name.clone();
    let root_value = ctx.root_value.clone();
    match ctx.operation.kind {
        OperationKind::Mutation => execute_fields_serially(ctx, root_type, root_value, groups),
        _ => execute_fields(ctx, root_type, root_value, None, groups),
    }
}

/// Executes a grouped field set breadth-first: every resolver is invoked
/// before any completion is awaited, so independent async fields run
/// concurrently while response-map order stays the collection order.
pub(crate) fn execute_fields(
    ctx: Arc<ExecutionContext>,
    object_type: String,
    source: Arc<Value>,
    path: Option<Arc<Path>>,
    groups: Vec<Arc<FieldGroup>>,
) -> Resolved<CompletedValue> {
    let mut keys = Vec::with_capacity(groups.len());
    let mut completions = Vec::with_capacity(groups.len());
    for group in groups {
        if let Some(completion) =
            execute_field(&ctx, &object_type, &source, path.as_ref(), &group)
        {
            keys.push(group.response_key.clone());
            completions.push(completion);
        }
    }
    Resolved::all(completions).map(move |completed| {
        let mut map = Map::new();
        for (key, item) in keys.into_iter().zip(completed) {
            map.insert(key, item?);
        }
        Ok(Value::Object(map))
    })
}

/// Mutation roots run strictly one after another; a later resolver is not
/// invoked until the previous field has fully completed. The synchronous
/// prefix is executed without a scheduler hop.
fn execute_fields_serially(
    ctx: Arc<ExecutionContext>,
    object_type: String,
    source: Arc<Value>,
    groups: Vec<Arc<FieldGroup>>,
) -> Resolved<CompletedValue> {
    let mut map = Map::new();
    let mut remaining = groups.into_iter();

    while let Some(group) = remaining.next() {
        let Some(completion) = execute_field(&ctx, &object_type, &source, None, &group) else {
            continue;
        };
        match completion {
            Resolved::Ready(Ok(value)) => {
                map.insert(group.response_key.clone(), value);
            }
            Resolved::Ready(Err(Nullified)) => return Resolved::Ready(Err(Nullified)),
            Resolved::Pending(future) => {
                let key = group.response_key.clone();
                let rest: Vec<_> = remaining.collect();
                return Resolved::Pending(Box::pin(async move {
                    map.insert(key, future.await?);
                    for group in rest {
                        let Some(completion) =
                            execute_field(&ctx, &object_type, &source, None, &group)
                        else {
                            continue;
                        };
                        map.insert(group.response_key.clone(), completion.finish().await?);
                    }
                    Ok(Value::Object(map))
                }));
            }
        }
    }

    Resolved::Ready(Ok(Value::Object(map)))
}

/// Resolves and completes one grouped field. Returns `None` when the field
/// is not defined on the parent type, which omits the entry from the
/// response map.
pub(crate) fn execute_field(
    ctx: &Arc<ExecutionContext>,
    parent_type: &str,
    source: &Arc<Value>,
    parent_path: Option<&Arc<Path>>,
    group: &Arc<FieldGroup>,
) -> Option<Resolved<CompletedValue>> {
    let field_name = group.field_name();
    if field_name == TYPENAME_FIELD {
        return Some(Resolved::Ready(Ok(Value::String(parent_type.to_string()))));
    }

    let field_def = ctx.schema.get_field(parent_type, field_name)?;
    let path = Path::key(parent_path, &group.response_key, parent_type);
    let positions: Vec<_> = group.fields.iter().map(|field| field.position).collect();

    let arguments = match get_argument_values(
        &ctx.schema,
        field_def,
        &group.fields[0],
        &ctx.variable_values,
    ) {
        Ok(arguments) => arguments,
        Err(mut error) => {
            error.path = Some(path.as_list());
            ctx.add_error(error);
            return Some(catch_nullable(
                &field_def.field_type,
                Resolved::Ready(Err(Nullified)),
            ));
        }
    };

    let info = Arc::new(ResolveInfo {
        field_name: field_def.name.clone(),
        parent_type: parent_type.to_string(),
        return_type: field_def.field_type.clone(),
        path: path.clone(),
        positions,
        schema: ctx.schema.clone(),
        operation: ctx.operation.kind,
        variable_values: ctx.variable_values.clone(),
        root_value: ctx.root_value.clone(),
        context_value: ctx.context_value.clone(),
    });

    let resolver = field_def
        .resolver
        .clone()
        .unwrap_or_else(|| ctx.field_resolver.clone());
    let resolved = resolver(source, &arguments, &info);

    let completion = complete_value(
        ctx.clone(),
        field_def.field_type.clone(),
        group.clone(),
        info,
        path,
        resolved,
    );
    Some(catch_nullable(&field_def.field_type, completion))
}

/// Absorbs a nulled child at a nullable position; a non-null position lets
/// the marker keep bubbling.
fn catch_nullable(
    return_type: &TypeRef,
    completion: Resolved<CompletedValue>,
) -> Resolved<CompletedValue> {
    if return_type.is_non_null() {
        completion
    } else {
        completion.map(|completed| Ok(completed.unwrap_or(Value::Null)))
    }
}

fn complete_value(
    ctx: Arc<ExecutionContext>,
    return_type: TypeRef,
    group: Arc<FieldGroup>,
    info: Arc<ResolveInfo>,
    path: Arc<Path>,
    resolved: ResolvedValue,
) -> Resolved<CompletedValue> {
    match resolved {
        ResolvedValue::Pending(future) => Resolved::Pending(Box::pin(async move {
            let resolved = future.await;
            complete_value(ctx, return_type, group, info, path, resolved)
                .finish()
                .await
        })),
        ResolvedValue::Error(error) => {
            ctx.add_error(GraphQLError::from_resolver(
                error,
                &info.positions,
                Some(&path),
            ));
            Resolved::Ready(Err(Nullified))
        }
        resolved => match return_type {
            TypeRef::NonNull(inner) => {
                let checked_ctx = ctx.clone();
                let checked_info = info.clone();
                let checked_path = path.clone();
                complete_value(ctx, *inner, group, info, path, resolved).map(move |completed| {
                    match completed {
                        Ok(Value::Null) => {
                            checked_ctx.add_error(GraphQLError::located(
                                format!(
                                    "Cannot return null for non-nullable field {}.{}.",
                                    checked_info.parent_type, checked_info.field_name
                                ),
                                &checked_info.positions,
                                Some(&checked_path),
                            ));
                            Err(Nullified)
                        }
                        other => other,
                    }
                })
            }
            _ if matches!(&resolved, ResolvedValue::Ready(Value::Null)) => {
                Resolved::Ready(Ok(Value::Null))
            }
            TypeRef::List(item_type) => {
                complete_list_value(ctx, *item_type, group, info, path, resolved)
            }
            TypeRef::Named(name) => complete_named_value(ctx, name, group, info, path, resolved),
        },
    }
}

fn complete_list_value(
    ctx: Arc<ExecutionContext>,
    item_type: TypeRef,
    group: Arc<FieldGroup>,
    info: Arc<ResolveInfo>,
    path: Arc<Path>,
    resolved: ResolvedValue,
) -> Resolved<CompletedValue> {
    let items = match resolved {
        ResolvedValue::List(items) => items,
        ResolvedValue::Ready(Value::Array(values)) => {
            values.into_iter().map(ResolvedValue::Ready).collect()
        }
        _ => {
            ctx.add_error(GraphQLError::located(
                format!(
                    "Expected Iterable, but did not find one for field '{}.{}'.",
                    info.parent_type, info.field_name
                ),
                &info.positions,
                Some(&path),
            ));
            return Resolved::Ready(Err(Nullified));
        }
    };

    let completions = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let item_path = Path::index(&path, index);
            catch_nullable(
                &item_type,
                complete_value(
                    ctx.clone(),
                    item_type.clone(),
                    group.clone(),
                    info.clone(),
                    item_path,
                    item,
                ),
            )
        })
        .collect();

    Resolved::all(completions).map(|completed| {
        let mut values = Vec::with_capacity(completed.len());
        for item in completed {
            values.push(item?);
        }
        Ok(Value::Array(values))
    })
}

fn complete_named_value(
    ctx: Arc<ExecutionContext>,
    type_name: String,
    group: Arc<FieldGroup>,
    info: Arc<ResolveInfo>,
    path: Arc<Path>,
    resolved: ResolvedValue,
) -> Resolved<CompletedValue> {
    let value = match resolved {
        ResolvedValue::Ready(value) => value,
        _ => {
            ctx.add_error(GraphQLError::located(
                format!(
                    "Expected value of type '{}' but got a list for field '{}.{}'.",
                    type_name, info.parent_type, info.field_name
                ),
                &info.positions,
                Some(&path),
            ));
            return Resolved::Ready(Err(Nullified));
        }
    };

    match ctx.schema.get_type(&type_name) {
        Some(TypeDefinition::Scalar(scalar)) => {
            let serialized = match &scalar.serialize {
                Some(serialize) => serialize(&value),
                None => serialize_builtin_scalar(&type_name, &value),
            };
            match serialized {
                Ok(serialized) => Resolved::Ready(Ok(serialized)),
                Err(message) => {
                    ctx.add_error(GraphQLError::located(
                        message,
                        &info.positions,
                        Some(&path),
                    ));
                    Resolved::Ready(Err(Nullified))
                }
            }
        }
        Some(TypeDefinition::Enum(enum_type)) => match &value {
            Value::String(member) if enum_type.values.iter().any(|value| value == member) => {
                Resolved::Ready(Ok(value))
            }
            _ => {
                ctx.add_error(GraphQLError::located(
                    format!("Enum '{}' cannot represent value: {}", type_name, value),
                    &info.positions,
                    Some(&path),
                ));
                Resolved::Ready(Err(Nullified))
            }
        },
        Some(TypeDefinition::Object(_)) => {
            complete_object_value(ctx.clone(), type_name, group, info, path, value)
        }
        Some(TypeDefinition::Interface(interface)) => {
            let resolve_type = interface
                .resolve_type
                .clone()
                .unwrap_or_else(|| ctx.type_resolver.clone());
            complete_abstract_value(ctx.clone(), type_name, resolve_type, group, info, path, value)
        }
        Some(TypeDefinition::Union(union)) => {
            let resolve_type = union
                .resolve_type
                .clone()
                .unwrap_or_else(|| ctx.type_resolver.clone());
            complete_abstract_value(ctx.clone(), type_name, resolve_type, group, info, path, value)
        }
        _ => {
            ctx.add_error(GraphQLError::located(
                format!(
                    "Cannot complete value of unexpected output type: '{}'.",
                    type_name
                ),
                &info.positions,
                Some(&path),
            ));
            Resolved::Ready(Err(Nullified))
        }
    }
}

fn complete_object_value(
    ctx: Arc<ExecutionContext>,
    type_name: String,
    group: Arc<FieldGroup>,
    info: Arc<ResolveInfo>,
    path: Arc<Path>,
    value: Value,
) -> Resolved<CompletedValue> {
    if let Some(object) = ctx.schema.get_object(&type_name) {
        if let Some(is_type_of) = &object.is_type_of {
            if !is_type_of(&value) {
                ctx.add_error(GraphQLError::located(
                    format!("Expected value of type '{}' but got: {}.", type_name, value),
                    &info.positions,
                    Some(&path),
                ));
                return Resolved::Ready(Err(Nullified));
            }
        }
    }

    let subfields = collect_subfields(
        &ctx.schema,
        &ctx.fragments,
        &ctx.variable_values,
        &type_name,
        &group,
    );
    execute_fields(ctx, type_name, Arc::new(value), Some(path), subfields)
}

#[allow(clippy::too_many_arguments)]
fn complete_abstract_value(
    ctx: Arc<ExecutionContext>,
    abstract_type: String,
    resolve_type: crate::resolver::TypeResolverFn,
    group: Arc<FieldGroup>,
    info: Arc<ResolveInfo>,
    path: Arc<Path>,
    value: Value,
) -> Resolved<CompletedValue> {
    resolve_type(&value, &info, &abstract_type).then(move |outcome| match outcome {
        Err(error) => {
            ctx.add_error(GraphQLError::from_resolver(
                error,
                &info.positions,
                Some(&path),
            ));
            Resolved::Ready(Err(Nullified))
        }
        Ok(runtime_type) => {
            match ensure_valid_runtime_type(&ctx, runtime_type, &abstract_type, &info) {
                Ok(type_name) => complete_object_value(ctx, type_name, group, info, path, value),
                Err(message) => {
                    ctx.add_error(GraphQLError::located(
                        message,
                        &info.positions,
                        Some(&path),
                    ));
                    Resolved::Ready(Err(Nullified))
                }
            }
        }
    })
}

fn ensure_valid_runtime_type(
    ctx: &ExecutionContext,
    runtime_type: Option<String>,
    abstract_type: &str,
    info: &ResolveInfo,
) -> Result<String, String> {
    let Some(type_name) = runtime_type else {
        return Err(format!(
            "Abstract type '{}' must resolve to an Object type at runtime for field '{}.{}'. \
             Either the '{}' type should provide a 'resolve_type' function or each possible \
             type should provide an 'is_type_of' function.",
            abstract_type, info.parent_type, info.field_name, abstract_type
        ));
    };

    match ctx.schema.get_type(&type_name) {
        None => Err(format!(
            "Abstract type '{}' was resolved to a type '{}' that does not exist inside the \
             schema.",
            abstract_type, type_name
        )),
        Some(TypeDefinition::Object(_)) => {
            if ctx.schema.is_sub_type(abstract_type, &type_name) {
                Ok(type_name)
            } else {
                Err(format!(
                    "Runtime Object type '{}' is not a possible type for '{}'.",
                    type_name, abstract_type
                ))
            }
        }
        Some(_) => Err(format!(
            "Abstract type '{}' was resolved to a non-object type '{}'.",
            abstract_type, type_name
        )),
    }
}
