pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use graphql_parser::schema::{self, Definition, TypeDefinition as AstTypeDefinition};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::context::OperationKind;
use crate::resolved::{Resolved, ResolvedValue};
use crate::resolver::{ResolveInfo, SourceEventStream};
use crate::values::value_from_const_ast;
use crate::ResolverError;

pub use types::{
    EnumType, FieldDefinition, InputObjectType, InputValueDefinition, InterfaceType, ObjectType,
    ScalarType, TypeDefinition, TypeRef, UnionType,
};

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("failed to parse schema document: {0}")]
    Parse(#[from] schema::ParseError),
    #[error("schema must define a query root type")]
    MissingQueryType,
    #[error("duplicate type definition for '{0}'")]
    DuplicateType(String),
    #[error("unknown type '{0}' referenced by the schema definition")]
    UnknownRootType(String),
}

/// Executable schema: the type map plus the root operation bindings. Resolver
/// functions are attached after construction through the builder methods and
/// the whole schema is shared behind an `Arc` for the lifetime of execution.
pub struct Schema {
    query_type: String,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    type_map: HashMap<String, TypeDefinition>,
    /// Concrete object types per abstract type, in declaration order so that
    /// `is_type_of` probing stays deterministic.
    possible_types: HashMap<String, IndexSet<String>>,
}

impl Schema {
    /// Builds a schema from SDL text. Root types default to `Query`,
    /// `Mutation` and `Subscription` unless a `schema { .. }` block overrides
    /// them.
    pub fn from_sdl(sdl: &str) -> Result<Schema, SchemaError> {
        let document = schema::parse_schema::<String>(sdl)?;

        let mut type_map: HashMap<String, TypeDefinition> = HashMap::new();
        let mut query_type = None;
        let mut mutation_type = None;
        let mut subscription_type = None;

        for name in ["Int", "Float", "String", "Boolean", "ID"] {
            type_map.insert(
                name.to_string(),
                TypeDefinition::Scalar(ScalarType {
                    name: name.to_string(),
                    serialize: None,
                    parse_value: None,
                }),
            );
        }

        for definition in &document.definitions {
            match definition {
                Definition::SchemaDefinition(schema_definition) => {
                    query_type = schema_definition.query.clone();
                    mutation_type = schema_definition.mutation.clone();
                    subscription_type = schema_definition.subscription.clone();
                }
                Definition::TypeDefinition(type_definition) => {
                    let converted = convert_type_definition(type_definition);
                    let name = converted.name().to_string();
                    // The well-known scalars may be re-declared in SDL.
                    let builtin_scalar = matches!(converted, TypeDefinition::Scalar(_))
                        && matches!(name.as_str(), "Int" | "Float" | "String" | "Boolean" | "ID");
                    if type_map.insert(name.clone(), converted).is_some() && !builtin_scalar {
                        return Err(SchemaError::DuplicateType(name));
                    }
                }
                Definition::TypeExtension(_) | Definition::DirectiveDefinition(_) => {}
            }
        }

        let query_type = match query_type {
            Some(name) => name,
            None if type_map.contains_key("Query") => "Query".to_string(),
            None => return Err(SchemaError::MissingQueryType),
        };
        let mutation_type =
            mutation_type.or_else(|| type_map.contains_key("Mutation").then(|| "Mutation".into()));
        let subscription_type = subscription_type
            .or_else(|| type_map.contains_key("Subscription").then(|| "Subscription".into()));

        for root in [Some(&query_type), mutation_type.as_ref(), subscription_type.as_ref()]
            .into_iter()
            .flatten()
        {
            if !type_map.contains_key(root) {
                return Err(SchemaError::UnknownRootType(root.clone()));
            }
        }

        let possible_types = collect_possible_types(&type_map);

        Ok(Schema {
            query_type,
            mutation_type,
            subscription_type,
            type_map,
            possible_types,
        })
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.type_map.get(name)
    }

    pub fn get_object(&self, name: &str) -> Option<&ObjectType> {
        match self.type_map.get(name) {
            Some(TypeDefinition::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// Field definition on an object or interface type.
    pub fn get_field(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        self.type_map
            .get(type_name)
            .and_then(TypeDefinition::fields)
            .and_then(|fields| fields.get(field_name))
    }

    pub fn root_type_name(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => Some(self.query_type.as_str()),
            OperationKind::Mutation => self.mutation_type.as_deref(),
            OperationKind::Subscription => self.subscription_type.as_deref(),
        }
    }

    pub fn possible_types(&self, abstract_type: &str) -> Option<&IndexSet<String>> {
        self.possible_types.get(abstract_type)
    }

    /// Whether `maybe_sub_type` is a member object of the abstract
    /// `super_type`, or the same named type.
    pub fn is_sub_type(&self, super_type: &str, maybe_sub_type: &str) -> bool {
        super_type == maybe_sub_type
            || self
                .possible_types
                .get(super_type)
                .is_some_and(|members| members.contains(maybe_sub_type))
    }

    /// Whether a fragment with the given type condition applies to an object
    /// type during field collection.
    pub fn type_condition_applies(&self, condition: &str, object_type: &str) -> bool {
        self.is_sub_type(condition, object_type)
    }

    pub fn with_resolver(
        mut self,
        type_name: &str,
        field_name: &str,
        resolver: impl Fn(&Value, &serde_json::Map<String, Value>, &ResolveInfo) -> ResolvedValue
            + Send
            + Sync
            + 'static,
    ) -> Self {
        match self.field_mut(type_name, field_name) {
            Some(field) => field.resolver = Some(Arc::new(resolver)),
            None => tracing::warn!(
                type_name,
                field_name,
                "attaching resolver to an unknown field"
            ),
        }
        self
    }

    pub fn with_subscribe(
        mut self,
        type_name: &str,
        field_name: &str,
        subscribe: impl Fn(
                &Value,
                &serde_json::Map<String, Value>,
                &ResolveInfo,
            ) -> Resolved<Result<SourceEventStream, ResolverError>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        match self.field_mut(type_name, field_name) {
            Some(field) => field.subscribe = Some(Arc::new(subscribe)),
            None => tracing::warn!(
                type_name,
                field_name,
                "attaching subscriber to an unknown field"
            ),
        }
        self
    }

    pub fn with_is_type_of(
        mut self,
        type_name: &str,
        is_type_of: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        match self.type_map.get_mut(type_name) {
            Some(TypeDefinition::Object(object)) => object.is_type_of = Some(Arc::new(is_type_of)),
            _ => tracing::warn!(type_name, "attaching is_type_of to an unknown object type"),
        }
        self
    }

    pub fn with_resolve_type(
        mut self,
        type_name: &str,
        resolve_type: impl Fn(&Value, &ResolveInfo, &str) -> Resolved<Result<Option<String>, ResolverError>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        match self.type_map.get_mut(type_name) {
            Some(TypeDefinition::Interface(interface)) => {
                interface.resolve_type = Some(Arc::new(resolve_type));
            }
            Some(TypeDefinition::Union(union)) => {
                union.resolve_type = Some(Arc::new(resolve_type));
            }
            _ => tracing::warn!(
                type_name,
                "attaching resolve_type to an unknown abstract type"
            ),
        }
        self
    }

    pub fn with_serialize(
        mut self,
        type_name: &str,
        serialize: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        match self.type_map.get_mut(type_name) {
            Some(TypeDefinition::Scalar(scalar)) => scalar.serialize = Some(Arc::new(serialize)),
            _ => tracing::warn!(type_name, "attaching serialize to an unknown scalar type"),
        }
        self
    }

    pub fn with_parse_value(
        mut self,
        type_name: &str,
        parse_value: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        match self.type_map.get_mut(type_name) {
            Some(TypeDefinition::Scalar(scalar)) => scalar.parse_value = Some(Arc::new(parse_value)),
            _ => tracing::warn!(type_name, "attaching parse_value to an unknown scalar type"),
        }
        self
    }

    fn field_mut(&mut self, type_name: &str, field_name: &str) -> Option<&mut FieldDefinition> {
        match self.type_map.get_mut(type_name) {
            Some(TypeDefinition::Object(object)) => object.fields.get_mut(field_name),
            Some(TypeDefinition::Interface(interface)) => interface.fields.get_mut(field_name),
            _ => None,
        }
    }
}

fn convert_type_definition(definition: &AstTypeDefinition<'_, String>) -> TypeDefinition {
    match definition {
        AstTypeDefinition::Scalar(scalar) => TypeDefinition::Scalar(ScalarType {
            name: scalar.name.clone(),
            serialize: None,
            parse_value: None,
        }),
        AstTypeDefinition::Object(object) => TypeDefinition::Object(ObjectType {
            name: object.name.clone(),
            fields: convert_fields(&object.fields),
            interfaces: object.implements_interfaces.clone(),
            is_type_of: None,
        }),
        AstTypeDefinition::Interface(interface) => TypeDefinition::Interface(InterfaceType {
            name: interface.name.clone(),
            fields: convert_fields(&interface.fields),
            interfaces: interface.implements_interfaces.clone(),
            resolve_type: None,
        }),
        AstTypeDefinition::Union(union) => TypeDefinition::Union(UnionType {
            name: union.name.clone(),
            types: union.types.clone(),
            resolve_type: None,
        }),
        AstTypeDefinition::Enum(enum_type) => TypeDefinition::Enum(EnumType {
            name: enum_type.name.clone(),
            values: enum_type
                .values
                .iter()
                .map(|value| value.name.clone())
                .collect(),
        }),
        AstTypeDefinition::InputObject(input_object) => {
            TypeDefinition::InputObject(InputObjectType {
                name: input_object.name.clone(),
                fields: convert_input_values(&input_object.fields),
            })
        }
    }
}

fn convert_fields(fields: &[schema::Field<'_, String>]) -> IndexMap<String, FieldDefinition> {
    fields
        .iter()
        .map(|field| {
            (
                field.name.clone(),
                FieldDefinition {
                    name: field.name.clone(),
                    field_type: TypeRef::from_parser(&field.field_type),
                    arguments: convert_input_values(&field.arguments),
                    resolver: None,
                    subscribe: None,
                },
            )
        })
        .collect()
}

fn convert_input_values(
    input_values: &[schema::InputValue<'_, String>],
) -> IndexMap<String, InputValueDefinition> {
    input_values
        .iter()
        .map(|input_value| {
            (
                input_value.name.clone(),
                InputValueDefinition {
                    name: input_value.name.clone(),
                    value_type: TypeRef::from_parser(&input_value.value_type),
                    default_value: input_value.default_value.as_ref().map(value_from_const_ast),
                },
            )
        })
        .collect()
}

/// Maps every abstract type to its concrete member objects, following
/// interface inheritance transitively.
fn collect_possible_types(
    type_map: &HashMap<String, TypeDefinition>,
) -> HashMap<String, IndexSet<String>> {
    let mut possible_types: HashMap<String, IndexSet<String>> = HashMap::new();

    for definition in type_map.values() {
        match definition {
            TypeDefinition::Union(union) => {
                possible_types
                    .entry(union.name.clone())
                    .or_default()
                    .extend(union.types.iter().cloned());
            }
            TypeDefinition::Object(object) => {
                let mut seen = IndexSet::new();
                let mut pending: Vec<&str> =
                    object.interfaces.iter().map(String::as_str).collect();
                while let Some(interface_name) = pending.pop() {
                    if !seen.insert(interface_name.to_string()) {
                        continue;
                    }
                    if let Some(TypeDefinition::Interface(interface)) =
                        type_map.get(interface_name)
                    {
                        pending.extend(interface.interfaces.iter().map(String::as_str));
                    }
                }
                for interface_name in seen {
                    possible_types
                        .entry(interface_name)
                        .or_default()
                        .insert(object.name.clone());
                }
            }
            _ => {}
        }
    }

    possible_types
}
