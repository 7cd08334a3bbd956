use std::fmt;
use std::sync::Arc;

use graphql_parser::query::Type as ParserType;
use indexmap::IndexMap;
use serde_json::Value;

use crate::resolver::{FieldResolverFn, SubscribeFn, TypeResolverFn};

/// Reference to a (possibly wrapped) schema type, as declared on a field,
/// argument or variable.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: &str) -> TypeRef {
        TypeRef::Named(name.to_string())
    }

    pub fn list(inner: TypeRef) -> TypeRef {
        TypeRef::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> TypeRef {
        TypeRef::NonNull(Box::new(inner))
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// Innermost named type, regardless of list/non-null wrappers.
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) => inner.name(),
            TypeRef::NonNull(inner) => inner.name(),
        }
    }

    pub(crate) fn from_parser(parser_type: &ParserType<'_, String>) -> TypeRef {
        match parser_type {
            ParserType::NamedType(name) => TypeRef::Named(name.clone()),
            ParserType::ListType(inner) => TypeRef::list(TypeRef::from_parser(inner)),
            ParserType::NonNullType(inner) => TypeRef::non_null(TypeRef::from_parser(inner)),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

pub type IsTypeOfFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub type ScalarValueFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

pub struct FieldDefinition {
    pub name: String,
    pub field_type: TypeRef,
    pub arguments: IndexMap<String, InputValueDefinition>,
    pub resolver: Option<FieldResolverFn>,
    pub subscribe: Option<SubscribeFn>,
}

pub struct InputValueDefinition {
    pub name: String,
    pub value_type: TypeRef,
    /// Already coerced to a runtime value at schema build time.
    pub default_value: Option<Value>,
}

pub struct ObjectType {
    pub name: String,
    pub fields: IndexMap<String, FieldDefinition>,
    pub interfaces: Vec<String>,
    pub is_type_of: Option<IsTypeOfFn>,
}

pub struct InterfaceType {
    pub name: String,
    pub fields: IndexMap<String, FieldDefinition>,
    pub interfaces: Vec<String>,
    pub resolve_type: Option<TypeResolverFn>,
}

pub struct UnionType {
    pub name: String,
    pub types: Vec<String>,
    pub resolve_type: Option<TypeResolverFn>,
}

pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

pub struct ScalarType {
    pub name: String,
    /// Output coercion; `None` uses the built-in rules for the well-known
    /// scalars and identity for custom ones.
    pub serialize: Option<ScalarValueFn>,
    /// Input coercion for custom scalars; `None` accepts the value as-is.
    pub parse_value: Option<ScalarValueFn>,
}

pub struct InputObjectType {
    pub name: String,
    pub fields: IndexMap<String, InputValueDefinition>,
}

pub enum TypeDefinition {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Scalar(scalar) => &scalar.name,
            TypeDefinition::Object(object) => &object.name,
            TypeDefinition::Interface(interface) => &interface.name,
            TypeDefinition::Union(union) => &union.name,
            TypeDefinition::Enum(enum_type) => &enum_type.name,
            TypeDefinition::InputObject(input_object) => &input_object.name,
        }
    }

    pub fn fields(&self) -> Option<&IndexMap<String, FieldDefinition>> {
        match self {
            TypeDefinition::Object(object) => Some(&object.fields),
            TypeDefinition::Interface(interface) => Some(&interface.fields),
            _ => None,
        }
    }
}

/// Built-in output coercion for the well-known scalars; unknown scalar names
/// pass the value through untouched.
pub(crate) fn serialize_builtin_scalar(name: &str, value: &Value) -> Result<Value, String> {
    match name {
        "Int" => match value.as_i64() {
            Some(int) if (i32::MIN as i64..=i32::MAX as i64).contains(&int) => Ok(value.clone()),
            Some(_) => Err(format!(
                "Int cannot represent non 32-bit signed integer value: {}",
                value
            )),
            None => Err(format!("Int cannot represent non-integer value: {}", value)),
        },
        "Float" => match value {
            Value::Number(_) => Ok(value.clone()),
            _ => Err(format!("Float cannot represent non numeric value: {}", value)),
        },
        "String" => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(number) => Ok(Value::String(number.to_string())),
            Value::Bool(boolean) => Ok(Value::String(boolean.to_string())),
            _ => Err(format!("String cannot represent value: {}", value)),
        },
        "Boolean" => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Number(number) => Ok(Value::Bool(number.as_f64() != Some(0.0))),
            _ => Err(format!(
                "Boolean cannot represent a non boolean value: {}",
                value
            )),
        },
        "ID" => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(number) if number.is_i64() || number.is_u64() => {
                Ok(Value::String(number.to_string()))
            }
            _ => Err(format!("ID cannot represent value: {}", value)),
        },
        _ => Ok(value.clone()),
    }
}
