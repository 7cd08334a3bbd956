use graphql_parser::query::{Field, Value as AstValue, VariableDefinition};
use serde_json::{Map, Number, Value};

use crate::error::GraphQLError;
use crate::schema::{FieldDefinition, Schema, TypeDefinition, TypeRef};

/// Outcome of evaluating an AST value: a missing value (unset variable or
/// uncoercible literal) is distinct from an explicit `null`.
pub enum InputValue {
    Missing,
    Null,
    Present(Value),
}

impl InputValue {
    fn from_nullable(value: Value) -> InputValue {
        if value.is_null() {
            InputValue::Null
        } else {
            InputValue::Present(value)
        }
    }
}

/// Literal-only conversion used for schema-level default values. Variable
/// references cannot appear there.
pub(crate) fn value_from_const_ast(ast: &AstValue<'_, String>) -> Value {
    match ast {
        AstValue::Variable(_) | AstValue::Null => Value::Null,
        AstValue::Int(int) => int.as_i64().map(Value::from).unwrap_or(Value::Null),
        AstValue::Float(float) => Number::from_f64(*float)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AstValue::String(string) => Value::String(string.clone()),
        AstValue::Boolean(boolean) => Value::Bool(*boolean),
        AstValue::Enum(name) => Value::String(name.clone()),
        AstValue::List(items) => Value::Array(items.iter().map(value_from_const_ast).collect()),
        AstValue::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, value)| (key.clone(), value_from_const_ast(value)))
                .collect(),
        ),
    }
}

/// Evaluates an AST value against an expected input type, resolving variable
/// references from the coerced variable map. Mirrors the spec's
/// CoerceArgumentValues literal rules: a literal that does not fit the type
/// yields `Missing`, never an implicit conversion.
pub fn value_from_ast(
    schema: &Schema,
    ast: &AstValue<'_, String>,
    value_type: &TypeRef,
    variables: &Map<String, Value>,
) -> InputValue {
    if let AstValue::Variable(name) = ast {
        return match variables.get(name) {
            Some(value) if value.is_null() && value_type.is_non_null() => InputValue::Missing,
            Some(value) => InputValue::from_nullable(value.clone()),
            None => InputValue::Missing,
        };
    }

    match value_type {
        TypeRef::NonNull(inner) => match ast {
            AstValue::Null => InputValue::Missing,
            _ => value_from_ast(schema, ast, inner, variables),
        },
        _ if matches!(ast, AstValue::Null) => InputValue::Null,
        TypeRef::List(item_type) => match ast {
            AstValue::List(items) => {
                let mut coerced = Vec::with_capacity(items.len());
                for item in items {
                    match value_from_ast(schema, item, item_type, variables) {
                        InputValue::Present(value) => coerced.push(value),
                        InputValue::Null => coerced.push(Value::Null),
                        InputValue::Missing if item_type.is_non_null() => {
                            return InputValue::Missing;
                        }
                        InputValue::Missing => coerced.push(Value::Null),
                    }
                }
                InputValue::Present(Value::Array(coerced))
            }
            // A single value is accepted as a list of one.
            _ => match value_from_ast(schema, ast, item_type, variables) {
                InputValue::Present(value) => InputValue::Present(Value::Array(vec![value])),
                InputValue::Null => InputValue::Present(Value::Array(vec![Value::Null])),
                InputValue::Missing => InputValue::Missing,
            },
        },
        TypeRef::Named(name) => literal_from_named_ast(schema, ast, name, variables),
    }
}

fn literal_from_named_ast(
    schema: &Schema,
    ast: &AstValue<'_, String>,
    type_name: &str,
    variables: &Map<String, Value>,
) -> InputValue {
    match schema.get_type(type_name) {
        Some(TypeDefinition::InputObject(input_object)) => {
            let AstValue::Object(object) = ast else {
                return InputValue::Missing;
            };
            let mut coerced = Map::new();
            for (field_name, field_def) in &input_object.fields {
                match object.get(field_name) {
                    Some(field_ast) => {
                        match value_from_ast(schema, field_ast, &field_def.value_type, variables) {
                            InputValue::Present(value) => {
                                coerced.insert(field_name.clone(), value);
                            }
                            InputValue::Null => {
                                coerced.insert(field_name.clone(), Value::Null);
                            }
                            InputValue::Missing if field_def.value_type.is_non_null() => {
                                return InputValue::Missing;
                            }
                            InputValue::Missing => {}
                        }
                    }
                    None => match &field_def.default_value {
                        Some(default) => {
                            coerced.insert(field_name.clone(), default.clone());
                        }
                        None if field_def.value_type.is_non_null() => return InputValue::Missing,
                        None => {}
                    },
                }
            }
            InputValue::Present(Value::Object(coerced))
        }
        Some(TypeDefinition::Enum(enum_type)) => match ast {
            AstValue::Enum(name) if enum_type.values.iter().any(|value| value == name) => {
                InputValue::Present(Value::String(name.clone()))
            }
            _ => InputValue::Missing,
        },
        Some(TypeDefinition::Scalar(scalar)) => {
            let literal = match (type_name, ast) {
                ("Int", AstValue::Int(int)) => match int.as_i64() {
                    Some(int) if (i32::MIN as i64..=i32::MAX as i64).contains(&int) => {
                        Some(Value::from(int))
                    }
                    _ => None,
                },
                ("Float", AstValue::Int(int)) => int.as_i64().map(Value::from),
                ("Float", AstValue::Float(float)) => Number::from_f64(*float).map(Value::Number),
                ("String", AstValue::String(string)) => Some(Value::String(string.clone())),
                ("Boolean", AstValue::Boolean(boolean)) => Some(Value::Bool(*boolean)),
                ("ID", AstValue::String(string)) => Some(Value::String(string.clone())),
                ("ID", AstValue::Int(int)) => {
                    int.as_i64().map(|int| Value::String(int.to_string()))
                }
                ("Int" | "Float" | "String" | "Boolean" | "ID", _) => None,
                // Custom scalar: take the literal shape as-is, then apply the
                // attached input coercion if any.
                _ => Some(value_from_const_ast(ast)),
            };
            match literal {
                Some(value) => match &scalar.parse_value {
                    Some(parse_value) => match parse_value(&value) {
                        Ok(parsed) => InputValue::from_nullable(parsed),
                        Err(_) => InputValue::Missing,
                    },
                    None => InputValue::from_nullable(value),
                },
                None => InputValue::Missing,
            }
        }
        _ => InputValue::Missing,
    }
}

/// Runtime input coercion for externally supplied variable values.
pub(crate) fn coerce_input_value(
    schema: &Schema,
    value: &Value,
    value_type: &TypeRef,
) -> Result<Value, String> {
    match value_type {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                Err(format!(
                    "Expected non-nullable type '{}' not to be null.",
                    value_type
                ))
            } else {
                coerce_input_value(schema, value, inner)
            }
        }
        _ if value.is_null() => Ok(Value::Null),
        TypeRef::List(item_type) => match value {
            Value::Array(items) => {
                let mut coerced = Vec::with_capacity(items.len());
                for item in items {
                    coerced.push(coerce_input_value(schema, item, item_type)?);
                }
                Ok(Value::Array(coerced))
            }
            // A single value is accepted as a list of one.
            _ => Ok(Value::Array(vec![coerce_input_value(
                schema, value, item_type,
            )?])),
        },
        TypeRef::Named(name) => coerce_named_input_value(schema, value, name),
    }
}

fn coerce_named_input_value(schema: &Schema, value: &Value, name: &str) -> Result<Value, String> {
    match schema.get_type(name) {
        Some(TypeDefinition::Scalar(scalar)) => {
            let checked = match name {
                "Int" => match value.as_i64() {
                    Some(int) if (i32::MIN as i64..=i32::MAX as i64).contains(&int) => {
                        Ok(value.clone())
                    }
                    Some(_) => Err(format!(
                        "Int cannot represent non 32-bit signed integer value: {}",
                        value
                    )),
                    None => Err(format!("Int cannot represent non-integer value: {}", value)),
                },
                "Float" => match value {
                    Value::Number(_) => Ok(value.clone()),
                    _ => Err(format!(
                        "Float cannot represent non numeric value: {}",
                        value
                    )),
                },
                "String" => match value {
                    Value::String(_) => Ok(value.clone()),
                    _ => Err(format!(
                        "String cannot represent a non string value: {}",
                        value
                    )),
                },
                "Boolean" => match value {
                    Value::Bool(_) => Ok(value.clone()),
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
            }?;
            match &scalar.parse_value {
                Some(parse_value) => parse_value(&checked),
                None => Ok(checked),
            }
        }
        Some(TypeDefinition::Enum(enum_type)) => match value {
            Value::String(member) if enum_type.values.iter().any(|value| value == member) => {
                Ok(value.clone())
            }
            _ => Err(format!("Value {} does not exist in '{}' enum.", value, name)),
        },
        Some(TypeDefinition::InputObject(input_object)) => {
            let Value::Object(object) = value else {
                return Err(format!("Expected type '{}' to be an object.", name));
            };
            let mut coerced = Map::new();
            for (field_name, field_def) in &input_object.fields {
                match object.get(field_name) {
                    Some(field_value) => {
                        coerced.insert(
                            field_name.clone(),
                            coerce_input_value(schema, field_value, &field_def.value_type)?,
                        );
                    }
                    None => match &field_def.default_value {
                        Some(default) => {
                            coerced.insert(field_name.clone(), default.clone());
                        }
                        None if field_def.value_type.is_non_null() => {
                            return Err(format!(
                                "Field '{}' of required type '{}' was not provided.",
                                field_name, field_def.value_type
                            ));
                        }
                        None => {}
                    },
                }
            }
            for key in object.keys() {
                if !input_object.fields.contains_key(key) {
                    return Err(format!(
                        "Field '{}' is not defined by type '{}'.",
                        key, name
                    ));
                }
            }
            Ok(Value::Object(coerced))
        }
        _ => Err(format!("Expected type '{}'.", name)),
    }
}

/// Coerces externally supplied variable values against the operation's
/// variable definitions. Every failure is reported; execution only proceeds
/// when the result is `Ok`.
pub fn get_variable_values(
    schema: &Schema,
    definitions: &[VariableDefinition<'static, String>],
    inputs: &Map<String, Value>,
    max_errors: Option<usize>,
) -> Result<Map<String, Value>, Vec<GraphQLError>> {
    let mut coerced = Map::new();
    let mut errors = Vec::new();
    let empty = Map::new();

    for definition in definitions {
        if let Some(limit) = max_errors {
            if errors.len() >= limit {
                errors.push(GraphQLError::new(
                    "Too many errors processing variables, error limit reached. Execution aborted.",
                ));
                return Err(errors);
            }
        }

        let var_name = &definition.name;
        let var_type = TypeRef::from_parser(&definition.var_type);

        match inputs.get(var_name) {
            None => {
                if let Some(default) = &definition.default_value {
                    match value_from_ast(schema, default, &var_type, &empty) {
                        InputValue::Present(value) => {
                            coerced.insert(var_name.clone(), value);
                        }
                        InputValue::Null => {
                            coerced.insert(var_name.clone(), Value::Null);
                        }
                        InputValue::Missing => {}
                    }
                } else if var_type.is_non_null() {
                    errors.push(GraphQLError::located(
                        format!(
                            "Variable '${}' of required type '{}' was not provided.",
                            var_name, var_type
                        ),
                        &[definition.position],
                        None,
                    ));
                }
            }
            Some(value) if value.is_null() && var_type.is_non_null() => {
                errors.push(GraphQLError::located(
                    format!(
                        "Variable '${}' of non-null type '{}' must not be null.",
                        var_name, var_type
                    ),
                    &[definition.position],
                    None,
                ));
            }
            Some(value) => match coerce_input_value(schema, value, &var_type) {
                Ok(value) => {
                    coerced.insert(var_name.clone(), value);
                }
                Err(reason) => {
                    errors.push(GraphQLError::located(
                        format!(
                            "Variable '${}' got invalid value {}; {}",
                            var_name, value, reason
                        ),
                        &[definition.position],
                        None,
                    ));
                }
            },
        }
    }

    if errors.is_empty() {
        Ok(coerced)
    } else {
        Err(errors)
    }
}

/// Coerces the argument literals of one field node against the field
/// definition. Any failure aborts the whole field with a located error.
pub(crate) fn get_argument_values(
    schema: &Schema,
    field_def: &FieldDefinition,
    field: &Field<'static, String>,
    variables: &Map<String, Value>,
) -> Result<Map<String, Value>, GraphQLError> {
    let mut coerced = Map::new();

    for (name, arg_def) in &field_def.arguments {
        let arg_type = &arg_def.value_type;
        let argument = field
            .arguments
            .iter()
            .find(|(arg_name, _)| arg_name == name)
            .map(|(_, value)| value);

        let Some(value_node) = argument else {
            match &arg_def.default_value {
                Some(default) => {
                    coerced.insert(name.clone(), default.clone());
                }
                None if arg_type.is_non_null() => {
                    return Err(GraphQLError::located(
                        format!(
                            "Argument '{}' of required type '{}' was not provided.",
                            name, arg_type
                        ),
                        &[field.position],
                        None,
                    ));
                }
                None => {}
            }
            continue;
        };

        let mut is_null = matches!(value_node, AstValue::Null);
        if let AstValue::Variable(variable_name) = value_node {
            match variables.get(variable_name) {
                Some(variable_value) => is_null = variable_value.is_null(),
                None => {
                    match &arg_def.default_value {
                        Some(default) => {
                            coerced.insert(name.clone(), default.clone());
                        }
                        None if arg_type.is_non_null() => {
                            return Err(GraphQLError::located(
                                format!(
                                    "Argument '{}' of required type '{}' was provided the \
                                     variable '${}' which was not provided a runtime value.",
                                    name, arg_type, variable_name
                                ),
                                &[field.position],
                                None,
                            ));
                        }
                        None => {}
                    }
                    continue;
                }
            }
        }

        if is_null && arg_type.is_non_null() {
            return Err(GraphQLError::located(
                format!(
                    "Argument '{}' of non-null type '{}' must not be null.",
                    name, arg_type
                ),
                &[field.position],
                None,
            ));
        }

        match value_from_ast(schema, value_node, arg_type, variables) {
            InputValue::Present(value) => {
                coerced.insert(name.clone(), value);
            }
            InputValue::Null => {
                coerced.insert(name.clone(), Value::Null);
            }
            InputValue::Missing => {
                return Err(GraphQLError::located(
                    format!("Argument '{}' has invalid value {}.", name, value_node),
                    &[field.position],
                    None,
                ));
            }
        }
    }

    Ok(coerced)
}
