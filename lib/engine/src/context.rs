use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use graphql_parser::query::{
    Definition, Document, FragmentDefinition, OperationDefinition, SelectionSet,
    VariableDefinition,
};
use graphql_parser::Pos;
use serde_json::{Map, Value};

use crate::error::GraphQLError;
use crate::resolver::{
    default_field_resolver, default_subscribe_resolver, default_type_resolver, FieldResolverFn,
    SubscribeFn, TypeResolverFn,
};
use crate::schema::Schema;
use crate::values::get_variable_values;

const VARIABLE_ERRORS_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        })
    }
}

/// The operation picked out of the document, normalized across the shorthand
/// and the named forms.
#[derive(Clone)]
pub struct Operation {
    pub kind: OperationKind,
    pub name: Option<String>,
    pub position: Pos,
    pub variable_definitions: Vec<VariableDefinition<'static, String>>,
    pub selection_set: SelectionSet<'static, String>,
}

/// Everything a caller can hand to `execute` / `subscribe`. Only the schema
/// and the document are required.
pub struct ExecutionArgs<'a> {
    pub schema: Arc<Schema>,
    pub document: &'a Document<'static, String>,
    pub root_value: Value,
    pub context_value: Value,
    pub variable_values: Map<String, Value>,
    pub operation_name: Option<String>,
    pub field_resolver: Option<FieldResolverFn>,
    pub type_resolver: Option<TypeResolverFn>,
    pub subscribe_field_resolver: Option<SubscribeFn>,
    pub max_errors: Option<usize>,
}

impl<'a> ExecutionArgs<'a> {
    pub fn new(schema: Arc<Schema>, document: &'a Document<'static, String>) -> ExecutionArgs<'a> {
        ExecutionArgs {
            schema,
            document,
            root_value: Value::Null,
            context_value: Value::Null,
            variable_values: Map::new(),
            operation_name: None,
            field_resolver: None,
            type_resolver: None,
            subscribe_field_resolver: None,
            max_errors: None,
        }
    }

    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn root_value(mut self, root_value: Value) -> Self {
        self.root_value = root_value;
        self
    }

    pub fn context_value(mut self, context_value: Value) -> Self {
        self.context_value = context_value;
        self
    }

    pub fn variable_values(mut self, variable_values: Map<String, Value>) -> Self {
        self.variable_values = variable_values;
        self
    }

    pub fn max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = Some(max_errors);
        self
    }
}

#[derive(Default)]
struct ErrorLog {
    errors: Vec<GraphQLError>,
    overflowed: bool,
}

/// State shared by every field of one operation execution. Cheap to share
/// across futures; the error log is the only interior mutability.
pub struct ExecutionContext {
    pub schema: Arc<Schema>,
    pub fragments: HashMap<String, FragmentDefinition<'static, String>>,
    pub operation: Operation,
    pub root_type_name: String,
    pub variable_values: Arc<Map<String, Value>>,
    pub root_value: Arc<Value>,
    pub context_value: Arc<Value>,
    pub field_resolver: FieldResolverFn,
    pub type_resolver: TypeResolverFn,
    pub subscribe_field_resolver: SubscribeFn,
    max_errors: Option<usize>,
    errors: Mutex<ErrorLog>,
}

impl ExecutionContext {
    /// Selects the operation, coerces variables and resolves the root type.
    /// Any failure here is fatal: the caller reports the errors with no
    /// `data` entry at all.
    pub fn build(args: ExecutionArgs<'_>) -> Result<ExecutionContext, Vec<GraphQLError>> {
        let mut fragments = HashMap::new();
        let mut operations = Vec::new();

        for definition in &args.document.definitions {
            match definition {
                Definition::Operation(operation) => operations.push(operation),
                Definition::Fragment(fragment) => {
                    fragments.insert(fragment.name.clone(), fragment.clone());
                }
            }
        }

        let operation = select_operation(&operations, args.operation_name.as_deref())
            .map(normalize_operation)
            .map_err(|error| vec![error])?;

        let root_type_name = match args.schema.root_type_name(operation.kind) {
            Some(name) => name.to_string(),
            None => {
                return Err(vec![GraphQLError::located(
                    format!(
                        "Schema is not configured to execute {} operation.",
                        operation.kind
                    ),
                    &[operation.position],
                    None,
                )]);
            }
        };

        let variable_values = get_variable_values(
            &args.schema,
            &operation.variable_definitions,
            &args.variable_values,
            Some(VARIABLE_ERRORS_LIMIT),
        )?;

        Ok(ExecutionContext {
            schema: args.schema,
            fragments,
            operation,
            root_type_name,
            variable_values: Arc::new(variable_values),
            root_value: Arc::new(args.root_value),
            context_value: Arc::new(args.context_value),
            field_resolver: args
                .field_resolver
                .unwrap_or_else(|| Arc::new(default_field_resolver)),
            type_resolver: args
                .type_resolver
                .unwrap_or_else(|| Arc::new(default_type_resolver)),
            subscribe_field_resolver: args
                .subscribe_field_resolver
                .unwrap_or_else(|| Arc::new(default_subscribe_resolver)),
            max_errors: args.max_errors,
            errors: Mutex::new(ErrorLog::default()),
        })
    }

    /// Fresh context for one subscription event: same operation and schema,
    /// the event payload as root value, an empty error log.
    pub fn for_event(&self, payload: Value) -> ExecutionContext {
        ExecutionContext {
            schema: self.schema.clone(),
            fragments: self.fragments.clone(),
            operation: self.operation.clone(),
            root_type_name: self.root_type_name.clone(),
            variable_values: self.variable_values.clone(),
            root_value: Arc::new(payload),
            context_value: self.context_value.clone(),
            field_resolver: self.field_resolver.clone(),
            type_resolver: self.type_resolver.clone(),
            subscribe_field_resolver: self.subscribe_field_resolver.clone(),
            max_errors: self.max_errors,
            errors: Mutex::new(ErrorLog::default()),
        }
    }

    /// Appends a located field error. Errors appear in the response in the
    /// order they were detected; past `max_errors` a single marker error is
    /// recorded and the rest are dropped.
    pub fn add_error(&self, error: GraphQLError) {
        let mut log = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        if log.overflowed {
            return;
        }
        if let Some(limit) = self.max_errors {
            if log.errors.len() >= limit {
                log.overflowed = true;
                log.errors.push(GraphQLError::new(
                    "Too many errors processed, execution aborted.",
                ));
                return;
            }
        }
        log.errors.push(error);
    }

    pub fn take_errors(&self) -> Vec<GraphQLError> {
        let mut log = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut log.errors)
    }
}

fn select_operation<'d>(
    operations: &[&'d OperationDefinition<'static, String>],
    operation_name: Option<&str>,
) -> Result<&'d OperationDefinition<'static, String>, GraphQLError> {
    match operation_name {
        Some(name) => operations
            .iter()
            .find(|operation| definition_name(operation) == Some(name))
            .copied()
            .ok_or_else(|| GraphQLError::new(format!("Unknown operation named '{}'.", name))),
        None => match operations {
            [] => Err(GraphQLError::new("Must provide an operation.")),
            [single] => Ok(*single),
            _ => Err(GraphQLError::new(
                "Must provide operation name if query contains multiple operations.",
            )),
        },
    }
}

fn definition_name<'d>(operation: &'d OperationDefinition<'static, String>) -> Option<&'d str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => query.name.as_deref(),
        OperationDefinition::Mutation(mutation) => mutation.name.as_deref(),
        OperationDefinition::Subscription(subscription) => subscription.name.as_deref(),
    }
}

fn normalize_operation(operation: &OperationDefinition<'static, String>) -> Operation {
    match operation {
        OperationDefinition::SelectionSet(selection_set) => Operation {
            kind: OperationKind::Query,
            name: None,
            position: selection_set.span.0,
            variable_definitions: Vec::new(),
            selection_set: selection_set.clone(),
        },
        OperationDefinition::Query(query) => Operation {
            kind: OperationKind::Query,
            name: query.name.clone(),
            position: query.position,
            variable_definitions: query.variable_definitions.clone(),
            selection_set: query.selection_set.clone(),
        },
        OperationDefinition::Mutation(mutation) => Operation {
            kind: OperationKind::Mutation,
            name: mutation.name.clone(),
            position: mutation.position,
            variable_definitions: mutation.variable_definitions.clone(),
            selection_set: mutation.selection_set.clone(),
        },
        OperationDefinition::Subscription(subscription) => Operation {
            kind: OperationKind::Subscription,
            name: subscription.name.clone(),
            position: subscription.position,
            variable_definitions: subscription.variable_definitions.clone(),
            selection_set: subscription.selection_set.clone(),
        },
    }
}
