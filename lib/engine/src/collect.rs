use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use graphql_parser::query::{
    Directive, Field, FragmentDefinition, Selection, SelectionSet, TypeCondition,
    Value as AstValue,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::schema::Schema;

/// One response-map entry: every field node that merged into the same
/// response key, in document order. Shared so that deferred completion work
/// can hold the group without cloning the AST.
pub struct FieldGroup {
    pub response_key: String,
    pub fields: Vec<Field<'static, String>>,
}

impl FieldGroup {
    /// The field nodes of a group always share a name; aliases only affect
    /// the response key.
    pub fn field_name(&self) -> &str {
        &self.fields[0].name
    }
}

/// Collects the grouped field set of a selection set against a concrete
/// object type: flattens fragments, applies `@skip`/`@include` and merges
/// same-keyed fields in document order.
pub fn collect_fields(
    schema: &Schema,
    fragments: &HashMap<String, FragmentDefinition<'static, String>>,
    variables: &Map<String, Value>,
    object_type: &str,
    selection_set: &SelectionSet<'static, String>,
) -> Vec<Arc<FieldGroup>> {
    let mut grouped: IndexMap<String, Vec<Field<'static, String>>> = IndexMap::new();
    let mut visited_fragments = HashSet::new();
    collect_into(
        schema,
        fragments,
        variables,
        object_type,
        selection_set,
        &mut grouped,
        &mut visited_fragments,
    );
    grouped
        .into_iter()
        .map(|(response_key, fields)| Arc::new(FieldGroup { response_key, fields }))
        .collect()
}

/// Collects the merged subfields of an already-grouped field, one selection
/// set per field node in the group.
pub fn collect_subfields(
    schema: &Schema,
    fragments: &HashMap<String, FragmentDefinition<'static, String>>,
    variables: &Map<String, Value>,
    object_type: &str,
    group: &FieldGroup,
) -> Vec<Arc<FieldGroup>> {
    let mut grouped: IndexMap<String, Vec<Field<'static, String>>> = IndexMap::new();
    let mut visited_fragments = HashSet::new();
    for field in &group.fields {
        collect_into(
            schema,
            fragments,
            variables,
            object_type,
            &field.selection_set,
            &mut grouped,
            &mut visited_fragments,
        );
    }
    grouped
        .into_iter()
        .map(|(response_key, fields)| Arc::new(FieldGroup { response_key, fields }))
        .collect()
}

fn collect_into(
    schema: &Schema,
    fragments: &HashMap<String, FragmentDefinition<'static, String>>,
    variables: &Map<String, Value>,
    object_type: &str,
    selection_set: &SelectionSet<'static, String>,
    grouped: &mut IndexMap<String, Vec<Field<'static, String>>>,
    visited_fragments: &mut HashSet<String>,
) {
    for selection in &selection_set.items {
        match selection {
            Selection::Field(field) => {
                if !should_include(&field.directives, variables) {
                    continue;
                }
                let response_key = field.alias.as_ref().unwrap_or(&field.name).clone();
                grouped.entry(response_key).or_default().push(field.clone());
            }
            Selection::FragmentSpread(spread) => {
                if !should_include(&spread.directives, variables)
                    || !visited_fragments.insert(spread.fragment_name.clone())
                {
                    continue;
                }
                let Some(fragment) = fragments.get(&spread.fragment_name) else {
                    continue;
                };
                let TypeCondition::On(condition) = &fragment.type_condition;
                if !schema.type_condition_applies(condition, object_type) {
                    continue;
                }
                collect_into(
                    schema,
                    fragments,
                    variables,
                    object_type,
                    &fragment.selection_set,
                    grouped,
                    visited_fragments,
                );
            }
            Selection::InlineFragment(inline) => {
                if !should_include(&inline.directives, variables) {
                    continue;
                }
                if let Some(TypeCondition::On(condition)) = &inline.type_condition {
                    if !schema.type_condition_applies(condition, object_type) {
                        continue;
                    }
                }
                collect_into(
                    schema,
                    fragments,
                    variables,
                    object_type,
                    &inline.selection_set,
                    grouped,
                    visited_fragments,
                );
            }
        }
    }
}

/// `@skip` wins over `@include`; an `@include` whose condition is unset or
/// false drops the selection.
fn should_include(directives: &[Directive<'static, String>], variables: &Map<String, Value>) -> bool {
    if directive_condition(directives, "skip", variables) == Some(true) {
        return false;
    }
    if directives.iter().any(|directive| directive.name == "include")
        && directive_condition(directives, "include", variables) != Some(true)
    {
        return false;
    }
    true
}

fn directive_condition(
    directives: &[Directive<'static, String>],
    name: &str,
    variables: &Map<String, Value>,
) -> Option<bool> {
    let directive = directives.iter().find(|directive| directive.name == name)?;
    let (_, condition) = directive
        .arguments
        .iter()
        .find(|(arg_name, _)| arg_name == "if")?;
    match condition {
        AstValue::Boolean(boolean) => Some(*boolean),
        AstValue::Variable(variable) => variables.get(variable).and_then(Value::as_bool),
        _ => None,
    }
}
