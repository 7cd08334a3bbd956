use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use super::{error_summaries, execute_sync, parse, sdl};
use crate::{execute, ExecutionArgs, GraphQLErrorLocation, ResolvedValue};

#[test]
fn resolves_fields_from_the_root_value() {
    let schema = sdl("type Query { a: String b: String }");
    let document = parse("{ a b }");
    let result = execute_sync(
        ExecutionArgs::new(schema, &document).root_value(json!({ "a": "Apple", "b": "Banana" })),
    );

    assert_eq!(result.data, Some(json!({ "a": "Apple", "b": "Banana" })));
    assert_eq!(result.errors, None);
}

#[test]
fn response_keys_follow_query_order() {
    let schema = sdl("type Query { a: String b: String }");
    let document = parse("{ b a }");
    let result = execute_sync(
        ExecutionArgs::new(schema, &document).root_value(json!({ "a": "Apple", "b": "Banana" })),
    );

    let data = serde_json::to_string(&result.data.unwrap()).unwrap();
    assert_eq!(data, r#"{"b":"Banana","a":"Apple"}"#);
}

#[test]
fn aliases_rename_response_keys() {
    let schema = sdl("type Query { a: String }");
    let document = parse("{ first: a second: a }");
    let result =
        execute_sync(ExecutionArgs::new(schema, &document).root_value(json!({ "a": "Apple" })));

    assert_eq!(
        result.data,
        Some(json!({ "first": "Apple", "second": "Apple" }))
    );
}

#[test]
fn typename_resolves_without_a_field_definition() {
    let schema = sdl("type Query { a: String }");
    let document = parse("{ __typename a }");
    let result =
        execute_sync(ExecutionArgs::new(schema, &document).root_value(json!({ "a": "Apple" })));

    assert_eq!(
        result.data,
        Some(json!({ "__typename": "Query", "a": "Apple" }))
    );
}

#[test]
fn undefined_fields_are_omitted_from_the_response() {
    let schema = sdl("type Query { a: String }");
    let document = parse("{ a missing }");
    let result =
        execute_sync(ExecutionArgs::new(schema, &document).root_value(json!({ "a": "Apple" })));

    assert_eq!(result.data, Some(json!({ "a": "Apple" })));
    assert_eq!(result.errors, None);
}

#[test]
fn attached_resolvers_take_precedence_over_the_default() {
    let schema = std::sync::Arc::new(
        crate::Schema::from_sdl("type Query { greeting: String }")
            .unwrap()
            .with_resolver("Query", "greeting", |_, _, _| ResolvedValue::value("hello")),
    );
    let document = parse("{ greeting }");
    let result = execute_sync(ExecutionArgs::new(schema, &document));

    assert_eq!(result.data, Some(json!({ "greeting": "hello" })));
}

#[test]
fn sync_errors_are_isolated_per_field() {
    let schema = std::sync::Arc::new(
        crate::Schema::from_sdl("type Query { syncOk: String syncError: String }")
            .unwrap()
            .with_resolver("Query", "syncOk", |_, _, _| ResolvedValue::value("ok"))
            .with_resolver("Query", "syncError", |_, _, _| ResolvedValue::error("boom")),
    );
    let document = parse("{ syncOk syncError }");
    let result = execute_sync(ExecutionArgs::new(schema, &document));

    assert_eq!(
        result.data,
        Some(json!({ "syncOk": "ok", "syncError": null }))
    );
    let errors = result.errors.as_ref().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "boom");
    assert_eq!(errors[0].path, Some(vec![json!("syncError")]));
    assert_eq!(
        errors[0].locations,
        Some(vec![GraphQLErrorLocation { line: 1, column: 10 }])
    );
}

#[test]
fn async_resolvers_produce_the_same_data_as_sync_ones() {
    let document = parse("{ a b }");

    let sync_schema = std::sync::Arc::new(
        crate::Schema::from_sdl("type Query { a: String b: String }")
            .unwrap()
            .with_resolver("Query", "a", |_, _, _| ResolvedValue::value("Apple"))
            .with_resolver("Query", "b", |_, _, _| ResolvedValue::value("Banana")),
    );
    let sync_result = execute_sync(ExecutionArgs::new(sync_schema, &document));

    let async_schema = std::sync::Arc::new(
        crate::Schema::from_sdl("type Query { a: String b: String }")
            .unwrap()
            .with_resolver("Query", "a", |_, _, _| {
                ResolvedValue::future(async { ResolvedValue::value("Apple") })
            })
            .with_resolver("Query", "b", |_, _, _| {
                ResolvedValue::future(async { ResolvedValue::value("Banana") })
            }),
    );
    let async_result =
        tokio_test::block_on(execute(ExecutionArgs::new(async_schema, &document)).finish());

    assert_eq!(sync_result.data, async_result.data);
    assert_eq!(sync_result.errors, async_result.errors);
}

#[test]
fn fragment_spreads_and_inline_fragments_merge_fields() {
    let schema = sdl("type Query { a: String b: String c: String }");
    let document = parse(
        "query { a ...Rest ... on Query { c } } fragment Rest on Query { b }",
    );
    let result = execute_sync(ExecutionArgs::new(schema, &document).root_value(json!({
        "a": "1", "b": "2", "c": "3"
    })));

    assert_eq!(result.data, Some(json!({ "a": "1", "b": "2", "c": "3" })));
}

#[test]
fn skip_and_include_directives_drop_selections() {
    let schema = sdl("type Query { a: String b: String c: String }");
    let document = parse("{ a @skip(if: true) b @include(if: false) c @include(if: true) }");
    let result = execute_sync(ExecutionArgs::new(schema, &document).root_value(json!({
        "a": "1", "b": "2", "c": "3"
    })));

    assert_eq!(result.data, Some(json!({ "c": "3" })));
}

#[test]
fn nested_objects_complete_recursively() {
    let schema = sdl("type Query { user: User } type User { name: String pet: Pet } type Pet { name: String }");
    let document = parse("{ user { name pet { name } } }");
    let result = execute_sync(ExecutionArgs::new(schema, &document).root_value(json!({
        "user": { "name": "Ada", "pet": { "name": "Rex" } }
    })));

    assert_eq!(
        result.data,
        Some(json!({ "user": { "name": "Ada", "pet": { "name": "Rex" } } }))
    );
}

#[test]
fn multiple_operations_require_an_operation_name() {
    let schema = sdl("type Query { a: String }");
    let document = parse("query One { a } query Two { a }");
    let result = execute_sync(ExecutionArgs::new(schema, &document));

    assert_eq!(result.data, None);
    assert_eq!(
        error_summaries(&result),
        vec![(
            "Must provide operation name if query contains multiple operations.".to_string(),
            None
        )]
    );
}

#[test]
fn unknown_operation_names_are_rejected() {
    let schema = sdl("type Query { a: String }");
    let document = parse("query One { a }");
    let result = execute_sync(ExecutionArgs::new(schema, &document).operation_name("Missing"));

    assert_eq!(result.data, None);
    assert_eq!(
        error_summaries(&result),
        vec![("Unknown operation named 'Missing'.".to_string(), None)]
    );
}

#[test]
fn named_operation_is_selected_among_several() {
    let schema = sdl("type Query { a: String b: String }");
    let document = parse("query One { a } query Two { b }");
    let result = execute_sync(
        ExecutionArgs::new(schema, &document)
            .operation_name("Two")
            .root_value(json!({ "a": "Apple", "b": "Banana" })),
    );

    assert_eq!(result.data, Some(json!({ "b": "Banana" })));
}

#[test]
fn unconfigured_operation_kinds_are_rejected() {
    let schema = sdl("type Query { a: String }");
    let document = parse("mutation { a }");
    let result = execute_sync(ExecutionArgs::new(schema, &document));

    assert_eq!(result.data, None);
    assert_eq!(
        error_summaries(&result),
        vec![(
            "Schema is not configured to execute mutation operation.".to_string(),
            None
        )]
    );
}

#[test]
fn scalar_serialization_failures_are_field_errors() {
    let schema = sdl("type Query { count: Int }");
    let document = parse("{ count }");
    let result = execute_sync(
        ExecutionArgs::new(schema, &document).root_value(json!({ "count": "not a number" })),
    );

    assert_eq!(result.data, Some(json!({ "count": null })));
    assert_eq!(
        error_summaries(&result),
        vec![(
            "Int cannot represent non-integer value: \"not a number\"".to_string(),
            Some(vec![Value::String("count".into())])
        )]
    );
}

#[test]
fn enum_membership_is_enforced_on_output() {
    let schema = sdl("enum Color { RED GREEN } type Query { color: Color }");
    let document = parse("{ color }");

    let ok = execute_sync(
        ExecutionArgs::new(schema.clone(), &document).root_value(json!({ "color": "RED" })),
    );
    assert_eq!(ok.data, Some(json!({ "color": "RED" })));

    let bad =
        execute_sync(ExecutionArgs::new(schema, &document).root_value(json!({ "color": "BLUE" })));
    assert_eq!(bad.data, Some(json!({ "color": null })));
    assert_eq!(
        error_summaries(&bad),
        vec![(
            "Enum 'Color' cannot represent value: \"BLUE\"".to_string(),
            Some(vec![Value::String("color".into())])
        )]
    );
}

#[test]
fn errors_past_the_limit_collapse_into_a_marker() {
    let schema = std::sync::Arc::new(
        crate::Schema::from_sdl("type Query { a: String b: String c: String }")
            .unwrap()
            .with_resolver("Query", "a", |_, _, _| ResolvedValue::error("a failed"))
            .with_resolver("Query", "b", |_, _, _| ResolvedValue::error("b failed"))
            .with_resolver("Query", "c", |_, _, _| ResolvedValue::error("c failed")),
    );
    let document = parse("{ a b c }");
    let result = execute_sync(ExecutionArgs::new(schema, &document).max_errors(1));

    assert_eq!(
        result.data,
        Some(json!({ "a": null, "b": null, "c": null }))
    );
    let errors = result.errors.unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].message, "a failed");
    assert_eq!(
        errors[1].message,
        "Too many errors processed, execution aborted."
    );
}

#[test]
fn error_extensions_survive_into_the_response() {
    let schema = std::sync::Arc::new(
        crate::Schema::from_sdl("type Query { guarded: String }")
            .unwrap()
            .with_resolver("Query", "guarded", |_, _, _| {
                let mut extensions = serde_json::Map::new();
                extensions.insert("code".to_string(), json!("FORBIDDEN"));
                ResolvedValue::Error(
                    crate::ResolverError::new("not allowed").with_extensions(extensions),
                )
            }),
    );
    let document = parse("{ guarded }");
    let result = execute_sync(ExecutionArgs::new(schema, &document));

    let errors = result.errors.unwrap();
    assert_eq!(errors[0].message, "not allowed");
    assert_eq!(
        errors[0].extensions.as_ref().unwrap().get("code"),
        Some(&json!("FORBIDDEN"))
    );
}
