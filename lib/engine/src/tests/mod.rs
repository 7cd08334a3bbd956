mod queries;
mod subscriptions;

use std::sync::Arc;

use graphql_parser::query::Document;
use serde_json::Value;

use crate::{execute, ExecutionArgs, ExecutionResult, Resolved, Schema};

pub(crate) fn parse(query: &str) -> Document<'static, String> {
    graphql_parser::parse_query::<String>(query)
        .expect("query must parse")
        .into_static()
}

pub(crate) fn sdl(schema: &str) -> Arc<Schema> {
    Arc::new(Schema::from_sdl(schema).expect("schema must build"))
}

/// Runs an operation that is expected to settle without yielding to a
/// scheduler; panics if any step went pending.
pub(crate) fn execute_sync(args: ExecutionArgs<'_>) -> ExecutionResult {
    match execute(args) {
        Resolved::Ready(result) => result,
        Resolved::Pending(_) => panic!("execution went pending, expected synchronous completion"),
    }
}

/// `(message, path)` pairs of all recorded errors, in response order.
pub(crate) fn error_summaries(result: &ExecutionResult) -> Vec<(String, Option<Vec<Value>>)> {
    result
        .errors
        .iter()
        .flatten()
        .map(|error| (error.message.clone(), error.path.clone()))
        .collect()
}
