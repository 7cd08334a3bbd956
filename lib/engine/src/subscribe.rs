use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;

use crate::collect::collect_fields;
use crate::context::{ExecutionArgs, ExecutionContext};
use crate::error::GraphQLError;
use crate::execute::{execute_operation, ExecutionResult};
use crate::path::Path;
use crate::resolved::Resolved;
use crate::resolver::{ResolveInfo, SourceEventStream};
use crate::values::get_argument_values;

/// One `ExecutionResult` per source event. A failure of the source stream
/// itself surfaces as a terminal `Err` item; dropping the stream drops the
/// source and cancels the subscription.
pub type SubscriptionStream = BoxStream<'static, Result<ExecutionResult, GraphQLError>>;

/// Sets up a subscription: resolves the root field to a source event stream
/// and maps every event through normal query-style execution of the
/// operation's selection set.
#[tracing::instrument(level = "trace", skip_all)]
pub fn subscribe(args: ExecutionArgs<'_>) -> Resolved<Result<SubscriptionStream, ExecutionResult>> {
    let ctx = match ExecutionContext::build(args) {
        Ok(ctx) => Arc::new(ctx),
        Err(errors) => return Resolved::Ready(Err(ExecutionResult::from_errors(errors))),
    };
    let event_ctx = ctx.clone();
    execute_subscription(ctx)
        .map(move |outcome| outcome.map(|source| map_source_to_response(event_ctx, source)))
}

/// Resolves only the source event stream, without attaching per-event
/// execution. A fatal setup failure is reported as a request-level result.
pub fn create_source_event_stream(
    args: ExecutionArgs<'_>,
) -> Resolved<Result<SourceEventStream, ExecutionResult>> {
    let ctx = match ExecutionContext::build(args) {
        Ok(ctx) => Arc::new(ctx),
        Err(errors) => return Resolved::Ready(Err(ExecutionResult::from_errors(errors))),
    };
    execute_subscription(ctx)
}

fn execute_subscription(
    ctx: Arc<ExecutionContext>,
) -> Resolved<Result<SourceEventStream, ExecutionResult>> {
    let groups = collect_fields(
        &ctx.schema,
        &ctx.fragments,
        &ctx.variable_values,
        &ctx.root_type_name,
        &ctx.operation.selection_set,
    );

    let mut groups = groups.into_iter();
    let group = match (groups.next(), groups.next()) {
        (Some(group), None) => group,
        _ => {
            return fatal(GraphQLError::located(
                "Subscription operations must select only one top level field.",
                &[ctx.operation.position],
                None,
            ));
        }
    };

    let positions: Vec<_> = group.fields.iter().map(|field| field.position).collect();
    let field_name = group.field_name();
    let Some(field_def) = ctx.schema.get_field(&ctx.root_type_name, field_name) else {
        return fatal(GraphQLError::located(
            format!("The subscription field '{}' is not defined.", field_name),
            &positions,
            None,
        ));
    };

    let arguments = match get_argument_values(
        &ctx.schema,
        field_def,
        &group.fields[0],
        &ctx.variable_values,
    ) {
        Ok(arguments) => arguments,
        Err(error) => return fatal(error),
    };

    let path = Path::key(None, &group.response_key, &ctx.root_type_name);
    let info = Arc::new(ResolveInfo {
        field_name: field_def.name.clone(),
        parent_type: ctx.root_type_name.clone(),
        return_type: field_def.field_type.clone(),
        path,
        positions: positions.clone(),
        schema: ctx.schema.clone(),
        operation: ctx.operation.kind,
        variable_values: ctx.variable_values.clone(),
        root_value: ctx.root_value.clone(),
        context_value: ctx.context_value.clone(),
    });

    let subscriber = field_def
        .subscribe
        .clone()
        .unwrap_or_else(|| ctx.subscribe_field_resolver.clone());

    subscriber(&ctx.root_value, &arguments, &info).map(move |outcome| {
        outcome.map_err(|error| {
            ExecutionResult::from_errors(vec![GraphQLError::from_resolver(
                error, &positions, None,
            )])
        })
    })
}

fn fatal(error: GraphQLError) -> Resolved<Result<SourceEventStream, ExecutionResult>> {
    Resolved::Ready(Err(ExecutionResult::from_errors(vec![error])))
}

fn map_source_to_response(
    ctx: Arc<ExecutionContext>,
    mut source: SourceEventStream,
) -> SubscriptionStream {
    Box::pin(async_stream::stream! {
        while let Some(event) = source.next().await {
            match event {
                Ok(payload) => {
                    let event_ctx = Arc::new(ctx.for_event(payload));
                    let completed = execute_operation(event_ctx.clone()).finish().await;
                    let data = completed.unwrap_or(Value::Null);
                    yield Ok(ExecutionResult::new(Some(data), event_ctx.take_errors()));
                }
                Err(error) => {
                    yield Err(GraphQLError::from_resolver(error, &[], None));
                    return;
                }
            }
        }
    })
}
