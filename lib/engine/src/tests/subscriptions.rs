use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use super::{error_summaries, parse};
use crate::{
    create_source_event_stream, subscribe, ExecutionArgs, Resolved, ResolverError, Schema,
    SourceEventStream, SubscriptionStream,
};

const COUNTER_SDL: &str =
    "type Query { ok: String } type Subscription { counter: Int }";

fn counter_schema(events: Vec<Result<Value, ResolverError>>) -> Arc<Schema> {
    let events = std::sync::Mutex::new(Some(events));
    Arc::new(
        Schema::from_sdl(COUNTER_SDL)
            .unwrap()
            .with_subscribe("Subscription", "counter", move |_, _, _| {
                let events = events.lock().unwrap().take().expect("single subscription");
                let stream: SourceEventStream = Box::pin(futures::stream::iter(events));
                Resolved::Ready(Ok(stream))
            }),
    )
}

async fn open_stream(schema: Arc<Schema>, query: &str) -> SubscriptionStream {
    let document = parse(query);
    subscribe(ExecutionArgs::new(schema, &document))
        .finish()
        .await
        .expect("subscription must start")
}

#[tokio::test]
async fn each_event_is_executed_against_the_selection_set() {
    let schema = counter_schema(vec![
        Ok(json!({ "counter": 1 })),
        Ok(json!({ "counter": 2 })),
        Ok(json!({ "counter": 3 })),
    ]);
    let mut stream = open_stream(schema, "subscription { counter }").await;

    let mut seen = Vec::new();
    while let Some(item) = stream.next().await {
        seen.push(item.unwrap().data.unwrap());
    }
    assert_eq!(
        seen,
        vec![
            json!({ "counter": 1 }),
            json!({ "counter": 2 }),
            json!({ "counter": 3 }),
        ]
    );
}

#[tokio::test]
async fn field_errors_in_one_event_do_not_end_the_stream() {
    let schema = counter_schema(vec![
        Ok(json!({ "counter": 1 })),
        Ok(json!({ "counter": "oops" })),
        Ok(json!({ "counter": 3 })),
    ]);
    let mut stream = open_stream(schema, "subscription { counter }").await;

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.data, Some(json!({ "counter": 1 })));
    assert_eq!(first.errors, None);

    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second.data, Some(json!({ "counter": null })));
    assert_eq!(
        error_summaries(&second),
        vec![(
            "Int cannot represent non-integer value: \"oops\"".to_string(),
            Some(vec![json!("counter")])
        )]
    );

    let third = stream.next().await.unwrap().unwrap();
    assert_eq!(third.data, Some(json!({ "counter": 3 })));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn source_stream_failures_end_the_stream_with_an_error() {
    let schema = counter_schema(vec![
        Ok(json!({ "counter": 1 })),
        Err(ResolverError::new("source went away")),
        Ok(json!({ "counter": 3 })),
    ]);
    let mut stream = open_stream(schema, "subscription { counter }").await;

    assert!(stream.next().await.unwrap().is_ok());
    let failure = stream.next().await.unwrap().unwrap_err();
    assert_eq!(failure.message, "source went away");
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn the_source_event_stream_yields_raw_payloads() {
    let schema = counter_schema(vec![
        Ok(json!({ "counter": 1 })),
        Ok(json!({ "counter": 2 })),
    ]);
    let document = parse("subscription { counter }");
    let mut source = create_source_event_stream(ExecutionArgs::new(schema, &document))
        .finish()
        .await
        .expect("setup must succeed");

    assert_eq!(
        source.next().await.unwrap().unwrap(),
        json!({ "counter": 1 })
    );
    assert_eq!(
        source.next().await.unwrap().unwrap(),
        json!({ "counter": 2 })
    );
    assert!(source.next().await.is_none());
}

#[tokio::test]
async fn source_stream_setup_failures_are_request_level_results() {
    let schema = counter_schema(vec![]);
    let document = parse("subscription { counter second: counter }");
    let outcome = create_source_event_stream(ExecutionArgs::new(schema, &document))
        .finish()
        .await;

    let result = outcome.err().expect("setup must fail");
    assert_eq!(result.data, None);
    assert_eq!(
        error_summaries(&result),
        vec![(
            "Subscription operations must select only one top level field.".to_string(),
            None
        )]
    );
}

#[tokio::test]
async fn subscriptions_must_select_a_single_root_field() {
    let schema = counter_schema(vec![]);
    let document = parse("subscription { counter second: counter }");
    let outcome = subscribe(ExecutionArgs::new(schema, &document))
        .finish()
        .await;

    let result = outcome.err().expect("setup must fail");
    assert_eq!(result.data, None);
    assert_eq!(
        error_summaries(&result),
        vec![(
            "Subscription operations must select only one top level field.".to_string(),
            None
        )]
    );
}

#[tokio::test]
async fn undefined_subscription_fields_fail_the_setup() {
    let schema = counter_schema(vec![]);
    let document = parse("subscription { unknownField }");
    let outcome = subscribe(ExecutionArgs::new(schema, &document))
        .finish()
        .await;

    let result = outcome.err().expect("setup must fail");
    assert_eq!(
        error_summaries(&result),
        vec![(
            "The subscription field 'unknownField' is not defined.".to_string(),
            None
        )]
    );
}

#[tokio::test]
async fn fields_without_a_subscriber_fail_the_setup() {
    let schema = Arc::new(Schema::from_sdl(COUNTER_SDL).unwrap());
    let document = parse("subscription { counter }");
    let outcome = subscribe(ExecutionArgs::new(schema, &document))
        .finish()
        .await;

    let result = outcome.err().expect("setup must fail");
    assert_eq!(
        error_summaries(&result),
        vec![(
            "Subscription field must return an event stream. Received: null.".to_string(),
            None
        )]
    );
}

#[tokio::test]
async fn dropping_the_response_stream_cancels_the_source() {
    struct DropFlag(Arc<AtomicBool>);
    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    let dropped = Arc::new(AtomicBool::new(false));
    let flag = dropped.clone();
    let schema = Arc::new(
        Schema::from_sdl(COUNTER_SDL)
            .unwrap()
            .with_subscribe("Subscription", "counter", move |_, _, _| {
                let guard = DropFlag(flag.clone());
                let stream: SourceEventStream = Box::pin(async_stream::stream! {
                    let _guard = guard;
                    let mut count = 0;
                    loop {
                        count += 1;
                        yield Ok(json!({ "counter": count }));
                    }
                });
                Resolved::Ready(Ok(stream))
            }),
    );

    let mut stream = open_stream(schema, "subscription { counter }").await;
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.data, Some(json!({ "counter": 1 })));
    assert!(!dropped.load(Ordering::SeqCst));

    drop(stream);
    assert!(dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn variables_reach_the_subscriber() {
    let schema = Arc::new(
        Schema::from_sdl(
            "type Query { ok: String } type Subscription { counter(from: Int!): Int }",
        )
        .unwrap()
        .with_subscribe("Subscription", "counter", |_, arguments, _| {
            let from = arguments.get("from").and_then(Value::as_i64).unwrap();
            let stream: SourceEventStream =
                Box::pin(futures::stream::iter([Ok(json!({ "counter": from }))]));
            Resolved::Ready(Ok(stream))
        }),
    );
    let document = parse("subscription Count($from: Int!) { counter(from: $from) }");
    let mut variables = serde_json::Map::new();
    variables.insert("from".to_string(), json!(7));
    let mut stream = subscribe(
        ExecutionArgs::new(schema, &document).variable_values(variables),
    )
    .finish()
    .await
    .expect("subscription must start");

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.data, Some(json!({ "counter": 7 })));
}
