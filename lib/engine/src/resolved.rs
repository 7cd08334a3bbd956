use std::future::Future;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::ResolverError;

/// A value that is either already settled or still being computed. This is
/// the one seam unifying synchronous and asynchronous execution: every
/// internal step produces a `Resolved`, and a call whose branches all settle
/// synchronously stays `Ready` end to end without touching a scheduler.
pub enum Resolved<T> {
    Ready(T),
    Pending(BoxFuture<'static, T>),
}

impl<T: Send + 'static> Resolved<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Resolved::Ready(_))
    }

    pub fn map<U: Send + 'static>(
        self,
        map_fn: impl FnOnce(T) -> U + Send + 'static,
    ) -> Resolved<U> {
        match self {
            Resolved::Ready(value) => Resolved::Ready(map_fn(value)),
            Resolved::Pending(future) => {
                Resolved::Pending(Box::pin(async move { map_fn(future.await) }))
            }
        }
    }

    pub fn then<U: Send + 'static>(
        self,
        then_fn: impl FnOnce(T) -> Resolved<U> + Send + 'static,
    ) -> Resolved<U> {
        match self {
            Resolved::Ready(value) => then_fn(value),
            Resolved::Pending(future) => Resolved::Pending(Box::pin(async move {
                then_fn(future.await).finish().await
            })),
        }
    }

    /// Settles a set of independent branches while preserving their order.
    /// Every branch has already been started eagerly by the caller; pending
    /// branches are polled concurrently, and when none are pending the
    /// combined result is assembled without a scheduler hop.
    pub fn all(items: Vec<Resolved<T>>) -> Resolved<Vec<T>> {
        let any_pending = items.iter().any(|item| matches!(item, Resolved::Pending(_)));
        if any_pending {
            Resolved::Pending(Box::pin(async move {
                futures::future::join_all(items.into_iter().map(|item| item.finish())).await
            }))
        } else {
            Resolved::Ready(
                items
                    .into_iter()
                    .map(|item| match item {
                        Resolved::Ready(value) => value,
                        Resolved::Pending(_) => unreachable!("checked above"),
                    })
                    .collect(),
            )
        }
    }

    pub async fn finish(self) -> T {
        match self {
            Resolved::Ready(value) => value,
            Resolved::Pending(future) => future.await,
        }
    }
}

/// What a field resolver hands back to the engine.
///
/// `Error` is a first-class value rather than only a control-flow path so
/// that a resolver can return errors *as data*, including per item inside a
/// `List` mixing settled values, errors and futures.
pub enum ResolvedValue {
    Ready(Value),
    Error(ResolverError),
    List(Vec<ResolvedValue>),
    Pending(BoxFuture<'static, ResolvedValue>),
}

impl ResolvedValue {
    pub fn value(value: impl Into<Value>) -> ResolvedValue {
        ResolvedValue::Ready(value.into())
    }

    pub fn null() -> ResolvedValue {
        ResolvedValue::Ready(Value::Null)
    }

    pub fn error(message: impl Into<String>) -> ResolvedValue {
        ResolvedValue::Error(ResolverError::new(message))
    }

    pub fn items(items: Vec<ResolvedValue>) -> ResolvedValue {
        ResolvedValue::List(items)
    }

    pub fn future(future: impl Future<Output = ResolvedValue> + Send + 'static) -> ResolvedValue {
        ResolvedValue::Pending(Box::pin(future))
    }
}

impl From<Value> for ResolvedValue {
    fn from(value: Value) -> ResolvedValue {
        ResolvedValue::Ready(value)
    }
}
