pub mod collect;
pub mod context;
pub mod error;
pub mod execute;
pub mod path;
pub mod resolved;
pub mod resolver;
pub mod schema;
pub mod subscribe;
pub mod values;

pub use context::{ExecutionArgs, ExecutionContext, OperationKind};
pub use error::{GraphQLError, GraphQLErrorLocation, ResolverError};
pub use execute::{execute, ExecutionResult};
pub use path::{Path, PathSegment};
pub use resolved::{Resolved, ResolvedValue};
pub use resolver::{
    default_field_resolver, default_type_resolver, FieldResolverFn, ResolveInfo,
    SourceEventStream, SubscribeFn, TypeResolverFn,
};
pub use schema::{Schema, SchemaError};
pub use subscribe::{create_source_event_stream, subscribe, SubscriptionStream};

pub const TYPENAME_FIELD: &str = "__typename";

#[cfg(test)]
mod tests;
