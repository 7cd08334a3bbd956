use graphql_parser::Pos;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphQLError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<GraphQLErrorLocation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>, // Path segments can be strings or numbers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphQLErrorLocation {
    pub line: usize,
    pub column: usize,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> GraphQLError {
        GraphQLError {
            message: message.into(),
            locations: None,
            path: None,
            extensions: None,
        }
    }

    /// Attaches source positions and the response path at the point where the
    /// error was first detected. Ancestors never re-locate an error; only its
    /// nulling effect propagates upward.
    pub fn located(message: impl Into<String>, positions: &[Pos], path: Option<&Path>) -> GraphQLError {
        GraphQLError {
            message: message.into(),
            locations: if positions.is_empty() {
                None
            } else {
                Some(
                    positions
                        .iter()
                        .map(|pos| GraphQLErrorLocation {
                            line: pos.line,
                            column: pos.column,
                        })
                        .collect(),
                )
            },
            path: path.map(Path::as_list),
            extensions: None,
        }
    }

    pub(crate) fn from_resolver(
        error: ResolverError,
        positions: &[Pos],
        path: Option<&Path>,
    ) -> GraphQLError {
        let mut located = GraphQLError::located(error.message, positions, path);
        located.extensions = error.extensions;
        located
    }
}

/// The error type resolvers hand back to the engine, either as a returned
/// value (`ResolvedValue::Error`, also legal inside list items) or out of a
/// pending future. It is turned into a located `GraphQLError` exactly once.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ResolverError {
    pub message: String,
    pub extensions: Option<Map<String, Value>>,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> ResolverError {
        ResolverError {
            message: message.into(),
            extensions: None,
        }
    }

    pub fn with_extensions(mut self, extensions: Map<String, Value>) -> ResolverError {
        self.extensions = Some(extensions);
        self
    }
}

impl From<String> for ResolverError {
    fn from(message: String) -> ResolverError {
        ResolverError::new(message)
    }
}

impl From<&str> for ResolverError {
    fn from(message: &str) -> ResolverError {
        ResolverError::new(message)
    }
}
