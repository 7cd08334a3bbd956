use std::sync::Arc;

use serde_json::Value;

/// Immutable, singly linked chain of response keys from the operation root to
/// one field or list index. Branches share their ancestors, so extending a
/// path never touches the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub prev: Option<Arc<Path>>,
    pub key: PathSegment,
    /// Name of the object type the field was collected on; list indices
    /// carry no type name.
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl Path {
    pub fn key(prev: Option<&Arc<Path>>, response_key: &str, type_name: &str) -> Arc<Path> {
        Arc::new(Path {
            prev: prev.cloned(),
            key: PathSegment::Key(response_key.to_string()),
            type_name: Some(type_name.to_string()),
        })
    }

    pub fn index(prev: &Arc<Path>, index: usize) -> Arc<Path> {
        Arc::new(Path {
            prev: Some(prev.clone()),
            key: PathSegment::Index(index),
            type_name: None,
        })
    }

    /// Projects the chain into the response-facing list of keys, root first,
    /// as attached to errors.
    pub fn as_list(&self) -> Vec<Value> {
        let mut segments = Vec::new();
        let mut current = Some(self);
        while let Some(path) = current {
            segments.push(match &path.key {
                PathSegment::Key(key) => Value::String(key.clone()),
                PathSegment::Index(index) => Value::from(*index as u64),
            });
            current = path.prev.as_deref();
        }
        segments.reverse();
        segments
    }
}
