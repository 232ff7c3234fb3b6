//! Deep Transform Engine: a recursive walker over `serde_json::Value` trees.
//!
//! [`deep_map`] hands every node (object, array or scalar) to a visitor
//! together with its key path from the root and the stack of ancestor objects.
//! The visitor decides whether the node is kept, replaced, or left untouched
//! without descending. When a node is replaced the walk continues into the
//! replacement, so a link marker swapped for the linked record gets that
//! record's own fields visited as well.
//!
//! # Cycle safety
//! The engine does not detect cycles itself. It supplies the [`ObjectStack`]
//! and every visitor that resolves references must check it before handing
//! back a linked record. A target already present on the stack resolves to
//! `null`.

use serde_json::{Map, Value};
use std::fmt;

/// One accessor in a key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathSegment::Key(key) => Some(key),
            PathSegment::Index(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{key}"),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// What the visitor wants done with a node.
#[derive(Debug)]
pub enum Step {
    /// Keep the node and descend into its children.
    Keep,
    /// Swap the node for the given value and descend into the replacement.
    Replace(Value),
    /// Keep the node verbatim; its children are not visited.
    Stop,
}

struct Frame<'a> {
    object: &'a Map<String, Value>,
    parent: Option<&'a Frame<'a>>,
}

/// Ancestor objects of the node being visited.
///
/// Each level holds the object as it was handed to the visitor, before any
/// replacement, so vendor identifiers stay visible even after a record has been
/// mapped into its canonical shape. When a scalar was replaced by an object, the
/// replacement is recorded instead. Arrays are not recorded.
#[derive(Clone, Copy)]
pub struct ObjectStack<'a> {
    top: Option<&'a Frame<'a>>,
}

impl<'a> ObjectStack<'a> {
    pub fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Ancestors from the closest parent up to the root.
    pub fn iter(&self) -> impl Iterator<Item = &'a Map<String, Value>> {
        let mut current = self.top;
        std::iter::from_fn(move || {
            let frame = current?;
            current = frame.parent;
            Some(frame.object)
        })
    }

    /// True when any ancestor satisfies the predicate.
    pub fn any<P>(&self, mut predicate: P) -> bool
    where
        P: FnMut(&Map<String, Value>) -> bool,
    {
        self.iter().any(|object| predicate(object))
    }
}

impl fmt::Debug for ObjectStack<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStack")
            .field("depth", &self.len())
            .finish()
    }
}

/// The visitor's view of a single node.
#[derive(Debug)]
pub struct Node<'a> {
    pub value: &'a Value,
    pub key_path: &'a [PathSegment],
    pub object_stack: ObjectStack<'a>,
}

impl Node<'_> {
    pub fn is_root(&self) -> bool {
        self.key_path.is_empty()
    }

    /// The key under which this node sits in its parent object, if any.
    pub fn last_key(&self) -> Option<&str> {
        self.key_path.last().and_then(PathSegment::as_key)
    }
}

/// Walks `root` depth first, in insertion order, and returns the rewritten tree.
///
/// The first error returned by `visit` aborts the walk.
pub fn deep_map<F, E>(root: &Value, mut visit: F) -> Result<Value, E>
where
    F: FnMut(&Node<'_>) -> Result<Step, E>,
{
    let mut key_path = Vec::new();
    walk(root, &mut key_path, None, &mut visit)
}

fn walk<F, E>(
    value: &Value,
    key_path: &mut Vec<PathSegment>,
    parent: Option<&Frame<'_>>,
    visit: &mut F,
) -> Result<Value, E>
where
    F: FnMut(&Node<'_>) -> Result<Step, E>,
{
    let step = visit(&Node {
        value,
        key_path: key_path.as_slice(),
        object_stack: ObjectStack { top: parent },
    })?;

    let replacement;
    let node = match step {
        Step::Stop => return Ok(value.clone()),
        Step::Keep => value,
        Step::Replace(replaced) => {
            replacement = replaced;
            &replacement
        }
    };

    match node {
        Value::Object(children) => {
            let recorded = match value {
                Value::Object(original) => original,
                _ => children,
            };
            let frame = Frame {
                object: recorded,
                parent,
            };
            let mut mapped = Map::with_capacity(children.len());
            for (key, child) in children {
                key_path.push(PathSegment::Key(key.clone()));
                let child = walk(child, key_path, Some(&frame), visit)?;
                key_path.pop();
                mapped.insert(key.clone(), child);
            }
            Ok(Value::Object(mapped))
        }
        Value::Array(items) => {
            let mut mapped = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                key_path.push(PathSegment::Index(index));
                let item = walk(item, key_path, parent, visit)?;
                key_path.pop();
                mapped.push(item);
            }
            Ok(Value::Array(mapped))
        }
        scalar => Ok(scalar.clone()),
    }
}
