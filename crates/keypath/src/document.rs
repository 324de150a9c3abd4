//! Reading and writing JSON documents through key paths.
//!
//! `search` expands wildcards into every concrete location that exists in the
//! document. `set` only accepts concrete locations and creates intermediate
//! objects/arrays on the way down.

use crate::error::{PathError, Result};
use crate::keypath::{KeyPath, Segment};
use serde_json::{Map, Value};

/// One concrete location found while searching a document
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'a> {
    pub location: KeyPath,
    pub value: &'a Value,
}

/// Short name of a JSON value's kind, used in error messages
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// All concrete matches of `path` in document order
pub fn search<'a>(document: &'a Value, path: &KeyPath) -> Vec<Match<'a>> {
    let mut found = Vec::new();
    // (depth, concrete segments so far, value); popped LIFO so children are
    // pushed in reverse to keep document order
    let mut stack: Vec<(usize, Vec<Segment>, &'a Value)> = vec![(0, Vec::new(), document)];

    while let Some((depth, prefix, value)) = stack.pop() {
        if depth == path.len() {
            found.push(Match {
                location: KeyPath::new(prefix),
                value,
            });
            continue;
        }
        match (path.get(depth), value) {
            (Segment::Name(name), Value::Object(map)) => {
                if let Some(child) = map.get(name) {
                    let mut next = prefix;
                    next.push(Segment::Name(name.clone()));
                    stack.push((depth + 1, next, child));
                }
            }
            (Segment::Index(index), Value::Array(items)) => {
                if let Some(child) = items.get(*index) {
                    let mut next = prefix;
                    next.push(Segment::Index(*index));
                    stack.push((depth + 1, next, child));
                }
            }
            (Segment::Wildcard, Value::Array(items)) => {
                for (index, child) in items.iter().enumerate().rev() {
                    let mut next = prefix.clone();
                    next.push(Segment::Index(index));
                    stack.push((depth + 1, next, child));
                }
            }
            _ => {}
        }
    }

    found
}

/// Value at a concrete location
pub fn get<'a>(document: &'a Value, location: &KeyPath) -> Option<&'a Value> {
    let mut current = document;
    for segment in location {
        current = match (segment, current) {
            (Segment::Name(name), Value::Object(map)) => map.get(name)?,
            (Segment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

pub fn get_mut<'a>(document: &'a mut Value, location: &KeyPath) -> Option<&'a mut Value> {
    let mut current = document;
    for segment in location {
        current = match (segment, current) {
            (Segment::Name(name), Value::Object(map)) => map.get_mut(name)?,
            (Segment::Index(index), Value::Array(items)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at a concrete location, creating containers as needed.
///
/// Missing array slots before the target index are filled with `null`.
/// Writing into an existing value of the wrong kind fails without touching
/// the document.
pub fn set(document: &mut Value, location: &KeyPath, value: Value) -> Result<()> {
    check_writable(document, location)?;
    let mut current = document;
    for segment in location {
        current = descend_or_create(current, segment);
    }
    *current = value;
    Ok(())
}

fn check_writable(document: &Value, location: &KeyPath) -> Result<()> {
    let mut current = Some(document);
    for (depth, segment) in location.iter().enumerate() {
        let here = match current {
            Some(value) => value,
            // everything below a missing child gets created
            None => {
                if location.iter().skip(depth).any(Segment::is_wildcard) {
                    return Err(PathError::WildcardInLocation(location.clone()));
                }
                return Ok(());
            }
        };
        current = match (segment, here) {
            (Segment::Wildcard, _) => return Err(PathError::WildcardInLocation(location.clone())),
            (_, Value::Null) => None,
            (Segment::Name(name), Value::Object(map)) => map.get(name),
            (Segment::Index(index), Value::Array(items)) => items.get(*index),
            (Segment::Name(_), other) => {
                return Err(PathError::Shape {
                    at: location.slice(0, depth),
                    expected: "object",
                    found: value_kind(other),
                })
            }
            (Segment::Index(_), other) => {
                return Err(PathError::Shape {
                    at: location.slice(0, depth),
                    expected: "array",
                    found: value_kind(other),
                })
            }
        };
    }
    Ok(())
}

// Only called after check_writable, so kinds line up.
fn descend_or_create<'a>(current: &'a mut Value, segment: &Segment) -> &'a mut Value {
    match segment {
        Segment::Name(name) => {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            match current {
                Value::Object(map) => map.entry(name.clone()).or_insert(Value::Null),
                _ => unreachable!("container was just created"),
            }
        }
        Segment::Index(index) => {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            match current {
                Value::Array(items) => {
                    if items.len() <= *index {
                        items.resize(*index + 1, Value::Null);
                    }
                    &mut items[*index]
                }
                _ => unreachable!("container was just created"),
            }
        }
        Segment::Wildcard => unreachable!("wildcards are rejected before writing"),
    }
}

/// Remove the value at a concrete location. Array elements are removed and
/// later elements shift down.
pub fn remove(document: &mut Value, location: &KeyPath) -> Option<Value> {
    let (last, parent) = location.segments().split_last()?;
    let parent = get_mut(document, &KeyPath::new(parent.to_vec()))?;
    match (last, parent) {
        (Segment::Name(name), Value::Object(map)) => map.remove(name),
        (Segment::Index(index), Value::Array(items)) if *index < items.len() => {
            Some(items.remove(*index))
        }
        _ => None,
    }
}

/// Remove every match of a (possibly wildcard) path; returns how many values
/// were removed. Matches are removed back to front so array shifts never
/// invalidate a location still to be visited.
pub fn remove_all(document: &mut Value, path: &KeyPath) -> usize {
    let locations: Vec<KeyPath> = search(document, path)
        .into_iter()
        .map(|m| m.location)
        .collect();
    locations
        .iter()
        .rev()
        .filter(|location| remove(document, location).is_some())
        .count()
}
