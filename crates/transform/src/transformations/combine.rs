use super::{expect_f64, number_value, scalar_text, Visit};
use crate::error::VisitErrorKind;
use crate::field::FieldId;
use crate::node::{FieldRef, JoinSpec, SumSpec};
use docflow_keypath::{search, set, BasePathMatcher, KeyPath};
use serde_json::Value;
use std::collections::HashMap;

/// Several correlated input values reduced to one output value
pub trait CombineTransformation {
    /// Decide how inputs missing from a group are represented. `values` has
    /// one slot per input field, in input order.
    fn process_match_set(&self, values: Vec<Option<Value>>) -> Vec<Value> {
        values
            .into_iter()
            .map(|value| value.unwrap_or(Value::Null))
            .collect()
    }

    fn combine(&self, values: &[Value]) -> Result<Value, VisitErrorKind>;
}

/// Nulls are skipped, other scalars are joined by their text form
impl CombineTransformation for JoinSpec {
    fn combine(&self, values: &[Value]) -> Result<Value, VisitErrorKind> {
        let parts = values
            .iter()
            .filter(|v| !v.is_null())
            .map(scalar_text)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::String(parts.join(&self.delimiter)))
    }
}

impl CombineTransformation for SumSpec {
    fn combine(&self, values: &[Value]) -> Result<Value, VisitErrorKind> {
        let mut total = 0.0;
        for value in values.iter().filter(|v| !v.is_null()) {
            total += expect_f64(value)?;
        }
        number_value(total)
    }
}

struct Group {
    destination: KeyPath,
    values: Vec<Option<Value>>,
}

/// Group the matches of every input by destination row and write one
/// combined value per row, in ascending destination order.
pub(crate) fn visit_combine<T>(
    doc: &mut Value,
    inputs: &[FieldRef],
    destination: &KeyPath,
    output: FieldId,
    transformation: &T,
    visit: &mut Visit<'_>,
) where
    T: CombineTransformation + ?Sized,
{
    let anchors: Vec<KeyPath> = inputs.iter().map(|i| i.path.clone()).collect();
    let Some(matcher) = BasePathMatcher::new(&anchors, destination) else {
        visit.fail(
            output,
            destination.clone(),
            VisitErrorKind::Locality {
                from: anchors.first().cloned().unwrap_or_default(),
                to: destination.clone(),
            },
        );
        return;
    };

    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for (slot, input) in inputs.iter().enumerate() {
        for found in search(doc, &input.path) {
            let Some(correlation) = matcher.correlate(slot, &found.location) else {
                visit.fail(
                    input.field,
                    found.location.clone(),
                    VisitErrorKind::Locality {
                        from: found.location,
                        to: destination.clone(),
                    },
                );
                continue;
            };
            let index = *by_key.entry(correlation.key).or_insert_with(|| {
                groups.push(Group {
                    destination: correlation.destination,
                    values: vec![None; inputs.len()],
                });
                groups.len() - 1
            });
            let value = &mut groups[index].values[slot];
            if value.is_none() {
                *value = Some(found.value.clone());
            }
        }
    }

    groups.sort_by(|a, b| a.destination.cmp(&b.destination));
    for group in groups {
        let values = transformation.process_match_set(group.values);
        tracing::trace!(to = %group.destination, inputs = values.len(), "combine write");
        match transformation.combine(&values) {
            Ok(result) => {
                if let Err(e) = set(doc, &group.destination, result) {
                    visit.fail(output, group.destination, e);
                }
            }
            Err(kind) => visit.fail(output, group.destination, kind),
        }
    }
}
