use super::{expect_str, SimpleTransformation, Visit};
use crate::error::VisitErrorKind;
use crate::node::{DeriveSpec, FieldRef, SplitSpec};
use docflow_keypath::{search, set, KeyPath, OneToOneMatcher};
use serde_json::Value;

/// One input value expanded into values for the node's declared fields
pub trait ForkTransformation {
    fn skips_null(&self) -> bool {
        true
    }

    /// `(declared field index, value)` pairs; indices not returned are left
    /// unwritten
    fn split(&self, value: &Value) -> Result<Vec<(usize, Value)>, VisitErrorKind>;
}

/// The last declared field receives the unsplit remainder
impl ForkTransformation for SplitSpec {
    fn split(&self, value: &Value) -> Result<Vec<(usize, Value)>, VisitErrorKind> {
        let text = expect_str(value)?;
        Ok(text
            .splitn(self.new_fields.len(), self.delimiter.as_str())
            .enumerate()
            .map(|(i, part)| (i, Value::String(part.to_string())))
            .collect())
    }
}

impl ForkTransformation for DeriveSpec {
    fn split(&self, value: &Value) -> Result<Vec<(usize, Value)>, VisitErrorKind> {
        self.ops
            .iter()
            .enumerate()
            .map(|(i, op)| op.transform_value(value).map(|v| (i, v)))
            .collect()
    }
}

/// For every match of the input, write each produced value at the sibling
/// location of its declared field.
pub(crate) fn visit_fork<T>(
    doc: &mut Value,
    input: &FieldRef,
    targets: &[KeyPath],
    transformation: &T,
    visit: &mut Visit<'_>,
) where
    T: ForkTransformation + ?Sized,
{
    // one plan per declared field, evaluated per match
    let matcher = OneToOneMatcher::new(&input.path, targets);
    let matches: Vec<(KeyPath, Value)> = search(doc, &input.path)
        .into_iter()
        .map(|m| (m.location, m.value.clone()))
        .collect();

    for (location, value) in matches {
        if value.is_null() && transformation.skips_null() {
            continue;
        }
        let parts = match transformation.split(&value) {
            Ok(parts) => parts,
            Err(kind) => {
                visit.fail(input.field, location, kind);
                continue;
            }
        };
        for (index, part) in parts {
            let Some(target) = matcher.resolve(index, &location) else {
                let to = targets.get(index).cloned().unwrap_or_default();
                visit.fail(
                    input.field,
                    location.clone(),
                    VisitErrorKind::Locality {
                        from: location.clone(),
                        to,
                    },
                );
                continue;
            };
            tracing::trace!(from = %location, to = %target, "fork write");
            if let Err(e) = set(doc, &target, part) {
                visit.fail(input.field, target, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ArithmeticOperator, ValueOp};
    use serde_json::json;

    fn kp(s: &str) -> KeyPath {
        KeyPath::parse(s).unwrap()
    }

    #[test]
    fn test_split_keeps_remainder_in_last_field() {
        let spec = SplitSpec {
            delimiter: " ".into(),
            new_fields: vec![kp("first"), kp("last")],
        };
        assert_eq!(
            spec.split(&json!("John Ronald Smith")).unwrap(),
            vec![(0, json!("John")), (1, json!("Ronald Smith"))]
        );
        assert_eq!(spec.split(&json!("Cher")).unwrap(), vec![(0, json!("Cher"))]);
        assert!(spec.split(&json!(1)).is_err());
    }

    #[test]
    fn test_derive_applies_one_op_per_field() {
        let spec = DeriveSpec {
            new_fields: vec![kp("y"), kp("z")],
            ops: vec![
                ValueOp::Arithmetic {
                    operator: ArithmeticOperator::Multiply,
                    operand: 10.0,
                },
                ValueOp::Cast {
                    to: crate::node::CastTarget::String,
                },
            ],
        };
        assert_eq!(
            spec.split(&json!(2)).unwrap(),
            vec![(0, json!(20)), (1, json!("2"))]
        );
    }
}
