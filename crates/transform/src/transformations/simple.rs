use super::{expect_f64, expect_str, number_value, scalar_text, Visit};
use crate::error::VisitErrorKind;
use crate::node::{CastTarget, FieldRef, ValueOp};
use docflow_keypath::{search, set, KeyPath};
use serde_json::Value;

/// One value in, one value out, written back at the same location
pub trait SimpleTransformation {
    /// Leave `null` values untouched instead of passing them in
    fn skips_null(&self) -> bool {
        true
    }

    fn transform_value(&self, value: &Value) -> Result<Value, VisitErrorKind>;
}

impl SimpleTransformation for ValueOp {
    fn transform_value(&self, value: &Value) -> Result<Value, VisitErrorKind> {
        match self {
            ValueOp::Uppercase => Ok(Value::String(expect_str(value)?.to_uppercase())),
            ValueOp::Lowercase => Ok(Value::String(expect_str(value)?.to_lowercase())),
            ValueOp::Substring { from, length } => {
                let chars = expect_str(value)?.chars().skip(*from);
                let text: String = match length {
                    Some(length) => chars.take(*length).collect(),
                    None => chars.collect(),
                };
                Ok(Value::String(text))
            }
            ValueOp::Append { text } => Ok(Value::String(format!("{}{}", expect_str(value)?, text))),
            ValueOp::Prepend { text } => Ok(Value::String(format!("{}{}", text, expect_str(value)?))),
            ValueOp::Replace { find, replace } => {
                Ok(Value::String(expect_str(value)?.replace(find.as_str(), replace)))
            }
            ValueOp::Arithmetic { operator, operand } => {
                number_value(operator.apply(expect_f64(value)?, *operand))
            }
            ValueOp::Cast { to } => cast(value, *to),
        }
    }
}

fn cast(value: &Value, to: CastTarget) -> Result<Value, VisitErrorKind> {
    match (to, value) {
        (CastTarget::String, _) => scalar_text(value).map(Value::String),
        (CastTarget::Number, Value::Number(_)) => Ok(value.clone()),
        (CastTarget::Number, Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(n) => number_value(n),
            Err(_) => Err(VisitErrorKind::InvalidValue(format!("'{}' is not a number", s))),
        },
        (CastTarget::Number, Value::Bool(b)) => Ok(Value::from(u8::from(*b))),
        (CastTarget::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (CastTarget::Boolean, Value::String(s)) => {
            if s.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if s.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(VisitErrorKind::InvalidValue(format!("'{}' is not a boolean", s)))
            }
        }
        (CastTarget::Boolean, Value::Number(n)) => Ok(Value::Bool(n.as_f64() != Some(0.0))),
        (_, other) => Err(VisitErrorKind::type_mismatch("scalar", other)),
    }
}

/// Apply `transformation` to every match of the input's anchored path
pub(crate) fn visit_simple<T>(doc: &mut Value, input: &FieldRef, transformation: &T, visit: &mut Visit<'_>)
where
    T: SimpleTransformation + ?Sized,
{
    let matches: Vec<(KeyPath, Value)> = search(doc, &input.path)
        .into_iter()
        .map(|m| (m.location, m.value.clone()))
        .collect();

    for (location, value) in matches {
        if value.is_null() && transformation.skips_null() {
            continue;
        }
        tracing::trace!(location = %location, "simple match");
        match transformation.transform_value(&value) {
            Ok(result) => {
                if let Err(e) = set(doc, &location, result) {
                    visit.fail(input.field, location, e);
                }
            }
            Err(kind) => visit.fail(input.field, location, kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ArithmeticOperator;
    use serde_json::json;

    fn apply(op: ValueOp, value: Value) -> Result<Value, VisitErrorKind> {
        op.transform_value(&value)
    }

    #[test]
    fn test_string_ops() {
        assert_eq!(apply(ValueOp::Uppercase, json!("abc")).unwrap(), json!("ABC"));
        assert_eq!(apply(ValueOp::Lowercase, json!("AbC")).unwrap(), json!("abc"));
        assert_eq!(
            apply(ValueOp::Substring { from: 1, length: Some(3) }, json!("héllo")).unwrap(),
            json!("éll")
        );
        assert_eq!(
            apply(ValueOp::Substring { from: 9, length: None }, json!("short")).unwrap(),
            json!("")
        );
        assert_eq!(
            apply(ValueOp::Append { text: "!".into() }, json!("hi")).unwrap(),
            json!("hi!")
        );
        assert_eq!(
            apply(ValueOp::Prepend { text: "> ".into() }, json!("hi")).unwrap(),
            json!("> hi")
        );
        assert_eq!(
            apply(
                ValueOp::Replace {
                    find: "-".into(),
                    replace: "/".into()
                },
                json!("a-b-c")
            )
            .unwrap(),
            json!("a/b/c")
        );
    }

    #[test]
    fn test_string_ops_reject_other_kinds() {
        assert_eq!(
            apply(ValueOp::Uppercase, json!(5)),
            Err(VisitErrorKind::TypeMismatch {
                expected: "string",
                found: "number"
            })
        );
    }

    #[test]
    fn test_arithmetic() {
        let times = |operand| ValueOp::Arithmetic {
            operator: ArithmeticOperator::Multiply,
            operand,
        };
        assert_eq!(apply(times(10.0), json!(3)).unwrap(), json!(30));
        assert_eq!(apply(times(0.5), json!(3)).unwrap(), json!(1.5));
        assert!(matches!(
            apply(times(2.0), json!("3")),
            Err(VisitErrorKind::TypeMismatch { .. })
        ));
        assert_eq!(
            apply(times(f64::MAX), json!(f64::MAX)),
            Err(VisitErrorKind::NonFiniteNumber)
        );
    }

    #[test]
    fn test_casts() {
        let to = |to| ValueOp::Cast { to };
        assert_eq!(apply(to(CastTarget::String), json!(12)).unwrap(), json!("12"));
        assert_eq!(apply(to(CastTarget::String), json!(true)).unwrap(), json!("true"));
        assert_eq!(apply(to(CastTarget::Number), json!(" 42 ")).unwrap(), json!(42));
        assert_eq!(apply(to(CastTarget::Number), json!("1.25")).unwrap(), json!(1.25));
        assert_eq!(apply(to(CastTarget::Number), json!(true)).unwrap(), json!(1));
        assert!(matches!(
            apply(to(CastTarget::Number), json!("abc")),
            Err(VisitErrorKind::InvalidValue(_))
        ));
        assert_eq!(apply(to(CastTarget::Boolean), json!("TRUE")).unwrap(), json!(true));
        assert_eq!(apply(to(CastTarget::Boolean), json!(0)).unwrap(), json!(false));
        assert!(matches!(
            apply(to(CastTarget::Boolean), json!({"a": 1})),
            Err(VisitErrorKind::TypeMismatch { .. })
        ));
    }
}
