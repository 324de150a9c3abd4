//! Executable transformation contracts.
//!
//! Every executable node kind implements one of three traits:
//! [`SimpleTransformation`] rewrites a value in place,
//! [`ForkTransformation`] expands one input into several declared fields and
//! [`CombineTransformation`] reduces several inputs into one. The `visit_*`
//! drivers do the document searching, locality matching and error
//! collection, so implementations only deal with values.

mod combine;
mod fork;
mod simple;

pub use combine::CombineTransformation;
pub use fork::ForkTransformation;
pub use simple::SimpleTransformation;

pub(crate) use combine::visit_combine;
pub(crate) use fork::visit_fork;
pub(crate) use simple::visit_simple;

use crate::error::{VisitError, VisitErrorKind};
use crate::field::FieldId;
use crate::node::NodeId;
use docflow_keypath::KeyPath;
use serde_json::Value;

/// Error sink for one node's run over one document
pub(crate) struct Visit<'a> {
    pub node: NodeId,
    pub errors: &'a mut Vec<VisitError>,
}

impl Visit<'_> {
    pub fn fail(&mut self, field: FieldId, location: KeyPath, kind: impl Into<VisitErrorKind>) {
        let error = VisitError {
            node: self.node,
            field,
            location,
            kind: kind.into(),
        };
        tracing::debug!(error = %error, "visit error");
        self.errors.push(error);
    }
}

/// JSON number for `n`, written as an integer when it is one
pub(crate) fn number_value(n: f64) -> Result<Value, VisitErrorKind> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if !n.is_finite() {
        return Err(VisitErrorKind::NonFiniteNumber);
    }
    if n.fract() == 0.0 && n.abs() < MAX_EXACT {
        return Ok(Value::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or(VisitErrorKind::NonFiniteNumber)
}

pub(crate) fn expect_str(value: &Value) -> Result<&str, VisitErrorKind> {
    value
        .as_str()
        .ok_or_else(|| VisitErrorKind::type_mismatch("string", value))
}

pub(crate) fn expect_f64(value: &Value) -> Result<f64, VisitErrorKind> {
    value
        .as_f64()
        .ok_or_else(|| VisitErrorKind::type_mismatch("number", value))
}

/// Text form of a scalar value
pub(crate) fn scalar_text(value: &Value) -> Result<String, VisitErrorKind> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(VisitErrorKind::type_mismatch("scalar", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_value_prefers_integers() {
        assert_eq!(number_value(10.0).unwrap(), json!(10));
        assert_eq!(number_value(-3.0).unwrap(), json!(-3));
        assert_eq!(number_value(2.5).unwrap(), json!(2.5));
        assert_eq!(number_value(f64::INFINITY), Err(VisitErrorKind::NonFiniteNumber));
        assert_eq!(number_value(f64::NAN), Err(VisitErrorKind::NonFiniteNumber));
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!("a")).unwrap(), "a");
        assert_eq!(scalar_text(&json!(4)).unwrap(), "4");
        assert_eq!(scalar_text(&json!(false)).unwrap(), "false");
        assert!(matches!(
            scalar_text(&json!([1])),
            Err(VisitErrorKind::TypeMismatch { expected: "scalar", found: "array" })
        ));
    }
}
