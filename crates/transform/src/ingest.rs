use crate::engine::TransformationEngine;
use crate::field::{FieldProps, FieldType};
use docflow_keypath::{KeyPath, Segment};
use serde_json::Value;
use tracing::{info, warn};

impl TransformationEngine {
    /// Build a schema with one field per distinct path of `sample`
    pub fn from_sample_document(sample: &Value) -> Self {
        let mut engine = Self::new();
        engine.add_sample_document(sample);
        engine
    }

    /// Register the paths of another sample; returns how many fields were new.
    ///
    /// Array elements are registered under a wildcard (`tags[*]`), merging
    /// the element types of every element seen. Types of known fields are
    /// merged with the new observation, so a field only seen as `null` picks
    /// up its type from a later sample.
    pub fn add_sample_document(&mut self, sample: &Value) -> usize {
        let Value::Object(root) = sample else {
            warn!(kind = docflow_keypath::value_kind(sample), "sample document is not an object");
            return 0;
        };

        let before = self.fields.len();
        let mut pending: Vec<(KeyPath, &Value)> = root
            .iter()
            .rev()
            .map(|(key, value)| (KeyPath::root().push(key.as_str()), value))
            .collect();

        while let Some((path, value)) = pending.pop() {
            let observed = FieldType::infer(value);
            let descend = observed != FieldType::GeoPoint;
            self.observe(&path, observed);
            if !descend {
                continue;
            }
            match value {
                Value::Object(map) => {
                    for (key, child) in map.iter().rev() {
                        pending.push((path.push(key.as_str()), child));
                    }
                }
                Value::Array(items) => {
                    let element = path.push(Segment::Wildcard);
                    for item in items.iter().rev() {
                        pending.push((element.clone(), item));
                    }
                }
                _ => {}
            }
        }

        let added = self.fields.len() - before;
        info!(added, total = self.fields.len(), "ingested sample document");
        added
    }

    fn observe(&mut self, path: &KeyPath, observed: FieldType) {
        match self.field_by_path(path) {
            Some(id) => {
                let field = self.field_mut(id);
                field.props.field_type = field.props.field_type.merge(&observed);
            }
            None => {
                let id = self.ensure_field(path.clone(), FieldProps::new(observed), None);
                self.field_mut(id).input_path = Some(path.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kp(s: &str) -> KeyPath {
        KeyPath::parse(s).unwrap()
    }

    fn type_at(engine: &TransformationEngine, path: &str) -> FieldType {
        let id = engine.field_by_path(&kp(path)).unwrap();
        engine.field_type(id).clone()
    }

    #[test]
    fn test_ingest_registers_every_path_in_document_order() {
        let engine = TransformationEngine::from_sample_document(&json!({
            "name": "Ann",
            "age": 31,
            "active": true,
            "address": {"city": "Oslo"},
            "tags": ["a", "b"],
            "dishes": [{"description": "soup"}, {"description": "bread", "price": 3}],
            "where": {"lat": 59.9, "lon": 10.7},
            "nothing": null
        }));

        // serde_json maps iterate in key order
        let paths: Vec<String> = engine
            .all_field_ids()
            .into_iter()
            .map(|id| engine.field_path(id).to_string())
            .collect();
        assert_eq!(
            paths,
            vec![
                "active",
                "address",
                "address.city",
                "age",
                "dishes",
                "dishes[*]",
                "dishes[*].description",
                "dishes[*].price",
                "name",
                "nothing",
                "tags",
                "tags[*]",
                "where"
            ]
        );

        assert_eq!(type_at(&engine, "name"), FieldType::String);
        assert_eq!(type_at(&engine, "age"), FieldType::Number);
        assert_eq!(type_at(&engine, "active"), FieldType::Boolean);
        assert_eq!(type_at(&engine, "address"), FieldType::Object);
        assert_eq!(type_at(&engine, "tags"), FieldType::array_of(FieldType::String));
        assert_eq!(type_at(&engine, "dishes[*]"), FieldType::Object);
        assert_eq!(type_at(&engine, "where"), FieldType::GeoPoint);
        assert_eq!(type_at(&engine, "nothing"), FieldType::Unknown);

        let city = engine.field_by_path(&kp("address.city")).unwrap();
        assert_eq!(engine.input_key_path(city), Some(&kp("address.city")));
    }

    #[test]
    fn test_mixed_arrays_have_unknown_elements() {
        let engine = TransformationEngine::from_sample_document(&json!({"mixed": [1, "x"]}));
        assert_eq!(type_at(&engine, "mixed"), FieldType::array_of(FieldType::Unknown));
        assert_eq!(type_at(&engine, "mixed[*]"), FieldType::Unknown);
    }

    #[test]
    fn test_later_samples_upgrade_unknown_types() {
        let mut engine = TransformationEngine::from_sample_document(&json!({"a": null}));
        assert_eq!(type_at(&engine, "a"), FieldType::Unknown);
        let added = engine.add_sample_document(&json!({"a": "text", "b": 1}));
        assert_eq!(added, 1);
        assert_eq!(type_at(&engine, "a"), FieldType::String);
    }

    #[test]
    fn test_non_object_samples_are_ignored() {
        let mut engine = TransformationEngine::new();
        assert_eq!(engine.add_sample_document(&json!([1, 2])), 0);
        assert_eq!(engine.field_count(), 0);
    }
}
