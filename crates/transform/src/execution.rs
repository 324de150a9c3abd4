use crate::engine::TransformationEngine;
use crate::error::{TransformError, VisitError, VisitErrorKind};
use crate::node::{FieldRef, NodeSpec, TransformationNode};
use crate::transformations::{visit_combine, visit_fork, visit_simple, Visit};
use docflow_keypath::{remove, remove_all, search, set, KeyPath, LocalMatcher};
use serde_json::Value;
use tracing::{debug, warn};

/// Result of running one document through the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub document: Value,
    pub errors: Vec<VisitError>,
    /// Errors beyond `max_errors_per_document`, counted but not kept
    pub suppressed_errors: usize,
}

impl Transformed {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.suppressed_errors == 0
    }

    pub fn error_count(&self) -> usize {
        self.errors.len() + self.suppressed_errors
    }
}

impl TransformationEngine {
    /// Run every node over a copy of `document`.
    ///
    /// Failures on single matches are collected and execution carries on
    /// with the remaining matches, nodes and fields.
    pub fn transform(&self, document: &Value) -> Transformed {
        let mut output = document.clone();
        let mut errors = Vec::new();

        for id in self.execution_order() {
            let node = self.graph.node(id);
            debug!(node = %id, kind = %node.kind(), "executing node");
            let mut visit = Visit {
                node: id,
                errors: &mut errors,
            };
            self.execute_node(&mut output, node, &mut visit);
        }

        if self.config.drop_disabled_fields {
            self.drop_disabled(&mut output);
        }

        let mut suppressed_errors = 0;
        if let Some(max) = self.config.max_errors_per_document {
            if errors.len() > max {
                suppressed_errors = errors.len() - max;
                errors.truncate(max);
            }
        }
        if !errors.is_empty() {
            warn!(
                errors = errors.len(),
                suppressed = suppressed_errors,
                "document transformed with errors"
            );
        }

        Transformed {
            document: output,
            errors,
            suppressed_errors,
        }
    }

    /// `transform`, failing when `fail_on_error` is set and anything went wrong
    pub fn try_transform(&self, document: &Value) -> Result<Transformed, TransformError> {
        let transformed = self.transform(document);
        if self.config.fail_on_error && !transformed.is_clean() {
            return Err(TransformError::Visit {
                errors: transformed.errors,
            });
        }
        Ok(transformed)
    }

    /// `transform` that fails on any error regardless of configuration
    pub fn transform_strict(&self, document: &Value) -> Result<Value, TransformError> {
        let transformed = self.transform(document);
        if transformed.is_clean() {
            Ok(transformed.document)
        } else {
            Err(TransformError::Visit {
                errors: transformed.errors,
            })
        }
    }

    fn execute_node(&self, doc: &mut Value, node: &TransformationNode, visit: &mut Visit<'_>) {
        match &node.spec {
            NodeSpec::Identity | NodeSpec::Load | NodeSpec::Store => {}
            NodeSpec::Rename { new_path } => move_values(doc, &node.inputs[0], new_path, true, visit),
            NodeSpec::Duplicate { new_path } => {
                move_values(doc, &node.inputs[0], new_path, false, visit)
            }
            NodeSpec::Split(spec) => visit_fork(doc, &node.inputs[0], &spec.new_fields, spec, visit),
            NodeSpec::Derive(spec) => visit_fork(doc, &node.inputs[0], &spec.new_fields, spec, visit),
            NodeSpec::Join(spec) => {
                let output = node.outputs.last().copied().unwrap_or(node.inputs[0].field);
                visit_combine(doc, &node.inputs, &spec.new_field, output, spec, visit)
            }
            NodeSpec::Sum(spec) => {
                let output = node.outputs.last().copied().unwrap_or(node.inputs[0].field);
                visit_combine(doc, &node.inputs, &spec.new_field, output, spec, visit)
            }
            NodeSpec::Simple { op } => visit_simple(doc, &node.inputs[0], op, visit),
        }
    }

    /// Remove values of disabled fields, outermost first. Paths that an
    /// enabled field has since taken over are kept.
    fn drop_disabled(&self, doc: &mut Value) {
        let mut paths: Vec<&KeyPath> = self
            .fields
            .iter()
            .filter(|f| !f.enabled && self.field_by_path(&f.output_path).is_none())
            .map(|f| &f.output_path)
            .collect();
        paths.sort_by_key(|p| p.len());

        let mut dropped: Vec<&KeyPath> = Vec::new();
        for path in paths {
            if dropped.iter().any(|d| d.is_structural_prefix_of(path)) {
                continue;
            }
            let removed = remove_all(doc, path);
            if removed > 0 {
                debug!(path = %path, removed, "dropped disabled field");
            }
            dropped.push(path);
        }
    }
}

/// Copy (or move, for a rename) every match of the input to the local
/// location under `new_path`. Moves run back to front so removing array
/// elements never shifts a location still to be visited.
fn move_values(doc: &mut Value, input: &FieldRef, new_path: &KeyPath, remove_source: bool, visit: &mut Visit<'_>) {
    let plan = LocalMatcher::new(&input.path, new_path);
    let mut matches: Vec<(KeyPath, Value)> = search(doc, &input.path)
        .into_iter()
        .map(|m| (m.location, m.value.clone()))
        .collect();
    if remove_source {
        matches.reverse();
    }

    for (location, value) in matches {
        let Some(target) = plan.as_ref().and_then(|p| p.resolve(&location)) else {
            visit.fail(
                input.field,
                location.clone(),
                VisitErrorKind::Locality {
                    from: location,
                    to: new_path.clone(),
                },
            );
            continue;
        };
        match set(doc, &target, value) {
            Ok(()) => {
                if remove_source {
                    remove(doc, &location);
                }
            }
            Err(e) => visit.fail(input.field, target, e),
        }
    }
}
