use super::definition::PipelineDefinition;
use super::executor::{Pipeline, PipelineError, PipelineExecutor};
use docflow_transform::{TransformConfig, TransformError};
use serde_json::json;

/// Helper to create a test pipeline over `{"items": [{"name", "qty"}]}`
fn create_test_pipeline(config: TransformConfig) -> Pipeline {
    let definition = PipelineDefinition::from_json_str(
        r#"{
            "name": "orders",
            "version": 1,
            "description": "Test pipeline",
            "sample": {"items": [{"name": "bolt", "qty": 2}], "note": "x"},
            "steps": [
                {"type": "uppercase", "field": "items[*].name"},
                {"type": "arithmetic", "field": "items[*].qty", "operator": "multiply", "operand": 3},
                {"type": "delete", "field": "note"}
            ]
        }"#,
    )
    .unwrap();
    Pipeline::from_definition(&definition, config).unwrap()
}

#[test]
fn test_run_transforms_document() {
    let pipeline = create_test_pipeline(TransformConfig::default());
    assert_eq!(pipeline.name, "orders");
    assert_eq!(pipeline.description, "Test pipeline");

    let out = PipelineExecutor::run(
        &pipeline,
        &json!({"items": [{"name": "nut", "qty": 4}, {"name": "pin", "qty": 1}], "note": "drop me"}),
    )
    .unwrap();

    assert!(out.is_clean());
    assert_eq!(
        out.document,
        json!({"items": [{"name": "NUT", "qty": 12}, {"name": "PIN", "qty": 3}]})
    );
}

#[test]
fn test_run_collects_errors_by_default() {
    let pipeline = create_test_pipeline(TransformConfig::default());
    let out = PipelineExecutor::run(
        &pipeline,
        &json!({"items": [{"name": 1, "qty": "many"}, {"name": "ok", "qty": 1}]}),
    )
    .unwrap();

    assert_eq!(out.errors.len(), 2);
    assert_eq!(out.document["items"][1], json!({"name": "OK", "qty": 3}));
}

#[test]
fn test_run_fails_when_configured() {
    let pipeline = create_test_pipeline(TransformConfig {
        fail_on_error: true,
        ..TransformConfig::default()
    });
    let result = PipelineExecutor::run(&pipeline, &json!({"items": [{"name": 1, "qty": 1}]}));

    match result {
        Err(PipelineError::Transform(TransformError::Visit { errors })) => {
            assert_eq!(errors.len(), 1)
        }
        other => panic!("expected visit failure, got {:?}", other),
    }
}

#[test]
fn test_run_caps_kept_errors() {
    let pipeline = create_test_pipeline(TransformConfig {
        max_errors_per_document: Some(1),
        ..TransformConfig::default()
    });
    let out = PipelineExecutor::run(
        &pipeline,
        &json!({"items": [{"name": 1, "qty": 1}, {"name": 2, "qty": 1}, {"name": 3, "qty": 1}]}),
    )
    .unwrap();

    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.suppressed_errors, 2);
    assert_eq!(out.error_count(), 3);
}

#[test]
fn test_run_batch_keeps_documents_independent() {
    let pipeline = create_test_pipeline(TransformConfig {
        fail_on_error: true,
        ..TransformConfig::default()
    });
    let results = PipelineExecutor::run_batch(
        &pipeline,
        &[
            json!({"items": [{"name": "a", "qty": 1}]}),
            json!({"items": [{"name": false, "qty": 1}]}),
            json!({"items": []}),
        ],
    );

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().document, json!({"items": []}));
}

#[test]
fn test_pipeline_error_is_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<PipelineError>();
    assert_sync::<PipelineError>();
}

#[test]
fn test_pipeline_is_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<Pipeline>();
    assert_sync::<Pipeline>();
    assert_send::<PipelineExecutor>();
    assert_sync::<PipelineExecutor>();
}
