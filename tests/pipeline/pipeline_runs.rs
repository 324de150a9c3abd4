use docflow::config::Config;
use docflow::pipeline::{Pipeline, PipelineError, PipelineExecutor};
use serde_json::json;
use std::path::Path;

const CONTACTS: &str = r#"{
    "name": "contacts",
    "version": 1,
    "description": "from definition",
    "sample": {
        "people": [{"first": "Ann", "last": "Lee", "phone": "555 0100", "age": 30}],
        "source": "crm"
    },
    "fields": [{"path": "imported", "type": "boolean"}],
    "steps": [
        {"type": "join", "fields": ["people[*].first", "people[*].last"], "delimiter": " ", "into": "people[*].display"},
        {"type": "split", "field": "people[*].phone", "delimiter": " ", "into": ["people[*].area", "people[*].number"]},
        {"type": "derive", "field": "people[*].age", "into": [
            {"path": "people[*].months", "op": {"type": "arithmetic", "operator": "multiply", "operand": 12}},
            {"path": "people[*].age_text", "op": {"type": "cast", "to": "string"}}
        ]},
        {"type": "rename", "field": "source", "to": "origin"},
        {"type": "uppercase", "field": "origin"},
        {"type": "delete", "field": "people[*].phone"}
    ]
}"#;

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

fn load(engine_section: &str) -> (tempfile::TempDir, Pipeline) {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "contacts.json", CONTACTS);
    let config_path = dir.path().join("docflow.toml");
    std::fs::write(
        &config_path,
        format!(
            "{}\n[pipelines.crm]\ndescription = \"CRM export\"\ndefinition_path = \"contacts.json\"\n",
            engine_section
        ),
    )
    .unwrap();
    let config = Config::from_file(&config_path).unwrap();
    let pipeline = Pipeline::load("crm", &config).unwrap();
    (dir, pipeline)
}

#[test]
fn configured_pipeline_transforms_documents() {
    let (_dir, pipeline) = load("");
    assert_eq!(pipeline.name, "crm");
    assert_eq!(pipeline.description, "CRM export");

    let out = PipelineExecutor::run(
        &pipeline,
        &json!({
            "people": [
                {"first": "Ann", "last": "Lee", "phone": "555 0100", "age": 30},
                {"first": "Bo", "last": "Kim", "phone": "555 0199", "age": 41}
            ],
            "source": "crm"
        }),
    )
    .unwrap();

    assert!(out.is_clean(), "{:?}", out.errors);
    assert_eq!(
        out.document,
        json!({
            "people": [
                {"first": "Ann", "last": "Lee", "display": "Ann Lee", "area": "555",
                 "number": "0100", "age": 30, "months": 360, "age_text": "30"},
                {"first": "Bo", "last": "Kim", "display": "Bo Kim", "area": "555",
                 "number": "0199", "age": 41, "months": 492, "age_text": "41"}
            ],
            "origin": "CRM"
        })
    );
}

#[test]
fn disabled_values_stay_when_dropping_is_off() {
    let (_dir, pipeline) = load("[engine]\ndrop_disabled_fields = false\n");
    let out = PipelineExecutor::run(
        &pipeline,
        &json!({"people": [{"first": "A", "last": "B", "phone": "1 2", "age": 1}], "source": "x"}),
    )
    .unwrap();
    assert_eq!(out.document["people"][0]["phone"], json!("1 2"));
}

#[test]
fn bad_values_are_reported_per_location() {
    let (_dir, pipeline) = load("");
    let out = PipelineExecutor::run(
        &pipeline,
        &json!({"people": [
            {"first": "A", "last": "B", "phone": "1 2", "age": "old"},
            {"first": "C", "last": "D", "phone": "3 4", "age": 2}
        ], "source": "x"}),
    )
    .unwrap();

    // a failed derivation writes none of its fields for that element
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].location.to_string(), "people[0].age");
    assert!(out.document["people"][0].get("age_text").is_none());
    assert_eq!(out.document["people"][0]["display"], json!("A B"));
    assert_eq!(out.document["people"][1]["months"], json!(24));
}

#[test]
fn fail_on_error_turns_reports_into_failures() {
    let (_dir, pipeline) = load("[engine]\nfail_on_error = true\n");
    let result = PipelineExecutor::run(
        &pipeline,
        &json!({"people": [{"first": "A", "last": "B", "phone": "1 2", "age": "old"}], "source": "x"}),
    );
    assert!(matches!(result, Err(PipelineError::Transform(_))));
}

#[test]
fn unknown_pipeline_and_missing_definition_fail_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("docflow.toml");
    std::fs::write(&config_path, "[pipelines.gone]\ndefinition_path = \"gone.json\"\n").unwrap();
    let config = Config::from_file(&config_path).unwrap();

    assert!(matches!(
        Pipeline::load("other", &config),
        Err(PipelineError::Config(_))
    ));
    assert!(matches!(
        Pipeline::load("gone", &config),
        Err(PipelineError::Read { .. })
    ));
}
