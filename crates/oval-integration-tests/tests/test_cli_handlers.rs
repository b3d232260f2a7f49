//! CLI handlers driven from documents and a configuration file on disk.

use std::path::Path;

use oval_cli::config::CliConfig;
use oval_cli::evaluate::{run_evaluate, EvaluateArgs};
use oval_cli::report::OutputFormat;
use oval_cli::validate::{run_validate, validate_definitions, ValidateArgs};
use oval_cli::{EXIT_FAILED, EXIT_OK};

const DEFINITIONS: &str = r#"{
    "definitions": [
        {"id": "oval:org.example:def:1", "class": "vulnerability",
         "title": "openssl older than 3.0.7",
         "criteria": {"operator": "AND", "children": [
            {"kind": "criterion", "test_ref": "oval:org.example:tst:1"}]}},
        {"id": "oval:org.example:def:2", "class": "compliance",
         "title": "sshd listens on the approved port",
         "criteria": {"operator": "AND", "children": [
            {"kind": "criterion", "test_ref": "oval:org.example:tst:2"}]}}
    ],
    "tests": [
        {"id": "oval:org.example:tst:1", "object_ref": "oval:org.example:obj:1",
         "state_refs": ["oval:org.example:ste:1"]},
        {"id": "oval:org.example:tst:2", "object_ref": "oval:org.example:obj:2",
         "state_refs": ["oval:org.example:ste:2"]}
    ],
    "objects": [
        {"id": "oval:org.example:obj:1", "object_type": "rpminfo_object"},
        {"id": "oval:org.example:obj:2", "object_type": "textfilecontent_object"}
    ],
    "states": [
        {"id": "oval:org.example:ste:1",
         "entities": [{"name": "version", "value": "3.0.7", "datatype": "version",
                       "operation": "less than"}]},
        {"id": "oval:org.example:ste:2",
         "entities": [{"name": "port", "var_ref": "oval:org.example:var:1",
                       "datatype": "int"}]}
    ],
    "variables": [
        {"id": "oval:org.example:var:1", "datatype": "int", "kind": "external"}
    ]
}"#;

const CHARACTERISTICS: &str = r#"{
    "objects": [
        {"object_id": "oval:org.example:obj:1", "flag": "complete", "item_refs": [1]},
        {"object_id": "oval:org.example:obj:2", "flag": "complete", "item_refs": [2]}
    ],
    "items": [
        {"id": 1, "item_type": "rpminfo_item",
         "entities": [{"name": "version", "value": "3.0.2", "datatype": "version"}]},
        {"id": 2, "item_type": "textfilecontent_item",
         "entities": [{"name": "port", "value": "22", "datatype": "int"}]}
    ]
}"#;

const VARIABLES: &str = r#"{"oval:org.example:var:1": ["22"]}"#;

fn write(dir: &Path, name: &str, text: &str) {
    std::fs::write(dir.join(name), text).unwrap();
}

fn content_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "definitions.json", DEFINITIONS);
    write(dir.path(), "host.json", CHARACTERISTICS);
    write(dir.path(), "variables.json", VARIABLES);
    dir
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ── evaluate ────────────────────────────────────────────────────────

#[test]
fn config_file_drives_an_evaluation() {
    let dir = content_dir();
    write(
        dir.path(),
        "oval.yaml",
        "definitions: definitions.json\n\
         characteristics: host.json\n\
         variables: variables.json\n\
         format: json\n",
    );
    let config = CliConfig::load(&dir.path().join("oval.yaml")).unwrap();
    let report_path = dir.path().join("report.json");
    let args = EvaluateArgs {
        output: Some(report_path.clone()),
        ..EvaluateArgs::default()
    };

    assert_eq!(run_evaluate(&args, &config).unwrap(), EXIT_OK);
    let report = read_json(&report_path);
    assert_eq!(report["summary"]["definitions"], 2);
    assert_eq!(report["summary"]["true_count"], 2);
    assert_eq!(report["definitions"][0]["id"], "oval:org.example:def:1");
    let tested = &report["definitions"][1]["tests"]["oval:org.example:tst:2"];
    assert_eq!(tested["tested_variables"][0]["value"], "22");
}

#[test]
fn missing_variables_file_yields_error_results_not_failure() {
    let dir = content_dir();
    let report_path = dir.path().join("report.txt");
    let args = EvaluateArgs {
        definitions: Some(dir.path().join("definitions.json")),
        characteristics: Some(dir.path().join("host.json")),
        output: Some(report_path.clone()),
        format: Some(OutputFormat::Text),
        ..EvaluateArgs::default()
    };

    assert_eq!(run_evaluate(&args, &CliConfig::default()).unwrap(), EXIT_OK);
    let text = std::fs::read_to_string(&report_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].contains("true"));
    assert!(lines[1].contains("error"));
    assert!(text.contains("2 definitions: 1 true, 0 false, 1 error"));
}

#[test]
fn unknown_definition_id_aborts_with_exit_one() {
    let dir = content_dir();
    let report_path = dir.path().join("report.json");
    let args = EvaluateArgs {
        definitions: Some(dir.path().join("definitions.json")),
        characteristics: Some(dir.path().join("host.json")),
        variables: Some(dir.path().join("variables.json")),
        definition_ids: vec![
            "oval:org.example:def:1".to_string(),
            "oval:org.example:def:99".to_string(),
        ],
        output: Some(report_path.clone()),
        format: Some(OutputFormat::Json),
        ..EvaluateArgs::default()
    };

    assert_eq!(run_evaluate(&args, &CliConfig::default()).unwrap(), EXIT_FAILED);
    let report = read_json(&report_path);
    assert_eq!(report["summary"]["fatal_count"], 1);
    assert!(report["definitions"][1]["error"]
        .as_str()
        .unwrap()
        .contains("oval:org.example:def:99"));
}

#[test]
fn unreadable_characteristics_is_an_operational_error() {
    let dir = content_dir();
    let args = EvaluateArgs {
        definitions: Some(dir.path().join("definitions.json")),
        characteristics: Some(dir.path().join("absent.json")),
        ..EvaluateArgs::default()
    };
    let err = run_evaluate(&args, &CliConfig::default()).unwrap_err();
    assert!(format!("{err:#}").contains("absent.json"));
}

// ── validate ────────────────────────────────────────────────────────

#[test]
fn shipped_content_validates_cleanly() {
    let dir = content_dir();
    let path = dir.path().join("definitions.json");
    assert!(validate_definitions(&path).unwrap().is_empty());
    let args = ValidateArgs {
        definitions: Some(path),
    };
    assert_eq!(run_validate(&args, &CliConfig::default()).unwrap(), EXIT_OK);
}

#[test]
fn validation_reports_every_dangling_reference() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "broken.json",
        r#"{
            "definitions": [{"id": "oval:org.example:def:1",
                "criteria": {"children": [
                    {"kind": "criterion", "test_ref": "oval:org.example:tst:1"},
                    {"kind": "extend_definition", "definition_ref": "oval:org.example:def:2"}]}}]
        }"#,
    );
    let path = dir.path().join("broken.json");
    let problems = validate_definitions(&path).unwrap();
    assert_eq!(problems.len(), 2);
    assert!(problems.iter().any(|p| p.contains("oval:org.example:tst:1")));
    assert!(problems.iter().any(|p| p.contains("oval:org.example:def:2")));

    let config = CliConfig {
        definitions: Some(path),
        ..CliConfig::default()
    };
    assert_eq!(run_validate(&ValidateArgs::default(), &config).unwrap(), EXIT_FAILED);
}
