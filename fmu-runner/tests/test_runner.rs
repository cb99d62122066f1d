//! Runner lifecycle tests driven end-to-end against the in-process bus.

use fmu_runner::{ErrorCode, FmiRunner};

fn runner_from(args: &[&str]) -> FmiRunner {
    let mut full = vec!["fmu-runner"];
    full.extend_from_slice(args);
    FmiRunner::parse(full).unwrap()
}

#[test]
fn test_missing_input_file() {
    let mut runner = runner_from(&[]);
    assert_eq!(runner.load(), ErrorCode::MissingFile as i32);
    // load is idempotent with respect to the error state
    assert_eq!(runner.load(), ErrorCode::MissingFile as i32);
    runner.close();
}

#[test]
fn test_unresolvable_input_file() {
    let mut runner = runner_from(&["/definitely/not/here.fmu"]);
    assert_eq!(runner.load(), ErrorCode::InvalidFile as i32);
    runner.close();
}

#[test]
fn test_fmupath_probing() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("empty.json");
    std::fs::write(&config_path, r#"{"fmus": [], "connections": []}"#).unwrap();

    // referenced by bare name, found through --fmupath
    let mut runner = runner_from(&[
        "--autobroker",
        "--fmupath",
        dir.path().to_str().unwrap(),
        "empty.json",
    ]);
    assert_eq!(runner.load(), 0);
    assert_eq!(runner.initialize(), 0);
    assert_eq!(runner.run(None), 0);
    assert_eq!(runner.close(), 0);
}

#[test]
fn test_invalid_archive_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let fmu_path = dir.path().join("dummy.fmu");
    std::fs::write(&fmu_path, b"these bytes are not a zip archive").unwrap();

    let mut runner = runner_from(&["--autobroker", fmu_path.to_str().unwrap()]);
    assert_eq!(runner.load(), ErrorCode::InvalidFmu as i32);
    // no extraction directory left behind
    assert!(!dir.path().join("dummy").exists());
    runner.close();
}

#[test]
fn test_missing_shared_object_is_an_fmu_error() {
    // a valid model description but no binaries directory
    let dir = tempfile::tempdir().unwrap();
    let fmu_dir = dir.path().join("nolib");
    std::fs::create_dir(&fmu_dir).unwrap();
    std::fs::write(
        fmu_dir.join("modelDescription.xml"),
        r##"<fmiModelDescription fmiVersion="2.0" modelName="nolib" guid="{n}">
  <CoSimulation modelIdentifier="nolib"/>
  <ModelVariables/>
  <ModelStructure/>
</fmiModelDescription>"##,
    )
    .unwrap();

    // a directory input has no .fmu extension, so point a config at it instead
    let config_path = dir.path().join("system.json");
    std::fs::write(
        &config_path,
        format!(
            r#"{{"fmus": [ {{ "fmu": "{}", "name": "nolibfed" }} ]}}"#,
            fmu_dir.display()
        ),
    )
    .unwrap();

    let mut runner = runner_from(&["--autobroker", config_path.to_str().unwrap()]);
    assert_eq!(runner.load(), ErrorCode::FmuError as i32);
    runner.close();
}

#[test]
fn test_malformed_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("broken.json");
    std::fs::write(&config_path, "{ this is not json").unwrap();

    let mut runner = runner_from(&["--autobroker", config_path.to_str().unwrap()]);
    assert_eq!(runner.load(), ErrorCode::FileProcessingError as i32);
    runner.close();
}

#[test]
fn test_config_referencing_missing_fmu() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("system.json");
    std::fs::write(
        &config_path,
        r#"{"fmus": [ { "fmu": "ghost.fmu", "name": "ghost" } ]}"#,
    )
    .unwrap();

    let mut runner = runner_from(&["--autobroker", config_path.to_str().unwrap()]);
    assert_eq!(runner.load(), ErrorCode::MissingFile as i32);
    runner.close();
}

#[test]
fn test_empty_federation_runs_clean() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("empty.toml");
    std::fs::write(&config_path, "fmus = []\nconnections = []\n").unwrap();

    let mut runner = runner_from(&[
        "--autobroker",
        "--stop",
        "1s",
        "--step",
        "100ms",
        config_path.to_str().unwrap(),
    ]);
    assert_eq!(runner.load(), 0);
    assert_eq!(runner.run(None), 0);
    assert_eq!(runner.close(), 0);
}

#[test]
fn test_unknown_set_parameter_warns_without_drivers() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("empty.json");
    std::fs::write(&config_path, r#"{"fmus": []}"#).unwrap();

    let mut runner = runner_from(&[
        "--autobroker",
        "--set",
        "unknown=45.6",
        config_path.to_str().unwrap(),
    ]);
    assert_eq!(runner.load(), 0);
    // no driver accepted the key: warned, not an error
    assert_eq!(runner.initialize(), 0);
    assert_eq!(runner.close(), 0);
}

#[test]
fn test_bad_time_value() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("empty.json");
    std::fs::write(&config_path, r#"{"fmus": []}"#).unwrap();

    let mut runner = runner_from(&[
        "--autobroker",
        "--stop",
        "tomorrow",
        config_path.to_str().unwrap(),
    ]);
    assert_eq!(runner.load(), ErrorCode::InvalidFile as i32);
    runner.close();
}

#[test]
fn test_run_async_completes() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("empty.json");
    std::fs::write(&config_path, r#"{"fmus": []}"#).unwrap();

    let mut runner = runner_from(&["--autobroker", config_path.to_str().unwrap()]);
    assert_eq!(runner.load(), 0);
    let (mut runner, code) = runner.run_async(None).join().unwrap();
    assert_eq!(code, 0);
    assert_eq!(runner.close(), 0);
}
