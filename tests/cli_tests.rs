#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use std::fs;
use tempfile::{NamedTempFile, tempdir};

#[allow(deprecated)]
fn command() -> Command {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.env_remove("ESTIMATE_TOOL_STORE")
        .env("ESTIMATE_TOOL_LOG", "warn");
    cmd
}

fn run_cli(script: &str) -> assert_cmd::assert::Assert {
    command().write_stdin(script.to_string()).assert()
}

fn path_arg(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

#[test]
fn cli_estimates_imported_work() {
    let dir = tempdir().expect("tempdir");
    let csv_path = dir.path().join("work.csv");
    fs::write(
        &csv_path,
        "Chapter,Section,Subsection,Complexity,Editor Hours,Researcher Hours,Review Hours\n\
         Intro,Basics,Overview,2,10,15,0\n",
    )
    .expect("write csv");

    let script = format!(
        "member add Member1 Editor 3 120\nmember alloc Member1 Researcher 2 80\nimport csv {}\nestimate\nquit\n",
        path_arg(&csv_path)
    );
    run_cli(&script)
        .success()
        .stdout(str_contains("Imported 1 chapters"))
        .stdout(str_contains("Duration: 2 weeks"))
        .stdout(str_contains("Bottleneck role: Researcher"))
        .stdout(str_contains("Total labor cost: 5200.00"));
}

#[test]
fn cli_reports_unstaffed_roles() {
    let dir = tempdir().expect("tempdir");
    let csv_path = dir.path().join("work.csv");
    fs::write(
        &csv_path,
        "Chapter,Section,Subsection,Complexity,Editor Hours,Researcher Hours,Review Hours\n\
         Intro,,Overview,1,5,0,3\n",
    )
    .expect("write csv");

    let script = format!(
        "member add Ed Editor 5 100\nimport csv {}\nestimate\nquit\n",
        path_arg(&csv_path)
    );
    run_cli(&script)
        .success()
        .stdout(str_contains("Duration: 1 weeks"))
        .stdout(str_contains("Unstaffed roles (not counted in duration): Specialist Reviewer"));
}

#[test]
fn cli_fixed_costs_reach_the_grand_total() {
    run_cli("cost add software 250 Licence seats\ncost add other 50 Printing\ncost drop other 1\nestimate\nquit\n")
        .success()
        .stdout(str_contains("Added software cost 'Licence seats'."))
        .stdout(str_contains("Removed other cost 'Printing'."))
        .stdout(str_contains("Fixed costs: 250.00"))
        .stdout(str_contains("Grand total: 250.00"));
}

#[test]
fn cli_preset_roles_keep_their_rate() {
    run_cli("rate Editor 50\nrate Topic_Specialist 95\nunrate Ghost\nquit\n")
        .success()
        .stdout(str_contains("Preset role 'Editor' keeps its canonical rate."))
        .stdout(str_contains("Custom role 'Topic Specialist' set to 95.00."))
        .stdout(str_contains("No custom role 'Ghost'."));
}

#[test]
fn cli_pace_is_clamped() {
    run_cli("pace 12 9\nquit\n")
        .success()
        .stdout(str_contains("Pace is now 8h/day x 7 days = 56h/week"));
}

#[test]
fn cli_save_and_load_json_round_trip() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = path_arg(tmp.path());
    let script = format!(
        "name Persisted Plan\nsave {path}\nname Scratch\nload {path}\nshow\nquit\n"
    );
    let assert = run_cli(&script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    let after_reload = output
        .split("Project loaded from")
        .last()
        .unwrap_or_default();
    assert!(
        after_reload.contains("Persisted Plan"),
        "expected the saved name after reload:\n{after_reload}"
    );
    assert!(!after_reload.contains("Scratch"));
}

#[test]
fn cli_writes_through_to_configured_store() {
    let dir = tempdir().expect("tempdir");
    let store = dir.path().join("project.json");

    command()
        .env("ESTIMATE_TOOL_STORE", format!("json:{}", store.display()))
        .write_stdin("name Stored Between Runs\nteam preset\nquit\n")
        .assert()
        .success()
        .stdout(str_contains("Preset team loaded."));
    assert!(store.exists());

    command()
        .env("ESTIMATE_TOOL_STORE", format!("json:{}", store.display()))
        .write_stdin("show\nteam\nquit\n")
        .assert()
        .success()
        .stdout(str_contains("Stored Between Runs"))
        .stdout(str_contains("Jordan Lee"));
}

#[test]
fn cli_template_imports_cleanly() {
    let dir = tempdir().expect("tempdir");
    let template = dir.path().join("template.csv");
    let script = format!(
        "template {path}\nimport csv {path}\ntree\nquit\n",
        path = path_arg(&template)
    );
    run_cli(&script)
        .success()
        .stdout(str_contains("Template written to"))
        .stdout(str_contains("Imported 2 chapters"));
}

#[test]
fn cli_reports_usage_and_unknown_commands() {
    run_cli("member add OnlyName\nhours 99 1 1 1\nfrobnicate\nquit\n")
        .success()
        .stdout(str_contains("Usage: member add <name> <role> <hours> [rate]"))
        .stdout(str_contains("Subsection '99' not found."))
        .stdout(str_contains("Unknown command 'frobnicate'"));
}
