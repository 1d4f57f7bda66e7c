// SPDX-FileCopyrightText: 2026 SQL Safety Guard Contributors
// SPDX-License-Identifier: MIT

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn sql_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[test]
fn critical_finding_exits_with_2() {
    let file = sql_file("DELETE FROM user");
    Command::cargo_bin("sql-safety-guard")
        .unwrap()
        .args(["check", "-i"])
        .arg(file.path())
        .arg("--no-color")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("no-where-clause"))
        .stdout(predicate::str::contains("CRITICAL"));
}

#[test]
fn clean_sql_exits_with_0() {
    let file = sql_file("SELECT id FROM user WHERE status = 1 ORDER BY id LIMIT 10");
    Command::cargo_bin("sql-safety-guard")
        .unwrap()
        .args(["check", "-i"])
        .arg(file.path())
        .arg("--no-color")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("PASS"));
}

#[test]
fn medium_finding_exits_with_1() {
    let file = sql_file("SELECT * FROM orders WHERE status = 1 ORDER BY id LIMIT 20 OFFSET 200000");
    Command::cargo_bin("sql-safety-guard")
        .unwrap()
        .args(["check", "-i"])
        .arg(file.path())
        .arg("--no-color")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("deep-pagination"));
}

#[test]
fn json_output_is_structured() {
    let file = sql_file("DELETE FROM user");
    Command::cargo_bin("sql-safety-guard")
        .unwrap()
        .args(["check", "-f", "json", "-i"])
        .arg(file.path())
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"violations\""))
        .stdout(predicate::str::contains("\"risk\": \"CRITICAL\""));
}

#[test]
fn stdin_input_is_supported() {
    Command::cargo_bin("sql-safety-guard")
        .unwrap()
        .args(["check", "-i", "-", "--no-color"])
        .write_stdin("UPDATE user SET status = 'x'")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("missing WHERE clause"));
}

#[test]
fn config_file_changes_rule_behavior() {
    let sql = sql_file("DELETE FROM user");
    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        config,
        "[rules.no-where-clause]\nenabled = false\n"
    )
    .unwrap();
    Command::cargo_bin("sql-safety-guard")
        .unwrap()
        .args(["check", "--no-color", "-i"])
        .arg(sql.path())
        .arg("-c")
        .arg(config.path())
        .assert()
        .code(0);
}

#[test]
fn multiple_statements_are_checked_separately() {
    let file = sql_file("DELETE FROM user; SELECT id FROM user WHERE id = 1;");
    Command::cargo_bin("sql-safety-guard")
        .unwrap()
        .args(["check", "-i"])
        .arg(file.path())
        .arg("--no-color")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("2 statement(s) checked"));
}

#[test]
fn missing_input_file_errors() {
    Command::cargo_bin("sql-safety-guard")
        .unwrap()
        .args(["check", "-i", "/nonexistent/queries.sql"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error"));
}
