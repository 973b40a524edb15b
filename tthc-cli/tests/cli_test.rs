//! End-to-end tests against the `retrieval-core` binary.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn ask_against_the_sample_corpus_prints_context() {
    let mut cmd = Command::cargo_bin("retrieval-core").unwrap();
    cmd.arg("ask").arg("Cần giấy tờ gì để đăng ký kết hôn?");
    cmd.assert().success().stdout(predicate::str::contains("confidence:"));
}

#[test]
fn exact_procedure_code_reports_full_confidence() {
    let mut cmd = Command::cargo_bin("retrieval-core").unwrap();
    cmd.arg("ask").arg("Thủ tục 1.001 cần giấy tờ gì?");
    cmd.assert().success().stdout(predicate::str::contains("matched exact procedure code"));
}

#[test]
fn config_subcommand_prints_json_snapshot() {
    let mut cmd = Command::cargo_bin("retrieval-core").unwrap();
    cmd.arg("config");
    cmd.assert().success().stdout(predicate::str::contains("\"rrf_k\""));
}

#[test]
fn missing_corpus_file_fails_with_a_clear_error() {
    let mut cmd = Command::cargo_bin("retrieval-core").unwrap();
    cmd.arg("--corpus").arg("does-not-exist.json").arg("ask").arg("test");
    cmd.assert().failure().stderr(predicate::str::contains("reading chunk corpus file"));
}
