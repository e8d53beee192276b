use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::str::FromStr;
use std::sync::Arc;

use reimburse::calculator::{BuiltinCalculator, Calculator, ExternalCalculator};
use reimburse::evaluation::{self, CaseEvaluator, EvaluationReport};
use rust_decimal::Decimal;
use tempfile::TempDir;

// Echoes its arguments one per line and exits with the argument count.
const ECHO_SCRIPT: &str = r#"for arg in "$@"; do printf '[%s]\n' "$arg"; done
echo "stderr line" >&2
exit $#
"#;

fn write_file(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    path
}

fn sh_command_line(script: &Path) -> String {
    format!("/bin/sh {}", script.display())
}

fn reimburse(args: &[&str], calculator: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_reimburse"));
    cmd.args(args).env_remove("RUST_LOG");
    match calculator {
        Some(command_line) => cmd.env("REIMBURSE_CALCULATOR", command_line),
        None => cmd.env_remove("REIMBURSE_CALCULATOR"),
    };
    cmd.output().unwrap()
}

fn direct(script: &Path, args: &[&str]) -> Output {
    Command::new("/bin/sh").arg(script).args(args).output().unwrap()
}

fn os_args(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}

#[test]
fn test_external_output_is_relayed_byte_for_byte() {
    let dir = TempDir::new().unwrap();
    let script = write_file(&dir, "calc.sh", ECHO_SCRIPT);

    let wrapped = reimburse(&["3", "100", "45.50"], Some(&sh_command_line(&script)));
    let expected = direct(&script, &["3", "100", "45.50"]);

    assert_eq!(wrapped.stdout, expected.stdout);
    assert_eq!(wrapped.stdout, b"[3]\n[100]\n[45.50]\n");
    assert_eq!(wrapped.stderr, expected.stderr);
    assert_eq!(wrapped.status.code(), Some(3));
}

#[test]
fn test_arguments_are_not_validated_or_rewritten() {
    let dir = TempDir::new().unwrap();
    let script = write_file(&dir, "calc.sh", ECHO_SCRIPT);
    let calculator = sh_command_line(&script);

    for args in [&[][..], &["3"][..], &["--help"][..], &["-1", " 2 ", "x", "extra"][..]] {
        let wrapped = reimburse(args, Some(&calculator));
        let expected = direct(&script, args);

        assert_eq!(wrapped.stdout, expected.stdout, "args {:?}", args);
        assert_eq!(wrapped.status.code(), expected.status.code(), "args {:?}", args);
    }
}

#[test]
fn test_missing_calculator_exits_like_a_shell() {
    let output = reimburse(&["3", "100", "45.50"], Some("/nonexistent/calculate_reimbursement"));

    assert_eq!(output.status.code(), Some(127));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("/nonexistent/calculate_reimbursement"));
}

#[test]
fn test_builtin_entry_point_matches_direct_invocation() {
    let wrapped = reimburse(&["3", "100", "45.50"], None);
    let direct = BuiltinCalculator::new().invoke(&os_args(&["3", "100", "45.50"])).unwrap();

    assert_eq!(wrapped.stdout, direct.stdout);
    assert_eq!(wrapped.stdout, b"302.3\n");
    assert_eq!(wrapped.status.code(), Some(0));
}

#[test]
fn test_entry_point_ignores_pool_settings() {
    let output = Command::new(env!("CARGO_BIN_EXE_reimburse"))
        .args(["3", "100", "45.50"])
        .env_remove("RUST_LOG")
        .env_remove("REIMBURSE_CALCULATOR")
        .env("REIMBURSE_ACTORS", "lots")
        .env("REIMBURSE_BUFFER", "0")
        .output()
        .unwrap();

    assert_eq!(output.stdout, b"302.3\n");
    assert!(output.stderr.is_empty());
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_builtin_entry_point_matches_float_printing() {
    for (args, expected) in [
        (["8", "638", "966.39"], &b"1374.59\n"[..]),
        (["5", "0.05", "0.05"], &b"375.05\n"[..]),
        (["1", "5e28", "0"], &b"2.9999999999999997e+28\n"[..]),
        (["2", "0", "-100"], &b"120\n"[..]),
    ] {
        let output = reimburse(&args, None);
        assert_eq!(output.stdout, expected, "args {:?}", args);
        assert_eq!(output.status.code(), Some(0), "args {:?}", args);
    }
}

#[test]
fn test_builtin_entry_point_usage_on_missing_arguments() {
    let output = reimburse(&["3", "100"], None);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        output.stdout,
        b"Usage: reimburse <trip_duration_days> <miles_traveled> <total_receipts_amount>\n"
    );
}

#[test]
fn test_builtin_entry_point_rejects_non_numeric_input() {
    let output = reimburse(&["three", "100", "45.50"], None);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("trip_duration_days"));
}

#[tokio::test]
async fn test_evaluate_json_cases_with_builtin() {
    let dir = TempDir::new().unwrap();
    let cases_path = write_file(
        &dir,
        "cases.json",
        r#"[
            {"input": {"trip_duration_days": 1, "miles_traveled": 100, "total_receipts_amount": 20}, "expected_output": 152.00},
            {"input": {"trip_duration_days": 3, "miles_traveled": 93, "total_receipts_amount": 300}, "expected_output": 430.00},
            {"input": {"trip_duration_days": 2, "miles_traveled": 50, "total_receipts_amount": 400}, "expected_output": 300.00}
        ]"#,
    );

    let cases = evaluation::load_cases(&cases_path).await.unwrap();
    let mut evaluator = CaseEvaluator::new(2, 4, Arc::new(BuiltinCalculator::new())).await;
    let outcomes = evaluator.evaluate(cases).await.unwrap();
    let report = EvaluationReport::from_outcomes("builtin", &outcomes, 1);

    assert_eq!(report.total_cases, 3);
    assert_eq!(report.exact_matches, 1);
    assert_eq!(report.within_10, 2);
    assert_eq!(report.within_25, 2);
    assert_eq!(report.max_error, Decimal::from(35));
    assert_eq!(report.worst[0].index, 2);
    // (0 + 8.5 + 35) / 3
    assert_eq!(report.average_error, Decimal::from_str("14.50").unwrap());
}

#[tokio::test]
async fn test_evaluate_csv_cases_with_external_calculator() {
    let dir = TempDir::new().unwrap();
    let script = write_file(
        &dir,
        "calc.sh",
        r#"if [ "$1" = "2" ]; then echo "no two day trips" >&2; exit 1; fi
echo 100.0
"#,
    );
    let cases_path = write_file(
        &dir,
        "cases.csv",
        "trip_duration_days,miles_traveled,total_receipts_amount,expected_output
1,10,5,100.00
2,10,5,120.00
3,10,5,99.50
",
    );

    let calculator = ExternalCalculator::from_command_line(&sh_command_line(&script)).unwrap();
    let cases = evaluation::load_cases(&cases_path).await.unwrap();
    let mut evaluator = CaseEvaluator::new(3, 1, Arc::new(calculator)).await;
    let outcomes = evaluator.evaluate(cases).await.unwrap();
    let report = EvaluationReport::from_outcomes("calc.sh", &outcomes, 5);

    assert_eq!(report.successful_runs, 2);
    assert_eq!(report.failed_runs, 1);
    assert_eq!(report.exact_matches, 1);
    assert_eq!(report.close_matches, 2);
    assert_eq!(report.failures[0].0, 1);
    assert!(report.failures[0].1.contains("no two day trips"));
}

#[test]
fn test_eval_binary_writes_report_and_predictions() {
    let dir = TempDir::new().unwrap();
    let cases_path = write_file(
        &dir,
        "cases.csv",
        "trip_duration_days,miles_traveled,total_receipts_amount,expected_output
1,100,20,152.00
12,240,4000,1690.00
",
    );
    let predictions = dir.path().join("predictions.csv");

    let output = Command::new(env!("CARGO_BIN_EXE_reimburse-eval"))
        .arg(&cases_path)
        .arg("--predictions")
        .arg(&predictions)
        .arg("--stats")
        .arg("--actors")
        .arg("2")
        .env_remove("REIMBURSE_CALCULATOR")
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report = String::from_utf8(output.stdout).unwrap();
    assert!(report.contains("Total cases: 2"));
    assert!(report.contains("Exact matches (±$0.01): 1 (50.0%)"));
    assert!(report.contains("Days range: 1 - 12"));

    let mut reader = csv::Reader::from_path(&predictions).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.get(5), Some("actual_output"));

    let amounts: Vec<(Decimal, Decimal)> = reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            (
                Decimal::from_str(&record[5]).unwrap(),
                Decimal::from_str(&record[6]).unwrap(),
            )
        })
        .collect();
    assert_eq!(
        amounts,
        vec![
            (Decimal::from(152), Decimal::ZERO),
            (Decimal::from(1700), Decimal::from(10)),
        ]
    );
}

#[test]
fn test_eval_binary_fails_on_unknown_format() {
    let dir = TempDir::new().unwrap();
    let cases_path = write_file(&dir, "cases.txt", "nothing");

    let output = Command::new(env!("CARGO_BIN_EXE_reimburse-eval"))
        .arg(&cases_path)
        .env_remove("REIMBURSE_CALCULATOR")
        .output()
        .unwrap();

    assert!(!output.status.success());
}
