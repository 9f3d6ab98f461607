use clap::Parser;
use neardupe::cli::Cli;
use neardupe::error::ExitCode;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const CONTENT: &[u8] = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit, \
    sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.";

fn fixture(dir: &Path) {
    fs::write(dir.join("report.txt"), CONTENT).unwrap();
    fs::write(dir.join("report_copy.txt"), CONTENT).unwrap();
    fs::write(dir.join("notes.md"), b"entirely unrelated notes").unwrap();
}

fn run(args: &[&str]) -> (ExitCode, String) {
    let cli = Cli::try_parse_from(args).unwrap();
    let mut out = Vec::new();
    let code = neardupe::run_app_to(cli, &mut out, false).unwrap();
    (code, String::from_utf8(out).unwrap())
}

#[test]
fn test_export_json() {
    let dir = tempdir().unwrap();
    fixture(dir.path());
    let path = dir.path().to_str().unwrap();

    let (code, output) = run(&["neardupe", "-q", "scan", path, "-n", "0.9", "--output", "json"]);
    assert_eq!(code, ExitCode::Success);

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    let pair = &json["similar_files"]["report.txt"]["similar_files"]["report_copy.txt"];
    assert_eq!(pair["hash_distance"], 1.0);
    assert_eq!(pair["size"], CONTENT.len() as u64);
    assert_eq!(json["summary"]["total_files"], 3);
    assert_eq!(json["summary"]["similar_bases"], 1);
    assert_eq!(json["summary"]["total_matches"], 1);
    assert_eq!(json["summary"]["thresholds"]["name"], 0.9);
    assert_eq!(json["summary"]["exit_code"], 0);
}

#[test]
fn test_export_csv() {
    let dir = tempdir().unwrap();
    fixture(dir.path());
    let path = dir.path().to_str().unwrap();

    let (code, output) = run(&["neardupe", "-q", "scan", path, "--output", "csv"]);
    assert_eq!(code, ExitCode::Success);

    let mut lines = output.lines();
    assert_eq!(
        lines.next().unwrap(),
        "base,base_hash,base_size,matched,matched_hash,matched_size,name_distance,hash_distance,size_distance"
    );
    // 3 files, thresholds at zero: every pair is a row
    assert_eq!(lines.count(), 3);
}

#[test]
fn test_export_text() {
    let dir = tempdir().unwrap();
    fixture(dir.path());
    let path = dir.path().to_str().unwrap();

    let (code, output) = run(&["neardupe", "-q", "scan", path, "-n", "0.9"]);
    assert_eq!(code, ExitCode::Success);

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "*".repeat(80));
    assert!(lines[1].starts_with("report.txt (hash: "));
    assert!(lines[2].starts_with("  report_copy.txt (hash: "));
    assert!(lines[2].contains("hash 1.000 | size 1.000"));
    assert_eq!(lines[3], "*".repeat(80));
    assert_eq!(lines[4], "1 file with similar files, 1 match");
    assert!(!output.contains('\u{1b}'));
}

#[test]
fn test_export_no_matches() {
    let dir = tempdir().unwrap();
    fixture(dir.path());
    let path = dir.path().to_str().unwrap();

    let (code, output) = run(&["neardupe", "-q", "scan", path, "-n", "1.0"]);
    assert_eq!(code, ExitCode::NoMatches);
    assert_eq!(output, "No similar files found.\n");
}
