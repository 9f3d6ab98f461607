use neardupe::similarity::{FinderConfig, HashMetric, SimilarityFinder, ThresholdPolicy};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

const SHARED_TEXT: &str = "The quick brown fox jumps over the lazy dog. \
    Pack my box with five dozen liquor jugs. \
    How vexingly quick daft zebras jump!";

fn write(dir: &Path, name: &str, content: &[u8]) {
    File::create(dir.join(name))
        .unwrap()
        .write_all(content)
        .unwrap();
}

fn keys<'a>(iter: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    iter.map(String::as_str).collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let (report, summary) = SimilarityFinder::with_defaults()
        .find_similar(dir.path())
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.comparisons, 0);
}

#[test]
fn test_scan_single_file() {
    let dir = tempdir().unwrap();
    write(dir.path(), "only.txt", b"lonely");

    let (report, summary) = SimilarityFinder::with_defaults()
        .find_similar(dir.path())
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(summary.total_files, 1);
    assert_eq!(summary.comparisons, 0);
}

#[test]
fn test_scan_default_thresholds_report_every_pair() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", SHARED_TEXT.as_bytes());
    write(dir.path(), "a_copy.txt", SHARED_TEXT.as_bytes());
    write(dir.path(), "b.txt", b"something else entirely, nothing alike");

    let (report, summary) = SimilarityFinder::with_defaults()
        .find_similar(dir.path())
        .unwrap();

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.comparisons, 3);
    assert_eq!(report.base_count(), 2);
    assert_eq!(report.match_count(), 3);

    let bases = keys(report.iter().map(|(name, _)| name));
    assert_eq!(bases, vec!["a.txt", "a_copy.txt"]);

    let a = report.get("a.txt").unwrap();
    assert_eq!(keys(a.similar_files.keys()), vec!["a_copy.txt", "b.txt"]);
    assert_eq!(a.size, SHARED_TEXT.len() as u64);

    let copy = &a.similar_files["a_copy.txt"];
    assert_eq!(copy.hash_distance, 1.0);
    assert_eq!(copy.size_distance, 1.0);
    assert_eq!(copy.matched_hash, a.hash);

    let a_copy = report.get("a_copy.txt").unwrap();
    assert_eq!(keys(a_copy.similar_files.keys()), vec!["b.txt"]);
}

#[test]
fn test_scan_name_threshold_filters_pairs() {
    let dir = tempdir().unwrap();
    write(dir.path(), "report.txt", SHARED_TEXT.as_bytes());
    write(dir.path(), "report_copy.txt", SHARED_TEXT.as_bytes());
    write(dir.path(), "b.txt", b"something else entirely, nothing alike");

    let policy = ThresholdPolicy::new(0.9, 0.0, 0.0).unwrap();
    let finder = SimilarityFinder::new(FinderConfig::default().with_policy(policy));
    let (report, summary) = finder.find_similar(dir.path()).unwrap();

    assert_eq!(summary.comparisons, 3);
    assert_eq!(report.base_count(), 1);
    assert_eq!(report.match_count(), 1);

    let entry = report.get("report.txt").unwrap();
    let matched = &entry.similar_files["report_copy.txt"];
    assert!(matched.name_distance >= 0.9);
    assert!(report.get("b.txt").is_none());
}

#[test]
fn test_scan_size_threshold() {
    let dir = tempdir().unwrap();
    write(dir.path(), "big.bin", &[7u8; 1000]);
    write(dir.path(), "small.bin", &[7u8; 100]);

    let policy = ThresholdPolicy::new(0.0, 0.0, 0.5).unwrap();
    let finder = SimilarityFinder::new(FinderConfig::default().with_policy(policy));
    let (report, _) = finder.find_similar(dir.path()).unwrap();

    // big.bin is the base: 1 - 900/1000 = 0.1
    assert!(report.is_empty());

    let policy = ThresholdPolicy::new(0.0, 0.0, 0.05).unwrap();
    let finder = SimilarityFinder::new(FinderConfig::default().with_policy(policy));
    let (report, _) = finder.find_similar(dir.path()).unwrap();
    let entry = report.get("big.bin").unwrap();
    assert_eq!(entry.similar_files["small.bin"].size_distance, 0.1);
}

#[test]
fn test_scan_ignores_subdirectories() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", SHARED_TEXT.as_bytes());
    fs::create_dir(dir.path().join("nested")).unwrap();
    write(&dir.path().join("nested"), "a.txt", SHARED_TEXT.as_bytes());

    let (report, summary) = SimilarityFinder::with_defaults()
        .find_similar(dir.path())
        .unwrap();

    assert_eq!(summary.total_files, 1);
    assert!(report.is_empty());
}

#[test]
fn test_scan_fuzzy_score_metric_identical_content() {
    let dir = tempdir().unwrap();
    let content = SHARED_TEXT.repeat(200);
    write(dir.path(), "one.txt", content.as_bytes());
    write(dir.path(), "two.txt", content.as_bytes());

    let config = FinderConfig::default().with_hash_metric(HashMetric::FuzzyScore);
    let (report, summary) = SimilarityFinder::new(config)
        .find_similar(dir.path())
        .unwrap();

    assert_eq!(summary.hash_metric, HashMetric::FuzzyScore);
    let matched = &report.get("one.txt").unwrap().similar_files["two.txt"];
    assert!(matched.hash_distance > 0.5);
    assert!(matched.hash_distance <= 1.0);
}

#[test]
fn test_scan_uses_small_pool_for_small_inputs() {
    let dir = tempdir().unwrap();
    for i in 0..5 {
        write(dir.path(), &format!("f{i}.txt"), SHARED_TEXT.as_bytes());
    }

    let (_, summary) = SimilarityFinder::with_defaults()
        .find_similar(dir.path())
        .unwrap();

    let hardware = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    assert_eq!(summary.workers, 2.min(hardware));
    assert_eq!(summary.comparisons, 10);
    assert_eq!(summary.total_matches, 10);
}
