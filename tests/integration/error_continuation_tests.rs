use neardupe::scanner::{FileRecord, FuzzyHasher, HashError};
use neardupe::similarity::{FinderConfig, FinderError, SimilarityFinder};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::tempdir;

/// Hashes like ssdeep's digest shape but refuses content starting with `!`.
struct PickyHasher;

impl FuzzyHasher for PickyHasher {
    fn hash(&self, data: &[u8]) -> Result<String, String> {
        if data.first() == Some(&b'!') {
            return Err("refusing marked content".to_string());
        }
        Ok(format!("3:{}:{}", data.len(), data.len() % 7))
    }

    fn compare(&self, a: &str, b: &str) -> Option<f64> {
        Some(if a == b { 1.0 } else { 0.0 })
    }
}

#[test]
fn test_missing_files_are_skipped() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
    fs::write(dir.path().join("c.txt"), b"gamma").unwrap();

    let records = vec![
        FileRecord::new("a.txt", dir.path().join("a.txt")),
        FileRecord::new("b.txt", PathBuf::from("nonexistent_b.txt")),
        FileRecord::new("c.txt", dir.path().join("c.txt")),
    ];

    let (report, summary) = SimilarityFinder::with_defaults()
        .find_similar_in(records)
        .unwrap();

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.fingerprinted_files, 2);
    assert!(summary.is_partial());
    assert_eq!(summary.errors.len(), 1);
    match &summary.errors[0] {
        HashError::NotFound(path) => assert_eq!(path, &PathBuf::from("nonexistent_b.txt")),
        other => panic!("Expected NotFound HashError, got: {other:?}"),
    }

    // The survivors are still compared with each other
    assert_eq!(summary.comparisons, 1);
    assert!(report.get("a.txt").unwrap().similar_files.contains_key("c.txt"));
}

#[test]
fn test_missing_files_strict_fails() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("b.txt"), b"beta").unwrap();

    let config = FinderConfig::default().with_strict(true);
    let records = vec![
        FileRecord::new("a.txt", PathBuf::from("nonexistent_a.txt")),
        FileRecord::new("b.txt", dir.path().join("b.txt")),
    ];

    let result = SimilarityFinder::new(config).find_similar_in(records);
    match result.unwrap_err() {
        FinderError::Fingerprint(HashError::NotFound(path)) => {
            assert_eq!(path, PathBuf::from("nonexistent_a.txt"));
        }
        other => panic!("Expected NotFound fingerprint error, got: {other:?}"),
    }
}

#[test]
fn test_rejected_content_is_isolated() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"plain").unwrap();
    fs::write(dir.path().join("b.txt"), b"!marked").unwrap();
    fs::write(dir.path().join("c.txt"), b"plain").unwrap();

    let config = FinderConfig::default().with_hasher(Arc::new(PickyHasher));
    let (report, summary) = SimilarityFinder::new(config)
        .find_similar(dir.path())
        .unwrap();

    assert_eq!(summary.skipped_files(), 1);
    assert!(matches!(summary.errors[0], HashError::Rejected { .. }));
    assert!(report.iter().all(|(name, _)| name != "b.txt"));
    assert!(report
        .iter()
        .all(|(_, entry)| !entry.similar_files.contains_key("b.txt")));
    assert_eq!(report.match_count(), 1);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
    let locked = dir.path().join("locked.txt");
    fs::write(&locked, b"secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root can read anything; nothing to test in that case.
    if fs::read(&locked).is_ok() {
        return;
    }

    let (_, summary) = SimilarityFinder::with_defaults()
        .find_similar(dir.path())
        .unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.fingerprinted_files, 1);
    assert!(matches!(summary.errors[0], HashError::PermissionDenied(_)));

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(target_os = "linux")]
#[test]
fn test_colliding_non_utf8_names_are_skipped() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    let first = dir.path().join(OsStr::from_bytes(b"dup\xfe.txt"));
    let second = dir.path().join(OsStr::from_bytes(b"dup\xff.txt"));
    fs::write(&first, b"payload").unwrap();
    fs::write(&second, b"payload").unwrap();
    fs::write(dir.path().join("dup.txt"), b"payload").unwrap();

    let (report, summary) = SimilarityFinder::with_defaults()
        .find_similar(dir.path())
        .unwrap();

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.fingerprinted_files, 2);
    assert!(summary.is_partial());
    match &summary.errors[0] {
        HashError::DuplicateName { path, name } => {
            assert_eq!(path, &second);
            assert_eq!(name, "dup\u{FFFD}.txt");
        }
        other => panic!("Expected DuplicateName, got: {other:?}"),
    }
    assert_eq!(report.match_count(), 1);
}
