//! Integration tests for directory scanning.

use tempfile::TempDir;
use terra_api::transfer::{is_eligible, scan_directory, scan_eligible};
use test_case::test_case;

#[test_case("DJI_0001.JPG", true ; "upper jpg")]
#[test_case("DJI_0001.jpeg", true ; "jpeg")]
#[test_case("raw/DJI_0001.DNG", true ; "nested dng")]
#[test_case("IMG_0001.heic", true ; "heic")]
#[test_case("IMG_0001.HeIf", true ; "mixed case heif")]
#[test_case("map.tif", false ; "tif")]
#[test_case("notes.txt", false ; "text")]
#[test_case("jpg", false ; "no extension")]
#[test_case(".jpg", false ; "dotfile")]
fn test_eligibility(name: &str, expected: bool) {
    assert_eq!(is_eligible(name), expected);
}

#[test]
fn test_scan_nested_tree() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("b/deep/er")).unwrap();
    std::fs::create_dir_all(root.join("a")).unwrap();
    std::fs::create_dir_all(root.join("empty")).unwrap();
    for name in ["a/2.jpg", "a/1.jpg", "b/deep/er/3.dng", "top.txt"] {
        std::fs::write(root.join(name), name).unwrap();
    }

    let files = scan_directory(root).unwrap();

    assert_eq!(files, vec!["a/1.jpg", "a/2.jpg", "b/deep/er/3.dng", "top.txt"]);
}

#[tokio::test]
async fn test_scan_eligible_filters() {
    let dir = TempDir::new().unwrap();
    for i in 0..7 {
        std::fs::write(dir.path().join(format!("{}.JPG", i)), "x").unwrap();
        std::fs::write(dir.path().join(format!("{}.xmp", i)), "x").unwrap();
    }

    let items = scan_eligible(dir.path()).await.unwrap();

    assert_eq!(items.len(), 7);
    assert_eq!(items[0].relative_path(), "0.JPG");
    assert_eq!(items[0].absolute_path(), dir.path().join("0.JPG"));
    assert_eq!(items[0].size().unwrap(), 1);
    assert!(items.iter().all(|item| item.content_tag().is_none()));
}

#[tokio::test]
async fn test_scan_missing_directory() {
    let dir = TempDir::new().unwrap();
    let result = scan_eligible(dir.path().join("missing")).await;
    assert!(result.is_err());
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_skipped() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("real")).unwrap();
    std::fs::write(root.join("real/a.jpg"), "a").unwrap();
    std::os::unix::fs::symlink(root.join("real/a.jpg"), root.join("link.jpg")).unwrap();
    std::os::unix::fs::symlink(root, root.join("real/loop")).unwrap();

    let files = scan_directory(root).unwrap();

    assert_eq!(files, vec!["real/a.jpg"]);
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_names_are_skipped() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::write(root.join("a.jpg"), "a").unwrap();
    std::fs::write(root.join(OsStr::from_bytes(b"b\xff.jpg")), "b").unwrap();

    let files = scan_directory(root).unwrap();

    assert_eq!(files, vec!["a.jpg"]);
}
