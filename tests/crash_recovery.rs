//! A crash between the snapshot payload write and the `index.json` update
//! leaves an orphan snapshot directory (§4.4, §4.5). `reconcile` must adopt
//! it if both `data.columnar` and `meta.json` made it to disk, or delete it
//! otherwise.

use std::fs;
use std::io::Write;

use tempfile::TempDir;

fn write_csv(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut f = fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn reconcile_adopts_a_complete_orphan_snapshot() {
    let temp = TempDir::new().unwrap();
    let workspace = snapbase::Workspace::new(Some(&temp.path().to_string_lossy())).unwrap();
    workspace.init().unwrap();

    write_csv(temp.path(), "people.csv", "id,name\n1,Alice\n");
    workspace.create_snapshot("people.csv", Some("v1")).unwrap();

    // Simulate a second commit that wrote its payload and metadata but
    // crashed before updating index.json, by writing directly into storage
    // with the same directory shape the snapshot writer uses.
    let storage_root = temp.path().join(".snapbase");
    let source_dirs: Vec<_> = fs::read_dir(storage_root.join("sources")).unwrap().collect();
    let source_dir = source_dirs.into_iter().next().unwrap().unwrap().path();
    let orphan_dir = source_dir.join("snapshots").join("v2-orphan");
    fs::create_dir_all(&orphan_dir).unwrap();

    let v1_dir = source_dir.join("snapshots").join("v1");
    let meta_text = fs::read_to_string(v1_dir.join("meta.json")).unwrap();
    let mut meta: serde_json::Value = serde_json::from_str(&meta_text).unwrap();
    meta["name"] = serde_json::json!("v2-orphan");
    meta["sequence"] = serde_json::json!(2);
    meta["content_hash"] = serde_json::json!("deadbeef");
    fs::write(orphan_dir.join("meta.json"), serde_json::to_vec_pretty(&meta).unwrap()).unwrap();
    fs::copy(v1_dir.join("data.columnar"), orphan_dir.join("data.columnar")).unwrap();

    assert!(!workspace.snapshot_exists("v2-orphan").unwrap());

    let report = workspace.reconcile().unwrap();
    assert_eq!(report.adopted, vec!["v2-orphan".to_string()]);
    assert!(report.removed.is_empty());

    assert!(workspace.snapshot_exists("v2-orphan").unwrap());
    let names = workspace.list_snapshots_for_source("people.csv").unwrap();
    assert_eq!(names.len(), 2);
}

#[test]
fn reconcile_removes_an_incomplete_orphan_directory() {
    let temp = TempDir::new().unwrap();
    let workspace = snapbase::Workspace::new(Some(&temp.path().to_string_lossy())).unwrap();
    workspace.init().unwrap();

    write_csv(temp.path(), "people.csv", "id,name\n1,Alice\n");
    workspace.create_snapshot("people.csv", Some("v1")).unwrap();

    let storage_root = temp.path().join(".snapbase");
    let source_dirs: Vec<_> = fs::read_dir(storage_root.join("sources")).unwrap().collect();
    let source_dir = source_dirs.into_iter().next().unwrap().unwrap().path();
    // Payload written, metadata never landed: incomplete, must be discarded.
    let orphan_dir = source_dir.join("snapshots").join("half-written");
    fs::create_dir_all(&orphan_dir).unwrap();
    fs::write(orphan_dir.join("data.columnar"), b"not actually parquet").unwrap();

    let report = workspace.reconcile().unwrap();
    assert_eq!(report.removed, vec!["half-written".to_string()]);
    assert!(!orphan_dir.exists());
}
