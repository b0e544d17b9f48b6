//! End-to-end scenarios from §8: round-trip, cross-snapshot query, and
//! duplicate-snapshot rejection.

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
fn basic_round_trip() {
    let temp = TempDir::new().unwrap();
    let workspace = snapbase::Workspace::new(Some(&temp.path().to_string_lossy())).unwrap();
    workspace.init().unwrap();

    write_csv(temp.path(), "employees.csv", "id,name,salary\n1,Alice,75000\n2,Bob,65000\n");
    let summary = workspace.create_snapshot("employees.csv", Some("baseline")).unwrap();

    assert!(summary.contains("rows=2"));
    assert!(summary.contains("columns=3"));
    assert_eq!(workspace.list_snapshots_for_source("employees.csv").unwrap(), vec!["baseline".to_string()]);
    assert!(workspace.snapshot_exists("baseline").unwrap());
}

#[test]
fn cross_snapshot_query_groups_by_snapshot_name() {
    let temp = TempDir::new().unwrap();
    let workspace = snapbase::Workspace::new(Some(&temp.path().to_string_lossy())).unwrap();
    workspace.init().unwrap();

    write_csv(temp.path(), "employees.csv", "id,name\n1,Alice\n2,Bob\n");
    workspace.create_snapshot("employees.csv", Some("s1")).unwrap();

    write_csv(temp.path(), "employees.csv", "id,name\n1,Alice\n2,Bob\n");
    workspace.create_snapshot("employees.csv", Some("s2")).unwrap();

    write_csv(temp.path(), "employees.csv", "id,name\n1,Alice\n2,Bob\n3,Carol\n");
    workspace.create_snapshot("employees.csv", Some("s3")).unwrap();

    let batches = workspace
        .query(
            "employees.csv",
            "SELECT snapshot_name, COUNT(*) AS c FROM employees_csv GROUP BY snapshot_name ORDER BY snapshot_name",
            None,
        )
        .unwrap();

    let total_rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(total_rows, 3);
}

#[test]
fn duplicate_snapshot_name_is_rejected_and_catalog_stays_at_one() {
    let temp = TempDir::new().unwrap();
    let workspace = snapbase::Workspace::new(Some(&temp.path().to_string_lossy())).unwrap();
    workspace.init().unwrap();

    write_csv(temp.path(), "x.csv", "id\n1\n");
    workspace.create_snapshot("x.csv", Some("same")).unwrap();

    let second = workspace.create_snapshot("x.csv", Some("same"));
    assert!(second.is_err());

    assert_eq!(workspace.list_snapshots_for_source("x.csv").unwrap(), vec!["same".to_string()]);
}

#[test]
fn export_refuses_to_overwrite_without_force() {
    let temp = TempDir::new().unwrap();
    let workspace = snapbase::Workspace::new(Some(&temp.path().to_string_lossy())).unwrap();
    workspace.init().unwrap();

    write_csv(temp.path(), "x.csv", "id\n1\n");
    workspace.create_snapshot("x.csv", Some("v1")).unwrap();

    let dest = temp.path().join("out.parquet");
    fs::write(&dest, b"existing").unwrap();

    let result = workspace.export("x.csv", &dest, "v1", false);
    assert!(result.is_err());

    workspace.export("x.csv", &dest, "v1", true).unwrap();
    assert!(fs::metadata(&dest).unwrap().len() > 8);
}
