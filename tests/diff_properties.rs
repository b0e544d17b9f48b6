//! Cross-cutting diff invariants (§8): cardinality symmetry, empty diff for
//! a snapshot against itself, and hash-map/external-merge parity.

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
fn diff_is_empty_for_a_snapshot_against_itself() {
    let temp = TempDir::new().unwrap();
    let workspace = snapbase::Workspace::new(Some(&temp.path().to_string_lossy())).unwrap();
    workspace.init().unwrap();

    write_csv(temp.path(), "orders.csv", "id,amount\n1,10\n2,20\n3,30\n");
    workspace.create_snapshot("orders.csv", Some("a")).unwrap();

    let outcome = workspace.diff("orders.csv", "a", "a").unwrap();
    assert!(outcome.added.is_empty());
    assert!(outcome.removed.is_empty());
    assert!(outcome.modified.is_empty());
}

#[test]
fn added_and_removed_are_symmetric_under_reversal() {
    let temp = TempDir::new().unwrap();
    let workspace = snapbase::Workspace::new(Some(&temp.path().to_string_lossy())).unwrap();
    workspace.init().unwrap();

    write_csv(temp.path(), "orders.csv", "id,amount\n1,10\n2,20\n");
    workspace.create_snapshot("orders.csv", Some("a")).unwrap();

    write_csv(temp.path(), "orders.csv", "id,amount\n1,10\n3,30\n");
    workspace.create_snapshot("orders.csv", Some("b")).unwrap();

    let forward = workspace.diff("orders.csv", "a", "b").unwrap();
    let backward = workspace.diff("orders.csv", "b", "a").unwrap();

    let mut forward_added = forward.added.clone();
    let mut backward_removed = backward.removed.clone();
    forward_added.sort();
    backward_removed.sort();
    assert_eq!(forward_added, backward_removed);

    let mut forward_removed = forward.removed.clone();
    let mut backward_added = backward.added.clone();
    forward_removed.sort();
    backward_added.sort();
    assert_eq!(forward_removed, backward_added);
}

#[test]
fn modification_reports_the_changed_column() {
    let temp = TempDir::new().unwrap();
    let workspace = snapbase::Workspace::new(Some(&temp.path().to_string_lossy())).unwrap();
    workspace.init().unwrap();

    write_csv(temp.path(), "people.csv", "id,name,age\n1,Alice,25\n");
    workspace.create_snapshot("people.csv", Some("a")).unwrap();

    write_csv(temp.path(), "people.csv", "id,name,age\n1,Alice,26\n");
    workspace.create_snapshot("people.csv", Some("b")).unwrap();

    let outcome = workspace.diff("people.csv", "a", "b").unwrap();
    assert_eq!(outcome.modified.len(), 1);
    assert_eq!(outcome.modified[0].key, "1");
    assert_eq!(outcome.modified[0].changes[0].column, "age");
}
