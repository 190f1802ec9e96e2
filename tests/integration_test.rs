use std::env;
use std::io::Write;
use std::process::{Command, Stdio};
use std::str;

use tempfile::tempdir;

#[test]
fn insert_and_retrieve_row() {
    let input = Vec::from([
        "insert 1 user1 person1@example.com".to_owned(),
        "select".to_owned(),
        ".exit".to_owned(),
    ]);

    let output = spawn_rust_sqlite(input);

    let expected_output = Vec::from([
        "db > Executed.".to_owned(),
        "db > (1, user1, person1@example.com)".to_owned(),
        "Executed.".to_owned(),
        "db > ".to_owned(),
    ]);

    assert_eq!(output, expected_output);
}

#[test]
fn selecting_an_empty_table_prints_nothing() {
    let input = Vec::from(["select".to_owned(), ".exit".to_owned()]);

    let output = spawn_rust_sqlite(input);

    let expected_output = Vec::from(["db > Executed.".to_owned(), "db > ".to_owned()]);

    assert_eq!(output, expected_output);
}

#[test]
fn allow_inserting_string_at_maximum_length() {
    let username = "a".repeat(33);
    let email = "a".repeat(256);
    let input = Vec::from([
        format!("insert 1 {username} {email}"),
        "select".to_owned(),
        ".exit".to_owned(),
    ]);

    let output = spawn_rust_sqlite(input);

    let expected_output = Vec::from([
        "db > Executed.".to_owned(),
        format!("db > (1, {username}, {email})"),
        "Executed.".to_owned(),
        "db > ".to_owned(),
    ]);

    assert_eq!(output, expected_output);
}

#[test]
fn prints_error_message_if_string_are_too_long() {
    let username = "a".repeat(34);
    let email = "a".repeat(256);
    let input = Vec::from([
        format!("insert 1 {username} {email}"),
        "select".to_owned(),
        ".exit".to_owned(),
    ]);

    let output = spawn_rust_sqlite(input);

    let expected_output = Vec::from([
        "db > String is too long.".to_owned(),
        "db > Executed.".to_owned(),
        "db > ".to_owned(),
    ]);

    assert_eq!(output, expected_output);
}

#[test]
fn prints_error_message_if_id_is_negative() {
    let input = Vec::from([
        "insert -1 foo bar@email.com".to_owned(),
        "select".to_owned(),
        ".exit".to_owned(),
    ]);

    let output = spawn_rust_sqlite(input);

    let expected_output = Vec::from([
        "db > ID is invalid.".to_owned(),
        "db > Executed.".to_owned(),
        "db > ".to_owned(),
    ]);

    assert_eq!(output, expected_output);
}

#[test]
fn rejects_duplicate_keys() {
    let input = Vec::from([
        "insert 1 user1 person1@example.com".to_owned(),
        "insert 1 user2 person2@example.com".to_owned(),
        "select".to_owned(),
        ".exit".to_owned(),
    ]);

    let output = spawn_rust_sqlite(input);

    let expected_output = Vec::from([
        "db > Executed.".to_owned(),
        "db > Error: Duplicate key.".to_owned(),
        "db > (1, user1, person1@example.com)".to_owned(),
        "Executed.".to_owned(),
        "db > ".to_owned(),
    ]);

    assert_eq!(output, expected_output);
}

#[test]
fn prints_a_syntax_error_for_garbage_input() {
    let input = Vec::from(["garbage command".to_owned(), ".exit".to_owned()]);

    let output = spawn_rust_sqlite(input);

    let expected_output = Vec::from([
        "db > Unrecognized keyword at start of 'garbage command'.".to_owned(),
        "db > ".to_owned(),
    ]);

    assert_eq!(output, expected_output);
}

#[test]
fn allows_insertion_of_maximum_number_of_rows_without_splitting() {
    // LEAF_NODE_MAX_CELLS is 13 for this row layout, so 13 inserts fit in a
    // single leaf page and the tree stays at depth 1.
    let mut input: Vec<_> = (1..=13)
        .map(|i| format!("insert {i} user{i} person{i}@example.com"))
        .collect();
    input.push(".btree".to_owned());
    input.push(".exit".to_owned());

    let output = spawn_rust_sqlite(input);

    assert!(output.iter().any(|line| line.contains("leaf (size 13)")));
    assert!(!output.iter().any(|line| line.contains("internal")));
}

#[test]
fn splits_the_root_leaf_once_it_overflows() {
    // A 14th insert overflows the 13-cell leaf: the tree grows to depth 2,
    // with a 7/7 split between the two new leaves.
    let mut input: Vec<_> = (1..=14)
        .map(|i| format!("insert {i} user{i} person{i}@example.com"))
        .collect();
    input.push(".btree".to_owned());
    input.push("select".to_owned());
    input.push(".exit".to_owned());

    let output = spawn_rust_sqlite(input);

    assert!(output.iter().any(|line| line.contains("internal (size 1)")));
    assert_eq!(
        output.iter().filter(|line| line.contains("leaf (size 7)")).count(),
        2
    );

    let selected: Vec<_> = output
        .iter()
        .filter(|line| line.starts_with("db > (") || line.starts_with('('))
        .collect();
    assert_eq!(selected.len(), 14);
}

#[test]
fn out_of_order_inserts_still_select_in_sorted_order() {
    let keys = [
        18, 7, 10, 29, 23, 4, 14, 5, 22, 25, 13, 1, 12, 9, 11, 8, 15, 17, 19, 21,
    ];

    let mut input: Vec<_> = keys
        .iter()
        .map(|i| format!("insert {i} user{i} person{i}@example.com"))
        .collect();
    input.push("select".to_owned());
    input.push(".exit".to_owned());

    let output = spawn_rust_sqlite(input);

    let mut sorted = keys;
    sorted.sort_unstable();

    let rows: Vec<u32> = output
        .iter()
        .filter_map(|line| {
            let line = line.strip_prefix("db > (").or_else(|| line.strip_prefix('('))?;
            let (id, _) = line.split_once(',')?;
            id.trim().parse().ok()
        })
        .collect();

    assert_eq!(rows, sorted.to_vec());
}

#[test]
fn reports_table_full_once_every_page_is_exhausted() {
    // TABLE_MAX_PAGES is 100; with a 13-cell leaf and depth-limited tree
    // growth, this many sequential inserts is guaranteed to exhaust it.
    let mut input: Vec<_> = (0..5000)
        .map(|i| format!("insert {i} user{i} person{i}@example.com"))
        .collect();
    input.push(".exit".to_owned());

    let output = spawn_rust_sqlite(input);

    assert!(output.iter().any(|line| line.contains("Error: Table full.")));
}

#[test]
fn sequential_inserts_force_a_depth_three_tree_and_scan_stays_sorted() {
    // LEAF_NODE_MAX_CELLS=13 and INTERNAL_NODE_MAX_CELLS=3 mean the root
    // itself (still an internal node by then) overflows and must split
    // after the 35th sequential insert, per spec.md's "root split at the
    // internal level creates depth 3" boundary scenario. Go well past that
    // to exercise the resulting shape under more inserts.
    let n: u32 = 300;
    let mut input: Vec<_> = (0..n)
        .map(|i| format!("insert {i} user{i} person{i}@example.com"))
        .collect();
    input.push(".btree".to_owned());
    input.push("select".to_owned());
    input.push(".exit".to_owned());

    let output = spawn_rust_sqlite(input);

    // `.btree` indents children two spaces per level; a line indented by
    // four spaces is a grandchild of the root, i.e. proof of depth >= 3.
    assert!(
        output.iter().any(|line| line.starts_with("    - ")),
        "expected a depth-3 (or deeper) node in .btree output"
    );

    let rows: Vec<u32> = output
        .iter()
        .filter_map(|line| {
            let line = line.strip_prefix("db > (").or_else(|| line.strip_prefix('('))?;
            let (id, _) = line.split_once(',')?;
            id.trim().parse().ok()
        })
        .collect();
    assert_eq!(rows, (0..n).collect::<Vec<_>>());
}

#[test]
fn constants_command_reports_row_and_node_layout() {
    let input = Vec::from([".constants".to_owned(), ".exit".to_owned()]);

    let output = spawn_rust_sqlite(input);

    assert!(output.iter().any(|line| line.contains("ROW_SIZE: 293")));
    assert!(output
        .iter()
        .any(|line| line.contains("LEAF_NODE_MAX_CELLS: 13")));
}

fn spawn_rust_sqlite(input: Vec<String>) -> Vec<String> {
    let dir = tempdir().expect("unable to create temp dir");
    let db_path = dir.path().join("test.db");

    let mut process = rust_sqlite_exe()
        .arg(&db_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Unable to start the process.");

    let stdin = process
        .stdin
        .as_mut()
        .expect("Unable to pipe stdin to process.");

    for line in input {
        stdin
            .write_all(format!("{}\n", line).as_bytes())
            .unwrap_or_else(|_| panic!("Unable to write command `{}`", line));
    }

    let output = process
        .wait_with_output()
        .expect("Unable to get output from the process.");

    assert!(
        output.status.success(),
        "rust-sqlite exited with {:?}; stderr:\n{}",
        output.status.code(),
        str::from_utf8(&output.stderr).unwrap_or("<non-utf8 stderr>")
    );

    str::from_utf8(&output.stdout)
        .expect("Could not get process output.")
        .lines()
        .map(str::to_owned)
        .collect()
}

// refer:
// https://github.com/rust-lang/cargo/blob/485670b3983b52289a2f353d589c57fae2f60f82/tests/testsuite/support/mod.rs#L507
// https://github.com/assert-rs/assert_cmd/blob/5036880699a8d01d56db132b81de84253e134166/src/cargo.rs#L206
fn rust_sqlite_exe() -> Command {
    let target_dir = env::current_exe()
        .ok()
        .map(|mut path| {
            path.pop();
            if path.ends_with("deps") {
                path.pop();
            }
            path
        })
        .expect("this should only be used where a `current_exe` can be set");
    let rust_sqlite_exe = target_dir.join(format!("{}{}", "rust-sqlite", env::consts::EXE_SUFFIX));
    Command::new(rust_sqlite_exe)
}
