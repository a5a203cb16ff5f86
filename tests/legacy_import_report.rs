use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_resultsd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn resultsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "{}", value);
    value
        .pointer("/error/code")
        .and_then(|v| v.as_str())
        .unwrap_or("missing")
}

fn admin_session(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &PathBuf,
) {
    let _ = request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "setup",
        "auth.setupAdmin",
        json!({ "email": "admin@school.edu", "password": "s3cret", "fullName": "Ada Admin" }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "login",
        "auth.login",
        json!({ "role": "admin", "email": "admin@school.edu", "password": "s3cret" }),
    );
}

#[test]
fn import_csv_then_write_summary_report() {
    let workspace = temp_dir("resultsd-legacy-import");
    std::fs::write(
        workspace.join("results.csv"),
        "IndexNumber,FullName,Course,Score\n\
         STU001,John Doe,Computer Science,85\n\
         STU002,Jane Smith,Mathematics,72\n\
         STU003,Bob Wilson,Physics,abc\n\
         STU004,Alice Brown,Chemistry,45\n",
    )
    .expect("write csv");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    admin_session(&mut stdin, &mut reader, &workspace);

    // Relative paths resolve against the workspace.
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "legacy.import",
        json!({ "path": "results.csv" }),
    );
    assert_eq!(imported.get("inserted").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(imported.get("skipped").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(
        imported.pointer("/issues/0/line").and_then(|v| v.as_u64()),
        Some(4)
    );

    let missing = request(
        &mut stdin,
        &mut reader,
        "2",
        "legacy.import",
        json!({ "path": "nope.csv" }),
    );
    assert_eq!(error_code(&missing), "io_failed");

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "legacy.get",
        json!({ "indexNumber": "STU002" }),
    );
    assert_eq!(
        got.pointer("/result/grade").and_then(|v| v.as_str()),
        Some("B")
    );

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "legacy.updateScore",
        json!({ "indexNumber": "STU004", "score": 55 }),
    );
    assert_eq!(updated.get("grade").and_then(|v| v.as_str()), Some("D"));

    let no_such = request(
        &mut stdin,
        &mut reader,
        "5",
        "legacy.updateScore",
        json!({ "indexNumber": "STU999", "score": 55 }),
    );
    assert_eq!(error_code(&no_such), "not_found");

    let dup = request(
        &mut stdin,
        &mut reader,
        "6",
        "legacy.create",
        json!({ "indexNumber": "STU001", "fullName": "John", "course": "Art", "score": 10 }),
    );
    assert_eq!(error_code(&dup), "conflict");
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "legacy.create",
        json!({ "indexNumber": "STU005", "fullName": "Eve", "course": "Art", "score": "91" }),
    );
    assert_eq!(created.get("grade").and_then(|v| v.as_str()), Some("A"));

    let dist = request_ok(&mut stdin, &mut reader, "8", "legacy.distribution", json!({}));
    assert_eq!(dist.get("total").and_then(|v| v.as_i64()), Some(4));
    assert_eq!(dist.pointer("/gradeDistribution/A").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(dist.pointer("/gradeDistribution/D").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(dist.pointer("/gradeDistribution/F").and_then(|v| v.as_u64()), Some(0));

    let report = request_ok(&mut stdin, &mut reader, "9", "legacy.writeReport", json!({}));
    let path = PathBuf::from(
        report
            .get("path")
            .and_then(|v| v.as_str())
            .expect("report path"),
    );
    assert!(path.starts_with(workspace.join("reports")));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .expect("file name")
        .to_string();
    assert!(name.starts_with("summary_report_") && name.ends_with(".txt"), "{name}");
    let text = std::fs::read_to_string(&path).expect("read report");
    assert!(text.contains("Total Students: 4"));
    assert!(text.contains("A: 2\nB: 1\nC: 0\nD: 1\nF: 0\n"));
    assert!(text.contains("Report generated on: "));

    let explicit = workspace.join("out").join("summary.txt");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "legacy.writeReport",
        json!({ "path": explicit.to_string_lossy() }),
    );
    assert!(explicit.is_file());

    let cleared = request_ok(&mut stdin, &mut reader, "11", "legacy.clear", json!({}));
    assert_eq!(cleared.get("removed").and_then(|v| v.as_u64()), Some(4));
    let list = request_ok(&mut stdin, &mut reader, "12", "legacy.list", json!({}));
    assert_eq!(list.get("total").and_then(|v| v.as_u64()), Some(0));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn plain_text_import_and_bad_csv_header() {
    let workspace = temp_dir("resultsd-legacy-txt");
    std::fs::write(
        workspace.join("results.txt"),
        "STU010, Ann Lee, History, 61\nSTU011,Ben Ng,History\n",
    )
    .expect("write txt");
    std::fs::write(workspace.join("broken.csv"), "Name,Score\nAnn,50\n").expect("write csv");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    admin_session(&mut stdin, &mut reader, &workspace);

    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "legacy.import",
        json!({ "path": workspace.join("results.txt").to_string_lossy() }),
    );
    assert_eq!(imported.get("inserted").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(imported.get("skipped").and_then(|v| v.as_u64()), Some(1));

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "legacy.get",
        json!({ "indexNumber": "STU010" }),
    );
    assert_eq!(
        got.pointer("/result/fullName").and_then(|v| v.as_str()),
        Some("Ann Lee")
    );
    assert_eq!(got.pointer("/result/grade").and_then(|v| v.as_str()), Some("C"));

    let broken = request(
        &mut stdin,
        &mut reader,
        "3",
        "legacy.import",
        json!({ "path": "broken.csv" }),
    );
    assert_eq!(error_code(&broken), "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn reimport_skips_duplicates_and_rows_can_be_deleted() {
    let workspace = temp_dir("resultsd-legacy-dupes");
    std::fs::write(
        workspace.join("quoted.csv"),
        "IndexNumber,FullName,Course,Score\n\
         STU001,\"Doe, John\",Computer Science,85\n\
         STU002,Jane Smith,\"Maths, Pure\",72\n\
         STU001,John Again,Physics,40\n",
    )
    .expect("write csv");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    admin_session(&mut stdin, &mut reader, &workspace);

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "legacy.import",
        json!({ "path": "quoted.csv" }),
    );
    assert_eq!(first.get("inserted").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(first.get("duplicates").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(first.get("skipped").and_then(|v| v.as_u64()), Some(0));

    let john = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "legacy.get",
        json!({ "indexNumber": "STU001" }),
    );
    assert_eq!(
        john.pointer("/result/fullName").and_then(|v| v.as_str()),
        Some("Doe, John")
    );
    assert_eq!(john.pointer("/result/score").and_then(|v| v.as_i64()), Some(85));

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "legacy.import",
        json!({ "path": "quoted.csv" }),
    );
    assert_eq!(second.get("inserted").and_then(|v| v.as_u64()), Some(0));
    assert_eq!(second.get("duplicates").and_then(|v| v.as_u64()), Some(3));
    let list = request_ok(&mut stdin, &mut reader, "4", "legacy.list", json!({}));
    assert_eq!(list.get("total").and_then(|v| v.as_u64()), Some(2));

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "legacy.delete",
        json!({ "indexNumber": "STU002" }),
    );
    assert_eq!(removed.get("removed").and_then(|v| v.as_u64()), Some(1));
    let gone = request(
        &mut stdin,
        &mut reader,
        "6",
        "legacy.delete",
        json!({ "indexNumber": "STU002" }),
    );
    assert_eq!(error_code(&gone), "not_found");
    let list = request_ok(&mut stdin, &mut reader, "7", "legacy.list", json!({}));
    assert_eq!(list.get("total").and_then(|v| v.as_u64()), Some(1));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
