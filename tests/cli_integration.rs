// CLI integration tests for encode/decode/quantize flows.
use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_tabwire");
    Command::new(exe)
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn stdout_lines(output: &[u8]) -> Vec<Value> {
    let text = String::from_utf8_lossy(output);
    text.lines().map(parse_json).collect()
}

fn encode_file(dir: &std::path::Path, name: &str, json: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut child = cmd()
        .args(["encode", "-", "--output", path.to_str().unwrap()])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn encode");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(json.as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("encode");
    assert!(
        output.status.success(),
        "encode failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    path
}

#[test]
fn encode_then_decode_flow() {
    let temp = tempfile::tempdir().expect("tempdir");
    let frame = encode_file(
        temp.path(),
        "rec.bin",
        r#"[1, "ada", null, {"$timestamp": "2024-01-01T00:00:00Z"}, {"$bytes": [1, 2]}]"#,
    );
    let bytes = std::fs::read(&frame).expect("read frame");
    assert_eq!(bytes[0] >> 4, 0x1);
    let declared = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]) as usize;
    assert_eq!(declared, bytes.len() - 14);

    let decode = cmd()
        .args(["decode", frame.to_str().unwrap()])
        .output()
        .expect("decode");
    assert!(decode.status.success());
    let lines = stdout_lines(&decode.stdout);
    assert_eq!(lines.len(), 1);
    let row = lines[0].as_array().expect("row array");
    assert_eq!(row[0], 1);
    assert_eq!(row[1], "ada");
    assert!(row[2].is_null());
    assert_eq!(row[3]["$timestamp"], "2024-01-01T00:00:00Z");
    assert_eq!(row[4]["$bytes"], serde_json::json!([1, 2]));
}

#[test]
fn decode_projects_columns_across_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    let a = encode_file(temp.path(), "a.bin", r#"[1, "x", true]"#);
    let b = encode_file(temp.path(), "b.bin", r#"[2, "y", false]"#);

    let decode = cmd()
        .args([
            "decode",
            a.to_str().unwrap(),
            b.to_str().unwrap(),
            "--columns",
            "2,0",
        ])
        .output()
        .expect("decode");
    assert!(decode.status.success());
    let lines = stdout_lines(&decode.stdout);
    assert_eq!(lines, vec![serde_json::json!([true, 1]), serde_json::json!([false, 2])]);

    let limited = cmd()
        .args([
            "decode",
            a.to_str().unwrap(),
            b.to_str().unwrap(),
            "--limit",
            "1",
        ])
        .output()
        .expect("decode");
    assert_eq!(stdout_lines(&limited.stdout).len(), 1);
}

#[test]
fn decode_table_format_renders_boxed_rows() {
    let temp = tempfile::tempdir().expect("tempdir");
    let a = encode_file(temp.path(), "a.bin", r#"["abcdefg", null]"#);
    let decode = cmd()
        .args(["decode", a.to_str().unwrap(), "--format", "table"])
        .output()
        .expect("decode");
    assert!(decode.status.success());
    let text = String::from_utf8_lossy(&decode.stdout);
    assert!(text.contains("| f0      | f1   |"), "{text}");
    assert!(text.contains("| abcdefg | null |"), "{text}");
}

#[test]
fn decode_rejects_bad_index_with_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let a = encode_file(temp.path(), "a.bin", r#"[1, 2, 3]"#);
    let decode = cmd()
        .args(["decode", a.to_str().unwrap(), "--columns", "5"])
        .output()
        .expect("decode");
    assert_eq!(decode.status.code(), Some(9));
    let err = parse_json(String::from_utf8_lossy(&decode.stderr).trim());
    assert_eq!(err["error"]["kind"], "IndexOutOfRange");
    assert_eq!(err["error"]["index"], 5);
}

#[test]
fn decode_short_frame_is_malformed() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("short.bin");
    std::fs::write(&path, [0x10u8; 13]).expect("write");
    let decode = cmd()
        .args(["decode", path.to_str().unwrap()])
        .output()
        .expect("decode");
    assert_eq!(decode.status.code(), Some(3));
    let err = parse_json(String::from_utf8_lossy(&decode.stderr).trim());
    assert_eq!(err["error"]["kind"], "MalformedFrame");
}

#[test]
fn decode_size_guard_flags() {
    let temp = tempfile::tempdir().expect("tempdir");
    let a = encode_file(temp.path(), "a.bin", r#"["a fairly long text field to exceed the cap"]"#);

    let capped = cmd()
        .args(["decode", a.to_str().unwrap(), "--max-record-size", "16"])
        .output()
        .expect("decode");
    assert_eq!(capped.status.code(), Some(5));

    let unbounded = cmd()
        .args(["decode", a.to_str().unwrap(), "--no-size-limit"])
        .output()
        .expect("decode");
    assert!(unbounded.status.success());
}

#[test]
fn quantize_reports_half_precision_value() {
    let output = cmd()
        .args(["quantize", "65520", "--bits", "16"])
        .output()
        .expect("quantize");
    assert!(output.status.success());
    let value = parse_json(String::from_utf8_lossy(&output.stdout).trim());
    assert_eq!(value["value"], "inf");
    assert_eq!(value["bits"], 16);

    let negative = cmd()
        .args(["quantize", "-0.1", "--bits", "32"])
        .output()
        .expect("quantize");
    assert!(negative.status.success());
    let value = parse_json(String::from_utf8_lossy(&negative.stdout).trim());
    assert_eq!(value["value"].as_f64(), Some(f64::from(-0.1f32)));
}

#[test]
fn quantize_rejects_unsupported_width() {
    let output = cmd()
        .args(["quantize", "1.5", "--bits", "8"])
        .output()
        .expect("quantize");
    assert_eq!(output.status.code(), Some(8));
    let err = parse_json(String::from_utf8_lossy(&output.stderr).trim());
    assert_eq!(err["error"]["kind"], "UnsupportedPrecision");
}
