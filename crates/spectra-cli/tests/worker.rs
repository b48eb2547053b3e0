//! Integration tests for `spectra worker`: JSON lines in, JSON lines out.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tempfile::TempDir;

fn spectra_binary() -> std::path::PathBuf {
    assert_cmd::cargo::cargo_bin!("spectra").into()
}

fn spawn_worker(data_dir: &TempDir) -> Child {
    Command::new(spectra_binary())
        .arg("worker")
        .env("SPECTRA_DATA_DIR", data_dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn spectra worker")
}

/// Send every line, close stdin, and collect responses keyed by id.
fn run_session(lines: &[Value]) -> HashMap<String, Value> {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_worker(&dir);
    {
        let stdin = child.stdin.as_mut().expect("stdin pipe");
        for line in lines {
            writeln!(stdin, "{}", serde_json::to_string(line).unwrap()).unwrap();
        }
        stdin.flush().unwrap();
    }
    drop(child.stdin.take());

    let stdout = child.stdout.take().expect("stdout pipe");
    let responses: HashMap<String, Value> = BufReader::new(stdout)
        .lines()
        .map(|l| serde_json::from_str::<Value>(&l.unwrap()).unwrap())
        .map(|v| (v["id"].to_string(), v))
        .collect();

    let status = child.wait().unwrap();
    assert!(status.success(), "worker should exit 0, got {status}");
    responses
}

const C4: [[i64; 4]; 4] = [[0, 1, 0, 1], [1, 0, 1, 0], [0, 1, 0, 1], [1, 0, 1, 0]];
const C4_CYCLIC: [[i64; 4]; 4] = [[0, 1, 0, -1], [-1, 0, 1, 0], [0, -1, 0, 1], [1, 0, -1, 0]];

#[test]
fn answers_every_request_type() {
    let responses = run_session(&[
        json!({"type": "eigenvalues-symmetric", "id": 1, "matrix": C4}),
        json!({"type": "eigenvalues-skew", "id": 2, "matrix": C4_CYCLIC}),
        json!({"type": "eigenvalues-both", "id": 3, "matrix": C4}),
        json!({"type": "spectral-radius-only", "id": 4, "matrix": C4}),
        json!({"type": "characteristic-polynomial", "id": "poly", "matrix": C4_CYCLIC}),
    ]);
    assert_eq!(responses.len(), 5);
    assert!(responses.values().all(|r| r["success"] == true));

    let symmetric = &responses["1"]["result"]["eigenvalues"];
    assert_eq!(symmetric.as_array().unwrap().len(), 4);

    let radius = responses["4"]["result"]["spectralRadius"].as_f64().unwrap();
    assert!((radius - 2.0).abs() < 1e-6);

    let poly = &responses["\"poly\""]["result"];
    assert_eq!(poly["text"], "λ^4 + 4λ^2");
    assert_eq!(poly["labels"], json!(["2i", "0", "-2i"]));
}

#[test]
fn reports_errors_per_request() {
    let responses = run_session(&[
        json!({"type": "eigenvalues-symmetric", "id": 1, "matrix": [[0, 1], [1]]}),
        json!({"type": "eigenvalues-skew", "id": 2, "matrix": C4}),
        json!({"type": "no-such-type", "id": 3}),
        json!({"type": "cancel", "id": 99}),
        json!({"type": "eigenvalues-symmetric", "id": 4, "matrix": [[0]]}),
    ]);
    assert_eq!(responses["1"]["success"], false);
    assert_eq!(responses["2"]["error"], "expected a skew-symmetric matrix");
    assert_eq!(responses["3"]["success"], false);
    assert_eq!(responses["99"]["success"], false);
    // later requests still run
    assert_eq!(responses["4"]["success"], true);
}

#[test]
fn invalid_json_line_gets_null_id() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_worker(&dir);
    {
        let stdin = child.stdin.as_mut().unwrap();
        writeln!(stdin, "this is not json").unwrap();
    }
    drop(child.stdin.take());
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let line = String::from_utf8_lossy(&output.stdout);
    let resp: Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(resp["id"], Value::Null);
    assert_eq!(resp["success"], false);
}

#[test]
fn exits_on_stdin_eof() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_worker(&dir);
    drop(child.stdin.take());

    let start = Instant::now();
    let status = child.wait().unwrap();
    assert!(status.success(), "worker should exit 0 on EOF, got {status}");
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn finishes_in_flight_requests_before_exit() {
    // a 12-vertex wheel-like graph keeps the factorization busy for a moment
    let n = 12;
    let mut m = vec![vec![0i64; n]; n];
    for i in 1..n {
        m[0][i] = 1;
        m[i][0] = 1;
        let j = if i == n - 1 { 1 } else { i + 1 };
        m[i][j] = 1;
        m[j][i] = 1;
    }
    let responses = run_session(&[json!({
        "type": "characteristic-polynomial",
        "id": 7,
        "matrix": m,
    })]);
    assert_eq!(responses.len(), 1);
    assert_eq!(responses["7"]["success"], true);
}

#[test]
fn cancel_stops_running_request_and_frees_its_id() {
    // orientation of K24 with arcs low → high: a degree-24 polynomial whose
    // μ-search runs long enough to be interrupted
    let n = 24;
    let mut m = vec![vec![0i64; n]; n];
    for i in 0..n {
        for j in i + 1..n {
            m[i][j] = 1;
            m[j][i] = -1;
        }
    }

    let dir = TempDir::new().unwrap();
    let mut child = spawn_worker(&dir);
    let mut stdin = child.stdin.take().expect("stdin pipe");
    let mut stdout = BufReader::new(child.stdout.take().expect("stdout pipe")).lines();
    let mut send = |line: Value| {
        writeln!(stdin, "{}", serde_json::to_string(&line).unwrap()).unwrap();
        stdin.flush().unwrap();
    };
    let mut next = || -> Value { serde_json::from_str(&stdout.next().unwrap().unwrap()).unwrap() };

    send(json!({"type": "characteristic-polynomial", "id": 7, "matrix": m}));
    send(json!({"type": "cancel", "id": 7}));
    let mut replies = [next(), next()];
    replies.sort_by_key(|r| r["success"] == false);
    assert_eq!(replies[0]["id"], 7);
    assert_eq!(replies[0]["result"]["cancelled"], true);
    assert_eq!(replies[1]["id"], 7);
    assert_eq!(replies[1]["error"], "computation cancelled");

    // the id is free again once the cancelled request has answered
    send(json!({"type": "eigenvalues-symmetric", "id": 7, "matrix": C4}));
    let reply = next();
    assert_eq!(reply["id"], 7);
    assert_eq!(reply["success"], true);

    drop(send);
    drop(stdin);
    let status = child.wait().unwrap();
    assert!(status.success(), "worker should exit 0, got {status}");
}
