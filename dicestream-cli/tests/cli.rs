use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "dicestream-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn dicestream() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_dicestream"));
    command
        .stdin(Stdio::null())
        .env_remove("SNAPSHOT_EVERY")
        .env_remove("SNAPSHOT_PATH");
    command
}

#[test]
fn cli_live_then_analyze_writes_reports() {
    let dir = temp_path("roundtrip");
    let log = dir.join("snapshots.csv");
    let reports = dir.join("reports");

    let live = dicestream()
        .args([
            "--mode",
            "live",
            "--seed",
            "1",
            "--max-rolls",
            "20",
            "--delay-ms",
            "0",
            "--snapshot-every",
            "10",
            "--snapshot-path",
        ])
        .arg(&log)
        .output()
        .expect("run live mode");
    assert!(
        live.status.success(),
        "live failed: {}",
        String::from_utf8_lossy(&live.stderr)
    );
    let content = std::fs::read_to_string(&log).expect("read snapshot log");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("ts,n,max_abs_dev,chi2,"));
    assert_eq!(lines[1].split(',').nth(1), Some("10"));
    assert_eq!(lines[2].split(',').nth(1), Some("20"));

    let analyze = dicestream()
        .args(["--mode", "analyze", "--report", "json", "--input"])
        .arg(&log)
        .arg("--out-dir")
        .arg(&reports)
        .output()
        .expect("run analyze mode");
    assert!(
        analyze.status.success(),
        "analyze failed: {}",
        String::from_utf8_lossy(&analyze.stderr)
    );
    let report: serde_json::Value =
        serde_json::from_slice(&analyze.stdout).expect("json report on stdout");
    assert_eq!(report["rows_read"], 2);
    assert_eq!(report["run_count"], 1);
    assert!(reports.join("faces_distribution.svg").exists());
    assert!(reports.join("faces_trend.svg").exists());
    assert!(reports.join("summary.csv").exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cli_snapshot_settings_fall_back_to_environment() {
    let dir = temp_path("env");
    let log = dir.join("env-snapshots.csv");

    let output = dicestream()
        .env("SNAPSHOT_EVERY", "5")
        .env("SNAPSHOT_PATH", &log)
        .args(["--seed", "4", "--max-rolls", "15", "--delay-ms", "0", "--emit-events"])
        .output()
        .expect("run live mode");
    assert!(output.status.success());

    let events = String::from_utf8_lossy(&output.stdout);
    assert_eq!(events.lines().count(), 15);
    assert!(events.lines().all(|line| line.contains("\"kind\":\"dice\"")));

    let content = std::fs::read_to_string(&log).expect("read snapshot log");
    assert_eq!(content.lines().count(), 4);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cli_analyze_rejects_header_only_log() {
    let dir = temp_path("empty");
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let log = dir.join("snapshots.csv");
    std::fs::write(
        &log,
        "ts,n,max_abs_dev,chi2,p1,p2,p3,p4,p5,p6,c1,c2,c3,c4,c5,c6\n",
    )
    .expect("write header");
    let reports = dir.join("reports");

    let output = dicestream()
        .args(["--mode", "analyze", "--input"])
        .arg(&log)
        .arg("--out-dir")
        .arg(&reports)
        .output()
        .expect("run analyze mode");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no snapshot rows"), "stderr: {stderr}");
    assert!(!reports.join("faces_distribution.svg").exists());
    assert!(!reports.join("faces_trend.svg").exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cli_live_exits_when_stdin_closes_while_paused() {
    let dir = temp_path("stdin");
    let output = dir.join("summary.json");

    let mut child = dicestream()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .args(["--seed", "1", "--delay-ms", "50", "--report", "json", "--snapshot-path"])
        .arg(dir.join("snapshots.csv"))
        .arg("--output")
        .arg(&output)
        .spawn()
        .expect("spawn live mode");
    {
        let mut stdin = child.stdin.take().expect("piped stdin");
        stdin.write_all(b"p\n").expect("write pause command");
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    while child.try_wait().expect("poll child").is_none() {
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("live mode kept running after stdin closed");
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    let finished = child.wait_with_output().expect("collect output");
    assert!(
        finished.status.success(),
        "live failed: {}",
        String::from_utf8_lossy(&finished.stderr)
    );

    let content = std::fs::read_to_string(&output).expect("read summary");
    let summary: serde_json::Value = serde_json::from_str(&content).expect("whole file is json");
    assert_eq!(summary["outcome"], "input_closed");
    assert!(summary["rolls"].as_u64().is_some_and(|rolls| rolls >= 1));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cli_json_report_file_holds_only_the_summary() {
    let dir = temp_path("json");
    let output = dir.join("summary.json");

    let finished = dicestream()
        .args(["--seed", "2", "--max-rolls", "3", "--delay-ms", "0", "--report", "json"])
        .arg("--snapshot-path")
        .arg(dir.join("snapshots.csv"))
        .arg("--output")
        .arg(&output)
        .output()
        .expect("run live mode");
    assert!(finished.status.success());

    let content = std::fs::read_to_string(&output).expect("read summary");
    let summary: serde_json::Value = serde_json::from_str(&content).expect("whole file is json");
    assert_eq!(summary["rolls"], 3);
    assert_eq!(summary["outcome"], "completed");

    let _ = std::fs::remove_dir_all(&dir);
}
