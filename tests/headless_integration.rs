// Drives the compiled binary on a recorded event log, exercising the real
// CLI surface, the replay path, and the summary rendering end to end.

use std::process::Command;

use assert_cmd::prelude::*;

#[test]
fn replay_prints_session_summary() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let log_path = dir.path().join("events.json");
    std::fs::write(
        &log_path,
        r#"[
            {"event": "ball_touched", "at": 0.0},
            {"event": "ball_explode", "at": 4.0},
            {"event": "round_reset", "at": 5.0},
            {"event": "ball_touched", "at": 10.0},
            {"event": "goal_scored", "at": 12.0, "score": 1},
            {"event": "ball_explode", "at": 15.0},
            {"event": "round_reset", "at": 16.0}
        ]"#,
    )?;

    let output = Command::cargo_bin("shotlog")?
        .arg("--log")
        .arg(&log_path)
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;

    // Two attempts, one goal: the replay explosion at 15s must not count.
    assert!(stdout.contains("session session_"), "stdout: {stdout}");
    assert!(stdout.contains("total         2      1     50.0%"), "stdout: {stdout}");
    assert!(stdout.contains(".x"), "history column missing: {stdout}");
    Ok(())
}

#[test]
fn show_prints_stored_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session_1700000000000.json");
    std::fs::write(
        &path,
        r#"{
            "sessionId": "session_1700000000000",
            "status": "completed",
            "startTime": "2026-08-30T10:00:00",
            "lastUpdated": "2026-08-30T10:42:00",
            "durationMinutes": 42,
            "totalAttempts": 3,
            "totalGoals": 2,
            "totalAccuracy": 66.7,
            "shots": {
                "1": {"attempts": 3, "goals": 2, "attemptHistory": [true, false, true], "shotType": "Aerial", "accuracy": 66.7}
            },
            "totalShots": 1
        }"#,
    )?;

    let output = Command::cargo_bin("shotlog")?
        .arg("--show")
        .arg(&path)
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("session_1700000000000"), "stdout: {stdout}");
    assert!(stdout.contains("completed"), "stdout: {stdout}");
    assert!(stdout.contains("shot 1 [Aerial]: 2/3"), "stdout: {stdout}");
    Ok(())
}

#[test]
fn missing_log_file_fails_cleanly() -> Result<(), Box<dyn std::error::Error>> {
    let output = Command::cargo_bin("shotlog")?
        .arg("--log")
        .arg("/nonexistent/events.json")
        .output()?;
    assert!(!output.status.success());
    Ok(())
}
