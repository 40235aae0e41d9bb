use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "contagion-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn console() -> Command {
    Command::new(env!("CARGO_BIN_EXE_contagion-console"))
}

#[test]
fn cli_infect_reports_the_clamped_stage() {
    let output = console()
        .args(["infect", "subject", "common_cold", "7"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "infected #1 with common_cold at stage 3");
}

#[test]
fn cli_vaccinate_by_id() {
    let output = console()
        .args(["vaccinate", "#2", "space_flu", "--mob", "alice", "--mob", "bob"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "vaccinated #2 against space_flu");
}

#[test]
fn cli_unknown_disease_fails() {
    let output = console()
        .args(["infect", "subject", "made_up"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("unknown disease `made_up`"));
}

#[test]
fn cli_list_diseases_writes_output() {
    let output_path = temp_path("list");
    let status = console()
        .args(["list-diseases", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available diseases"));
    assert!(content.contains("common_cold"));
}

#[test]
fn cli_script_continues_after_a_failed_line() {
    let script_path = temp_path("script");
    std::fs::write(
        &script_path,
        "# ward\nspawn alice 0 0\nspawn bob 1 0\ninfect carol common_cold\ninfect alice common_cold 2\ndiagnose bob\n",
    )
    .expect("write script");
    let output = console()
        .arg("script")
        .arg("--file")
        .arg(&script_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "spawned #1 alice at (0, 0)");
    assert_eq!(lines[1], "spawned #2 bob at (1, 0)");
    assert!(lines[2].starts_with("error: no entity matches `carol`"));
    assert_eq!(lines[3], "infected #1 with common_cold at stage 2");
    assert!(stdout.contains("No pathogens detected."));
}

#[test]
fn cli_simulate_json_is_deterministic() {
    let run = || {
        let output = console()
            .args([
                "--seed",
                "42",
                "simulate",
                "--duration",
                "60",
                "--grid",
                "3",
                "--report",
                "json",
            ])
            .output()
            .expect("run cli");
        assert!(output.status.success());
        serde_json::from_slice::<serde_json::Value>(&output.stdout).expect("json report")
    };
    let first = run();
    assert_eq!(first["seed"], 42);
    assert_eq!(first["population"], 9);
    assert_eq!(first, run());
}

#[test]
fn cli_config_override_is_applied() {
    let config_path = temp_path("config");
    std::fs::write(&config_path, r#"{ "seed": 4242 }"#).expect("write config");
    let output = console()
        .args(["simulate", "--duration", "0", "--report", "json", "--config"])
        .arg(&config_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["seed"], 4242);
}
