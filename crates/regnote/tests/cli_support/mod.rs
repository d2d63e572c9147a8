#![allow(dead_code)]

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub fn regnote_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_regnote"))
}

pub fn run_cli(args: &[&str], envs: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(regnote_bin());
    cmd.args(args);
    cmd.env_remove("REGNOTE_CONFIG");
    cmd.env_remove("REGNOTE_SMTP_PASSWORD");
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.output().expect("failed to execute regnote CLI")
}

pub fn assert_cli_success(output: &Output, args: &[&str]) {
    assert!(
        output.status.success(),
        "command failed: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn run_cli_json_value(args: &[&str], envs: &[(&str, &str)]) -> serde_json::Value {
    let output = run_cli(args, envs);
    assert_cli_success(&output, args);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json_start = stdout.find(|c| c == '{' || c == '[').unwrap_or_else(|| {
        panic!(
            "no JSON payload found in output\nstdout:\n{}\nstderr:\n{}",
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    });
    let json_text = &stdout[json_start..];
    let mut deserializer = serde_json::Deserializer::from_str(json_text);
    serde_json::Value::deserialize(&mut deserializer).unwrap_or_else(|err| {
        panic!(
            "failed to parse JSON output: {}\nstdout:\n{}\nstderr:\n{}",
            err,
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

pub fn run_cli_json<T: DeserializeOwned>(args: &[&str], envs: &[(&str, &str)]) -> T {
    let value = run_cli_json_value(args, envs);
    serde_json::from_value(value).expect("failed to deserialize JSON output")
}

/// Write a config whose paths all live under `root`. Returns the config path.
pub fn write_config(root: &Path, connection_string: &str) -> PathBuf {
    let source = root.join("incoming");
    fs::create_dir_all(&source).unwrap();

    let config = format!(
        r#"source_directory: "{source}"
ledger_path: "{ledger}"
log_directory: "{logs}"
record_store:
  connection_string: "{conn}"
mail:
  host: 127.0.0.1
  port: 2525
  tls: none
  from: notify@lab.example
"#,
        source = source.display(),
        ledger = root.join("regnote.sqlite3").display(),
        logs = root.join("logs").display(),
        conn = connection_string,
    );
    let path = root.join("config.yml");
    fs::write(&path, config).unwrap();
    path
}
