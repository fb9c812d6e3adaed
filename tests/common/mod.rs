#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper struct to run caseport commands in an isolated temp directory
pub struct CaseportTest {
    pub temp_dir: TempDir,
    binary_path: &'static str,
}

impl CaseportTest {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        CaseportTest {
            temp_dir,
            binary_path: env!("CARGO_BIN_EXE_caseport"),
        }
    }

    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(self.binary_path)
            .args(args)
            .current_dir(self.temp_dir.path())
            .env_remove("CASEPORT_ROOT")
            .env_remove("CASEPORT_CLIENT_ID")
            .env_remove("CASEPORT_CLIENT_SECRET")
            .env_remove("CASEPORT_LOG")
            .output()
            .expect("Failed to execute caseport command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Expected command {:?} to fail, but it succeeded",
            args
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join(".caseport")
    }

    pub fn write_config(&self, content: &str) {
        let dir = self.root();
        fs::create_dir_all(&dir).expect("Failed to create .caseport directory");
        fs::write(dir.join("config.yaml"), content).expect("Failed to write config file");
    }

    pub fn read_config(&self) -> String {
        fs::read_to_string(self.root().join("config.yaml")).expect("Failed to read config file")
    }

    /// Config pointing at a mock server, with fast polling
    pub fn write_remote_config(&self, base_url: &str) {
        self.write_config(&format!(
            "base_url: {base_url}\nauth:\n  client_id: client-1\n  client_secret: secret-1\npoll:\n  max_attempts: 3\n  interval_ms: 1\n"
        ));
    }

    pub fn write_record(&self, id: &str, content: &str) {
        let dir = self.root().join("records");
        fs::create_dir_all(&dir).expect("Failed to create .caseport/records directory");
        fs::write(dir.join(format!("{id}.yaml")), content).expect("Failed to write record file");
    }
}

/// Strip ANSI color sequences from command output
pub fn strip_ansi(text: &str) -> String {
    let re = regex::Regex::new(r"\x1b\[[0-9;]*m").expect("ansi regex should be valid");
    re.replace_all(text, "").into_owned()
}
