//! CLI integration tests for medibot
//!
//! Drives the medibot binary end-to-end using assert_cmd. Every command runs
//! with an isolated config directory and without LLM credentials.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

const CATALOG: &str = r#"[
  {"name": "Dr. Amina Rao", "specialty": "Cardiology", "tags": "heart chest"},
  {"name": "Dr. Priya Nair", "specialty": "Neurology", "tags": "brain headache"},
  {"name": "Dr. Maria Lopez", "specialty": "General Medicine", "tags": "fever family"}
]"#;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("doctors.json"), CATALOG).unwrap();
        Self { dir }
    }

    fn catalog(&self) -> PathBuf {
        self.dir.path().join("doctors.json")
    }

    fn config_dir(&self) -> PathBuf {
        self.dir.path().join("config")
    }

    /// Helper to create a command isolated from the user's config and keys
    #[allow(deprecated)]
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("medibot").unwrap();
        cmd.current_dir(self.dir.path());
        cmd.env("MEDIBOT_CONFIG_DIR", self.config_dir());
        cmd.env_remove("MEDIBOT_API_KEY");
        cmd.env_remove("GROQ_API_KEY");
        cmd.env("RUST_LOG", "error");
        cmd
    }
}

#[test]
fn test_classify_cardiology_scenario() {
    let env = Env::new();
    env.cmd()
        .args(["classify", "I have chest pain and shortness of breath"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Specialty: Cardiology (score 1.90)"));
}

#[test]
fn test_classify_json() {
    let env = Env::new();
    let output = env
        .cmd()
        .args(["--format", "json", "classify", "my", "knee", "hurts"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["specialty"], "Orthopedics");
    assert!((value["score"].as_f64().unwrap() - 0.8).abs() < 1e-9);
}

#[test]
fn test_classify_no_match() {
    let env = Env::new();
    env.cmd()
        .args(["classify", "I feel generally unwell"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No known symptom found."));
}

#[test]
fn test_resolve_graph_match_with_doctor() {
    let env = Env::new();
    env.cmd()
        .arg("--catalog")
        .arg(env.catalog())
        .args(["resolve", "Patient: my head hurts", "Nurse: Since when?", "Patient: two days"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Specialty: Neurology"))
        .stdout(predicate::str::contains("Dr. Priya Nair"))
        .stdout(predicate::str::contains("video call"));
}

#[test]
fn test_resolve_defaults_without_llm() {
    let env = Env::new();
    let output = env
        .cmd()
        .arg("--catalog")
        .arg(env.catalog())
        .args(["--format", "json", "resolve", "I feel generally unwell"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["specialty"], "General Medicine");
    assert_eq!(value["confidence_source"], "fallback");
    assert_eq!(value["defaulted"], true);
    assert_eq!(value["doctor"]["record"]["name"], "Dr. Maria Lopez");
}

#[test]
fn test_resolve_missing_catalog_schedules_visit() {
    let env = Env::new();
    env.cmd()
        .args(["--catalog", "/nonexistent/doctors.json", "resolve", "my knee hurts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Specialty: Orthopedics"))
        .stdout(predicate::str::contains("schedule a visit"));
}

#[test]
fn test_doctors_list() {
    let env = Env::new();
    env.cmd()
        .arg("--catalog")
        .arg(env.catalog())
        .args(["doctors", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dr. Amina Rao"))
        .stdout(predicate::str::contains("3 doctors"));
}

#[test]
fn test_doctors_search_lexical() {
    let env = Env::new();
    env.cmd()
        .arg("--catalog")
        .arg(env.catalog())
        .args(["doctors", "search", "Cardiology"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dr. Amina Rao"))
        .stdout(predicate::str::contains("Dr. Priya Nair").not());
}

#[test]
fn test_doctors_search_semantic() {
    let env = Env::new();
    env.cmd()
        .arg("--catalog")
        .arg(env.catalog())
        .args(["doctors", "search", "neurology", "--mode", "semantic", "-k", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dr. Priya Nair"));
}

#[test]
fn test_doctors_search_no_match() {
    let env = Env::new();
    env.cmd()
        .arg("--catalog")
        .arg(env.catalog())
        .args(["doctors", "search", "Dentistry"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No matching doctors"));
}

#[test]
fn test_doctors_search_invalid_mode() {
    let env = Env::new();
    env.cmd()
        .args(["doctors", "search", "Cardiology", "--mode", "magic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid matcher mode"));
}

#[test]
fn test_graph_stats() {
    let env = Env::new();
    env.cmd()
        .args(["graph", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Specialties: 10"));
}

#[test]
fn test_graph_symptoms() {
    let env = Env::new();
    env.cmd()
        .args(["graph", "symptoms"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shortness of breath"));
}

#[test]
fn test_config_set_get_reset() {
    let env = Env::new();

    env.cmd()
        .args(["config", "set", "matcher.mode", "semantic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set matcher.mode = semantic"));
    assert!(env.config_dir().join("config.toml").exists());

    env.cmd()
        .args(["config", "get", "matcher.mode"])
        .assert()
        .success()
        .stdout(predicate::str::diff("semantic\n"));

    env.cmd().args(["config", "reset"]).assert().success();

    env.cmd()
        .args(["config", "get", "matcher.mode"])
        .assert()
        .success()
        .stdout(predicate::str::diff("lexical\n"));
}

#[test]
fn test_config_rejects_out_of_range_threshold() {
    let env = Env::new();
    env.cmd()
        .args(["config", "set", "matcher.dice_threshold", "1.5"])
        .assert()
        .failure();
    assert!(!env.config_dir().join("config.toml").exists());
}

#[test]
fn test_config_path_uses_override() {
    let env = Env::new();
    env.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains(env.config_dir().to_string_lossy().to_string()));
}

#[test]
fn test_chat_requires_api_key() {
    let env = Env::new();
    env.cmd()
        .arg("chat")
        .assert()
        .failure()
        .stderr(predicate::str::contains("MEDIBOT_API_KEY"));
}

#[test]
fn test_doctor_health_check() {
    let env = Env::new();
    env.cmd()
        .arg("--catalog")
        .arg(env.catalog())
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Knowledge graph"))
        .stdout(predicate::str::contains("[OK] Doctor catalog: 3 doctors"))
        .stdout(predicate::str::contains("API Key: Not configured"));
}
