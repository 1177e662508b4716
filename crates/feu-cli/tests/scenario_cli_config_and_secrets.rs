use assert_cmd::Command;
use predicates::prelude::*;

fn base_yaml() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("feu-config")
        .join("config")
        .join("base.yaml")
}

#[allow(deprecated)]
fn feu() -> Command {
    let mut cmd = Command::cargo_bin("feu").expect("feu binary");
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("FEU_CONFIG")
        .env_remove("FEU_DATABASE_URL");
    cmd
}

/// `feu config-hash` prints the same hash twice for the same layers.
#[test]
fn config_hash_is_stable_across_invocations() {
    let first = feu()
        .arg("config-hash")
        .arg(base_yaml())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("config_hash="))
        .stdout(predicate::str::contains("\"reference_intensity\":\"91.16\""))
        .get_output()
        .stdout
        .clone();

    let second = feu()
        .arg("config-hash")
        .arg(base_yaml())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(first, second);
}

/// A layer carrying a credentialed URL is refused before anything connects.
#[test]
fn config_hash_refuses_literal_secret() {
    let dir = tempfile::tempdir().unwrap();
    let layer = dir.path().join("leak.yaml");
    std::fs::write(&layer, "database:\n  url: \"postgres://feu:hunter2@db:5432/feu\"\n").unwrap();

    feu()
        .arg("config-hash")
        .arg(base_yaml())
        .arg(&layer)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("hunter2").not());

}

/// Any database-backed command names the missing URL variable and exits
/// non-zero without a connection attempt.
#[test]
fn cb_without_database_url_reports_missing_secret() {
    feu()
        .args(["cb", "--route", "R001", "--year", "2025"])
        .arg("--config")
        .arg(base_yaml())
        .assert()
        .failure()
        .stderr(predicate::str::contains("SECRETS_MISSING"))
        .stderr(predicate::str::contains("FEU_DATABASE_URL"));
}

#[test]
fn pool_without_members_fails_argument_parsing() {
    feu()
        .args(["pool", "--year", "2025"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("MEMBERS"));
}
