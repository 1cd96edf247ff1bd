//! End-to-end tests for the `bindguard` binary.

use std::path::Path;

use assert_cmd::Command;

// sha256("release-cert")
const RELEASE_HASH: &str = "58ef63f250bbb2b42fefdbaf1eb063d258ceb294ee2e85909ffa7b120a082c11";
// sha256("release-cert" ++ "lineage")
const RELEASE_LINEAGE_HASH: &str =
    "d7c9838ad928c57b9c1b13d4b75ec5469d244e09aefb308e8dcb69f25aaa3ab6";

fn setup(dir: &Path) {
    std::fs::write(dir.join("release.der"), b"release-cert").unwrap();
    std::fs::write(dir.join("lineage.der"), b"lineage").unwrap();
    std::fs::write(
        dir.join("inventory.toml"),
        r#"
[[package]]
name = "com.example.app"
uid = 10057
certificate_files = ["release.der"]

[[package]]
name = "com.example.fake"
uid = 10101
certificates = ["00ff"]
"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("allowlist.toml"),
        format!(
            "[[entries]]\nsignature = \"{}\"\npackages = [\"com.example.app\"]\n",
            RELEASE_HASH.to_uppercase()
        ),
    )
    .unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "log_level = \"warn\"\nallowlist = \"allowlist.toml\"\ninventory = \"inventory.toml\"\n",
    )
    .unwrap();
}

fn bindguard(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bindguard").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg(dir.join("config.toml"));
    cmd
}

#[test]
fn check_allowed_uid() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let output = bindguard(dir.path())
        .args(["check", "--uid", "10057"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim(), format!("allowed: com.example.app ({})", RELEASE_HASH));
}

#[test]
fn check_denied_uid_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let output = bindguard(dir.path())
        .args(["check", "--uid", "10101"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8(output.stdout).unwrap().trim(), "denied: com.example.fake");
}

#[test]
fn check_unknown_uid_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let output = bindguard(dir.path())
        .args(["check", "--uid", "4242"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("no packages associated with caller uid 4242"));
}

#[test]
fn truncated_allow_list_hash_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());
    // leading zero byte dropped, 31 bytes left
    std::fs::write(
        dir.path().join("allowlist.toml"),
        format!(
            "[[entries]]\nsignature = \"{}\"\npackages = [\"com.example.app\"]\n",
            &RELEASE_HASH[2..]
        ),
    )
    .unwrap();

    let output = bindguard(dir.path())
        .args(["check", "--uid", "10057"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("31-byte digest, expected 32 bytes for sha256"));
}

#[test]
fn config_errors_are_logged() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());
    std::fs::write(dir.path().join("config.toml"), "log_level = [").unwrap();

    let output = bindguard(dir.path()).arg("allowlist").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("ERROR"));
    assert!(stderr.contains("failed to load config"));
}

#[test]
fn check_requires_a_target() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    bindguard(dir.path()).arg("check").assert().failure();
}

#[test]
fn hash_certificates() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    bindguard(dir.path())
        .arg("hash")
        .arg(dir.path().join("release.der"))
        .arg(dir.path().join("lineage.der"))
        .assert()
        .success()
        .stdout(format!("{}\n", RELEASE_HASH));

    bindguard(dir.path())
        .args(["hash", "--all"])
        .arg(dir.path().join("release.der"))
        .arg(dir.path().join("lineage.der"))
        .assert()
        .success()
        .stdout(format!("{}\n", RELEASE_LINEAGE_HASH));
}

#[test]
fn allowlist_listing() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    bindguard(dir.path())
        .arg("allowlist")
        .assert()
        .success()
        .stdout(format!(
            "{}\n    com.example.app\n1 signatures, 1 package patterns\n",
            RELEASE_HASH
        ));
}
