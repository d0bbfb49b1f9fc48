#![allow(deprecated)] // cargo_bin! macro doesn't exist yet in assert_cmd 2.1

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TEST_IDENTITY: &str = "alice";
const TEST_KEY: &str = "secret";

/// Scratch storage dir plus an (empty) config file location.
struct Env {
    storage: TempDir,
    config: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            storage: TempDir::new().expect("Failed to create storage dir"),
            config: TempDir::new().expect("Failed to create config dir"),
        }
    }

    /// `veilfs` with storage dir and config isolated, no identity or key.
    fn bare(&self) -> Command {
        let mut cmd = Command::cargo_bin("veilfs").unwrap();
        cmd.env_remove("VEILFS_IDENTITY")
            .env_remove("VEILFS_KEY")
            .env_remove("HASH_SALT")
            .env_remove("RUST_LOG")
            .env("VEILFS_CONFIG", self.config.path().join("config.toml"))
            .env("VEILFS_STORAGE_DIR", self.storage.path());
        cmd
    }

    fn veilfs(&self) -> Command {
        let mut cmd = self.bare();
        cmd.env("VEILFS_IDENTITY", TEST_IDENTITY).env("VEILFS_KEY", TEST_KEY);
        cmd
    }
}

#[test]
fn test_help() {
    Command::cargo_bin("veilfs")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Show the decrypted tree"));
}

#[test]
fn test_write_then_cat() {
    let env = Env::new();
    env.veilfs()
        .args(["write", "docs/readme.md"])
        .write_stdin("hello")
        .assert()
        .success();

    env.veilfs()
        .args(["cat", "docs/readme.md"])
        .assert()
        .success()
        .stdout("hello");
}

#[test]
fn test_tree_and_ls() {
    let env = Env::new();
    env.veilfs().args(["mkdir", "docs/img"]).assert().success();
    env.veilfs()
        .args(["write", "docs/readme.md"])
        .write_stdin("x")
        .assert()
        .success();

    env.veilfs()
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("docs/"))
        .stdout(predicate::str::contains("└── readme.md"));

    env.veilfs()
        .args(["ls", "docs"])
        .assert()
        .success()
        .stdout("img/\nreadme.md\n");

    env.veilfs()
        .args(["ls", "--json", "docs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"directory\""));
}

#[test]
fn test_tree_json_includes_types() {
    let env = Env::new();
    env.veilfs()
        .args(["tree", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"types\""))
        .stdout(predicate::str::contains("\"CRAWLABLE\": 3"));
}

#[test]
fn test_cat_missing_exit_code() {
    let env = Env::new();
    env.veilfs()
        .args(["cat", "nope.txt"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_wrong_key_cannot_see_files() {
    let env = Env::new();
    env.veilfs()
        .args(["write", "a.txt"])
        .write_stdin("private")
        .assert()
        .success();

    env.veilfs()
        .env("VEILFS_KEY", "wrong")
        .args(["cat", "a.txt"])
        .assert()
        .code(7);
}

#[test]
fn test_no_clobber_collision_exit_code() {
    let env = Env::new();
    env.veilfs().args(["write", "a.txt"]).write_stdin("1").assert().success();
    env.veilfs()
        .args(["write", "--no-clobber", "a.txt"])
        .write_stdin("2")
        .assert()
        .code(9);

    env.veilfs().args(["cat", "a.txt"]).assert().success().stdout("1");
}

#[test]
fn test_mv_and_rm() {
    let env = Env::new();
    env.veilfs().args(["write", "a.txt"]).write_stdin("body").assert().success();

    env.veilfs().args(["mv", "a.txt", "b.txt"]).assert().success();
    env.veilfs().args(["cat", "b.txt"]).assert().success().stdout("body");
    env.veilfs().args(["cat", "a.txt"]).assert().code(7);

    env.veilfs().args(["rm", "b.txt"]).assert().success();
    env.veilfs().args(["rm", "b.txt"]).assert().code(7);
    env.veilfs().args(["rm", "-f", "b.txt"]).assert().success();
}

#[test]
fn test_cat_directory_is_usage_error() {
    let env = Env::new();
    env.veilfs().args(["mkdir", "docs"]).assert().success();
    env.veilfs().args(["cat", "docs"]).assert().code(2);
}

#[test]
fn test_missing_identity_is_usage_error() {
    let env = Env::new();
    env.bare()
        .env("VEILFS_KEY", TEST_KEY)
        .arg("tree")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No identity given"));
}

#[test]
fn test_identity_from_config_file() {
    let env = Env::new();
    std::fs::write(
        env.config.path().join("config.toml"),
        "[defaults]\nidentity = \"alice\"\n",
    )
    .unwrap();

    env.veilfs().args(["write", "a.txt"]).write_stdin("from flag").assert().success();
    env.bare()
        .env("VEILFS_KEY", TEST_KEY)
        .args(["cat", "a.txt"])
        .assert()
        .success()
        .stdout("from flag");
}

#[test]
fn test_types_needs_no_credentials() {
    let env = Env::new();
    env.bare()
        .arg("types")
        .assert()
        .success()
        .stdout(predicate::str::contains("UNKNOWN"));
}

#[test]
fn test_quiet_suppresses_errors() {
    let env = Env::new();
    env.veilfs()
        .args(["-q", "cat", "missing.txt"])
        .assert()
        .code(7)
        .stderr(predicate::str::is_empty());
}
