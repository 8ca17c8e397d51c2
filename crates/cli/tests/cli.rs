use std::path::PathBuf;

use assert_cmd::Command;

fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config")
}

#[test]
fn tools_prints_capability_table() {
    let output = Command::cargo_bin("catalog")
        .unwrap()
        .env_remove("CATALOG_ENV")
        .arg("--config-dir")
        .arg(config_dir())
        .arg("tools")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    for tool in [
        "books_add",
        "books_update",
        "books_delete",
        "books_get",
        "books_list",
        "books_search",
    ] {
        assert!(stdout.contains(tool), "{tool} missing from:\n{stdout}");
    }
    assert!(stdout.contains("enabled"));
}

#[test]
fn migrate_applies_once() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("books.db").display());

    let run = || {
        Command::cargo_bin("catalog")
            .unwrap()
            .env_remove("CATALOG_ENV")
            .env("CATALOG_DATABASE__URL", &url)
            .arg("migrate")
            .arg("--config-dir")
            .arg(config_dir())
            .output()
            .unwrap()
    };

    let first = run();
    assert!(first.status.success());
    assert!(String::from_utf8_lossy(&first.stdout).contains("applied 1 migration(s)"));

    let second = run();
    assert!(second.status.success());
    assert!(String::from_utf8_lossy(&second.stdout).contains("applied 0 migration(s)"));
}

#[test]
fn unknown_environment_fails() {
    Command::cargo_bin("catalog")
        .unwrap()
        .env("CATALOG_ENV", "moon")
        .arg("tools")
        .assert()
        .failure();
}
