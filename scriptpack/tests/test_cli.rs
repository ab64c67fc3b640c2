// Allow deprecated APIs (assert_cmd::cargo_bin is deprecated but still works)
#![allow(deprecated)]

use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
use rstest::rstest;
use std::fs;
use std::path::Path;
use std::process::Command; // Run programs
use tempfile::tempdir;

fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (name, contents) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
}

#[rstest]
#[case::default_task(None)]
#[case::scripts_task(Some("scripts"))]
#[case::build_task(Some("build"))]
fn test_bundles_entries(#[case] task: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_files(
        dir.path(),
        &[
            ("app.js", "import { name } from \"./dep.js\";\nconsole.log(name);\n"),
            ("dep.js", "export const name = \"from dep\";\n"),
        ],
    );

    let mut cmd = Command::cargo_bin("scriptpack")?;
    if let Some(task) = task {
        cmd.arg(task);
    }
    cmd.arg("-C").arg(dir.path()).assert().success();

    let bundle = fs::read_to_string(dir.path().join("app.min.js"))?;
    assert!(bundle.contains("from dep"));
    assert!(bundle.ends_with("//# sourceMappingURL=app.min.js.map"));

    let map = sourcemap::SourceMap::from_slice(&fs::read(dir.path().join("app.min.js.map"))?)?;
    let sources: Vec<_> = map.sources().collect();
    assert!(sources.contains(&"app.js"));
    assert!(sources.contains(&"dep.js"));
    Ok(())
}

#[test]
fn test_config_file_is_discovered() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_files(
        dir.path(),
        &[
            ("src/main.js", "console.log(\"main\");\n"),
            (
                "scriptpack.toml",
                "scripts = [\"./src/*.js\"]\ndest = \"./public\"\n",
            ),
        ],
    );

    Command::cargo_bin("scriptpack")?
        .arg("-C")
        .arg(dir.path())
        .assert()
        .success();

    assert!(dir.path().join("public/main.min.js").is_file());
    assert!(dir.path().join("public/main.min.js.map").is_file());
    Ok(())
}

#[test]
fn test_explicit_config_path() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_files(
        dir.path(),
        &[
            ("web/entry.js", "console.log(\"entry\");\n"),
            ("build.toml", "scripts = [\"./web/*.js\"]\ndest = \"./out\"\n"),
        ],
    );

    Command::cargo_bin("scriptpack")?
        .arg("--config")
        .arg(dir.path().join("build.toml"))
        .assert()
        .success();

    assert!(dir.path().join("out/entry.min.js").is_file());
    Ok(())
}

#[test]
fn test_invalid_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_files(dir.path(), &[("scriptpack.toml", "scripts = [\"./*.js\"]\nunknown_key = 1\n")]);

    Command::cargo_bin("scriptpack")?
        .arg("-C")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("scriptpack.toml"));
    Ok(())
}

#[test]
fn test_missing_import_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_files(dir.path(), &[("broken.js", "import \"./missing.js\";\n")]);

    Command::cargo_bin("scriptpack")?
        .arg("-C")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("broken.js"));

    assert!(!dir.path().join("broken.min.js").exists());
    Ok(())
}

#[test]
fn test_unknown_task_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    Command::cargo_bin("scriptpack")?
        .arg("lint")
        .arg("-C")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("lint"));
    Ok(())
}

#[test]
fn test_lists_tasks() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("scriptpack")?
        .arg("--tasks")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("scripts")
                .and(predicate::str::contains("build"))
                .and(predicate::str::contains("default")),
        );
    Ok(())
}

#[test]
fn test_no_matching_entries_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_files(dir.path(), &[("notes.txt", "not a script\n")]);

    Command::cargo_bin("scriptpack")?
        .arg("-C")
        .arg(dir.path())
        .assert()
        .success();
    Ok(())
}

#[test]
fn test_logs_written_paths() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_files(dir.path(), &[("app.js", "console.log(\"app\");\n")]);

    Command::cargo_bin("scriptpack")?
        .arg("-C")
        .arg(dir.path())
        .env("RUST_LOG", "info")
        .assert()
        .success()
        .stderr(
            predicate::str::contains("bundling")
                .and(predicate::str::contains("app.min.js.map"))
                .and(predicate::str::contains("app.min.js")),
        );
    Ok(())
}

#[test]
fn test_required_json_is_bundled() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_files(
        dir.path(),
        &[
            ("r.js", "const data = require(\"./d.json\");\nconsole.log(data.k);\n"),
            ("d.json", "{\"k\": \"json via require\"}\n"),
        ],
    );

    Command::cargo_bin("scriptpack")?
        .arg("-C")
        .arg(dir.path())
        .assert()
        .success();

    assert!(fs::read_to_string(dir.path().join("r.min.js"))?.contains("json via require"));
    Ok(())
}
