use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

/// Writes an artifact for every module and fails on modules mentioning ERROR
#[cfg(unix)]
const FAKE_COMPILER: &str = r##"#!/bin/sh
bin=""; modules=""
while [ $# -gt 0 ]; do
  case "$1" in
    -bin) bin="$2"; shift 2;;
    -modules) modules="$2"; shift 2;;
    *) shift;;
  esac
done

status=0
IFS=':'
for module in $modules; do
  if grep -q ERROR "$module"; then
    echo "$module: error: undeclared name"
    status=1
    continue
  fi
  stem=$(basename "$module" .rsc)
  mkdir -p "$bin/rascal"
  echo "compiled" > "$bin/rascal/\$$stem.tpl"
done
exit $status
"##;

fn rascal_build() -> Command {
    let mut cmd = Command::cargo_bin("rascal-build").expect("rascal-build binary");
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("RASCAL_COMPILE_SKIP");
    cmd
}

fn project(modules: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("src/main/rascal");
    fs::create_dir_all(&src).expect("source root");
    for (name, body) in modules {
        fs::write(src.join(name), body).expect("module");
    }

    let config = format!(
        r#"{{
  "project": {{ "name": "demo" }},
  "launcher": {{ "executable": "{}" }}
}}"#,
        dir.path().join("rascal-check").display()
    );
    fs::write(dir.path().join(".rascal-build.json"), config).expect("config");
    dir
}

#[cfg(unix)]
fn install_fake_compiler(root: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let tool = root.join("rascal-check");
    fs::write(&tool, FAKE_COMPILER).expect("fake compiler");
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).expect("permissions");
}

#[test]
fn help_lists_every_goal() {
    rascal_build()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            contains("compile")
                .and(contains("tutor"))
                .and(contains("package"))
                .and(contains("generate-sources"))
                .and(contains("console")),
        );
}

#[test]
fn compile_dry_run_prints_the_checker_command() {
    let dir = project(&[("A.rsc", "module A"), ("B.rsc", "module B")]);

    rascal_build()
        .current_dir(dir.path())
        .args(["compile", "--dry-run"])
        .assert()
        .success()
        .stdout(
            contains("rascal-check")
                .and(contains("-modules"))
                .and(contains("A.rsc"))
                .and(contains("Command breakdown")),
        );

    assert!(!dir.path().join("target").exists());
}

#[test]
fn package_dry_run_uses_the_project_name() {
    let dir = project(&[]);

    rascal_build()
        .current_dir(dir.path())
        .args(["package", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("-sourceLookup"));
}

#[test]
fn missing_launcher_is_reported() {
    let dir = tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("src/main/rascal")).expect("source root");
    fs::write(dir.path().join("src/main/rascal/A.rsc"), "module A").expect("module");

    rascal_build()
        .current_dir(dir.path())
        .args(["compile", "--dry-run"])
        .assert()
        .failure()
        .stderr(contains("Error"));
}

#[cfg(unix)]
#[test]
fn compile_writes_artifacts() {
    let dir = project(&[("A.rsc", "module A"), ("B.rsc", "module B")]);
    install_fake_compiler(dir.path());

    rascal_build().current_dir(dir.path()).arg("compile").assert().success();

    let bin = dir.path().join("target/classes/rascal");
    assert!(bin.join("$A.tpl").exists());
    assert!(bin.join("$B.tpl").exists());
}

#[cfg(unix)]
#[test]
fn compile_errors_fail_the_command() {
    let dir = project(&[("A.rsc", "module A"), ("Broken.rsc", "module Broken ERROR")]);
    install_fake_compiler(dir.path());

    rascal_build()
        .current_dir(dir.path())
        .arg("compile")
        .assert()
        .failure()
        .stderr(contains("Errors found while checking."));

    assert!(dir.path().join("target/classes/rascal/$A.tpl").exists());
}

#[cfg(unix)]
#[test]
fn errors_as_warnings_passes() {
    let dir = project(&[("Broken.rsc", "module Broken ERROR")]);
    install_fake_compiler(dir.path());

    rascal_build()
        .current_dir(dir.path())
        .args(["compile", "--errors-as-warnings"])
        .assert()
        .success();
}

#[test]
fn skip_switch_turns_compile_into_a_no_op() {
    let dir = project(&[("A.rsc", "module A")]);

    rascal_build()
        .current_dir(dir.path())
        .env("RASCAL_COMPILE_SKIP", "true")
        .arg("compile")
        .assert()
        .success();

    assert!(!dir.path().join("target").exists());
}
