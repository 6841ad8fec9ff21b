//! End-to-end tests for the `publish` command

mod common;
use common::prelude::*;

/// Test that --help lists the publish options
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_publish_help() {
    let mut cmd = cargo_bin_cmd!("artifact-combiner");

    cmd.arg("publish")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--allow-conflicts"));
}

/// Test that each publication lands only in its bound repository
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_publish_to_bound_repositories() {
    let fixture = TestFixture::new()
        .with_sub_build("cpp", "1.0", "r1")
        .with_artifact("cpp", "_GROUP_com_foo_ID_bar-cpp_CLS-headers.zip")
        .with_sub_build("java", "1.0", "r2")
        .with_artifact("java", "_GROUP_com_foo_ID_bar-java_CLS.jar")
        .with_artifact("java", "_GROUP_com_foo_ID_bar-java_CLS-sources.jar");

    fixture
        .command()
        .arg("publish")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[OK] Published com.foo:bar-cpp:1.0 to 'r1'",
        ))
        .stdout(predicate::str::contains(
            "[OK] Published com.foo:bar-java:1.0 to 'r2'",
        ));

    let repos = fixture.repos_root();
    assert!(repos.join("r1/com/foo/bar-cpp/1.0/bar-cpp-1.0-headers.zip").is_file());
    assert!(repos.join("r2/com/foo/bar-java/1.0/bar-java-1.0.jar").is_file());
    assert!(repos.join("r2/com/foo/bar-java/1.0/bar-java-1.0-sources.jar").is_file());
    assert!(!repos.join("r1/com/foo/bar-java").exists());
    assert!(!repos.join("r2/com/foo/bar-cpp").exists());
}

/// Test that --dry-run reports without writing
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_publish_dry_run() {
    let fixture = TestFixture::new()
        .with_sub_build("java", "2.0", "r2")
        .with_artifact("java", "_GROUP_com_foo_ID_bar-java_CLS.jar");

    fixture
        .command()
        .arg("publish")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Would publish com.foo:bar-java:2.0 to 'r2'",
        ));

    assert!(!fixture.repos_root().exists());
}

/// Test that conflicts block publishing unless explicitly allowed
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_publish_refuses_conflicts() {
    let fixture = TestFixture::new()
        .with_sub_build("a", "1.0", "r1")
        .with_artifact("a", "_GROUP_com_foo_ID_bar_CLS.zip")
        .with_sub_build("b", "1.0", "r2")
        .with_artifact("b", "_GROUP_com_foo_ID_bar_CLS-sources.zip");

    fixture
        .command()
        .arg("publish")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Refusing to publish"));
    assert!(!fixture.repos_root().exists());

    fixture
        .command()
        .arg("publish")
        .arg("--allow-conflicts")
        .assert()
        .success();
    assert!(fixture.repos_root().join("r1/com/foo/bar/1.0/bar-1.0.zip").is_file());
    assert!(!fixture.repos_root().join("r1/com/foo/bar/1.0/bar-1.0-sources.zip").exists());
    assert!(!fixture.repos_root().join("r2").exists());
}

/// Test that a failing repository fails the command but not other repositories
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_publish_failure_is_isolated() {
    let fixture = TestFixture::new()
        .with_sub_build("cpp", "1.0", "remote")
        .with_artifact("cpp", "_GROUP_g_ID_cpp_CLS.zip")
        .with_sub_build("java", "1.0", "local")
        .with_artifact("java", "_GROUP_g_ID_java_CLS.jar")
        .with_config("repositories:\n  remote: https://repo.example.com/releases\n");

    fixture
        .command()
        .arg("publish")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[FAIL] Repository 'remote'"))
        .stdout(predicate::str::contains("[OK] Published g:java:1.0 to 'local'"))
        .stderr(predicate::str::contains("Publishing failed for 1 repository(ies)"));

    assert!(fixture.repos_root().join("local/g/java/1.0/java-1.0.jar").is_file());
}

/// Test that an empty products root publishes nothing and succeeds
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_publish_nothing() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .arg("publish")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to publish"));
}
