use cli_test_dir::*;
use std::fs;

#[test]
fn help_flag() {
    let testdir = TestDir::new("spectrum-import", "help_flag");
    let output = testdir.cmd().arg("--help").expect_success();
    assert!(output.stdout_str().contains("spectrum-import"));
}

#[test]
fn version_flag() {
    let testdir = TestDir::new("spectrum-import", "version_flag");
    let output = testdir.cmd().arg("--version").expect_success();
    assert!(output.stdout_str().contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn config_set_rewrites_env_file() {
    let testdir = TestDir::new("spectrum-import", "config_set_rewrites_env_file");
    testdir
        .cmd()
        .args([
            "config",
            "--env-file",
            "test.env",
            "set",
            "S3_LOCATION",
            "s3://b/x/y/z/schema1/feed/",
        ])
        .expect_success();
    testdir
        .cmd()
        .args([
            "config",
            "--env-file",
            "test.env",
            "set",
            "REDSHIFT_HOST",
            "example.invalid",
        ])
        .expect_success();

    let text = fs::read_to_string(testdir.path("test.env")).unwrap();
    assert!(text.contains("S3_LOCATION=s3://b/x/y/z/schema1/feed/"));
    assert!(text.contains("REDSHIFT_HOST=example.invalid"));
}

#[test]
fn config_unset_removes_key() {
    let testdir = TestDir::new("spectrum-import", "config_unset_removes_key");
    testdir
        .cmd()
        .args(["config", "--env-file", "test.env", "set", "AWS_PROFILE", "dev"])
        .expect_success();
    testdir
        .cmd()
        .args(["config", "--env-file", "test.env", "unset", "AWS_PROFILE"])
        .expect_success();

    let text = fs::read_to_string(testdir.path("test.env")).unwrap();
    assert!(!text.contains("AWS_PROFILE"));
}

#[test]
fn run_fails_fast_without_s3_location() {
    let testdir = TestDir::new("spectrum-import", "run_fails_fast_without_s3_location");
    let output = testdir
        .cmd()
        .arg("run")
        .env_remove("S3_LOCATION")
        .expect_failure();
    assert!(output.stdout_str().contains("S3_LOCATION"));
}

#[test]
fn run_fails_fast_with_empty_s3_location() {
    let testdir = TestDir::new("spectrum-import", "run_fails_fast_with_empty_s3_location");
    let output = testdir
        .cmd()
        .arg("run")
        .env("S3_LOCATION", " , ")
        .expect_failure();
    assert!(output.stdout_str().contains("S3_LOCATION"));
}
