use assert_cmd::prelude::*;
use httpmock::{Method::GET, MockServer};
use predicates::prelude::*;
use serde_json::json;
use std::process::Command;

const KEY_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/AuthKey_TEST1234.p8");

fn asc() -> Command {
    let mut cmd = Command::cargo_bin("asc").unwrap();
    for var in [
        "ASC_ISSUER_ID",
        "ASC_KEY_ID",
        "ASC_PRIVATE_KEY",
        "ASC_PRIVATE_KEY_PATH",
        "ASC_BASE_URL",
        "ASC_TOKEN_LIFETIME_SECS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn with_credentials(cmd: &mut Command) -> &mut Command {
    cmd.env("ASC_ISSUER_ID", "issuer-1")
        .env("ASC_KEY_ID", "TEST1234")
        .env("ASC_PRIVATE_KEY_PATH", KEY_PATH)
}

#[test]
fn prints_help() {
    asc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("App Store Connect"));
}

#[test]
fn missing_credentials_name_the_variable() {
    asc()
        .arg("apps")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ASC_ISSUER_ID"));
}

#[test]
fn token_prints_a_jwt() {
    let mut cmd = asc();
    with_credentials(&mut cmd)
        .arg("token")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[\w-]+\.[\w-]+\.[\w-]+\n$").unwrap());
}

#[test]
fn apps_lists_rows_from_base_url() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/apps")
            .query_param("filter[bundleId]", "com.example.demo")
            .header_exists("authorization");
        then.status(200).json_body(json!({
            "data": [{"type": "apps", "id": "app1", "attributes": {"name": "Demo", "bundleId": "com.example.demo"}}],
            "links": {"next": server.url("/v1/apps?cursor=Mg")}
        }));
    });

    let mut cmd = asc();
    with_credentials(&mut cmd)
        .env("ASC_BASE_URL", server.base_url())
        .args(["apps", "--bundle-id", "com.example.demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app1\tDemo\tcom.example.demo"))
        .stdout(predicate::str::contains("next: "));
    m.assert();
}

#[test]
fn api_errors_fail_the_command() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/builds/b1");
        then.status(401).json_body(json!({"errors": [{
            "status": "401",
            "code": "NOT_AUTHORIZED",
            "title": "Authentication credentials are missing or invalid.",
            "detail": "Provide a properly configured and signed bearer token"
        }]}));
    });

    let mut cmd = asc();
    with_credentials(&mut cmd)
        .env("ASC_BASE_URL", server.base_url())
        .args(["build-info", "--build", "b1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOT_AUTHORIZED"));
}
