// Binary-level tests: argument validation, config resolution and a full
// session against a mock Zabbix endpoint.

use assert_cmd::cargo::cargo_bin_cmd;
use httpmock::prelude::*;
use serde_json::{Value, json};
use std::fs;
use tempfile::{TempDir, tempdir};

const TOKEN: &str = "0424bd59b807674191e7d77572075f33";

fn workspace(server: &MockServer) -> TempDir {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("config")).unwrap();
    fs::write(
        dir.path().join("config").join("config.yaml"),
        format!(
            "servers:\n  lab:\n    address: {}\n    username: admin\n    protocol: http\n",
            server.address()
        ),
    )
    .unwrap();
    dir
}

fn zbxctl(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("zbxctl");
    cmd.current_dir(dir.path())
        .env("ZBXCTL_CONFIG_DIR", dir.path().join("config"))
        .env("ZBXCTL_PASSWORD", "zabbix")
        .env_remove("RUST_LOG");
    cmd
}

fn mock_login(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(POST).path("/zabbix/api_jsonrpc.php").json_body(json!({
            "jsonrpc": "2.0",
            "method": "user.login",
            "params": {"user": "admin", "password": "zabbix"},
            "auth": null,
            "id": 1
        }));
        then.status(200)
            .json_body(json!({"jsonrpc": "2.0", "result": TOKEN, "id": 1}));
    })
}

#[test]
fn help_lists_operation_flags() {
    let mut cmd = cargo_bin_cmd!("zbxctl");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("--time_from"))
        .stdout(predicates::str::contains("--mapid"))
        .stdout(predicates::str::contains("map_update"));
}

#[test]
fn missing_flag_fails_before_any_request() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.path("/zabbix/api_jsonrpc.php");
        then.status(200).json_body(json!({"jsonrpc": "2.0", "result": TOKEN, "id": 1}));
    });
    let dir = workspace(&server);

    let cases: [&[&str]; 4] = [
        &["-m", "host_get_search"],
        &["-m", "map_update", "--mapid", "7"],
        &["-m", "item_get_search", "--key", "system.cpu"],
        &["-m", "history_get", "--itemid", "23296"],
    ];
    for args in cases {
        zbxctl(&dir)
            .args(["-d", "lab"])
            .args(args)
            .assert()
            .failure()
            .stderr(predicates::str::contains("[Fail] if execute"))
            .stderr(predicates::str::contains("Usage:"));
    }
    assert_eq!(any.hits(), 0);
}

#[test]
fn unknown_alias_is_fatal() {
    let server = MockServer::start();
    let dir = workspace(&server);

    zbxctl(&dir)
        .args(["-d", "hoge", "-m", "host_get_gid", "--gid", "4"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("no such zabbix server: hoge"));
}

#[test]
fn host_get_search_prints_matching_hosts() {
    let server = MockServer::start();
    let login = mock_login(&server);
    let hosts = json!([
        {
            "hostid": "10084",
            "host": "web01",
            "inventory": {"model": "PowerEdge R640", "serialno_a": "ABC123"},
            "groups": [{"groupid": "2", "name": "Linux servers", "internal": "0"}]
        },
        {
            "hostid": "10085",
            "host": "web02",
            "inventory": {"model": "PowerEdge R650", "serialno_a": "DEF456"},
            "groups": [{"groupid": "12", "name": "ウェブ", "internal": "0"}]
        }
    ]);
    let search = server.mock(|when, then| {
        when.method(POST).path("/zabbix/api_jsonrpc.php").json_body(json!({
            "jsonrpc": "2.0",
            "method": "host.get",
            "params": {
                "output": ["host"],
                "selectInventory": ["model", "serialno_a"],
                "selectGroups": "extend",
                "search": {"host": "web"}
            },
            "auth": TOKEN,
            "id": 2
        }));
        then.status(200)
            .json_body(json!({"jsonrpc": "2.0", "result": hosts.clone(), "id": 2}));
    });
    let dir = workspace(&server);

    let output = zbxctl(&dir)
        .args(["-d", "lab", "-m", "host_get_search", "--host", "web"])
        .output()
        .unwrap();

    assert!(output.status.success());
    login.assert();
    search.assert();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("ウェブ"));
    let printed: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(printed, hosts);
}

#[test]
fn file_mode_sends_params_verbatim() {
    let server = MockServer::start();
    mock_login(&server);
    let raw = server.mock(|when, then| {
        when.method(POST).path("/zabbix/api_jsonrpc.php").json_body(json!({
            "jsonrpc": "2.0",
            "method": "hostgroup.get",
            "params": {"output": ["name"], "filter": {"name": ["Linux servers"]}},
            "auth": TOKEN,
            "id": 2
        }));
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "result": [{"groupid": "2", "name": "Linux servers"}],
            "id": 2
        }));
    });
    let dir = workspace(&server);
    fs::write(
        dir.path().join("params.json"),
        r#"{"output": ["name"], "filter": {"name": ["Linux servers"]}}"#,
    )
    .unwrap();

    zbxctl(&dir)
        .args(["-d", "lab", "-m", "hostgroup.get", "--file", "params.json"])
        .assert()
        .success()
        .stdout(predicates::str::contains("\"groupid\": \"2\""));
    raw.assert();
}

#[test]
fn api_error_prints_envelope_and_fails() {
    let server = MockServer::start();
    mock_login(&server);
    server.mock(|when, then| {
        when.method(POST)
            .path("/zabbix/api_jsonrpc.php")
            .body_contains("\"map.get\"");
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32500, "message": "Application error.", "data": "No permissions to referred object or it does not exist!"},
            "id": 2
        }));
    });
    let dir = workspace(&server);

    zbxctl(&dir)
        .args(["-d", "lab", "-m", "map_delete", "--mapid", "99"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("\"code\": -32500"))
        .stderr(predicates::str::contains("[Fail] api error: Application error."));
}

#[test]
fn declined_delete_issues_no_mutation() {
    let server = MockServer::start();
    mock_login(&server);
    server.mock(|when, then| {
        when.method(POST)
            .path("/zabbix/api_jsonrpc.php")
            .body_contains("\"map.get\"");
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "result": [{"sysmapid": "7", "name": "core"}],
            "id": 2
        }));
    });
    let delete = server.mock(|when, then| {
        when.method(POST)
            .path("/zabbix/api_jsonrpc.php")
            .body_contains("\"map.delete\"");
        then.status(200)
            .json_body(json!({"jsonrpc": "2.0", "result": {"sysmapids": ["7"]}, "id": 3}));
    });
    let dir = workspace(&server);

    zbxctl(&dir)
        .args(["-d", "lab", "-m", "map_delete", "--mapid", "7"])
        .write_stdin("Y\n")
        .assert()
        .failure()
        .stdout(predicates::str::contains("Delete map [core] OK? (y/n): "))
        .stderr(predicates::str::contains("[Fail] user cancel"));
    assert_eq!(delete.hits(), 0);
}
