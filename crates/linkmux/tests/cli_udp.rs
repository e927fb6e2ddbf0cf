#![cfg(all(unix, feature = "cli"))]

use std::net::UdpSocket;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use linkmux::transport::Transport;

fn free_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0")
        .expect("ephemeral bind should work")
        .local_addr()
        .expect("bound socket has an address")
        .port()
}

fn linkmux() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_linkmux"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn wait_with_deadline(child: &mut std::process::Child, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Ok(Some(_)) = child.try_wait() {
            return true;
        }
        thread::sleep(Duration::from_millis(25));
    }
    false
}

#[test]
fn version_prints_name() {
    let output = linkmux()
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("linkmux "));
}

#[test]
fn version_extended_reports_wire_format() {
    let output = linkmux()
        .arg("version")
        .arg("--extended")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("wire_version: 1"));
    assert!(stdout.contains("channels=8"));
}

#[test]
fn send_without_link_is_usage_error() {
    let output = linkmux()
        .arg("send")
        .arg("--data")
        .arg("x")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn send_with_bad_remote_is_usage_error() {
    let output = linkmux()
        .arg("send")
        .arg("--recv-port")
        .arg(free_port().to_string())
        .arg("--send-port")
        .arg("9")
        .arg("--remote")
        .arg("not-an-ip")
        .arg("--data")
        .arg("x")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn send_wait_times_out_with_124() {
    let output = linkmux()
        .arg("send")
        .arg("--recv-port")
        .arg(free_port().to_string())
        .arg("--send-port")
        .arg(free_port().to_string())
        .arg("--data")
        .arg("anyone?")
        .arg("--wait")
        .arg("--wait-timeout")
        .arg("200ms")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(124));
}

#[test]
fn listen_prints_received_message_as_json() {
    let listen_port = free_port();
    let mut child = linkmux()
        .arg("--format")
        .arg("json")
        .arg("listen")
        .arg("--recv-port")
        .arg(listen_port.to_string())
        .arg("--send-port")
        .arg("9")
        .arg("--count")
        .arg("1")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen should start");

    let mut transport = Transport::new();
    let id = transport
        .add_udp_locator(free_port(), listen_port)
        .expect("locator should register");

    // Keep sending until the listener has bound and printed one message.
    let start = Instant::now();
    let mut exited = false;
    while start.elapsed() < Duration::from_secs(5) {
        transport.send_data(b"ping", id).expect("send should succeed");
        if wait_with_deadline(&mut child, Duration::from_millis(100)) {
            exited = true;
            break;
        }
    }
    if !exited {
        let _ = child.kill();
    }

    let output = child.wait_with_output().expect("listen output");
    assert!(exited, "listen never received a message");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().expect("one message line");
    let value: serde_json::Value = serde_json::from_str(line).expect("json output");
    assert_eq!(value["payload"], "ping");
    assert_eq!(value["size"], 4);
    assert_eq!(value["kind"], "udp");
}

#[test]
fn send_wait_receives_echo() {
    let echo_port = free_port();
    let client_port = free_port();
    let mut echo = linkmux()
        .arg("echo")
        .arg("--recv-port")
        .arg(echo_port.to_string())
        .arg("--send-port")
        .arg(client_port.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("echo should start");

    let mut last: Option<Output> = None;
    for _ in 0..10 {
        let output = linkmux()
            .arg("--format")
            .arg("pretty")
            .arg("send")
            .arg("--recv-port")
            .arg(client_port.to_string())
            .arg("--send-port")
            .arg(echo_port.to_string())
            .arg("--hex")
            .arg("68656c6c6f")
            .arg("--wait")
            .arg("--wait-timeout")
            .arg("500ms")
            .output()
            .expect("send should run");
        let done = output.status.success();
        last = Some(output);
        if done {
            break;
        }
    }

    let _ = echo.kill();
    let _ = echo.wait();

    let output = last.expect("at least one attempt");
    assert!(output.status.success(), "echo never answered");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("payload=hello"), "stdout: {stdout}");
    assert!(stdout.contains("kind=udp"));
}
