use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use elite_driver::{ControlMode, DriverConfig, EliteDriver, MotionType};

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn config(dir: &tempfile::TempDir) -> DriverConfig {
    let template_path = dir.path().join("template.script");
    std::fs::write(&template_path, elite_driver::DEFAULT_TEMPLATE).unwrap();
    DriverConfig {
        robot_ip: "127.0.0.1:1".to_owned(),
        local_ip: "127.0.0.1".to_owned(),
        script_template_path: template_path,
        headless: false,
        reverse_port: free_port(),
        trajectory_port: free_port(),
        script_command_port: free_port(),
        script_sender_port: free_port(),
        ..DriverConfig::default()
    }
}

/// End-to-end (within one process) variant of spec.md §8 scenario 2: a
/// fake robot-side peer connects to the reverse port and observes the
/// exact byte layout `write_joint_command` produces.
#[test]
fn write_joint_command_reaches_a_connected_peer_with_the_documented_layout() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir);
    let reverse_port = cfg.reverse_port;
    let driver = EliteDriver::new(cfg).unwrap();

    let mut peer = TcpStream::connect(("127.0.0.1", reverse_port)).unwrap();
    std::thread::sleep(Duration::from_millis(50));

    assert!(driver.write_joint_command(Some([0.1, 0.0, 0.0, 0.0, 0.0, 0.0]), ControlMode::Servoj, 200));

    let mut buf = [0_u8; 8 * 4];
    peer.read_exact(&mut buf).unwrap();
    let words: Vec<i32> = buf.chunks_exact(4).map(|c| i32::from_be_bytes(c.try_into().unwrap())).collect();
    assert_eq!(words, vec![200, 10_000, 0, 0, 0, 0, 0, ControlMode::Servoj as i32]);
}

/// Variant of spec.md §8 scenario 3 through the facade's trajectory
/// surface: a fake peer sends a result code and the registered callback
/// observes it.
#[test]
fn trajectory_result_callback_fires_through_the_facade() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir);
    let trajectory_port = cfg.trajectory_port;
    let driver = EliteDriver::new(cfg).unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    driver.set_trajectory_result_callback(move |result| {
        let _ = tx.send(result);
    });

    let mut peer = TcpStream::connect(("127.0.0.1", trajectory_port)).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    peer.write_all(&0_i32.to_be_bytes()).unwrap();

    let result = rx.recv_timeout(Duration::from_millis(200)).expect("callback should fire");
    assert_eq!(result, elite_driver::MotionResult::Success);

    assert!(driver.write_waypoint([0.0; 6], 1.0, 0.0, MotionType::Joint));
}
