use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use elite_primary::PrimaryClient;

fn robot_state_frame(sub_packages: &[(u8, &[u8])]) -> Vec<u8> {
    let mut body = vec![16_u8]; // ROBOT_STATE_MSG_TYPE
    for (sub_type, payload) in sub_packages {
        body.extend_from_slice(&((5 + payload.len()) as u32).to_be_bytes());
        body.push(*sub_type);
        body.extend_from_slice(payload);
    }
    let mut frame = ((body.len() + 4) as u32).to_be_bytes().to_vec();
    frame.extend_from_slice(&body);
    frame
}

#[test]
fn get_package_resolves_once_matching_sub_type_arrives() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        std::thread::sleep(Duration::from_millis(30));
        let frame = robot_state_frame(&[(3, &[0xDE, 0xAD]), (7, &[1, 2, 3, 4])]);
        stream.write_all(&frame).unwrap();
        std::thread::sleep(Duration::from_millis(200));
    });

    let client = PrimaryClient::connect_to("127.0.0.1", port).unwrap();
    let payload = client.get_package(7, Duration::from_secs(1));
    assert_eq!(payload, Some(vec![1, 2, 3, 4]));

    client.disconnect();
    server.join().unwrap();
}

#[test]
fn get_package_times_out_when_sub_type_never_arrives() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = std::thread::spawn(move || {
        let (_stream, _) = listener.accept().unwrap();
        std::thread::sleep(Duration::from_millis(200));
    });

    let client = PrimaryClient::connect_to("127.0.0.1", port).unwrap();
    assert_eq!(client.get_package(200, Duration::from_millis(50)), None);

    client.disconnect();
    server.join().unwrap();
}

#[test]
fn send_script_writes_bytes_to_peer_with_trailing_newline() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = std::thread::spawn(move || {
        use std::io::Read;
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0_u8; 64];
        let n = stream.read(&mut buf).unwrap();
        buf[..n].to_vec()
    });

    let client = PrimaryClient::connect_to("127.0.0.1", port).unwrap();
    assert!(client.send_script("def externalControl():\n\tend"));

    let received = server.join().unwrap();
    assert_eq!(received, b"def externalControl():\n\tend\n");
    client.disconnect();
}
