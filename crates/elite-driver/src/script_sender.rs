use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};

use elite_network::FramedEndpoint;
use elite_utils::{DriverResult, spawn_named};
use tracing::{debug, trace, warn};

/// The one request line this channel acts on (spec.md §4.2).
const REQUEST_TOKEN: &str = "request_program";

/// The script sender (C2): a one-shot request/response server. On the
/// literal line `request_program`, it writes the prepared script bytes
/// back with no terminator; every other line is ignored.
pub struct ScriptSender {
    client: Arc<Mutex<Option<TcpStream>>>,
    _endpoint: FramedEndpoint,
}

impl ScriptSender {
    pub fn bind(port: u16, script: String) -> DriverResult<Self> {
        let client: Arc<Mutex<Option<TcpStream>>> = Arc::new(Mutex::new(None));
        let script = Arc::new(script);
        let client_for_accept = client.clone();
        let endpoint = FramedEndpoint::bind(port, "script-sender", move |stream, addr| {
            adopt(&client_for_accept, &script, stream, addr);
        })?;
        Ok(Self { client, _endpoint: endpoint })
    }

    pub fn is_connected(&self) -> bool {
        self.client.lock().unwrap().is_some()
    }
}

fn adopt(client: &Arc<Mutex<Option<TcpStream>>>, script: &Arc<String>, stream: TcpStream, addr: SocketAddr) {
    let write_clone = stream.try_clone().ok();
    {
        let mut guard = client.lock().unwrap();
        if let Some(prior) = guard.take() {
            let _ = prior.shutdown(std::net::Shutdown::Both);
        }
        *guard = write_clone;
    }
    debug!(peer = %addr, "script sender client adopted");

    let client_for_recv = client.clone();
    let script_for_recv = script.clone();
    if let Err(e) = spawn_named("elite-script-sender-recv", move || recv_loop(stream, &client_for_recv, &script_for_recv)) {
        warn!(error = %e, "failed to start script sender receive loop");
    }
}

fn recv_loop(mut stream: TcpStream, client: &Mutex<Option<TcpStream>>, script: &str) {
    let mut line = Vec::new();
    let mut byte = [0_u8; 1];
    loop {
        match stream.read(&mut byte) {
            Ok(0) => {
                trace!("script sender peer closed connection");
                break;
            }
            Ok(_) => {
                if byte[0] == b'\n' {
                    let text = String::from_utf8_lossy(&line);
                    let text = text.trim_end_matches('\r');
                    if text == REQUEST_TOKEN {
                        debug!("serving requested program script");
                        if let Err(e) = stream.write_all(script.as_bytes()) {
                            warn!(error = %e, "script sender write failed, releasing client");
                            break;
                        }
                    } else {
                        trace!(line = %text, "ignoring unrecognized script sender request");
                    }
                    line.clear();
                } else {
                    line.push(byte[0]);
                }
            }
            Err(e) => {
                trace!(error = %e, "script sender read failed");
                break;
            }
        }
    }
    *client.lock().unwrap() = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[test]
    fn replies_to_request_program_with_script_bytes() {
        let port = free_port();
        let _sender = ScriptSender::bind(port, "def prog():\nend\n".to_owned()).unwrap();
        let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        client.write_all(b"request_program\n").unwrap();
        let mut buf = vec![0_u8; "def prog():\nend\n".len()];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(buf, b"def prog():\nend\n");
    }

    #[test]
    fn ignores_unrecognized_lines() {
        let port = free_port();
        let _sender = ScriptSender::bind(port, "script-body".to_owned()).unwrap();
        let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        client.write_all(b"not_a_real_request\n").unwrap();
        client.write_all(b"request_program\n").unwrap();
        let mut buf = vec![0_u8; "script-body".len()];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(buf, b"script-body");
    }

    #[test]
    fn re_arms_for_a_second_request_on_the_same_connection() {
        let port = free_port();
        let _sender = ScriptSender::bind(port, "s".to_owned()).unwrap();
        let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        for _ in 0..2 {
            client.write_all(b"request_program\n").unwrap();
            let mut buf = [0_u8; 1];
            client.read_exact(&mut buf).unwrap();
            assert_eq!(buf, [b's']);
        }
    }

    #[test]
    fn disconnect_releases_client() {
        let port = free_port();
        let sender = ScriptSender::bind(port, "s".to_owned()).unwrap();
        let client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(sender.is_connected());

        drop(client);
        std::thread::sleep(Duration::from_millis(80));
        assert!(!sender.is_connected());
    }
}
