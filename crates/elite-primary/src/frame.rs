use std::io::{self, Read};
use std::net::TcpStream;

/// `4`-byte big-endian total length (itself included) + `1`-byte message
/// type; the same 5-byte shape recurs one level down for each sub-package.
pub const HEAD_LENGTH: usize = 5;

/// Top-level message type carrying the robot state sub-package bundle.
pub const ROBOT_STATE_MSG_TYPE: u8 = 16;

/// Reads one top-level primary message: `(message_type, body)`, where
/// `body` excludes the 5-byte header. Returns `Ok(None)` on a clean EOF.
pub fn read_message(stream: &mut TcpStream) -> io::Result<Option<(u8, Vec<u8>)>> {
    let mut len_buf = [0_u8; 4];
    if let Err(e) = stream.read_exact(&mut len_buf) {
        return if e.kind() == io::ErrorKind::UnexpectedEof { Ok(None) } else { Err(e) };
    }
    let total_len = u32::from_be_bytes(len_buf) as usize;
    if total_len <= HEAD_LENGTH {
        return Err(io::Error::new(io::ErrorKind::InvalidData, format!("primary message length {total_len} at or below header size")));
    }
    let mut rest = vec![0_u8; total_len - 4];
    stream.read_exact(&mut rest)?;
    let msg_type = rest[0];
    let body = rest[1..].to_vec();
    Ok(Some((msg_type, body)))
}

/// Splits a robot-state message body into its `(sub_type, sub_payload)`
/// sub-packages. A sub-package with a length that under/overruns the
/// remaining buffer truncates the walk rather than panicking — a
/// malformed trailing sub-package should not lose the ones already parsed.
pub fn split_sub_packages(body: &[u8]) -> Vec<(u8, &[u8])> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos + HEAD_LENGTH <= body.len() {
        let sub_len = u32::from_be_bytes(body[pos..pos + 4].try_into().unwrap()) as usize;
        if sub_len < HEAD_LENGTH || pos + sub_len > body.len() {
            break;
        }
        let sub_type = body[pos + 4];
        let sub_payload = &body[pos + HEAD_LENGTH..pos + sub_len];
        out.push((sub_type, sub_payload));
        pos += sub_len;
    }
    out
}
