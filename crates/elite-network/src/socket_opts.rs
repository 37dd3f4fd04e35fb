use std::io;
use std::net::TcpStream;
use std::os::unix::io::AsRawFd;

/// Applies the socket options every control channel wants on both ends of
/// a connection: Nagle disabled, address reuse enabled, and (Linux only)
/// `TCP_QUICKACK` so delayed-ack coalescing doesn't add latency to small
/// control frames.
///
/// Applied uniformly to both accepted and outbound sockets.
pub fn apply_standard_socket_options(stream: &TcpStream) -> io::Result<()> {
    stream.set_nodelay(true)?;
    set_reuse_addr(stream)?;
    #[cfg(target_os = "linux")]
    set_quickack(stream)?;
    Ok(())
}

fn set_reuse_addr(stream: &TcpStream) -> io::Result<()> {
    let fd = stream.as_raw_fd();
    let val: libc::c_int = 1;
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            std::ptr::addr_of!(val).cast(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret != 0 { Err(io::Error::last_os_error()) } else { Ok(()) }
}

#[cfg(target_os = "linux")]
fn set_quickack(stream: &TcpStream) -> io::Result<()> {
    let fd = stream.as_raw_fd();
    let val: libc::c_int = 1;
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::IPPROTO_TCP,
            libc::TCP_QUICKACK,
            std::ptr::addr_of!(val).cast(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret != 0 { Err(io::Error::last_os_error()) } else { Ok(()) }
}
