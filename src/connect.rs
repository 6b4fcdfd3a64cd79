//! Name resolution and connection establishment.

use async_std::net::{TcpStream, ToSocketAddrs};
use std::io;
use std::net::SocketAddr;

/// Resolve `host` and `port` into candidate endpoints, in the order the resolver gave them.
///
/// A lookup giving no addresses at all is an error.
pub async fn resolve(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs().await?.collect();

    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("No addresses for {}:{}", host, port),
        ));
    }

    debug!("resolve {}:{}: {:?}", host, port, addrs);

    Ok(addrs)
}

/// Connect to the first candidate that accepts.
///
/// Candidates are tried strictly in order. If they all fail, the error is the one from
/// the last attempt.
pub async fn connect(candidates: &[SocketAddr]) -> io::Result<TcpStream> {
    let mut last_err = None;

    for addr in candidates {
        match TcpStream::connect(*addr).await {
            Ok(tcp) => {
                debug!("connect {}: ok", addr);
                return Ok(tcp);
            }
            Err(e) => {
                debug!("connect {}: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "No candidates to connect to")
    }))
}
