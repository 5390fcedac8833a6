use socket2::{Domain, Protocol, Socket, Type};
use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use tracing::{debug, info};

use crate::config::ConnectConfig;
use crate::error::{Error, Result};
use crate::segment::Segment;

fn is_timeout(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

/// Maps a failed `connect_timeout` to `ConnectTimeout` or `ConnectionFailure`.
fn connect_error(source: std::io::Error, address: SocketAddr, config: &ConnectConfig) -> Error {
    if is_timeout(source.kind()) {
        Error::ConnectTimeout {
            target: address.to_string(),
            timeout: config.connect_timeout,
        }
    } else {
        Error::ConnectionFailure {
            target: address.to_string(),
            source,
        }
    }
}

/// Maps a failed write of the encoded segment. Non-I/O errors pass through.
fn send_error(err: Error, target: &str, port: u16, config: &ConnectConfig) -> Error {
    match err {
        Error::Io(source) if is_timeout(source.kind()) => Error::SendTimeout {
            timeout: config.send_timeout,
        },
        Error::Io(source) => Error::ConnectionFailure {
            target: format!("{}:{}", target, port),
            source,
        },
        other => other,
    }
}

fn resolve(target: &str, port: u16) -> Result<SocketAddr> {
    let failure = |source: std::io::Error| Error::ConnectionFailure {
        target: format!("{}:{}", target, port),
        source,
    };
    (target, port)
        .to_socket_addrs()
        .map_err(failure)?
        .next()
        .ok_or_else(|| {
            failure(std::io::Error::new(
                ErrorKind::NotFound,
                "address resolved to nothing",
            ))
        })
}

/// Opens a blocking stream connection to `target:port`, bounded by the
/// configured timeouts.
#[tracing::instrument(skip(config))]
pub fn open_connection(target: &str, port: u16, config: &ConnectConfig) -> Result<TcpStream> {
    let address = resolve(target, port)?;

    let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
        .map_err(|source| Error::ConnectionFailure {
            target: address.to_string(),
            source,
        })?;

    socket
        .connect_timeout(&address.into(), config.connect_timeout)
        .map_err(|source| connect_error(source, address, config))?;

    socket.set_write_timeout(Some(config.send_timeout))?;
    socket.set_read_timeout(Some(config.read_timeout))?;
    debug!(%address, "connected");

    Ok(socket.into())
}

/// Sends `segment` to its first destination address and returns whatever
/// the peer answers, up to `config.response_buffer` bytes. The connection
/// is closed before returning.
#[tracing::instrument(skip_all, fields(session_id = segment.session_id()))]
pub fn exchange(segment: &Segment, config: &ConnectConfig) -> Result<Vec<u8>> {
    let target = segment.target().ok_or_else(|| Error::ConnectionFailure {
        target: format!("session {}", segment.session_id()),
        source: std::io::Error::new(ErrorKind::InvalidInput, "no destination address"),
    })?;
    let port = segment.destination_port();

    if segment.payload().is_none() {
        return Err(Error::MissingPayload);
    }

    let mut stream = open_connection(target, port, config)?;

    let sent = segment
        .encode_and_send(&mut stream)
        .map_err(|err| send_error(err, target, port, config))?;
    info!(bytes = sent, "segment sent to {}:{}", target, port);

    let mut response = vec![0u8; config.response_buffer];
    let received = match stream.read(&mut response) {
        Ok(n) => n,
        Err(err) if is_timeout(err.kind()) => {
            debug!("no response before read timeout");
            0
        }
        Err(source) => {
            return Err(Error::ConnectionFailure {
                target: format!("{}:{}", target, port),
                source,
            })
        }
    };
    response.truncate(received);
    debug!(bytes = received, "response received");

    Ok(response)
}
