//! TLS connection used only to collect the server's certificate chain.
//!
//! Verification is switched off for the handshake: the point is to look at
//! whatever the server presents, including self-signed or expired chains.
//! No application data is exchanged, and the socket is closed before the
//! chain is returned.

use std::io;
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use openssl::ssl::{Ssl, SslContext, SslMethod, SslStream, SslVerifyMode};

use crate::certificate::{Certificate, Chain};
use crate::error::InspectError;

/// Default network timeout in seconds.
pub const DEFAULT_TIMEOUT: u64 = 30;

/// Opens TLS connections and returns the presented chain.
#[derive(Debug, Clone)]
pub struct Connector {
    timeout: Option<Duration>,
}

impl Default for Connector {
    fn default() -> Self {
        Connector::new(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
    }
}

impl Connector {
    /// `None` leaves connect, read and write timeouts to the OS.
    pub fn new(timeout: Option<Duration>) -> Self {
        Connector { timeout }
    }

    /// Connects to `host:port`, completes a handshake and returns the chain
    /// in the order the server sent it, leaf first.
    ///
    /// With `use_sni` the client hello names `host`, unless `host` is an IP
    /// literal, which may not be sent as a server name.
    pub fn connect(&self, host: &str, port: u16, use_sni: bool) -> Result<Chain, InspectError> {
        let mut context = SslContext::builder(SslMethod::tls())?;
        context.set_verify(SslVerifyMode::NONE);
        let context = context.build();

        let mut ssl = Ssl::new(&context)?;
        if use_sni {
            if host.parse::<IpAddr>().is_ok() {
                log::debug!("not sending SNI for IP address {}", host);
            } else {
                ssl.set_hostname(host)?;
            }
        }

        let tcp_stream = self.open(host, port)?;
        log::debug!("starting TLS handshake with {}:{}", host, port);
        let mut stream = ssl.connect(tcp_stream)?;
        let chain = peer_chain(&stream);
        close(&mut stream);
        chain
    }

    fn open(&self, host: &str, port: u16) -> Result<TcpStream, InspectError> {
        let addresses: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|source| InspectError::DnsResolution {
                hostname: host.to_string(),
                source,
            })?
            .collect();
        log::debug!("{} resolved to {:?}", host, addresses);

        let address = format!("{}:{}", host, port);
        let mut last_error =
            io::Error::new(io::ErrorKind::NotFound, "hostname resolved to no addresses");
        for socket_addr in addresses {
            let attempt = match self.timeout {
                Some(timeout) => TcpStream::connect_timeout(&socket_addr, timeout),
                None => TcpStream::connect(socket_addr),
            };
            match attempt {
                Ok(tcp_stream) => {
                    tcp_stream
                        .set_read_timeout(self.timeout)
                        .and_then(|_| tcp_stream.set_write_timeout(self.timeout))
                        .map_err(|source| InspectError::ConnectionFailed {
                            address: address.clone(),
                            source,
                        })?;
                    log::debug!("connected to {}", socket_addr);
                    return Ok(tcp_stream);
                }
                Err(e) => {
                    log::debug!("connection to {} failed: {}", socket_addr, e);
                    last_error = e;
                }
            }
        }
        Err(InspectError::ConnectionFailed {
            address,
            source: last_error,
        })
    }
}

fn peer_chain(stream: &SslStream<TcpStream>) -> Result<Chain, InspectError> {
    let stack = stream
        .ssl()
        .peer_cert_chain()
        .ok_or_else(|| InspectError::certificate("server presented no certificate chain"))?;
    // Only the leaf feeds the field report, so the rest may decode partially.
    let certificates = stack
        .iter()
        .enumerate()
        .map(|(index, x509)| match index {
            0 => Certificate::from_x509(x509.to_owned()),
            _ => Certificate::from_x509_lenient(x509.to_owned()),
        })
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("server presented {} certificate(s)", certificates.len());
    Chain::new(certificates)
}

/// Best-effort close_notify; the socket itself closes when the stream drops.
fn close(stream: &mut SslStream<TcpStream>) {
    if let Err(e) = stream.shutdown() {
        log::debug!("TLS shutdown failed: {}", e);
    }
}
