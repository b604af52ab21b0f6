//! Low-level SMTP stream handling.

use crate::error::{Error, Result};
use crate::types::ServerAddress;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

/// SMTP stream (TCP, possibly upgraded to TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Tcp(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
}

impl SmtpStream {
    /// Reads a line from the stream, without the trailing CRLF.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the peer closed the connection.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = match self {
            Self::Tcp(reader) => reader.read_line(&mut line).await?,
            Self::Tls(reader) => reader.read_line(&mut line).await?,
        };
        if read == 0 {
            return Err(Error::ConnectionClosed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes data to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Tcp(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Self::Tls(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
        }
        Ok(())
    }

    /// Returns true once the stream has been upgraded to TLS.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Upgrades a TCP stream to TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already encrypted or the TLS
    /// handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let tcp_stream = match self {
            Self::Tcp(reader) => reader.into_inner(),
            Self::Tls(_) => return Err(Error::Protocol("Already using TLS".into())),
        };

        let server_name = ServerName::try_from(hostname.to_string())
            .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))?;

        let tls_stream = tls_connector().connect(server_name, tcp_stream).await?;
        Ok(Self::Tls(Box::new(BufReader::new(tls_stream))))
    }
}

/// Opens a plain TCP connection to an SMTP server.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(server: &ServerAddress) -> Result<SmtpStream> {
    let stream = TcpStream::connect((server.host.as_str(), server.port)).await?;
    Ok(SmtpStream::Tcp(BufReader::new(stream)))
}

/// Creates a TLS connector trusting the webpki root certificates.
fn tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
