//! Error types for certificate inspection.
//!
//! This module defines the errors that abort an inspection run. Field-level
//! problems (unknown field names, absent extensions) are never errors; the
//! formatter reports them as output lines instead.

use std::{fmt, io};

use thiserror::Error;

use crate::config::ConfigError;

/// Error type for a failed inspection run.
///
/// Everything except [`InspectError::Configuration`] and [`InspectError::Io`]
/// is raised while fetching the certificate chain and counts as a
/// connection failure.
#[derive(Debug, Error)]
pub enum InspectError {
    /// The run configuration was incomplete or invalid
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// DNS resolution failed for the given hostname
    #[error("Failed to resolve hostname: {hostname}. Check that the hostname is spelled correctly and your DNS configuration is working.")]
    DnsResolution {
        /// The hostname that failed to resolve
        hostname: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// TCP connection failed to the target address
    #[error("Connection failed to: {address}. Verify the host is running a TLS service and is reachable.")]
    ConnectionFailed {
        /// The address (host:port) that connection failed to
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// TLS handshake failed
    #[error("TLS handshake failed: {details}")]
    HandshakeFailed {
        /// Details about why the handshake failed
        details: String,
    },

    /// The server sent no usable certificate chain
    #[error("Certificate error: {reason}")]
    CertificateError {
        /// Description of what went wrong
        reason: String,
    },

    /// OpenSSL error occurred outside the handshake itself
    #[error("OpenSSL error: {0}")]
    OpenSSL(#[from] openssl::error::ErrorStack),

    /// Writing the report failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl InspectError {
    /// Returns true for failures that happened while fetching the chain.
    pub fn is_connection_error(&self) -> bool {
        !matches!(self, Self::Configuration(_) | Self::Io(_))
    }

    pub(crate) fn certificate(reason: impl Into<String>) -> Self {
        Self::CertificateError {
            reason: reason.into(),
        }
    }
}

impl<S: fmt::Debug> From<openssl::ssl::HandshakeError<S>> for InspectError {
    fn from(e: openssl::ssl::HandshakeError<S>) -> Self {
        Self::HandshakeFailed {
            details: e.to_string(),
        }
    }
}
