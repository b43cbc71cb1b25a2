//! Inspect the certificate chain a TLS server presents.
//!
//! [`CertInspector`] connects to a host, collects the chain exactly as the
//! server sends it and prints the requested fields in the requested order.
//! Chain verification only checks that each certificate is signed by the next
//! one; it never consults a trust store.
//!
//! ```no_run
//! use certinspect::{CertInspector, FieldRequest, InspectConfig};
//!
//! let mut config = InspectConfig::new("example.com");
//! config.fields = FieldRequest::parse("header,cn,san,verifychain");
//! CertInspector::new(config).run(&mut std::io::stdout())?;
//! # Ok::<(), certinspect::InspectError>(())
//! ```

use std::io::Write;

pub mod certificate;
pub mod config;
pub mod connector;
pub mod error;
pub mod extension;
pub mod fields;
pub mod formatter;
pub mod logging;
pub mod verify;

#[cfg(test)]
mod test_support;

pub use certificate::{Certificate, Chain, DistinguishedName, PublicKeyInfo};
pub use config::{Config, ConfigError, InspectConfig};
pub use connector::Connector;
pub use error::InspectError;
pub use extension::Extension;
pub use fields::{Field, FieldRequest, FieldSpec, Preset};
pub use formatter::Formatter;
pub use verify::{verify, verify_links, LinkResult, Signed};

/// One inspection run: connect, then print the requested fields.
pub struct CertInspector {
    config: InspectConfig,
}

impl CertInspector {
    pub fn new(config: InspectConfig) -> Self {
        CertInspector { config }
    }

    pub fn config(&self) -> &InspectConfig {
        &self.config
    }

    /// Fetches the chain and writes one or more lines per requested field.
    ///
    /// Nothing is written when the connection fails.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<(), InspectError> {
        let chain = self.fetch_chain()?;
        self.write_report(&chain, out)
    }

    pub fn fetch_chain(&self) -> Result<Chain, InspectError> {
        log::info!(
            "inspecting {}:{} (SNI {})",
            self.config.host,
            self.config.port,
            if self.config.use_sni { "on" } else { "off" }
        );
        Connector::new(self.config.timeout).connect(
            &self.config.host,
            self.config.port,
            self.config.use_sni,
        )
    }

    pub fn write_report<W: Write>(&self, chain: &Chain, out: &mut W) -> Result<(), InspectError> {
        let formatter = Formatter::new(&self.config.host, chain);
        for line in formatter.lines(&self.config.fields) {
            writeln!(out, "{}", line)?;
        }
        out.flush()?;
        Ok(())
    }
}
