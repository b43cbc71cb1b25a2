//! Certificate and chain values handed from the connector to the formatter.

use std::fmt;

use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::nid::Nid;
use openssl::pkey::Id;
use openssl::x509::{X509NameRef, X509};

use crate::error::InspectError;
use crate::extension::{decode_extensions, Extension};
use crate::verify::Signed;

/// An ordered distinguished name, e.g. `/C=US/O=Example/CN=example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DistinguishedName(Vec<(String, String)>);

impl DistinguishedName {
    fn from_x509_name(name: &X509NameRef) -> DistinguishedName {
        let entries = name
            .entries()
            .map(|entry| {
                let object = entry.object();
                let key = object
                    .nid()
                    .short_name()
                    .map(str::to_string)
                    .unwrap_or_else(|_| object.to_string());
                let value = entry
                    .data()
                    .as_utf8()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| String::from_utf8_lossy(entry.data().as_slice()).into_owned());
                (key, value)
            })
            .collect();
        DistinguishedName(entries)
    }

    /// First value stored under `key` (a short name such as `CN`).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn common_name(&self) -> Option<&str> {
        self.get("CN")
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.0
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.0 {
            write!(f, "/{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Public key parameters of a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyInfo {
    Rsa {
        bits: u32,
        /// Upper case hex
        modulus: String,
        /// Decimal
        exponent: String,
    },
    Ec {
        bits: u32,
        curve: Option<String>,
    },
    Other {
        algorithm: String,
        bits: u32,
    },
}

impl PublicKeyInfo {
    fn unreadable() -> PublicKeyInfo {
        PublicKeyInfo::Other {
            algorithm: "unreadable".to_string(),
            bits: 0,
        }
    }
}

impl fmt::Display for PublicKeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicKeyInfo::Rsa { bits, .. } => write!(f, "RSA ({} bit)", bits),
            PublicKeyInfo::Ec {
                bits,
                curve: Some(curve),
            } => write!(f, "EC ({} bit, {})", bits, curve),
            PublicKeyInfo::Ec { bits, curve: None } => write!(f, "EC ({} bit)", bits),
            PublicKeyInfo::Other { algorithm, bits } => write!(f, "{} ({} bit)", algorithm, bits),
        }
    }
}

/// A certificate presented by the server.
///
/// Names, key parameters and extensions are extracted once when the value is
/// built; time fields and signature checks go through the wrapped `X509`.
#[derive(Clone)]
pub struct Certificate {
    x509: X509,
    subject: DistinguishedName,
    issuer: DistinguishedName,
    serial: String,
    signature_algorithm: String,
    public_key: PublicKeyInfo,
    extensions: Vec<Extension>,
}

impl Certificate {
    /// Decodes names, key parameters and extensions; any failure is an error.
    pub fn from_x509(x509: X509) -> Result<Certificate, InspectError> {
        Certificate::decode(x509, false)
    }

    /// Like [`Certificate::from_x509`], but a serial, key or extension list
    /// that cannot be decoded is logged and replaced by a placeholder.
    /// Used for the certificates above the leaf.
    pub fn from_x509_lenient(x509: X509) -> Result<Certificate, InspectError> {
        Certificate::decode(x509, true)
    }

    fn decode(x509: X509, lenient: bool) -> Result<Certificate, InspectError> {
        let subject = DistinguishedName::from_x509_name(x509.subject_name());
        let extensions = x509
            .to_der()
            .map_err(InspectError::from)
            .and_then(|der| decode_extensions(&der));
        let extensions = recover(extensions, lenient, &subject, "extensions", Vec::new)?;
        let public_key = recover(
            public_key_info(&x509),
            lenient,
            &subject,
            "public key",
            PublicKeyInfo::unreadable,
        )?;
        let serial = x509
            .serial_number()
            .to_bn()
            .map(|bn| bn.to_string())
            .map_err(InspectError::from);
        let serial = recover(serial, lenient, &subject, "serial number", || {
            "unknown".to_string()
        })?;
        Ok(Certificate {
            issuer: DistinguishedName::from_x509_name(x509.issuer_name()),
            subject,
            serial,
            signature_algorithm: x509.signature_algorithm().object().to_string(),
            public_key,
            extensions,
            x509,
        })
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    /// Decimal serial number.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// X.509 version as printed by tools (1, 2 or 3).
    pub fn version(&self) -> i32 {
        self.x509.version() + 1
    }

    pub fn signature_algorithm(&self) -> &str {
        &self.signature_algorithm
    }

    pub fn not_before(&self) -> &Asn1TimeRef {
        self.x509.not_before()
    }

    pub fn not_after(&self) -> &Asn1TimeRef {
        self.x509.not_after()
    }

    /// Whole days from now until expiry; negative once expired.
    pub fn days_left(&self) -> Result<i32, InspectError> {
        let now = Asn1Time::days_from_now(0)?;
        Ok(now.diff(self.x509.not_after())?.days)
    }

    pub fn public_key(&self) -> &PublicKeyInfo {
        &self.public_key
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Looks an extension up by short name or dotted OID.
    pub fn extension(&self, identifier: &str) -> Option<&Extension> {
        self.extensions.iter().find(|ext| ext.matches(identifier))
    }

    pub fn x509(&self) -> &X509 {
        &self.x509
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject.to_string())
            .field("issuer", &self.issuer.to_string())
            .field("serial", &self.serial)
            .finish()
    }
}

impl Signed for Certificate {
    fn is_signed_by(&self, issuer: &Self) -> bool {
        let outcome = issuer
            .x509
            .public_key()
            .and_then(|key| self.x509.verify(&key));
        match outcome {
            Ok(valid) => valid,
            Err(e) => {
                log::debug!("signature check of {} failed: {}", self.subject, e);
                false
            }
        }
    }
}

fn recover<T>(
    result: Result<T, InspectError>,
    lenient: bool,
    subject: &DistinguishedName,
    what: &str,
    fallback: impl FnOnce() -> T,
) -> Result<T, InspectError> {
    match result {
        Err(e) if lenient => {
            log::warn!("could not decode {} of {}: {}", what, subject, e);
            Ok(fallback())
        }
        other => other,
    }
}

fn public_key_info(x509: &X509) -> Result<PublicKeyInfo, InspectError> {
    let key = x509.public_key()?;
    let bits = key.bits();
    let info = match key.id() {
        Id::RSA => {
            let rsa = key.rsa()?;
            PublicKeyInfo::Rsa {
                bits,
                modulus: rsa.n().to_hex_str()?.to_string(),
                exponent: rsa.e().to_dec_str()?.to_string(),
            }
        }
        Id::EC => {
            let curve = key
                .ec_key()?
                .group()
                .curve_name()
                .and_then(|nid: Nid| nid.short_name().ok())
                .map(str::to_string);
            PublicKeyInfo::Ec { bits, curve }
        }
        Id::ED25519 => PublicKeyInfo::Other {
            algorithm: "ED25519".to_string(),
            bits,
        },
        Id::ED448 => PublicKeyInfo::Other {
            algorithm: "ED448".to_string(),
            bits,
        },
        Id::DSA => PublicKeyInfo::Other {
            algorithm: "DSA".to_string(),
            bits,
        },
        other => PublicKeyInfo::Other {
            algorithm: format!("key type {}", other.as_raw()),
            bits,
        },
    };
    Ok(info)
}

/// Certificates in the order the server sent them; index 0 is the leaf.
#[derive(Debug, Clone)]
pub struct Chain {
    certificates: Vec<Certificate>,
}

impl Chain {
    pub fn new(certificates: Vec<Certificate>) -> Result<Chain, InspectError> {
        if certificates.is_empty() {
            return Err(InspectError::certificate("server presented no certificates"));
        }
        Ok(Chain { certificates })
    }

    pub fn leaf(&self) -> &Certificate {
        &self.certificates[0]
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Certificate> {
        self.certificates.iter()
    }
}
