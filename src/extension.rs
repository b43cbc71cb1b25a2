//! X.509v3 extension decoding.
//!
//! `openssl` does not expose a certificate's extension list, so the DER is
//! parsed a second time with `x509-parser` and every extension is rendered
//! to text in the familiar `openssl x509 -text` style. Values that span
//! several logical entries (access descriptions, policies, distribution
//! points) are rendered one entry per line.

use std::fmt::Write as _;
use std::net::{Ipv4Addr, Ipv6Addr};

use x509_parser::extensions::{
    DistributionPointName, GeneralName, ParsedExtension, X509Extension,
};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::InspectError;

pub const OID_SUBJECT_ALT_NAME: &str = "2.5.29.17";

const EXTENSION_NAMES: &[(&str, &str)] = &[
    ("2.5.29.14", "subjectKeyIdentifier"),
    ("2.5.29.15", "keyUsage"),
    ("2.5.29.17", "subjectAltName"),
    ("2.5.29.18", "issuerAltName"),
    ("2.5.29.19", "basicConstraints"),
    ("2.5.29.30", "nameConstraints"),
    ("2.5.29.31", "crlDistributionPoints"),
    ("2.5.29.32", "certificatePolicies"),
    ("2.5.29.33", "policyMappings"),
    ("2.5.29.35", "authorityKeyIdentifier"),
    ("2.5.29.36", "policyConstraints"),
    ("2.5.29.37", "extendedKeyUsage"),
    ("2.5.29.46", "freshestCRL"),
    ("2.5.29.54", "inhibitAnyPolicy"),
    ("1.3.6.1.5.5.7.1.1", "authorityInfoAccess"),
    ("1.3.6.1.5.5.7.1.11", "subjectInfoAccess"),
    ("1.3.6.1.5.5.7.1.12", "tlsfeature"),
    ("1.3.6.1.4.1.11129.2.4.2", "ct_precert_scts"),
    ("1.3.6.1.4.1.11129.2.4.3", "ct_precert_poison"),
];

const ACCESS_METHODS: &[(&str, &str)] = &[
    ("1.3.6.1.5.5.7.48.1", "OCSP"),
    ("1.3.6.1.5.5.7.48.2", "CA Issuers"),
];

const KEY_PURPOSES: &[(&str, &str)] = &[
    ("1.3.6.1.5.5.7.3.1", "TLS Web Server Authentication"),
    ("1.3.6.1.5.5.7.3.2", "TLS Web Client Authentication"),
    ("1.3.6.1.5.5.7.3.3", "Code Signing"),
    ("1.3.6.1.5.5.7.3.4", "E-mail Protection"),
    ("1.3.6.1.5.5.7.3.8", "Time Stamping"),
    ("1.3.6.1.5.5.7.3.9", "OCSP Signing"),
];

/// A decoded extension of a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    /// Dotted OID, e.g. `2.5.29.17`
    pub oid: String,
    /// Short name, or the dotted OID when the extension is not known
    pub name: String,
    pub critical: bool,
    /// Rendered value; may contain several lines
    pub value: String,
    /// One entry per general name for alternative-name extensions, empty for
    /// everything else. `value` is these entries joined with `, `.
    pub names: Vec<String>,
}

impl Extension {
    /// Matches a field-request identifier (short name or OID, any case).
    pub fn matches(&self, identifier: &str) -> bool {
        self.oid == identifier || self.name.eq_ignore_ascii_case(identifier)
    }

    pub fn is_subject_alt_name(&self) -> bool {
        self.oid == OID_SUBJECT_ALT_NAME
    }

    /// Label used when printing, flags critical extensions.
    pub fn label(&self) -> String {
        if self.critical {
            format!("{} (critical)", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Short name for a dotted extension OID.
pub fn extension_name(oid: &str) -> Option<&'static str> {
    lookup(EXTENSION_NAMES, oid)
}

/// Decodes every extension of a DER certificate, keeping the first entry
/// when an OID occurs more than once.
pub fn decode_extensions(der: &[u8]) -> Result<Vec<Extension>, InspectError> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| InspectError::certificate(format!("failed to parse certificate: {e}")))?;

    let mut extensions: Vec<Extension> = Vec::with_capacity(cert.extensions().len());
    for ext in cert.extensions() {
        let oid = ext.oid.to_id_string();
        if extensions.iter().any(|known| known.oid == oid) {
            log::debug!("ignoring duplicate extension {oid}");
            continue;
        }
        let (value, names) = match alt_names(ext) {
            Some(names) => (names.join(", "), names),
            None => (render_value(ext), Vec::new()),
        };
        extensions.push(Extension {
            name: extension_name(&oid).map_or_else(|| oid.clone(), str::to_string),
            critical: ext.critical,
            value,
            names,
            oid,
        });
    }
    Ok(extensions)
}

fn render_value(ext: &X509Extension<'_>) -> String {
    match ext.parsed_extension() {
        ParsedExtension::BasicConstraints(bc) => {
            let mut value = format!("CA:{}", if bc.ca { "TRUE" } else { "FALSE" });
            if let Some(len) = bc.path_len_constraint {
                let _ = write!(value, ", pathlen:{len}");
            }
            value
        }
        ParsedExtension::KeyUsage(ku) => {
            let usages = [
                (ku.digital_signature(), "Digital Signature"),
                (ku.non_repudiation(), "Non Repudiation"),
                (ku.key_encipherment(), "Key Encipherment"),
                (ku.data_encipherment(), "Data Encipherment"),
                (ku.key_agreement(), "Key Agreement"),
                (ku.key_cert_sign(), "Certificate Sign"),
                (ku.crl_sign(), "CRL Sign"),
                (ku.encipher_only(), "Encipher Only"),
                (ku.decipher_only(), "Decipher Only"),
            ];
            usages
                .iter()
                .filter(|(set, _)| *set)
                .map(|(_, name)| *name)
                .collect::<Vec<_>>()
                .join(", ")
        }
        ParsedExtension::ExtendedKeyUsage(eku) => {
            let mut purposes = Vec::new();
            let flags = [
                (eku.any, "Any Extended Key Usage"),
                (eku.server_auth, "TLS Web Server Authentication"),
                (eku.client_auth, "TLS Web Client Authentication"),
                (eku.code_signing, "Code Signing"),
                (eku.email_protection, "E-mail Protection"),
                (eku.time_stamping, "Time Stamping"),
                (eku.ocsp_signing, "OCSP Signing"),
            ];
            purposes.extend(flags.iter().filter(|(set, _)| *set).map(|(_, n)| n.to_string()));
            for oid in &eku.other {
                let oid = oid.to_id_string();
                purposes.push(lookup(KEY_PURPOSES, &oid).map_or(oid.clone(), str::to_string));
            }
            purposes.join(", ")
        }
        ParsedExtension::SubjectKeyIdentifier(ski) => hex_colon(ski.0),
        ParsedExtension::AuthorityKeyIdentifier(aki) => match &aki.key_identifier {
            Some(id) => format!("keyid:{}", hex_colon(id.0)),
            None => hex_colon(ext.value),
        },
        ParsedExtension::AuthorityInfoAccess(aia) => aia
            .accessdescs
            .iter()
            .map(|desc| {
                let method = desc.access_method.to_id_string();
                format!(
                    "{} - {}",
                    lookup(ACCESS_METHODS, &method).map_or(method.clone(), str::to_string),
                    general_name(&desc.access_location)
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        ParsedExtension::CRLDistributionPoints(cdp) => {
            let mut lines = Vec::new();
            for point in &cdp.points {
                if let Some(DistributionPointName::FullName(names)) = &point.distribution_point {
                    lines.push("Full Name:".to_string());
                    lines.extend(names.iter().map(|name| format!("  {}", general_name(name))));
                }
            }
            lines.join("\n")
        }
        ParsedExtension::CertificatePolicies(policies) => policies
            .iter()
            .map(|policy| format!("Policy: {}", policy.policy_id.to_id_string()))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => hex_colon(ext.value),
    }
}

fn alt_names(ext: &X509Extension<'_>) -> Option<Vec<String>> {
    let names = match ext.parsed_extension() {
        ParsedExtension::SubjectAlternativeName(san) => &san.general_names,
        ParsedExtension::IssuerAlternativeName(ian) => &ian.general_names,
        _ => return None,
    };
    Some(names.iter().map(general_name).collect())
}

fn general_name(name: &GeneralName<'_>) -> String {
    match name {
        GeneralName::DNSName(dns) => format!("DNS:{dns}"),
        GeneralName::RFC822Name(email) => format!("email:{email}"),
        GeneralName::URI(uri) => format!("URI:{uri}"),
        GeneralName::IPAddress(ip) => format!("IP Address:{}", ip_address(ip)),
        GeneralName::DirectoryName(dn) => format!("DirName:{dn}"),
        GeneralName::RegisteredID(oid) => format!("Registered ID:{}", oid.to_id_string()),
        GeneralName::OtherName(oid, _) => format!("othername:{}", oid.to_id_string()),
        _ => "<unsupported>".to_string(),
    }
}

fn ip_address(bytes: &[u8]) -> String {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        Ipv4Addr::from(octets).to_string()
    } else if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        Ipv6Addr::from(octets).to_string()
    } else {
        hex_colon(bytes)
    }
}

fn hex_colon(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn lookup(table: &[(&str, &'static str)], oid: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(known, _)| *known == oid)
        .map(|(_, name)| *name)
}
