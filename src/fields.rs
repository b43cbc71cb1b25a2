//! Field identifiers and field requests.
//!
//! A field request is the ordered list of things to print about a chain,
//! parsed once from a comma separated string such as `header,cn,san`.
//! Identifiers are case-insensitive. Anything that is not a known field and
//! does not use the `ext:` prefix is kept as [`FieldSpec::Unknown`] so the
//! formatter can report it without aborting the run.

use std::str::FromStr;

use strum_macros::{Display, EnumIter, EnumMessage, EnumString};

/// Prefix selecting a single extension by short name or dotted OID,
/// e.g. `ext:keyUsage` or `ext:2.5.29.15`.
pub const EXTENSION_PREFIX: &str = "ext:";

/// Fields printed when nothing else is configured.
pub const DEFAULT_FIELDS: &str = "header,cn,san";

/// Built-in fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, EnumMessage)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Field {
    #[strum(message = "Header line naming the host")]
    Header,
    #[strum(message = "Leaf common name")]
    Cn,
    #[strum(message = "Leaf subject distinguished name")]
    Subject,
    #[strum(message = "Leaf issuer distinguished name")]
    Issuer,
    #[strum(message = "Leaf serial number")]
    Serial,
    #[strum(message = "Leaf X.509 version")]
    Version,
    #[strum(message = "Leaf signature algorithm")]
    SigAlg,
    #[strum(message = "Start of the leaf validity window")]
    NotBefore,
    #[strum(message = "End of the leaf validity window")]
    NotAfter,
    #[strum(message = "Leaf expiry date")]
    Expiry,
    #[strum(message = "Days until the leaf expires")]
    Days,
    #[strum(message = "Leaf public key algorithm and size")]
    PubKey,
    #[strum(message = "Leaf RSA modulus")]
    Modulus,
    #[strum(message = "Leaf RSA public exponent")]
    Exponent,
    #[strum(message = "Leaf subject alternative names")]
    San,
    #[strum(message = "Subject of every certificate in the chain")]
    Chain,
    #[strum(message = "Whether every certificate is signed by the next one")]
    VerifyChain,
    #[strum(message = "Every leaf extension")]
    Extensions,
    #[strum(
        to_string = "extensions-nosan",
        serialize = "extensionsnosan",
        message = "Every leaf extension except subjectAltName"
    )]
    ExtensionsNoSan,
}

/// One entry of a field request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSpec {
    Builtin(Field),
    /// A single leaf extension, by short name or dotted OID.
    Extension(String),
    /// An identifier nothing recognises; reported, never fatal.
    Unknown(String),
}

impl FieldSpec {
    /// Parses one identifier. Never fails.
    pub fn parse(identifier: &str) -> FieldSpec {
        let identifier = identifier.trim();
        let lowered = identifier.to_ascii_lowercase();
        if let Some(name) = lowered.strip_prefix(EXTENSION_PREFIX) {
            if !name.is_empty() {
                return FieldSpec::Extension(name.to_string());
            }
        }
        match Field::from_str(&lowered) {
            Ok(field) => FieldSpec::Builtin(field),
            Err(_) => FieldSpec::Unknown(identifier.to_string()),
        }
    }
}

impl From<Field> for FieldSpec {
    fn from(field: Field) -> Self {
        FieldSpec::Builtin(field)
    }
}

/// Ordered list of requested fields. Duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldRequest(Vec<FieldSpec>);

impl FieldRequest {
    /// Parses a comma separated list, skipping empty entries.
    pub fn parse(list: &str) -> FieldRequest {
        FieldRequest(
            list.split(',')
                .filter(|entry| !entry.trim().is_empty())
                .map(FieldSpec::parse)
                .collect(),
        )
    }

    pub fn from_identifiers<I, S>(identifiers: I) -> FieldRequest
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        FieldRequest(
            identifiers
                .into_iter()
                .filter(|entry| !entry.as_ref().trim().is_empty())
                .map(|entry| FieldSpec::parse(entry.as_ref()))
                .collect(),
        )
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldSpec> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains(&FieldSpec::Builtin(field))
    }
}

impl From<Vec<Field>> for FieldRequest {
    fn from(fields: Vec<Field>) -> Self {
        FieldRequest(fields.into_iter().map(FieldSpec::from).collect())
    }
}

impl<'a> IntoIterator for &'a FieldRequest {
    type Item = &'a FieldSpec;
    type IntoIter = std::slice::Iter<'a, FieldSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Named replacements for the whole field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Preset {
    /// Everything about the leaf plus the chain and its verification
    All,
    /// Just the expiry date
    Expiry,
}

impl Preset {
    pub fn fields(self) -> FieldRequest {
        match self {
            Preset::All => FieldRequest::from(vec![
                Field::Header,
                Field::Cn,
                Field::Subject,
                Field::Issuer,
                Field::Serial,
                Field::Version,
                Field::SigAlg,
                Field::NotBefore,
                Field::Expiry,
                Field::Days,
                Field::PubKey,
                Field::San,
                Field::ExtensionsNoSan,
                Field::Chain,
                Field::VerifyChain,
            ]),
            Preset::Expiry => FieldRequest::from(vec![Field::Expiry]),
        }
    }
}
