//! Turns a chain and a field request into report lines.
//!
//! Every built-in field maps to a handler, a plain function from the
//! inspection context to its output lines. Handlers never fail: missing data
//! is reported as a line of its own, so each requested field yields at least
//! one line and one bad field cannot hide the rest of the report.

use crate::certificate::{Chain, PublicKeyInfo};
use crate::extension::Extension;
use crate::fields::{Field, FieldRequest, FieldSpec};
use crate::verify;

/// What a handler gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub host: &'a str,
    pub chain: &'a Chain,
}

pub type Handler = fn(&Context<'_>) -> Vec<String>;

const INDENT: &str = "    ";

impl Field {
    /// Handler printing this field.
    pub fn handler(self) -> Handler {
        match self {
            Field::Header => header,
            Field::Cn => common_name,
            Field::Subject => subject,
            Field::Issuer => issuer,
            Field::Serial => serial,
            Field::Version => version,
            Field::SigAlg => signature_algorithm,
            Field::NotBefore => not_before,
            Field::NotAfter => not_after,
            Field::Expiry => expiry,
            Field::Days => days_left,
            Field::PubKey => public_key,
            Field::Modulus => modulus,
            Field::Exponent => exponent,
            Field::San => subject_alt_names,
            Field::Chain => chain,
            Field::VerifyChain => verify_chain,
            Field::Extensions => all_extensions,
            Field::ExtensionsNoSan => extensions_without_san,
        }
    }
}

/// Report writer for one inspected chain.
pub struct Formatter<'a> {
    context: Context<'a>,
}

impl<'a> Formatter<'a> {
    pub fn new(host: &'a str, chain: &'a Chain) -> Self {
        Formatter {
            context: Context { host, chain },
        }
    }

    /// Lines for every requested field, in request order. Fields are
    /// rendered as the iterator advances, so chain verification only runs
    /// once a `verifychain` field is reached.
    pub fn lines(&'a self, fields: &'a FieldRequest) -> impl Iterator<Item = String> + 'a {
        fields.iter().flat_map(move |field| self.render(field))
    }

    /// Lines for a single field.
    pub fn render(&self, field: &FieldSpec) -> Vec<String> {
        match field {
            FieldSpec::Builtin(field) => field.handler()(&self.context),
            FieldSpec::Extension(name) => named_extension(&self.context, name),
            FieldSpec::Unknown(identifier) => {
                log::debug!("unknown field requested: {}", identifier);
                vec![format!("Unknown field: {}", identifier)]
            }
        }
    }
}

fn header(ctx: &Context<'_>) -> Vec<String> {
    vec![format!("==> {}", ctx.host)]
}

fn common_name(ctx: &Context<'_>) -> Vec<String> {
    let line = match ctx.chain.leaf().subject().common_name() {
        Some(cn) => format!("CN: {}", cn),
        None => "CN: No CN present".to_string(),
    };
    vec![line]
}

fn subject(ctx: &Context<'_>) -> Vec<String> {
    vec![format!("Subject: {}", ctx.chain.leaf().subject())]
}

fn issuer(ctx: &Context<'_>) -> Vec<String> {
    vec![format!("Issuer: {}", ctx.chain.leaf().issuer())]
}

fn serial(ctx: &Context<'_>) -> Vec<String> {
    vec![format!("Serial: {}", ctx.chain.leaf().serial())]
}

fn version(ctx: &Context<'_>) -> Vec<String> {
    vec![format!("Version: {}", ctx.chain.leaf().version())]
}

fn signature_algorithm(ctx: &Context<'_>) -> Vec<String> {
    vec![format!(
        "Signature Algorithm: {}",
        ctx.chain.leaf().signature_algorithm()
    )]
}

fn not_before(ctx: &Context<'_>) -> Vec<String> {
    vec![format!("Not Before: {}", ctx.chain.leaf().not_before())]
}

fn not_after(ctx: &Context<'_>) -> Vec<String> {
    vec![format!("Not After: {}", ctx.chain.leaf().not_after())]
}

fn expiry(ctx: &Context<'_>) -> Vec<String> {
    vec![format!("expiry: {}", ctx.chain.leaf().not_after())]
}

fn days_left(ctx: &Context<'_>) -> Vec<String> {
    let line = match ctx.chain.leaf().days_left() {
        Ok(days) => format!("Days Left: {}", days),
        Err(e) => format!("Days Left: unavailable ({})", e),
    };
    vec![line]
}

fn public_key(ctx: &Context<'_>) -> Vec<String> {
    vec![format!("Public Key: {}", ctx.chain.leaf().public_key())]
}

fn modulus(ctx: &Context<'_>) -> Vec<String> {
    let line = match ctx.chain.leaf().public_key() {
        PublicKeyInfo::Rsa { modulus, .. } => format!("Modulus: {}", modulus),
        _ => "Modulus: not an RSA key".to_string(),
    };
    vec![line]
}

fn exponent(ctx: &Context<'_>) -> Vec<String> {
    let line = match ctx.chain.leaf().public_key() {
        PublicKeyInfo::Rsa { exponent, .. } => format!("Exponent: {}", exponent),
        _ => "Exponent: not an RSA key".to_string(),
    };
    vec![line]
}

fn subject_alt_names(ctx: &Context<'_>) -> Vec<String> {
    let leaf = ctx.chain.leaf();
    let Some(san) = leaf.extensions().iter().find(|ext| ext.is_subject_alt_name()) else {
        return vec!["subjectAltNames: No SANs present".to_string()];
    };
    san_lines(san)
}

/// DNS names print bare, every other general name keeps its type prefix.
fn san_lines(san: &Extension) -> Vec<String> {
    let mut lines = vec!["subjectAltNames:".to_string()];
    lines.extend(
        san.names
            .iter()
            .map(|entry| format!("{}{}", INDENT, entry.trim_start_matches("DNS:"))),
    );
    lines
}

fn chain(ctx: &Context<'_>) -> Vec<String> {
    let mut lines = vec!["Certificate chain:".to_string()];
    lines.extend(
        ctx.chain
            .iter()
            .map(|cert| format!("{}{}", INDENT, cert.subject())),
    );
    lines
}

fn verify_chain(ctx: &Context<'_>) -> Vec<String> {
    vec![format!(
        "Chain Valid: {}",
        verify::verify(ctx.chain.certificates())
    )]
}

fn all_extensions(ctx: &Context<'_>) -> Vec<String> {
    let extensions = ctx.chain.leaf().extensions();
    if extensions.is_empty() {
        return vec!["extensions: No extensions present".to_string()];
    }
    extensions.iter().flat_map(extension_lines).collect()
}

fn extensions_without_san(ctx: &Context<'_>) -> Vec<String> {
    let lines: Vec<String> = ctx
        .chain
        .leaf()
        .extensions()
        .iter()
        .filter(|ext| !ext.is_subject_alt_name())
        .flat_map(extension_lines)
        .collect();
    if lines.is_empty() {
        return vec!["extensions: No extensions present".to_string()];
    }
    lines
}

fn named_extension(ctx: &Context<'_>, name: &str) -> Vec<String> {
    match ctx.chain.leaf().extension(name) {
        Some(ext) => extension_lines(ext),
        None => vec![format!("{}: No such extension present", name)],
    }
}

/// Single-line values stay on the label line, multi-line values become an
/// indented block under it.
fn extension_lines(ext: &Extension) -> Vec<String> {
    let label = ext.label();
    if !ext.value.contains('\n') {
        return vec![format!("{}: {}", label, ext.value)];
    }
    let mut lines = vec![format!("{}:", label)];
    lines.extend(ext.value.lines().map(|line| format!("{}{}", INDENT, line)));
    lines
}
