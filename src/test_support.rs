//! Throwaway PKI for unit tests.

use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{BasicConstraints, KeyUsage, SubjectAlternativeName};
use openssl::x509::{X509Builder, X509Name, X509NameBuilder, X509};

use crate::certificate::{Certificate, Chain};

pub(crate) struct Issued {
    pub cert: X509,
    pub key: PKey<Private>,
}

pub(crate) struct Leaf {
    cn: String,
    dns: Vec<String>,
    ips: Vec<String>,
    ec: bool,
}

impl Leaf {
    pub fn new(cn: &str) -> Self {
        Leaf {
            cn: cn.to_string(),
            dns: Vec::new(),
            ips: Vec::new(),
            ec: false,
        }
    }

    pub fn san(mut self, names: &[&str]) -> Self {
        self.dns.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn ip(mut self, ip: &str) -> Self {
        self.ips.push(ip.to_string());
        self
    }

    pub fn ec(mut self) -> Self {
        self.ec = true;
        self
    }
}

fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn name(cn: &str) -> X509Name {
    let mut builder = X509NameBuilder::new().unwrap();
    builder.append_entry_by_text("C", "NZ").unwrap();
    builder.append_entry_by_text("O", "Inspect Tests").unwrap();
    builder.append_entry_by_text("CN", cn).unwrap();
    builder.build()
}

fn serial(n: u32) -> Asn1Integer {
    BigNum::from_u32(n).unwrap().to_asn1_integer().unwrap()
}

pub(crate) fn new_ca(cn: &str) -> Issued {
    let key = rsa_key();
    let name = name(cn);
    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder.set_serial_number(&serial(1)).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(3650).unwrap())
        .unwrap();
    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    builder
        .append_extension(
            KeyUsage::new()
                .critical()
                .key_cert_sign()
                .crl_sign()
                .build()
                .unwrap(),
        )
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    Issued {
        cert: builder.build(),
        key,
    }
}

pub(crate) fn issue_leaf(ca: &Issued, leaf: &Leaf) -> Issued {
    let key = if leaf.ec { ec_key() } else { rsa_key() };
    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder.set_serial_number(&serial(4242)).unwrap();
    builder.set_subject_name(&name(&leaf.cn)).unwrap();
    builder.set_issuer_name(ca.cert.subject_name()).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(90).unwrap())
        .unwrap();
    builder
        .append_extension(BasicConstraints::new().critical().build().unwrap())
        .unwrap();
    builder
        .append_extension(
            KeyUsage::new()
                .digital_signature()
                .key_encipherment()
                .build()
                .unwrap(),
        )
        .unwrap();
    if !leaf.dns.is_empty() || !leaf.ips.is_empty() {
        let mut san = SubjectAlternativeName::new();
        for dns in &leaf.dns {
            san.dns(dns);
        }
        for ip in &leaf.ips {
            san.ip(ip);
        }
        let extension = {
            let context = builder.x509v3_context(Some(&ca.cert), None);
            san.build(&context).unwrap()
        };
        builder.append_extension(extension).unwrap();
    }
    builder.sign(&ca.key, MessageDigest::sha256()).unwrap();
    Issued {
        cert: builder.build(),
        key,
    }
}

/// Flips a bit in the signature, which sits at the very end of the DER.
pub(crate) fn corrupt_signature(cert: &X509) -> X509 {
    let mut der = cert.to_der().unwrap();
    let last = der.len() - 1;
    der[last] ^= 0x01;
    X509::from_der(&der).unwrap()
}

pub(crate) fn chain_of(certs: &[&X509]) -> Chain {
    let certs = certs
        .iter()
        .map(|cert| Certificate::from_x509((*cert).clone()).unwrap())
        .collect();
    Chain::new(certs).unwrap()
}
