//! Local TLS server presenting a generated two-certificate chain.

#![allow(dead_code)]

use std::io::Read;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::ssl::{NameType, SslAcceptor, SslMethod};
use openssl::x509::extension::{BasicConstraints, SubjectAlternativeName};
use openssl::x509::{X509Builder, X509NameBuilder, X509};

pub struct Pki {
    pub ca: X509,
    pub leaf: X509,
    pub leaf_key: PKey<Private>,
}

fn build(cn: &str, serial: u32, issuer: Option<(&X509, &PKey<Private>)>) -> (X509, PKey<Private>) {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("O", "Integration").unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder
        .set_serial_number(&BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap())
        .unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();

    match issuer {
        None => {
            builder.set_issuer_name(&name).unwrap();
            builder
                .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
                .unwrap();
            builder.sign(&key, MessageDigest::sha256()).unwrap();
        }
        Some((ca, ca_key)) => {
            builder.set_issuer_name(ca.subject_name()).unwrap();
            let san = SubjectAlternativeName::new()
                .dns("localhost")
                .ip("127.0.0.1")
                .build(&builder.x509v3_context(Some(ca), None))
                .unwrap();
            builder.append_extension(san).unwrap();
            builder.sign(ca_key, MessageDigest::sha256()).unwrap();
        }
    }
    (builder.build(), key)
}

impl Pki {
    /// A local CA and a leaf for `localhost` signed by it.
    pub fn new() -> Self {
        let (ca, ca_key) = build("Integration CA", 1, None);
        let (leaf, leaf_key) = build("localhost", 2, Some((&ca, &ca_key)));
        Pki { ca, leaf, leaf_key }
    }

    /// Same chain with one bit of the leaf signature flipped.
    pub fn with_corrupted_leaf(mut self) -> Self {
        let mut der = self.leaf.to_der().unwrap();
        let last = der.len() - 1;
        der[last] ^= 0x01;
        self.leaf = X509::from_der(&der).unwrap();
        self
    }
}

pub struct TestServer {
    pub port: u16,
    server_name: Arc<Mutex<Option<String>>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Accepts a single TLS connection presenting leaf + CA.
    pub fn start(pki: &Pki) -> Self {
        let server_name = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&server_name);

        let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
        acceptor.set_private_key(&pki.leaf_key).unwrap();
        acceptor.set_certificate(&pki.leaf).unwrap();
        acceptor.add_extra_chain_cert(pki.ca.clone()).unwrap();
        acceptor.set_servername_callback(move |ssl, _alert| {
            *seen.lock().unwrap() = ssl.servername(NameType::HOST_NAME).map(String::from);
            Ok(())
        });
        let acceptor = acceptor.build();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                if let Ok(mut tls) = acceptor.accept(stream) {
                    // Wait for the client to hang up.
                    let mut buf = [0u8; 16];
                    let _ = tls.read(&mut buf);
                }
            }
        });

        TestServer {
            port,
            server_name,
            handle,
        }
    }

    /// Server name the client sent, once the connection is done.
    pub fn finish(self) -> Option<String> {
        self.handle.join().unwrap();
        let name = self.server_name.lock().unwrap().clone();
        name
    }
}
