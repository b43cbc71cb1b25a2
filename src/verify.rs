//! Chain signature verification.
//!
//! Checks only cryptographic linkage: every certificate must carry a valid
//! signature under the public key of the certificate that follows it. Names,
//! validity windows, CA flags and trust anchors are not looked at, so a chain
//! of self-consistent but untrusted certificates passes.

/// A certificate that can check its own signature against a candidate issuer.
pub trait Signed {
    /// True when `self` carries a valid signature made with `issuer`'s key.
    fn is_signed_by(&self, issuer: &Self) -> bool;
}

/// Outcome of one adjacent pair of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkResult {
    /// Index of the signed certificate
    pub subject: usize,
    /// Index of the certificate whose key was used
    pub issuer: usize,
    pub valid: bool,
}

/// Verifies every link, walking from the most root-like certificate towards
/// the leaf. A single certificate has no links and is trivially valid.
pub fn verify<C: Signed>(chain: &[C]) -> bool {
    let mut valid = true;
    for link in verify_links(chain) {
        valid &= link.valid;
    }
    valid
}

/// Per-link results in traversal order (root end first). Every link is
/// checked even after a failure.
pub fn verify_links<C: Signed>(chain: &[C]) -> Vec<LinkResult> {
    let mut links = Vec::with_capacity(chain.len().saturating_sub(1));
    let mut parent: Option<(usize, &C)> = None;
    for (index, cert) in chain.iter().enumerate().rev() {
        if let Some((parent_index, parent_cert)) = parent {
            let valid = cert.is_signed_by(parent_cert);
            log::debug!(
                "chain link {} <- {}: {}",
                index,
                parent_index,
                if valid { "ok" } else { "signature mismatch" }
            );
            links.push(LinkResult {
                subject: index,
                issuer: parent_index,
                valid,
            });
        }
        parent = Some((index, cert));
    }
    links
}
