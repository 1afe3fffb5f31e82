//! Fingerprints for change detection.
//!
//! Resolved specs and whole manifests are hashed so the state file can record
//! what was last applied and `plan` can tell when a manifest changed.

use sha2::{Digest, Sha256};

use crate::model::NamespaceSpec;

use super::parser::Manifest;

// Keeps ("ab", "c") and ("a", "bc") apart.
const FIELD_SEPARATOR: [u8; 1] = [0x1f];

/// Hasher for computing spec and manifest fingerprints.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpecHasher;

impl SpecHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of one resolved namespace spec.
    #[must_use]
    pub fn hash_spec(&self, spec: &NamespaceSpec) -> String {
        let mut hasher = Sha256::new();
        for field in [&spec.name, &spec.description, &spec.owner_email] {
            hasher.update(field.as_bytes());
            hasher.update(FIELD_SEPARATOR);
        }
        hex::encode(hasher.finalize())
    }

    /// Computes the fingerprint of a manifest.
    ///
    /// Namespace order does not matter; the endpoint does.
    #[must_use]
    pub fn hash_manifest(&self, manifest: &Manifest) -> String {
        let mut hasher = Sha256::new();

        for field in [&manifest.provider.host, &manifest.provider.port] {
            hasher.update(field.known().map_or("", String::as_str).as_bytes());
            hasher.update(FIELD_SEPARATOR);
        }

        let mut namespaces: Vec<_> = manifest
            .namespaces
            .iter()
            .map(|ns| {
                [&ns.name, &ns.description, &ns.owner_email]
                    .map(|v| v.known().cloned().unwrap_or_default())
            })
            .collect();
        namespaces.sort();

        for fields in namespaces {
            for field in fields {
                hasher.update(field.as_bytes());
                hasher.update(FIELD_SEPARATOR);
            }
        }

        hex::encode(hasher.finalize())
    }

    /// Shortens a hash for display.
    #[must_use]
    pub fn short_hash(hash: &str) -> &str {
        hash.get(..8).unwrap_or(hash)
    }
}
