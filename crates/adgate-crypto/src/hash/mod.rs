//! Hash utilities

use digest::core_api::BlockSizeUser;
use digest::Digest;
use hmac::{Mac, SimpleHmac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Digest used for request signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    #[default]
    Sha512,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported hash algorithm: {0}")]
pub struct UnsupportedAlgorithm(pub String);

impl FromStr for HashAlgorithm {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        };
        f.write_str(name)
    }
}

impl HashAlgorithm {
    /// Digest length in bytes
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

pub fn md5_hash(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn keyed<D: Digest + BlockSizeUser>(key: &[u8], parts: &[&[u8]]) -> SimpleHmac<D> {
    let mut mac =
        <SimpleHmac<D> as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    for part in parts {
        mac.update(part);
    }
    mac
}

fn digest_with<D: Digest + BlockSizeUser>(key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    keyed::<D>(key, parts).finalize().into_bytes().to_vec()
}

fn verify_with<D: Digest + BlockSizeUser>(key: &[u8], parts: &[&[u8]], expected: &[u8]) -> bool {
    keyed::<D>(key, parts).verify_slice(expected).is_ok()
}

/// HMAC over the concatenation of `parts`
pub fn hmac_digest(algorithm: HashAlgorithm, key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Md5 => digest_with::<Md5>(key, parts),
        HashAlgorithm::Sha1 => digest_with::<Sha1>(key, parts),
        HashAlgorithm::Sha256 => digest_with::<Sha256>(key, parts),
        HashAlgorithm::Sha384 => digest_with::<Sha384>(key, parts),
        HashAlgorithm::Sha512 => digest_with::<Sha512>(key, parts),
    }
}

pub fn hmac_hex(algorithm: HashAlgorithm, key: &[u8], parts: &[&[u8]]) -> String {
    hex::encode(hmac_digest(algorithm, key, parts))
}

/// Constant-time check of `expected` against the HMAC over `parts`
pub fn hmac_verify(
    algorithm: HashAlgorithm,
    key: &[u8],
    parts: &[&[u8]],
    expected: &[u8],
) -> bool {
    match algorithm {
        HashAlgorithm::Md5 => verify_with::<Md5>(key, parts, expected),
        HashAlgorithm::Sha1 => verify_with::<Sha1>(key, parts, expected),
        HashAlgorithm::Sha256 => verify_with::<Sha256>(key, parts, expected),
        HashAlgorithm::Sha384 => verify_with::<Sha384>(key, parts, expected),
        HashAlgorithm::Sha512 => verify_with::<Sha512>(key, parts, expected),
    }
}
