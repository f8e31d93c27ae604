//! Hashing System - SHA-256 for Manifests, FNV-1a for Texture Seeds
//!
//! Provides deterministic, reproducible hashes. Nothing in here may depend on
//! process state: the same bytes always hash the same way.

use sha2::{Sha256, Digest};
use serde::Serialize;
use serde_json::{Value, to_string};
use std::fmt::Write;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    to_hex(&result)
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => {
            Value::Array(arr.iter().map(sort_value).collect())
        }
        _ => v.clone()
    }
}

/// Compute manifest hash for any serializable manifest
pub fn compute_manifest_hash<T: Serialize>(manifest: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(manifest)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Compute the hash of a whole file tree.
///
/// tree_hash = sha256(for each file in path order: path + NUL + sha256(contents) + LF)
///
/// The caller's ordering is ignored; entries are sorted by path first so two
/// trees with the same files always hash identically.
pub fn compute_tree_hash<'a, I>(files: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut entries: Vec<(&str, String)> = files
        .into_iter()
        .map(|(path, data)| (path, sha256_hex(data)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Sha256::new();
    for (path, digest) in entries {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(digest.as_bytes());
        hasher.update(b"\n");
    }
    to_hex(&hasher.finalize())
}

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over a string. Used wherever a stable small hash of an id is
/// needed (hue fallback, variation pixel choice).
pub fn string_hash(s: &str) -> u32 {
    fnv1a(FNV_OFFSET, s.as_bytes())
}

/// Hash of `(seed, x, y)` for per-pixel procedural noise.
pub fn noise_hash(seed: &str, x: u32, y: u32) -> u32 {
    let h = fnv1a(FNV_OFFSET, seed.as_bytes());
    let h = fnv1a(h, b":");
    let h = fnv1a(h, &x.to_le_bytes());
    fnv1a(h, &y.to_le_bytes())
}

fn fnv1a(mut hash: u32, bytes: &[u8]) -> u32 {
    for b in bytes {
        hash ^= u32::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Lowercase hex of a digest.
fn to_hex(digest: &[u8]) -> String {
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
