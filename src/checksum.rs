//! Checksums written into Podfile.lock
//!
//! - `PODFILE CHECKSUM`: SHA-1 of the final Podfile text
//! - `SPEC CHECKSUMS`: SHA-1 of each spec document body
//! - CDN shard prefix: first three hex digits of MD5(pod name)

use md5::Md5;
use sha1::{Digest, Sha1};

/// Lowercase hex SHA-1 of `bytes`
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Checksum of the Podfile as recorded under `PODFILE CHECKSUM`
pub fn podfile_checksum(manifest: &str) -> String {
    sha1_hex(manifest.as_bytes())
}

/// Shard prefix of a pod on the CocoaPods CDN, e.g. `["d", "a", "2"]` for Alamofire
pub fn shard_prefix(name: &str) -> [char; 3] {
    let digest = hex::encode(Md5::digest(name.as_bytes()));
    let mut chars = digest.chars();
    let mut next = || chars.next().unwrap_or('0');
    [next(), next(), next()]
}
