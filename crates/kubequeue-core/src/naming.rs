//! DNS-safe job names.

use k8s_openapi::api::batch::v1::Job;
use rand::RngCore;
use regex::Regex;
use std::sync::LazyLock;

/// Length of the suffix appended by [`append_unique_suffix`].
pub const SUFFIX_LEN: usize = 5;

const MAX_LABEL_LEN: usize = 63;
const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

static DNS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("DNS label pattern is valid")
});

static LABEL_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").expect("label value pattern is valid")
});

/// Whether `name` is an RFC 1123 label.
pub fn is_dns_label(name: &str) -> bool {
    name.len() <= MAX_LABEL_LEN && DNS_LABEL.is_match(name)
}

/// Whether `value` can be stored as a non-empty label value.
pub fn is_label_value(value: &str) -> bool {
    value.len() <= MAX_LABEL_LEN && LABEL_VALUE.is_match(value)
}

/// An `n`-character string over `[a-z2-7]`.
///
/// `n` random bytes, base32 encoded without padding, truncated to `n`.
pub fn dns_safe_suffix(n: usize) -> String {
    let mut bytes = vec![0u8; n];
    rand::rng().fill_bytes(&mut bytes);
    let mut encoded = base32_lower(&bytes);
    encoded.truncate(n);
    encoded
}

/// Rename `job` to `<name>-<suffix>`. The group label is set from the name
/// before this runs, so it keeps the base name.
pub fn append_unique_suffix(job: &mut Job) {
    if let Some(name) = job.metadata.name.as_mut() {
        let suffix = dns_safe_suffix(SUFFIX_LEN);
        let keep = MAX_LABEL_LEN.saturating_sub(SUFFIX_LEN + 1);
        if name.len() > keep {
            name.truncate(keep);
            while name.ends_with(['-', '.']) {
                name.pop();
            }
        }
        name.push('-');
        name.push_str(&suffix);
    }
}

fn base32_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(5) * 8);
    let mut buffer: u16 = 0;
    let mut bits = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | u16::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[usize::from((buffer >> bits) & 0x1f)] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[usize::from((buffer << (5 - bits)) & 0x1f)] as char);
    }
    out
}
