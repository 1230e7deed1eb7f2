//! Domain key encoding.
//!
//! Keys are the domain's bytes in reverse order, so names sharing a suffix
//! (`mail.example.com`, `www.example.com`) share a key prefix and sit next to
//! each other in the tree. No normalization is applied: callers supply names
//! in the same canonical form the dataset was built with.

/// Encode a domain into its lookup key.
#[inline]
pub fn encode(domain: &str) -> Vec<u8> {
    reverse(domain.as_bytes())
}

/// Encode into a reusable buffer, replacing its contents.
#[inline]
pub fn encode_into(domain: &str, buf: &mut Vec<u8>) {
    buf.clear();
    buf.extend(domain.bytes().rev());
}

/// Recover the domain bytes from a key produced by [`encode`].
#[inline]
pub fn decode(key: &[u8]) -> Vec<u8> {
    reverse(key)
}

fn reverse(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}
