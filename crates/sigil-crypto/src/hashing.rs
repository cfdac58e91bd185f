/// BLAKE3 hash (32 bytes).
pub type Hash = [u8; 32];

const SEED_CONTEXT: &str = "sigil 2024-06 ed25519 seed derivation";

/// Hash arbitrary data using BLAKE3.
pub fn hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Turn configured secret material into a 32-byte Ed25519 seed.
///
/// A 64-character hex string (optionally `0x`-prefixed) is taken as the raw
/// seed. Anything else (a mnemonic, a passphrase) is run through BLAKE3 in
/// key-derivation mode so the same phrase always yields the same key.
pub fn derive_seed(material: &str) -> Hash {
    let trimmed = material.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if hex_part.len() == 64 {
        if let Ok(bytes) = hex::decode(hex_part) {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&bytes);
            return seed;
        }
    }
    blake3::derive_key(SEED_CONTEXT, trimmed.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash(b"sigil"), hash(b"sigil"));
        assert_ne!(hash(b"sigil"), hash(b"Sigil"));
    }

    #[test]
    fn test_derive_seed_from_hex() {
        let hex_seed = "11".repeat(32);
        assert_eq!(derive_seed(&hex_seed), [0x11u8; 32]);
        assert_eq!(derive_seed(&format!("0x{}", hex_seed)), [0x11u8; 32]);
    }

    #[test]
    fn test_derive_seed_from_phrase() {
        let phrase = "sketch mountain erode window enact net enrich smoke claim kangaroo another visual";
        let a = derive_seed(phrase);
        let b = derive_seed(phrase);
        assert_eq!(a, b);
        assert_ne!(a, derive_seed("another phrase entirely"));
    }

    #[test]
    fn test_derive_seed_ignores_surrounding_whitespace() {
        assert_eq!(derive_seed("  word list  "), derive_seed("word list"));
    }
}
