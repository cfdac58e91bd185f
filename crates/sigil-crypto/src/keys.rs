use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::hashing::derive_seed;

/// Multicodec prefix for an Ed25519 public key (varint 0xed).
pub const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// Ed25519 key pair for signing operations.
/// Private key material is zeroized on drop by ed25519-dalek.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair using OS-provided entropy.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Create a key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Create a key pair from raw bytes (32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(bytes);
        let kp = Self::from_seed(&seed);
        seed.zeroize();
        Ok(kp)
    }

    /// Create a key pair from configured secret material: a hex seed, a
    /// mnemonic or a passphrase. See [`derive_seed`].
    pub fn from_secret_material(material: &str) -> Result<Self, CryptoError> {
        if material.trim().is_empty() {
            return Err(CryptoError::InvalidInput("empty key material".into()));
        }
        let mut seed = derive_seed(material);
        let kp = Self::from_seed(&seed);
        seed.zeroize();
        Ok(kp)
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Access the underlying ed25519-dalek SigningKey for signing operations.
    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

/// Ed25519 public key for verification operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    /// Create from raw bytes (32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes_arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        let verifying_key = VerifyingKey::from_bytes(&bytes_arr)
            .map_err(|e| CryptoError::InvalidInput(format!("invalid public key: {}", e)))?;
        Ok(Self { verifying_key })
    }

    /// Get the raw bytes (32 bytes).
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.verifying_key.as_bytes()
    }

    /// Encode as hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Encode as base58.
    pub fn to_bs58(&self) -> String {
        bs58::encode(self.as_bytes()).into_string()
    }

    /// Decode from base58.
    pub fn from_bs58(bs58_str: &str) -> Result<Self, CryptoError> {
        let bytes = bs58::decode(bs58_str)
            .into_vec()
            .map_err(|e| CryptoError::InvalidInput(format!("invalid base58: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Encode as a base58btc multibase string carrying the Ed25519
    /// multicodec prefix (`z6Mk...`).
    pub fn to_multibase(&self) -> String {
        let mut bytes = Vec::with_capacity(34);
        bytes.extend_from_slice(&ED25519_MULTICODEC);
        bytes.extend_from_slice(self.as_bytes());
        format!("z{}", bs58::encode(bytes).into_string())
    }

    /// Decode a base58btc multibase string, with or without the Ed25519
    /// multicodec prefix.
    pub fn from_multibase(value: &str) -> Result<Self, CryptoError> {
        let encoded = value.strip_prefix('z').ok_or_else(|| {
            CryptoError::InvalidInput(format!("unsupported multibase encoding: {}", value))
        })?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| CryptoError::InvalidInput(format!("invalid base58: {}", e)))?;
        match bytes.len() {
            34 if bytes[..2] == ED25519_MULTICODEC => Self::from_bytes(&bytes[2..]),
            34 => Err(CryptoError::UnsupportedAlgorithm(format!(
                "multicodec 0x{:02x}{:02x}",
                bytes[0], bytes[1]
            ))),
            _ => Self::from_bytes(&bytes),
        }
    }

    /// Access the underlying verifying key.
    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keypair() {
        let kp = KeyPair::generate();
        let pk = kp.public_key();
        assert_eq!(pk.as_bytes().len(), 32);
    }

    #[test]
    fn test_from_seed_deterministic() {
        let seed = [42u8; 32];
        let kp1 = KeyPair::from_seed(&seed);
        let kp2 = KeyPair::from_seed(&seed);
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_from_bytes_invalid_length() {
        let result = KeyPair::from_bytes(&[0u8; 16]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidKeyLength { expected: 32, actual: 16 })
        ));
    }

    #[test]
    fn test_from_secret_material() {
        let kp1 = KeyPair::from_secret_material("payer mnemonic words").unwrap();
        let kp2 = KeyPair::from_secret_material("payer mnemonic words").unwrap();
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert!(KeyPair::from_secret_material("   ").is_err());
    }

    #[test]
    fn test_public_key_bs58_roundtrip() {
        let pk = KeyPair::generate().public_key();
        let pk2 = PublicKey::from_bs58(&pk.to_bs58()).unwrap();
        assert_eq!(pk, pk2);
    }

    #[test]
    fn test_multibase_has_ed25519_prefix() {
        let pk = KeyPair::from_seed(&[7u8; 32]).public_key();
        let mb = pk.to_multibase();
        assert!(mb.starts_with("z6Mk"));
        assert_eq!(PublicKey::from_multibase(&mb).unwrap(), pk);
    }

    #[test]
    fn test_multibase_without_prefix() {
        let pk = KeyPair::generate().public_key();
        let raw = format!("z{}", pk.to_bs58());
        assert_eq!(PublicKey::from_multibase(&raw).unwrap(), pk);
    }

    #[test]
    fn test_multibase_rejects_other_encodings() {
        assert!(PublicKey::from_multibase("mAAAA").is_err());
        let mut secp = vec![0xe7, 0x01];
        secp.extend_from_slice(&[1u8; 32]);
        let encoded = format!("z{}", bs58::encode(secp).into_string());
        assert!(matches!(
            PublicKey::from_multibase(&encoded),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_public_key_from_bytes_invalid() {
        assert!(PublicKey::from_bytes(&[0u8; 31]).is_err());
    }
}
