pub mod error;
pub mod hashing;
pub mod jws;
pub mod keys;
pub mod keystore;
pub mod signing;

pub use error::CryptoError;
pub use hashing::{derive_seed, hash};
pub use jws::{DecodedJws, JwsHeader};
pub use keys::{KeyPair, PublicKey};
pub use keystore::{KeyRef, KeyStore};
pub use signing::{sign, verify, Signature};
