use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Decentralized Identifier.
/// Format: `did:<method>:<method-specific-id>`, where the method-specific id
/// may carry a namespace segment (`did:cheqd:testnet:<uuid>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse and validate a DID string.
    pub fn parse(uri: impl Into<String>) -> Result<Self, CoreError> {
        let uri = uri.into();
        let mut parts = uri.splitn(3, ':');
        let scheme = parts.next().unwrap_or_default();
        let method = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default();

        if scheme != "did" {
            return Err(CoreError::InvalidDid(format!(
                "DID must start with 'did:', got: {}",
                uri
            )));
        }
        if method.is_empty()
            || !method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(CoreError::InvalidDid(format!(
                "DID method must be non-empty lowercase alphanumeric, got: {}",
                uri
            )));
        }
        if rest.is_empty() || rest.ends_with(':') {
            return Err(CoreError::InvalidDid(format!(
                "DID must have format 'did:<method>:<identifier>', got: {}",
                uri
            )));
        }
        Ok(Self(uri))
    }

    /// Build a DID from its method, an optional namespace and an identifier.
    pub fn from_parts(method: &str, namespace: Option<&str>, identifier: &str) -> Self {
        match namespace {
            Some(ns) => Self(format!("did:{}:{}:{}", method, ns, identifier)),
            None => Self(format!("did:{}:{}", method, identifier)),
        }
    }

    /// Get the full DID URI.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the method (cheqd, key, web, vda, ...).
    pub fn method(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }

    /// Everything after `did:<method>:`.
    pub fn method_specific_id(&self) -> &str {
        self.0.splitn(3, ':').nth(2).unwrap_or_default()
    }

    /// The namespace segment, present only for `did:<method>:<ns>:<id>` forms.
    pub fn namespace(&self) -> Option<&str> {
        let parts: Vec<&str> = self.0.split(':').collect();
        if parts.len() >= 4 {
            Some(parts[2])
        } else {
            None
        }
    }

    /// The trailing identifier segment.
    pub fn identifier(&self) -> &str {
        self.0.rsplit(':').next().unwrap_or_default()
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Did {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ledger network a chain-anchored DID lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Namespace string as it appears inside a DID.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }

    /// Read the network from an identifier of the form
    /// `did:<method>:<network>:<id>` (third `:`-separated segment).
    pub fn from_identifier(identifier: &str) -> Result<Self, CoreError> {
        let ns = identifier.split(':').nth(2).unwrap_or_default();
        ns.parse()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(CoreError::InvalidNetwork(other.to_string())),
        }
    }
}
