use alloy_primitives::hex;
use serde::{Deserialize, Serialize};
use sha2::digest::Update;
use sha2::{Digest, Sha256};
use std::fmt::{Debug, Display};

/// Stable identifier of a route or opportunity, a sha256 over its constituent ids.
#[derive(Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RouteHash(pub [u8; 32]);

impl RouteHash {
    /// Hashes the parts in order, each one followed by a separator byte so that
    /// `["ab", "c"]` and `["a", "bc"]` differ.
    pub fn from_parts<'a, I: IntoIterator<Item = &'a str>>(parts: I) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            Update::update(&mut hasher, part.as_bytes());
            Update::update(&mut hasher, &[0u8]);
        }
        let hash_slice: [u8; 32] = hasher.finalize().into();
        RouteHash(hash_slice)
    }
}

impl Display for RouteHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode_prefixed(self.0))
    }
}

impl Debug for RouteHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RouteHash({})", hex::encode_prefixed(self.0))
    }
}

impl From<[u8; 32]> for RouteHash {
    fn from(hash: [u8; 32]) -> Self {
        RouteHash(hash)
    }
}

impl Serialize for RouteHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode_prefixed(self.0))
    }
}

impl<'de> Deserialize<'de> for RouteHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        if bytes.len() != 32 {
            return Err(serde::de::Error::custom(format!("expected 32 bytes, got {}", bytes.len())));
        }
        let mut hash = [0; 32];
        hash.copy_from_slice(&bytes);
        Ok(RouteHash(hash))
    }
}
