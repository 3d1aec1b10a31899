//! Account addresses and wallet identities are `solana_sdk` public keys.
//! In JSON they travel as base58 strings, the form every cluster client uses.

pub use solana_sdk::pubkey::Pubkey;

/// `#[serde(with = "base58")]` for a single key.
pub mod base58 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }

    /// `#[serde(with = "base58::option")]`, `None` is `null`.
    pub mod option {
        use serde::{de, Deserialize, Deserializer, Serializer};

        use super::Pubkey;

        pub fn serialize<S: Serializer>(key: &Option<Pubkey>, serializer: S) -> Result<S::Ok, S::Error> {
            match key {
                Some(key) => serializer.collect_str(key),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Pubkey>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| s.parse().map_err(de::Error::custom))
                .transpose()
        }
    }
}
