//! Recipe identity: random UUID-shaped identifiers

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng, TryRngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Template filled by the fallback generator (`x` = any hex digit,
/// `y` = variant nibble 8..b)
const UUID_TEMPLATE: &str = "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx";

/// A unique recipe identifier
///
/// Freshly generated ids are v4 UUIDs. Ids read back from storage are
/// treated as opaque strings, whatever generator produced them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecipeId(String);

impl RecipeId {
    /// Generate a new random identifier
    ///
    /// Uses the operating system RNG. If it is unavailable, falls back to a
    /// time-seeded pseudo-random generator producing the same textual format.
    pub fn new() -> Self {
        let mut bytes = [0u8; 16];
        match OsRng.try_fill_bytes(&mut bytes) {
            Ok(()) => Self(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()),
            Err(e) => {
                tracing::warn!("OS random source unavailable ({}), using fallback id generator", e);
                Self::fallback()
            }
        }
    }

    /// Generate an identifier from a seeded pseudo-random generator
    ///
    /// Weaker uniqueness guarantee than [`RecipeId::new`].
    pub fn fallback() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let mut rng = StdRng::seed_from_u64(seed ^ u64::from(std::process::id()));
        Self(fill_template(&mut rng))
    }

    /// Wrap an existing identifier string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id has the canonical UUID shape
    pub fn is_uuid(&self) -> bool {
        Uuid::parse_str(&self.0).is_ok()
    }
}

impl Default for RecipeId {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_template<R: Rng>(rng: &mut R) -> String {
    UUID_TEMPLATE
        .chars()
        .map(|c| match c {
            'x' => char::from_digit(rng.random_range(0..16), 16).unwrap_or('0'),
            'y' => char::from_digit(rng.random_range(0..16) & 0x3 | 0x8, 16).unwrap_or('8'),
            other => other,
        })
        .collect()
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecipeId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdParseError::Empty);
        }
        Ok(Self(s.to_string()))
    }
}

impl Serialize for RecipeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecipeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct IdVisitor;

        impl serde::de::Visitor<'_> for IdVisitor {
            type Value = RecipeId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-empty recipe id")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<RecipeId, E> {
                v.parse().map_err(E::custom)
            }

            // Old local records were keyed by numeric timestamps
            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<RecipeId, E> {
                Ok(RecipeId(v.to_string()))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<RecipeId, E> {
                Ok(RecipeId(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Errors that can occur when reading recipe IDs
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("recipe id is empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_id_generation() {
        let id = RecipeId::new();
        assert_eq!(id.to_string().len(), 36);
        assert!(id.is_uuid());
        assert_eq!(id.as_str().chars().nth(14), Some('4'));
    }

    #[test]
    fn test_recipe_ids_are_unique() {
        let a = RecipeId::new();
        let b = RecipeId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fallback_has_uuid_shape() {
        let id = RecipeId::fallback();
        let s = id.to_string();
        assert_eq!(s.len(), 36);
        assert!(id.is_uuid());
        assert_eq!(s.chars().nth(14), Some('4'));
        let variant = s.chars().nth(19).unwrap();
        assert!(matches!(variant, '8' | '9' | 'a' | 'b'));
    }

    #[test]
    fn test_legacy_ids_are_opaque() {
        let id = RecipeId::parse("1700000000000").unwrap();
        assert_eq!(id.as_str(), "1700000000000");
        assert!(!id.is_uuid());
    }

    #[test]
    fn test_id_rejects_empty() {
        assert!(matches!(RecipeId::parse(""), Err(IdParseError::Empty)));
    }

    #[test]
    fn test_id_kept_verbatim() {
        let id = RecipeId::parse(" my recipe ").unwrap();
        assert_eq!(id.as_str(), " my recipe ");

        let parsed: RecipeId = serde_json::from_str(r#""tarte aux pommes""#).unwrap();
        assert_eq!(parsed.as_str(), "tarte aux pommes");
    }

    #[test]
    fn test_id_serde_roundtrip() {
        let id = RecipeId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: RecipeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
