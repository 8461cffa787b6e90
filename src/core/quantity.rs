//! Ingredient quantity normalization, ordering and scaling
//!
//! Quantities are text everywhere in the data model so that half-typed
//! authoring input survives a round trip. This module is the only place
//! where that text is read as a number.
//!
//! Two operations build on the parse step:
//! - [`sort`] orders an ingredient list by unit-weighted magnitude, once,
//!   when a recipe is saved.
//! - [`scale`] rescales a single quantity from the recipe's base servings to
//!   a target serving count, for display.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::entities::recipe::Ingredient;

/// Servings used when a stored recipe has none (or zero)
pub const DEFAULT_SERVINGS: u32 = 4;

/// Leading numeric text: optional sign, digits with optional fraction (or a
/// bare fraction), optional exponent
static NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?")
        .expect("numeric prefix pattern is valid")
});

/// Unit of an ingredient quantity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Unit {
    /// No unit (a count, or a quantity described in the name)
    #[default]
    None,
    /// Grams
    Gram,
    /// Kilograms
    Kilogram,
    /// Pieces ("unité")
    Piece,
    /// Centiliters
    Centiliter,
    /// Liters
    Liter,
    /// Any other label, carried verbatim
    Other(String),
}

impl Unit {
    #[cfg(test)]
    pub fn known() -> &'static [Unit] {
        &[
            Unit::None,
            Unit::Gram,
            Unit::Kilogram,
            Unit::Piece,
            Unit::Centiliter,
            Unit::Liter,
        ]
    }

    /// Parse a unit label; unknown labels become [`Unit::Other`]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "" => Unit::None,
            "g" => Unit::Gram,
            "kg" => Unit::Kilogram,
            "u" => Unit::Piece,
            "cl" => Unit::Centiliter,
            "l" => Unit::Liter,
            _ => Unit::Other(label.trim().to_string()),
        }
    }

    /// The stored label
    pub fn as_str(&self) -> &str {
        match self {
            Unit::None => "",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Piece => "u",
            Unit::Centiliter => "cl",
            Unit::Liter => "l",
            Unit::Other(label) => label,
        }
    }

    /// Whether the label is one of the fixed authoring units
    pub fn is_known(&self) -> bool {
        !matches!(self, Unit::Other(_))
    }

    /// Relative magnitude used for ordering only.
    ///
    /// Not a conversion factor: 1 l ranks like 100 of the cl/g base scale.
    pub fn weight(&self) -> f64 {
        match self {
            Unit::Kilogram => 1000.0,
            Unit::Liter => 100.0,
            Unit::Gram | Unit::Centiliter | Unit::Piece | Unit::None | Unit::Other(_) => 1.0,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Unit::from_label(s))
    }
}

impl Serialize for Unit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(Unit::from_label(s.as_deref().unwrap_or("")))
    }
}

/// A serving count, always at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u32")]
pub struct Servings(u32);

impl Servings {
    /// Create a serving count, rejecting zero
    pub fn new(n: u32) -> Option<Self> {
        (n >= 1).then_some(Self(n))
    }

    /// Clamp raw user input to a minimum of one serving
    pub fn clamped(n: i64) -> Self {
        Self(n.clamp(1, i64::from(u32::MAX)) as u32)
    }

    /// The serving count
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Servings {
    fn default() -> Self {
        Self(DEFAULT_SERVINGS)
    }
}

/// Stored values of zero or below read as the default serving count
impl From<i64> for Servings {
    fn from(n: i64) -> Self {
        if n < 1 {
            Self::default()
        } else {
            Self::clamped(n)
        }
    }
}

impl From<Servings> for u32 {
    fn from(s: Servings) -> Self {
        s.0
    }
}

impl fmt::Display for Servings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Servings {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("Invalid serving count: '{}'", s))?;
        Servings::new(n).ok_or_else(|| "Serving count must be at least 1".to_string())
    }
}

/// Result of scaling a quantity
#[derive(Debug, Clone, PartialEq)]
pub enum ScaledQuantity {
    /// Numeric quantity, rounded to two decimals
    Amount(f64),
    /// Descriptive quantity passed through unchanged
    Verbatim(String),
}

impl fmt::Display for ScaledQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaledQuantity::Amount(v) => write!(f, "{}", v),
            ScaledQuantity::Verbatim(text) => f.write_str(text),
        }
    }
}

/// Parse the leading number of a quantity text
///
/// Leading whitespace is skipped and trailing text ignored, so `"12 pinces"`
/// reads as 12. Returns `None` when there is no numeric prefix.
pub fn parse_quantity(text: &str) -> Option<f64> {
    let m = NUMERIC_PREFIX.find(text.trim_start())?;
    m.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Unit-weighted magnitude of an ingredient; unparsable quantities weigh 0
pub fn normalized_magnitude(ingredient: &Ingredient) -> f64 {
    parse_quantity(&ingredient.quantity).unwrap_or(0.0) * ingredient.unit.weight()
}

/// Order ingredients by normalized magnitude, largest first
///
/// The sort is stable: ingredients of equal magnitude keep their input order.
pub fn sort(ingredients: &[Ingredient]) -> Vec<Ingredient> {
    let mut keyed: Vec<(f64, &Ingredient)> = ingredients
        .iter()
        .map(|ing| (normalized_magnitude(ing), ing))
        .collect();
    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    keyed.into_iter().map(|(_, ing)| ing.clone()).collect()
}

/// Rescale a quantity from `base` servings to `target` servings
pub fn scale(quantity: &str, base: Servings, target: Servings) -> ScaledQuantity {
    match parse_quantity(quantity) {
        Some(q) => {
            let result = (q / f64::from(base.get())) * f64::from(target.get());
            ScaledQuantity::Amount(round2(result))
        }
        None => ScaledQuantity::Verbatim(quantity.to_string()),
    }
}

/// Round half away from zero at the second decimal
fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // avoid "-0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ing(quantity: &str, unit: &str, name: &str) -> Ingredient {
        Ingredient::new(quantity, Unit::from_label(unit), name)
    }

    fn servings(n: u32) -> Servings {
        Servings::new(n).unwrap()
    }

    fn names(list: &[Ingredient]) -> Vec<&str> {
        list.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("100"), Some(100.0));
        assert_eq!(parse_quantity("  0.5"), Some(0.5));
        assert_eq!(parse_quantity(".5"), Some(0.5));
        assert_eq!(parse_quantity("12 pincées"), Some(12.0));
        assert_eq!(parse_quantity("1,5"), Some(1.0));
        assert_eq!(parse_quantity("-2"), Some(-2.0));
        assert_eq!(parse_quantity("1e3"), Some(1000.0));
        assert_eq!(parse_quantity("une pincée"), None);
        assert_eq!(parse_quantity(""), None);
        assert_eq!(parse_quantity("."), None);
        assert_eq!(parse_quantity("-"), None);
    }

    #[test]
    fn test_unit_weights() {
        assert_eq!(Unit::Kilogram.weight(), 1000.0);
        assert_eq!(Unit::Liter.weight(), 100.0);
        assert_eq!(Unit::Gram.weight(), 1.0);
        assert_eq!(Unit::Centiliter.weight(), 1.0);
        assert_eq!(Unit::Piece.weight(), 1.0);
        assert_eq!(Unit::None.weight(), 1.0);
        assert_eq!(Unit::from_label("tbsp").weight(), 1.0);
    }

    #[test]
    fn test_unit_labels() {
        for unit in Unit::known() {
            assert_eq!(&Unit::from_label(unit.as_str()), unit);
        }
        assert_eq!(Unit::from_label("KG"), Unit::Kilogram);
        assert_eq!(Unit::from_label("tasse"), Unit::Other("tasse".to_string()));
        assert!(!Unit::from_label("tasse").is_known());
    }

    #[test]
    fn test_sort_by_magnitude() {
        let input = vec![ing("1", "kg", "riz"), ing("200", "g", "sel"), ing("1", "l", "lait")];
        let sorted = sort(&input);
        assert_eq!(names(&sorted), vec!["riz", "sel", "lait"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let input = vec![ing("500", "g", "farine"), ing("500", "g", "sucre")];
        let sorted = sort(&input);
        assert_eq!(names(&sorted), vec!["farine", "sucre"]);
    }

    #[test]
    fn test_sort_unparsable_counts_as_zero() {
        let input = vec![
            ing("une pincée", "", "sel"),
            ing("", "", "poivre"),
            ing("2", "u", "oeufs"),
            ing("0", "g", "levure"),
        ];
        let sorted = sort(&input);
        assert_eq!(names(&sorted), vec!["oeufs", "sel", "poivre", "levure"]);
    }

    #[test]
    fn test_sort_leaves_input_untouched() {
        let input = vec![ing("1", "g", "a"), ing("2", "g", "b")];
        let _ = sort(&input);
        assert_eq!(names(&input), vec!["a", "b"]);
    }

    #[test]
    fn test_scale_examples() {
        assert_eq!(scale("100", servings(4), servings(6)), ScaledQuantity::Amount(150.0));
        assert_eq!(scale("0.1", servings(3), servings(1)), ScaledQuantity::Amount(0.03));
        assert_eq!(scale("0.1", servings(1), servings(3)).to_string(), "0.3");
        assert_eq!(scale("250", servings(4), servings(4)).to_string(), "250");
    }

    #[test]
    fn test_scale_rounds_half_away_from_zero() {
        // 0.125 is exact in binary
        assert_eq!(scale("0.125", servings(1), servings(1)), ScaledQuantity::Amount(0.13));
        assert_eq!(scale("-0.125", servings(1), servings(1)), ScaledQuantity::Amount(-0.13));
    }

    #[test]
    fn test_scale_passes_descriptive_text_through() {
        for text in ["une pincée", "", "à volonté", "q.s."] {
            for (base, target) in [(1, 1), (4, 2), (3, 10)] {
                assert_eq!(
                    scale(text, servings(base), servings(target)),
                    ScaledQuantity::Verbatim(text.to_string())
                );
            }
        }
    }

    #[test]
    fn test_servings_clamp_and_defaults() {
        assert_eq!(Servings::clamped(0).get(), 1);
        assert_eq!(Servings::clamped(-3).get(), 1);
        assert_eq!(Servings::clamped(6).get(), 6);
        assert!(Servings::new(0).is_none());
        assert_eq!(Servings::from(0).get(), DEFAULT_SERVINGS);
        assert!("0".parse::<Servings>().is_err());
        assert_eq!("3".parse::<Servings>().unwrap().get(), 3);
    }

    #[test]
    fn test_servings_serde() {
        let s: Servings = serde_json::from_str("0").unwrap();
        assert_eq!(s, Servings::default());
        let s: Servings = serde_json::from_str("6").unwrap();
        assert_eq!(serde_json::to_string(&s).unwrap(), "6");
    }
}
