//! Expense categorisation by vendor keyword
//!
//! A fixed keyword list per category, scanned in declaration order
//! (meals, travel, accommodation). The first keyword found as a
//! case-insensitive substring of the vendor/description decides the
//! category; nothing found means [`ExpenseCategory::Other`].
//!
//! Keywords of [`WORD_MATCH_MAX_CHARS`] characters or fewer ("pub", "bus",
//! "cab") only match as whole words, so "Public" or "Business" never hit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Keywords this short must be bounded by non-alphanumerics on both sides
pub const WORD_MATCH_MAX_CHARS: usize = 5;

/// Expense category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Meals,
    Travel,
    Accommodation,
    Other,
}

const MEALS_KEYWORDS: &[&str] = &[
    "restaurant",
    "cafe",
    "café",
    "coffee",
    "starbucks",
    "costa",
    "pret",
    "greggs",
    "mcdonald",
    "burger",
    "pizza",
    "nando",
    "wagamama",
    "deliveroo",
    "just eat",
    "uber eats",
    "bistro",
    "brasserie",
    "kitchen",
    "diner",
    "bakery",
    "pub",
    "tavern",
    "sandwich",
    "lunch",
    "dinner",
    "breakfast",
    "meal",
    "food",
];

const TRAVEL_KEYWORDS: &[&str] = &[
    "uber",
    "taxi",
    "cab",
    "trainline",
    "rail",
    "train",
    "lner",
    "avanti",
    "tfl",
    "transport for london",
    "public transport",
    "transport",
    "oyster",
    "bus",
    "coach",
    "national express",
    "airline",
    "airways",
    "easyjet",
    "ryanair",
    "jet2",
    "flight",
    "airport",
    "parking",
    "ncp",
    "petrol",
    "fuel",
    "shell",
    "esso",
    "texaco",
    "car hire",
    "hertz",
    "enterprise rent",
    "toll",
];

const ACCOMMODATION_KEYWORDS: &[&str] = &[
    "hotel",
    "premier inn",
    "travelodge",
    "holiday inn",
    "hilton",
    "marriott",
    "radisson",
    "novotel",
    "ibis",
    "hostel",
    "airbnb",
    "booking.com",
    "expedia",
    "b&b",
    "bed and breakfast",
    "guest house",
    "guesthouse",
    "lodge",
    "accommodation",
];

impl ExpenseCategory {
    /// All categories, in scan order followed by the fallback
    pub const ALL: [ExpenseCategory; 4] = [
        ExpenseCategory::Meals,
        ExpenseCategory::Travel,
        ExpenseCategory::Accommodation,
        ExpenseCategory::Other,
    ];

    /// Lower-case name used in the database and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Meals => "meals",
            ExpenseCategory::Travel => "travel",
            ExpenseCategory::Accommodation => "accommodation",
            ExpenseCategory::Other => "other",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            ExpenseCategory::Meals => MEALS_KEYWORDS,
            ExpenseCategory::Travel => TRAVEL_KEYWORDS,
            ExpenseCategory::Accommodation => ACCOMMODATION_KEYWORDS,
            ExpenseCategory::Other => &[],
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "meals" => Ok(ExpenseCategory::Meals),
            "travel" => Ok(ExpenseCategory::Travel),
            "accommodation" => Ok(ExpenseCategory::Accommodation),
            "other" => Ok(ExpenseCategory::Other),
            other => Err(Error::InvalidInput(format!(
                "Unknown expense category: {other:?} (expected meals, travel, accommodation or other)"
            ))),
        }
    }
}

/// Categorise an expense from its vendor and optional description
pub fn categorize(vendor: &str, description: Option<&str>) -> ExpenseCategory {
    let haystack = match description {
        Some(desc) => format!("{} {}", vendor, desc),
        None => vendor.to_string(),
    }
    .to_lowercase();

    ExpenseCategory::ALL
        .iter()
        .copied()
        .find(|category| {
            category
                .keywords()
                .iter()
                .any(|keyword| contains_keyword(&haystack, keyword))
        })
        .unwrap_or(ExpenseCategory::Other)
}

fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    if keyword.chars().count() > WORD_MATCH_MAX_CHARS {
        return haystack.contains(keyword);
    }

    haystack.match_indices(keyword).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + keyword.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meals_vendor() {
        assert_eq!(categorize("Pret A Manger", None), ExpenseCategory::Meals);
        assert_eq!(categorize("STARBUCKS 1234", None), ExpenseCategory::Meals);
    }

    #[test]
    fn test_travel_vendor() {
        assert_eq!(categorize("Trainline.com", None), ExpenseCategory::Travel);
        assert_eq!(categorize("easyJet", Some("LGW-EDI")), ExpenseCategory::Travel);
    }

    #[test]
    fn test_accommodation_vendor() {
        assert_eq!(categorize("Travelodge Manchester", None), ExpenseCategory::Accommodation);
        assert_eq!(categorize("Airbnb", None), ExpenseCategory::Accommodation);
    }

    #[test]
    fn test_description_is_scanned() {
        assert_eq!(
            categorize("ACME Ltd", Some("Team lunch with client")),
            ExpenseCategory::Meals
        );
    }

    #[test]
    fn test_first_category_in_scan_order_wins() {
        // "hotel" (accommodation) and "restaurant" (meals) both match
        assert_eq!(
            categorize("Grand Hotel Restaurant", None),
            ExpenseCategory::Meals
        );
    }

    #[test]
    fn test_unmatched_is_other() {
        assert_eq!(categorize("Staples", Some("printer paper")), ExpenseCategory::Other);
    }

    #[test]
    fn test_short_keywords_need_word_boundaries() {
        assert_eq!(categorize("Public transport ticket", None), ExpenseCategory::Travel);
        assert_eq!(categorize("Vistaprint", Some("Business cards")), ExpenseCategory::Other);
        assert_eq!(categorize("Interpreter services Ltd", None), ExpenseCategory::Other);
        assert_eq!(categorize("Filing cabinet", None), ExpenseCategory::Other);
        assert_eq!(categorize("Trail running shoes", None), ExpenseCategory::Other);
        assert_eq!(categorize("Shopping trolley", None), ExpenseCategory::Other);
    }

    #[test]
    fn test_short_keywords_still_match_whole_words() {
        assert_eq!(categorize("The Red Lion Pub", None), ExpenseCategory::Meals);
        assert_eq!(categorize("Nando's", None), ExpenseCategory::Meals);
        assert_eq!(categorize("Stagecoach", Some("Bus fare")), ExpenseCategory::Travel);
        assert_eq!(categorize("M6 Toll", None), ExpenseCategory::Travel);
        assert_eq!(categorize("Guest stay", Some("B&B")), ExpenseCategory::Accommodation);
    }

    #[test]
    fn test_parse_category() {
        assert_eq!("Travel".parse::<ExpenseCategory>().unwrap(), ExpenseCategory::Travel);
        assert!("groceries".parse::<ExpenseCategory>().is_err());
    }
}
