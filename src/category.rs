//! Keyword classifier: maps headline text to one topic category.
//!
//! Rules are an ordered table of `(category, regex)` pairs, all case-insensitive.
//! The first rule that matches wins; text matching nothing is `All`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of topic categories shown as tabs in the news feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Trades,
    Signings,
    Injuries,
    Live,
    Rumors,
    Games,
    All,
}

impl Category {
    pub const ALL_VARIANTS: [Category; 7] = [
        Category::Trades,
        Category::Signings,
        Category::Injuries,
        Category::Live,
        Category::Rumors,
        Category::Games,
        Category::All,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Trades => "trades",
            Category::Signings => "signings",
            Category::Injuries => "injuries",
            Category::Live => "live",
            Category::Rumors => "rumors",
            Category::Games => "games",
            Category::All => "all",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Category::ALL_VARIANTS
            .into_iter()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| anyhow::anyhow!("unknown category '{s}'"))
    }
}

// Priority order matters: first match wins.
static RULES: Lazy<Vec<(Category, Regex)>> = Lazy::new(|| {
    [
        (Category::Trades, r"(?i)trade|traded|deal|acquired"),
        (
            Category::Signings,
            r"(?i)signing|signed|agrees|agreed|has signed|re-signed|extension|two-way|10-day",
        ),
        (
            Category::Injuries,
            r"(?i)injury|injured|out|questionable|doubtful|probable|returning",
        ),
        (
            Category::Live,
            r"(?i)Q1|Q2|Q3|Q4|halftime|tipoff|tip-off|timeout|time out|Final\b|\bvs\b",
        ),
        (Category::Rumors, r"(?i)rumor|rumors|sources|reportedly"),
        (Category::Games, r"(?i)game|tonight|final|score|preview|recap"),
    ]
    .into_iter()
    .map(|(cat, pat)| (cat, Regex::new(pat).expect("category rule regex")))
    .collect()
});

/// Classify free text into a category. Empty text is `All`.
pub fn classify(text: &str) -> Category {
    if text.trim().is_empty() {
        return Category::All;
    }
    RULES
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(cat, _)| *cat)
        .unwrap_or(Category::All)
}

/// Same as [`classify`], for upstream fields that may be absent.
pub fn classify_opt(text: Option<&str>) -> Category {
    text.map(classify).unwrap_or(Category::All)
}

/// Category restriction requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// No restriction (`"all"` or absent).
    #[default]
    Any,
    Only(Category),
    /// Unrecognized category name: nothing can match it.
    Nothing,
}

impl CategoryFilter {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => CategoryFilter::Any,
            Some(s) => match s.parse::<Category>() {
                Ok(Category::All) => CategoryFilter::Any,
                Ok(c) => CategoryFilter::Only(c),
                Err(_) => CategoryFilter::Nothing,
            },
        }
    }

    pub fn admits(&self, category: Category) -> bool {
        match self {
            CategoryFilter::Any => true,
            CategoryFilter::Only(c) => *c == category,
            CategoryFilter::Nothing => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_rule_has_a_representative() {
        assert_eq!(classify("76ers acquired a second-round pick"), Category::Trades);
        assert_eq!(classify("Sixers re-signed their backup center"), Category::Signings);
        assert_eq!(classify("Embiid questionable with knee soreness"), Category::Injuries);
        assert_eq!(classify("Halftime: Sixers 58, Celtics 51"), Category::Live);
        assert_eq!(classify("Rumor mill heats up in Philly"), Category::Rumors);
        assert_eq!(classify("Preview: Sixers host the Heat"), Category::Games);
        assert_eq!(classify("Community mailbag"), Category::All);
    }

    #[test]
    fn priority_order_is_respected() {
        assert_eq!(
            classify("Sources say Team A traded Player X"),
            Category::Trades
        );
        // signing beats injury wording
        assert_eq!(
            classify("Maxey signed an extension while injured"),
            Category::Signings
        );
        // rumors beat games
        assert_eq!(classify("Sources: game plan changes"), Category::Rumors);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify("BLOCKBUSTER TRADE"), Category::Trades);
        assert_eq!(classify("q3 underway"), Category::Live);
    }

    #[test]
    fn vs_matches_as_a_word() {
        assert_eq!(classify("Sixers vs Knicks"), Category::Live);
        assert_eq!(classify("Sixers vs. Knicks"), Category::Live);
    }

    #[test]
    fn empty_or_missing_text_is_all() {
        assert_eq!(classify(""), Category::All);
        assert_eq!(classify("   "), Category::All);
        assert_eq!(classify_opt(None), Category::All);
        assert_eq!(classify_opt(Some("")), Category::All);
    }

    #[test]
    fn filter_parsing() {
        assert_eq!(CategoryFilter::from_param(None), CategoryFilter::Any);
        assert_eq!(CategoryFilter::from_param(Some("all")), CategoryFilter::Any);
        assert_eq!(
            CategoryFilter::from_param(Some("Trades")),
            CategoryFilter::Only(Category::Trades)
        );
        let unknown = CategoryFilter::from_param(Some("bloopers"));
        assert_eq!(unknown, CategoryFilter::Nothing);
        assert!(Category::ALL_VARIANTS.iter().all(|c| !unknown.admits(*c)));
    }

    #[test]
    fn serializes_lowercase() {
        let s = serde_json::to_string(&Category::Injuries).unwrap();
        assert_eq!(s, "\"injuries\"");
    }
}
