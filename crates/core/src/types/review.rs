//! Review types: visit metadata, ordered items and scores.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ShopId;
use super::price::Price;
use super::role::ReservationType;
use crate::search;

/// Largest accepted party size.
pub const MAX_PARTY_SIZE: i16 = 20;
/// Maximum length of review notes in characters.
pub const MAX_NOTES_LENGTH: usize = 5000;
/// Upper bound of every score.
pub const MAX_SCORE: f64 = 100.0;

/// Validation errors for review input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReviewError {
    #[error("party size must be between 1 and {}", MAX_PARTY_SIZE)]
    PartySize,
    #[error("at least one ramen item is required")]
    NoRamenItem,
    #[error("item name is required")]
    EmptyItemName,
    #[error("price of {0:?} cannot be negative")]
    NegativePrice(String),
    #[error("{field} score must be between 0 and {}", MAX_SCORE)]
    ScoreOutOfRange { field: &'static str },
    #[error("notes must be at most {} characters", MAX_NOTES_LENGTH)]
    NotesTooLong,
}

/// Whether an ordered item is a bowl of ramen or a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Ramen,
    Side,
}

/// One ordered item, kept in the order the reviewer listed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub kind: ItemKind,
    pub name: String,
    #[serde(default)]
    pub price: Option<Price>,
}

/// Sub-scores and the overall score, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    #[serde(default)]
    pub soup: Option<f64>,
    #[serde(default)]
    pub noodles: Option<f64>,
    #[serde(default)]
    pub toppings: Option<f64>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub atmosphere: Option<f64>,
    #[serde(default)]
    pub overall: Option<f64>,
}

impl Scores {
    fn named(&self) -> [(&'static str, Option<f64>); 7] {
        [
            ("soup", self.soup),
            ("noodles", self.noodles),
            ("toppings", self.toppings),
            ("balance", self.balance),
            ("value", self.value),
            ("atmosphere", self.atmosphere),
            ("overall", self.overall),
        ]
    }

    /// Check that every set score is within range.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::ScoreOutOfRange` naming the first bad field.
    pub fn validate(&self) -> Result<(), ReviewError> {
        for (field, score) in self.named() {
            if let Some(v) = score
                && !(v.is_finite() && (0.0..=MAX_SCORE).contains(&v))
            {
                return Err(ReviewError::ScoreOutOfRange { field });
            }
        }
        Ok(())
    }

    /// Mean of the set sub-scores, rounded to one decimal place.
    ///
    /// Returns `None` if no sub-score is set.
    #[must_use]
    pub fn average(&self) -> Option<f64> {
        let set: Vec<f64> = self
            .named()
            .iter()
            .filter(|(field, _)| *field != "overall")
            .filter_map(|(_, score)| *score)
            .collect();
        if set.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)] // at most six values
        let mean = set.iter().sum::<f64>() / set.len() as f64;
        Some((mean * 10.0).round() / 10.0)
    }

    /// Fill in `overall` from the sub-scores when it was left unset.
    #[must_use]
    pub fn resolved(mut self) -> Self {
        if self.overall.is_none() {
            self.overall = self.average();
        }
        self
    }
}

/// Review input as submitted by a reviewer or an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub shop_id: ShopId,
    pub visit_date: NaiveDate,
    #[serde(default = "default_party_size")]
    pub party_size: i16,
    #[serde(default)]
    pub reservation: ReservationType,
    pub items: Vec<ReviewItem>,
    #[serde(default)]
    pub scores: Scores,
    #[serde(default)]
    pub notes: String,
}

const fn default_party_size() -> i16 {
    1
}

impl ReviewDraft {
    /// Validate the draft and return its normalized form.
    ///
    /// Item names and notes are trimmed and a missing overall score is
    /// filled from the sub-scores.
    ///
    /// # Errors
    ///
    /// Returns the first `ReviewError` found.
    pub fn normalize(self) -> Result<Self, ReviewError> {
        if !(1..=MAX_PARTY_SIZE).contains(&self.party_size) {
            return Err(ReviewError::PartySize);
        }

        let mut items = Vec::with_capacity(self.items.len());
        for item in self.items {
            let name = item.name.trim().to_owned();
            if name.is_empty() {
                return Err(ReviewError::EmptyItemName);
            }
            if item.price.is_some_and(|p| p.is_negative()) {
                return Err(ReviewError::NegativePrice(name));
            }
            items.push(ReviewItem {
                kind: item.kind,
                name,
                price: item.price,
            });
        }
        if !items.iter().any(|i| i.kind == ItemKind::Ramen) {
            return Err(ReviewError::NoRamenItem);
        }

        self.scores.validate()?;

        let notes = self.notes.trim().to_owned();
        if notes.chars().count() > MAX_NOTES_LENGTH {
            return Err(ReviewError::NotesTooLong);
        }

        Ok(Self {
            shop_id: self.shop_id,
            visit_date: self.visit_date,
            party_size: self.party_size,
            reservation: self.reservation,
            items,
            scores: self.scores.resolved(),
            notes,
        })
    }

    /// Search tokens for this review (shop name, item names, notes).
    #[must_use]
    pub fn search_tokens(&self, shop_name: &str) -> Vec<String> {
        let mut fields: Vec<&str> = vec![shop_name];
        fields.extend(self.items.iter().map(|i| i.name.as_str()));
        fields.push(&self.notes);
        search::search_tokens_for(fields)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::CurrencyCode;

    fn draft() -> ReviewDraft {
        ReviewDraft {
            shop_id: ShopId::new(1),
            visit_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            party_size: 2,
            reservation: ReservationType::NumberedTicket,
            items: vec![
                ReviewItem {
                    kind: ItemKind::Ramen,
                    name: " Shoyu Ramen ".to_owned(),
                    price: Some(Price::new(Decimal::new(1200, 0), CurrencyCode::JPY)),
                },
                ReviewItem {
                    kind: ItemKind::Side,
                    name: "Gyoza".to_owned(),
                    price: None,
                },
            ],
            scores: Scores {
                soup: Some(90.0),
                noodles: Some(85.0),
                toppings: Some(80.0),
                ..Scores::default()
            },
            notes: "  Rich broth.  ".to_owned(),
        }
    }

    #[test]
    fn test_overall_is_averaged_when_unset() {
        let review = draft().normalize().unwrap();
        assert_eq!(review.scores.overall, Some(85.0));
        assert_eq!(review.items[0].name, "Shoyu Ramen");
        assert_eq!(review.notes, "Rich broth.");
    }

    #[test]
    fn test_explicit_overall_is_kept() {
        let mut d = draft();
        d.scores.overall = Some(70.0);
        assert_eq!(d.normalize().unwrap().scores.overall, Some(70.0));
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        let scores = Scores {
            soup: Some(90.0),
            noodles: Some(85.0),
            value: Some(81.0),
            ..Scores::default()
        };
        assert_eq!(scores.average(), Some(85.3));
        assert_eq!(Scores::default().average(), None);
        assert_eq!(Scores::default().resolved().overall, None);
    }

    #[test]
    fn test_item_order_is_preserved() {
        let review = draft().normalize().unwrap();
        let names: Vec<_> = review.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Shoyu Ramen", "Gyoza"]);
    }

    #[test]
    fn test_validation_errors() {
        let mut d = draft();
        d.party_size = 0;
        assert_eq!(d.normalize(), Err(ReviewError::PartySize));

        let mut d = draft();
        d.items.retain(|i| i.kind == ItemKind::Side);
        assert_eq!(d.normalize(), Err(ReviewError::NoRamenItem));

        let mut d = draft();
        d.scores.soup = Some(101.0);
        assert_eq!(
            d.normalize(),
            Err(ReviewError::ScoreOutOfRange { field: "soup" })
        );

        let mut d = draft();
        d.items[1].price = Some(Price::new(Decimal::new(-5, 0), CurrencyCode::JPY));
        assert!(matches!(d.normalize(), Err(ReviewError::NegativePrice(_))));
    }

    #[test]
    fn test_search_tokens_include_shop_and_items() {
        let review = draft().normalize().unwrap();
        let tokens = review.search_tokens("Menya Kaiju");
        assert!(tokens.contains(&"menya".to_owned()));
        assert!(tokens.contains(&"shoyu".to_owned()));
        assert!(tokens.contains(&"gyo".to_owned()));
    }
}
