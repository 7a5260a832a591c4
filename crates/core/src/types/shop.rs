//! Shop listing types.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geo::{GeoError, GeoPoint};
use crate::search;

/// Maximum shop name length in characters.
pub const MAX_NAME_LENGTH: usize = 200;
/// Maximum number of opening periods per day.
pub const MAX_PERIODS_PER_DAY: usize = 6;
/// Maximum number of tags per shop.
pub const MAX_TAGS: usize = 20;

/// UTC offset of countries that use one time zone and no daylight saving.
///
/// Shops elsewhere get no open/closed indicator.
#[must_use]
pub fn fixed_utc_offset(country: &str) -> Option<FixedOffset> {
    let hours = match country.trim().to_ascii_uppercase().as_str() {
        "JP" | "KR" => 9,
        "CN" | "TW" | "HK" | "MO" | "SG" | "MY" | "PH" => 8,
        "TH" | "VN" => 7,
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}

/// Validation errors for shop input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShopError {
    #[error("shop name is required")]
    EmptyName,
    #[error("shop name must be at most {} characters", MAX_NAME_LENGTH)]
    NameTooLong,
    #[error("address is required")]
    EmptyAddress,
    #[error("country must be a two-letter ISO code (got {0:?})")]
    InvalidCountry(String),
    #[error(transparent)]
    Location(#[from] GeoError),
    #[error("{day} has more than {} opening periods", MAX_PERIODS_PER_DAY)]
    TooManyPeriods { day: DayOfWeek },
    #[error("{day} has a period that opens and closes at the same time")]
    EmptyPeriod { day: DayOfWeek },
    #[error("at most {} tags are allowed", MAX_TAGS)]
    TooManyTags,
}

/// Day of the week used as a business-hours key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// The day before this one.
    #[must_use]
    pub const fn previous(self) -> Self {
        match self {
            Self::Monday => Self::Sunday,
            Self::Tuesday => Self::Monday,
            Self::Wednesday => Self::Tuesday,
            Self::Thursday => Self::Wednesday,
            Self::Friday => Self::Thursday,
            Self::Saturday => Self::Friday,
            Self::Sunday => Self::Saturday,
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

impl std::fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        };
        f.write_str(name)
    }
}

/// One opening period, `HH:MM` to `HH:MM` local time.
///
/// A `close` at or before `open` means the period runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
}

impl Period {
    /// Returns true if the period runs past midnight.
    #[must_use]
    pub fn crosses_midnight(&self) -> bool {
        self.close <= self.open
    }
}

/// Weekly opening hours. Days missing from the map are closed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusinessHours(BTreeMap<DayOfWeek, Vec<Period>>);

impl BusinessHours {
    /// Create empty (always closed) hours.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a period to a day, keeping insertion order.
    pub fn push(&mut self, day: DayOfWeek, period: Period) {
        self.0.entry(day).or_default().push(period);
    }

    /// Periods for a day (empty if closed).
    #[must_use]
    pub fn periods(&self, day: DayOfWeek) -> &[Period] {
        self.0.get(&day).map_or(&[], Vec::as_slice)
    }

    /// Check period counts and reject zero-length periods.
    ///
    /// # Errors
    ///
    /// Returns `ShopError` naming the first offending day.
    pub fn validate(&self) -> Result<(), ShopError> {
        for (day, periods) in &self.0 {
            if periods.len() > MAX_PERIODS_PER_DAY {
                return Err(ShopError::TooManyPeriods { day: *day });
            }
            if periods.iter().any(|p| p.open == p.close) {
                return Err(ShopError::EmptyPeriod { day: *day });
            }
        }
        Ok(())
    }

    /// Returns true if the shop is open at the given local time.
    ///
    /// Overnight periods from the previous day are taken into account.
    #[must_use]
    pub fn is_open_at(&self, at: NaiveDateTime) -> bool {
        let day = DayOfWeek::from(at.weekday());
        let time = at.time();

        let today = self.periods(day).iter().any(|p| {
            if p.crosses_midnight() {
                time >= p.open
            } else {
                time >= p.open && time < p.close
            }
        });

        today
            || self
                .periods(day.previous())
                .iter()
                .any(|p| p.crosses_midnight() && time < p.close)
    }

    /// Returns true if no day has any period, i.e. hours are unknown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Whether a shop in `country` is open at `now`.
    ///
    /// `None` when the hours are unknown or the country's local time can't
    /// be derived from a fixed offset.
    #[must_use]
    pub fn open_at_instant(&self, country: &str, now: DateTime<Utc>) -> Option<bool> {
        if self.is_empty() {
            return None;
        }
        let offset = fixed_utc_offset(country)?;
        Some(self.is_open_at(now.with_timezone(&offset).naive_local()))
    }

    /// Drop days with no periods.
    #[must_use]
    fn compact(mut self) -> Self {
        self.0.retain(|_, periods| !periods.is_empty());
        self
    }
}

/// Shop input as submitted from the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopDraft {
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
    pub country: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub business_hours: BusinessHours,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub google_place_id: Option<String>,
}

impl ShopDraft {
    /// Validate the draft and return its normalized form.
    ///
    /// Trims text fields, upper-cases the country, normalizes tags, and turns
    /// blank optional strings into `None`.
    ///
    /// # Errors
    ///
    /// Returns the first `ShopError` found.
    pub fn normalize(self) -> Result<Self, ShopError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(ShopError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(ShopError::NameTooLong);
        }

        let address = self.address.trim().to_owned();
        if address.is_empty() {
            return Err(ShopError::EmptyAddress);
        }

        let country = self.country.trim().to_ascii_uppercase();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ShopError::InvalidCountry(self.country));
        }

        self.location.validate()?;
        self.business_hours.validate()?;

        let tags = normalize_tags(&self.tags);
        if tags.len() > MAX_TAGS {
            return Err(ShopError::TooManyTags);
        }

        Ok(Self {
            name,
            address,
            location: self.location,
            country,
            region: non_blank(self.region),
            business_hours: self.business_hours.compact(),
            tags,
            google_place_id: non_blank(self.google_place_id),
        })
    }

    /// Search tokens for this shop (name, address, region, tags).
    #[must_use]
    pub fn search_tokens(&self) -> Vec<String> {
        let mut fields: Vec<&str> = vec![&self.name, &self.address];
        if let Some(region) = &self.region {
            fields.push(region);
        }
        fields.extend(self.tags.iter().map(String::as_str));
        search::search_tokens_for(fields)
    }
}

/// Trim, lower-case, de-duplicate and drop empty tags, keeping first-seen order.
#[must_use]
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(s.trim(), FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn period(open: &str, close: &str) -> Period {
        Period {
            open: NaiveTime::parse_from_str(open, "%H:%M").unwrap(),
            close: NaiveTime::parse_from_str(close, "%H:%M").unwrap(),
        }
    }

    fn draft() -> ShopDraft {
        ShopDraft {
            name: "  Menya Kaiju ".to_owned(),
            address: "1-2-3 Shinjuku, Tokyo".to_owned(),
            location: GeoPoint {
                lat: 35.69,
                lng: 139.70,
            },
            country: "jp".to_owned(),
            region: Some("  ".to_owned()),
            business_hours: BusinessHours::new(),
            tags: vec!["Tonkotsu".to_owned(), " tonkotsu".to_owned(), String::new()],
            google_place_id: Some(String::new()),
        }
    }

    #[test]
    fn test_normalize_trims_and_cleans() {
        let shop = draft().normalize().unwrap();
        assert_eq!(shop.name, "Menya Kaiju");
        assert_eq!(shop.country, "JP");
        assert_eq!(shop.region, None);
        assert_eq!(shop.tags, vec!["tonkotsu"]);
        assert_eq!(shop.google_place_id, None);
    }

    #[test]
    fn test_normalize_rejects_invalid() {
        let mut bad = draft();
        bad.name = "   ".to_owned();
        assert_eq!(bad.normalize(), Err(ShopError::EmptyName));

        let mut bad = draft();
        bad.country = "JPN".to_owned();
        assert!(matches!(bad.normalize(), Err(ShopError::InvalidCountry(_))));

        let mut bad = draft();
        bad.location.lat = 120.0;
        assert!(matches!(bad.normalize(), Err(ShopError::Location(_))));
    }

    #[test]
    fn test_business_hours_json_shape() {
        let mut hours = BusinessHours::new();
        hours.push(DayOfWeek::Monday, period("11:00", "15:00"));
        hours.push(DayOfWeek::Monday, period("18:00", "22:30"));

        let json = serde_json::to_value(&hours).unwrap();
        assert_eq!(json["monday"][1]["close"], "22:30");

        let back: BusinessHours = serde_json::from_value(json).unwrap();
        assert_eq!(back, hours);
    }

    #[test]
    fn test_zero_length_period_rejected() {
        let mut hours = BusinessHours::new();
        hours.push(DayOfWeek::Friday, period("12:00", "12:00"));
        assert_eq!(
            hours.validate(),
            Err(ShopError::EmptyPeriod {
                day: DayOfWeek::Friday
            })
        );
    }

    #[test]
    fn test_is_open_at_handles_overnight_periods() {
        let mut hours = BusinessHours::new();
        hours.push(DayOfWeek::Friday, period("11:00", "14:00"));
        hours.push(DayOfWeek::Friday, period("20:00", "02:00"));

        // 2026-10-16 is a Friday.
        let friday = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let saturday = friday.succ_opt().unwrap();

        assert!(hours.is_open_at(friday.and_hms_opt(12, 0, 0).unwrap()));
        assert!(!hours.is_open_at(friday.and_hms_opt(15, 0, 0).unwrap()));
        assert!(hours.is_open_at(friday.and_hms_opt(23, 30, 0).unwrap()));
        assert!(hours.is_open_at(saturday.and_hms_opt(1, 30, 0).unwrap()));
        assert!(!hours.is_open_at(saturday.and_hms_opt(2, 0, 0).unwrap()));
    }

    #[test]
    fn test_open_at_instant_uses_country_offset() {
        let mut hours = BusinessHours::new();
        hours.push(DayOfWeek::Friday, period("11:00", "14:00"));

        // 02:30 UTC on Friday 2026-10-16 is 11:30 in Tokyo, 10:30 in Taipei.
        let now = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap()
            .and_utc();
        assert_eq!(hours.open_at_instant("JP", now), Some(true));
        assert_eq!(hours.open_at_instant("tw", now), Some(false));
        assert_eq!(hours.open_at_instant("US", now), None);
        assert_eq!(BusinessHours::new().open_at_instant("JP", now), None);
    }

    #[test]
    fn test_search_tokens_cover_tags() {
        let shop = draft().normalize().unwrap();
        let tokens = shop.search_tokens();
        assert!(tokens.contains(&"menya kaiju".to_owned()));
        assert!(tokens.contains(&"kai".to_owned()));
        assert!(tokens.contains(&"tonkotsu".to_owned()));
    }
}
