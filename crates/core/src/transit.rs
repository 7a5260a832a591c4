//! Rules for the nearest-station lookup.

/// Nearby stations inspected per lookup.
pub const MAX_CANDIDATES: usize = 5;
/// Stations returned at most.
pub const MAX_RESULTS: usize = 3;
/// Longest walk accepted, in minutes.
pub const MAX_WALKING_MINUTES: u32 = 20;

/// Walking time in whole minutes, rounded up.
#[must_use]
pub fn walking_minutes(seconds: u32) -> u32 {
    seconds.div_ceil(60)
}

/// Returns true if a walk of `seconds` is short enough to list.
#[must_use]
pub fn within_walking_limit(seconds: u32) -> bool {
    walking_minutes(seconds) <= MAX_WALKING_MINUTES
}

/// Response language for the Google web services by shop country.
#[must_use]
pub fn language_for_country(country: &str) -> &'static str {
    match country.trim().to_ascii_uppercase().as_str() {
        "JP" => "ja",
        "KR" => "ko",
        "TW" => "zh-TW",
        "CN" => "zh-CN",
        _ => "en",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walking_minutes_rounds_up() {
        assert_eq!(walking_minutes(0), 0);
        assert_eq!(walking_minutes(60), 1);
        assert_eq!(walking_minutes(61), 2);
        assert!(within_walking_limit(1200));
        assert!(!within_walking_limit(1201));
    }

    #[test]
    fn test_language_for_country() {
        assert_eq!(language_for_country("jp"), "ja");
        assert_eq!(language_for_country("TW"), "zh-TW");
        assert_eq!(language_for_country("US"), "en");
        assert_eq!(language_for_country(""), "en");
    }
}
