//! Search-token generation for partial-text lookup.
//!
//! Rows store a denormalized `search_tokens` array. A query matches a row
//! when every token from [`query_tokens`] is contained in that array, so the
//! tokens written here decide what partial input finds a row:
//!
//! - the whole lower-cased text and each whitespace-separated word;
//! - for Latin words, every prefix of at least [`MIN_PREFIX_LEN`] characters;
//! - for words containing CJK characters, every substring of
//!   1..=[`MAX_CJK_GRAM`] characters (CJK text has no spaces to split on).

use std::collections::HashSet;

/// Shortest prefix emitted for Latin words.
pub const MIN_PREFIX_LEN: usize = 3;
/// Longest substring emitted for CJK words.
pub const MAX_CJK_GRAM: usize = 3;

/// Returns true for characters from CJK scripts.
#[must_use]
pub const fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303F}'   // CJK symbols and punctuation
        | '\u{3040}'..='\u{309F}' // Hiragana
        | '\u{30A0}'..='\u{30FF}' // Katakana
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{AC00}'..='\u{D7AF}' // Hangul syllables
        | '\u{1100}'..='\u{11FF}' // Hangul jamo
        | '\u{F900}'..='\u{FAFF}' // CJK compatibility ideographs
        | '\u{FF00}'..='\u{FFEF}' // halfwidth and fullwidth forms
    )
}

fn has_cjk(word: &str) -> bool {
    word.chars().any(is_cjk)
}

/// Appends tokens while skipping duplicates.
#[derive(Default)]
struct TokenSet {
    seen: HashSet<String>,
    tokens: Vec<String>,
}

impl TokenSet {
    fn push(&mut self, token: &str) {
        if token.is_empty() || self.seen.contains(token) {
            return;
        }
        self.seen.insert(token.to_owned());
        self.tokens.push(token.to_owned());
    }

    fn extend_from_text(&mut self, text: &str) {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return;
        }
        self.push(&normalized);

        for word in normalized.split_whitespace() {
            self.push(word);
            let chars: Vec<char> = word.chars().collect();
            if has_cjk(word) {
                for start in 0..chars.len() {
                    for len in 1..=MAX_CJK_GRAM {
                        if start + len > chars.len() {
                            break;
                        }
                        let gram: String = chars[start..start + len].iter().collect();
                        self.push(&gram);
                    }
                }
            } else {
                for len in MIN_PREFIX_LEN..chars.len() {
                    let prefix: String = chars[..len].iter().collect();
                    self.push(&prefix);
                }
            }
        }
    }
}

/// Tokens for a single text field.
#[must_use]
pub fn search_tokens(text: &str) -> Vec<String> {
    search_tokens_for([text])
}

/// Tokens for several fields, merged in field order without duplicates.
#[must_use]
pub fn search_tokens_for<'a, I>(fields: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut set = TokenSet::default();
    for field in fields {
        set.extend_from_text(field);
    }
    set.tokens
}

/// Tokens for a user: display name and the local part of the email.
#[must_use]
pub fn user_search_tokens(display_name: &str, email: &str) -> Vec<String> {
    let local = email.split('@').next().unwrap_or_default();
    search_tokens_for([display_name, local])
}

/// Tokens a row must contain to match `query`.
///
/// An empty result means no filtering.
#[must_use]
pub fn query_tokens(query: &str) -> Vec<String> {
    let normalized = query.trim().to_lowercase();
    let mut set = TokenSet::default();
    for word in normalized.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        if has_cjk(word) && chars.len() > MAX_CJK_GRAM {
            for window in chars.windows(MAX_CJK_GRAM) {
                let gram: String = window.iter().collect();
                set.push(&gram);
            }
        } else {
            set.push(word);
        }
    }
    set.tokens
}
