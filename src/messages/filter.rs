//! Profanity filter for outgoing chat text
//!
//! Matches banned terms as whole words, ignoring case. Terms inside longer
//! words ("badwordish") are left alone.

use crate::{PolypalError, Result};
use regex::{Captures, Regex};
use tracing::debug;

pub const DEFAULT_BANNED_TERMS: &[&str] = &["badword", "anotherbadword", "offensiveword"];
pub const DEFAULT_MASK_CHAR: char = '*';

#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    pattern: Option<Regex>,
    term_count: usize,
    mask_char: char,
}

impl ProfanityFilter {
    /// Build a filter from a banned-term list
    ///
    /// # Errors
    /// Returns a configuration error if the combined pattern cannot be compiled
    pub fn new<I, S>(terms: I, mask_char: char) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        terms.sort();
        terms.dedup();
        // Longest first so overlapping alternatives prefer the full term
        terms.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));

        let pattern = if terms.is_empty() {
            None
        } else {
            let alternatives = terms
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            let regex = Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)).map_err(|e| {
                PolypalError::ConfigError(format!("Invalid banned term list: {}", e))
            })?;
            Some(regex)
        };

        debug!("Profanity filter loaded with {} terms", terms.len());

        Ok(Self {
            pattern,
            term_count: terms.len(),
            mask_char,
        })
    }

    /// Number of distinct banned terms, ignoring case
    pub fn term_count(&self) -> usize {
        self.term_count
    }

    pub fn contains_banned(&self, text: &str) -> bool {
        self.pattern
            .as_ref()
            .map(|re| re.is_match(text))
            .unwrap_or(false)
    }

    /// Replace each banned word with a run of mask characters of equal length
    pub fn mask(&self, text: &str) -> String {
        match &self.pattern {
            Some(re) => re
                .replace_all(text, |caps: &Captures| {
                    self.mask_char.to_string().repeat(caps[0].chars().count())
                })
                .into_owned(),
            None => text.to_string(),
        }
    }
}

impl Default for ProfanityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_BANNED_TERMS.iter(), DEFAULT_MASK_CHAR).unwrap_or(Self {
            pattern: None,
            term_count: 0,
            mask_char: DEFAULT_MASK_CHAR,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ProfanityFilter {
        ProfanityFilter::new(DEFAULT_BANNED_TERMS.iter(), DEFAULT_MASK_CHAR).unwrap()
    }

    #[test]
    fn test_masks_whole_word_only() {
        let f = filter();
        let masked = f.mask("badword is bad");
        assert_eq!(masked, "******* is bad");
        assert_eq!(masked.len(), "badword is bad".len());
    }

    #[test]
    fn test_ignores_substrings() {
        let f = filter();
        assert!(!f.contains_banned("badwordish"));
        assert_eq!(f.mask("badwordish"), "badwordish");
    }

    #[test]
    fn test_case_insensitive() {
        let f = filter();
        assert!(f.contains_banned("BadWord"));
        assert_eq!(f.mask("You BADWORD!"), "You *******!");
    }

    #[test]
    fn test_masks_every_occurrence() {
        let f = filter();
        assert_eq!(
            f.mask("badword, offensiveword and anotherbadword"),
            "*******, ************* and **************"
        );
    }

    #[test]
    fn test_terms_are_escaped() {
        let f = ProfanityFilter::new(["a.b"], '#').unwrap();
        assert!(f.contains_banned("say a.b now"));
        assert!(!f.contains_banned("say axb now"));
        assert_eq!(f.mask("a.b"), "###");
    }

    #[test]
    fn test_duplicate_terms_collapse_across_case() {
        let f = ProfanityFilter::new(["BadWord", "x", "badword", "yy", "badword "], '*').unwrap();
        assert_eq!(f.term_count(), 3);
        assert_eq!(f.mask("BADWORD x"), "******* *");
    }

    #[test]
    fn test_empty_list_never_matches() {
        let f = ProfanityFilter::new(Vec::<String>::new(), '*').unwrap();
        assert_eq!(f.term_count(), 0);
        assert!(!f.contains_banned("badword"));
        assert_eq!(f.mask("badword"), "badword");
    }

    #[test]
    fn test_default_matches_default_terms() {
        let f = ProfanityFilter::default();
        for term in DEFAULT_BANNED_TERMS {
            assert!(f.contains_banned(term));
        }
    }
}
