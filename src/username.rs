use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::LookupError;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{1,16}$").expect("username pattern compiles"));

/// Returns true when `input` is 1-16 ASCII letters, digits or underscores.
pub fn is_valid_username(input: &str) -> bool {
    USERNAME_RE.is_match(input)
}

/// A username that has passed [`is_valid_username`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    pub fn parse(input: &str) -> Result<Self, LookupError> {
        if is_valid_username(input) {
            Ok(Self(input.to_string()))
        } else {
            Err(LookupError::ValidationRejected(input.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_names_within_bounds() {
        for name in ["a", "Notch", "jeb_", "___", "0123456789abcdef", "A_b_C_1"] {
            assert!(is_valid_username(name), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_empty_and_overlong() {
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("0123456789abcdefg"));
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        for name in ["with space", "dash-name", "dot.name", "tab\t", "Notch\n", "ünïcode", "名前"] {
            assert!(!is_valid_username(name), "{name:?} should be rejected");
        }
    }

    #[test]
    fn validator_matches_character_rule_exhaustively_for_short_inputs() {
        let alphabet = ['a', 'Z', '5', '_', '-', ' ', 'é', '!'];
        for first in alphabet {
            for second in alphabet {
                let candidate: String = [first, second].iter().collect();
                let expected = candidate
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
                assert_eq!(is_valid_username(&candidate), expected, "{candidate:?}");
            }
        }
    }

    #[test]
    fn parse_reports_rejected_input() {
        let err = Username::parse("bad name").expect_err("space is rejected");
        assert_eq!(err, LookupError::ValidationRejected("bad name".into()));
        assert_eq!(Username::parse("Notch").unwrap().as_str(), "Notch");
    }
}
