use uuid::Uuid;

use crate::lookup::LookupResult;

pub const NOT_FOUND_MESSAGE: &str = "User not found";
pub const ERROR_MESSAGE: &str = "An error occurred";

/// The three strings shown to the user after a lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayFields {
    pub name: String,
    pub id: String,
    pub legacy: String,
}

impl DisplayFields {
    fn message(text: &str) -> Self {
        Self {
            name: text.to_string(),
            id: String::new(),
            legacy: String::new(),
        }
    }

    pub fn not_found() -> Self {
        Self::message(NOT_FOUND_MESSAGE)
    }

    pub fn error() -> Self {
        Self::message(ERROR_MESSAGE)
    }
}

/// Render a lookup outcome, applying the separator preference to the identifier.
pub fn render(result: &LookupResult, dashes: bool) -> DisplayFields {
    match result {
        LookupResult::Found(profile) => {
            let id = if dashes {
                match format_separated(&profile.id) {
                    Some(formatted) => formatted,
                    None => return DisplayFields::error(),
                }
            } else {
                profile.id.clone()
            };
            DisplayFields {
                name: profile.name.clone(),
                id,
                legacy: if profile.legacy { "Yes" } else { "No" }.to_string(),
            }
        }
        LookupResult::NotFound => DisplayFields::not_found(),
        LookupResult::Error => DisplayFields::error(),
    }
}

/// Group the leading 32 hex digits of `raw` as 8-4-4-4-12, lowercase.
///
/// Returns `None` when `raw` does not start with 32 hexadecimal digits.
pub fn format_separated(raw: &str) -> Option<String> {
    let digits = raw.get(..32)?;
    if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    Uuid::try_parse(digits)
        .ok()
        .map(|uuid| uuid.hyphenated().to_string())
}

pub fn strip_separators(formatted: &str) -> String {
    formatted.chars().filter(|ch| *ch != '-').collect()
}
