//! Request field validation. Errors are collected per field so a single
//! response can report every problem at once.

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de::IgnoredAny, Deserialize};
use uuid::Uuid;

use crate::error::{AppError, FieldErrors, Result};

pub const MIN_RELEASE_YEAR: i32 = 1900;
pub const MIN_STARS: i32 = 1;
pub const MAX_STARS: i32 = 5;
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email regex compiles")
});

/// Parses a path id. Anything that is not a UUID is a 400, before any lookup.
pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest("Invalid ID format".to_string()))
}

pub fn max_release_year() -> i32 {
    Utc::now().year() + 1
}

/// Accumulates field errors across one request.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Trimmed, non-empty text. Records `message` and returns `None` otherwise.
    pub fn required_text(&mut self, field: &str, value: Option<String>, message: &str) -> Option<String> {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.add(field, message);
                None
            }
        }
    }

    /// For partial updates: absent stays absent, present must be non-empty.
    pub fn optional_text(&mut self, field: &str, value: Option<String>, message: &str) -> Option<String> {
        match value {
            None => None,
            Some(v) => self.required_text(field, Some(v), message),
        }
    }

    /// Coerces a loosely typed number, recording `<label> must be a whole
    /// number` when it does not hold one.
    pub fn whole_number(&mut self, field: &str, value: &NumberInput, label: &str) -> Option<i32> {
        let number = value.as_i32();
        if number.is_none() {
            self.add(field, format!("{} must be a whole number", label));
        }
        number
    }

    pub fn release_year(&mut self, field: &str, year: i32) -> Option<i32> {
        let max = max_release_year();
        if year < MIN_RELEASE_YEAR {
            self.add(field, format!("Year must be at least {}", MIN_RELEASE_YEAR));
            None
        } else if year > max {
            self.add(field, format!("Year must be at most {}", max));
            None
        } else {
            Some(year)
        }
    }

    pub fn stars(&mut self, field: &str, stars: i32) -> Option<i32> {
        if (MIN_STARS..=MAX_STARS).contains(&stars) {
            Some(stars)
        } else {
            self.add(
                field,
                format!("Stars must be between {} and {}", MIN_STARS, MAX_STARS),
            );
            None
        }
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

/// A numeric field as clients actually send it: a JSON number, a numeric
/// string, or something else entirely. Decoding never fails, so a bad value
/// becomes a field error next to the others instead of rejecting the body.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

impl NumberInput {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(n) => i32::try_from(*n).ok(),
            Self::Float(f) => {
                let in_range = *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX);
                (f.fract() == 0.0 && in_range).then_some(*f as i32)
            }
            Self::Text(text) => text.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }
}

/// A track list sent either as an array or as one `;`-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TrackListInput {
    List(Vec<String>),
    Joined(String),
}

impl TrackListInput {
    /// Trims every entry and drops the empty ones.
    pub fn into_tracks(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            Self::List(list) => list,
            Self::Joined(joined) => joined.split(';').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|track| track.trim().to_string())
            .filter(|track| !track.is_empty())
            .collect()
    }
}

/// Release ids sent either as an array or as one `,`-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdListInput {
    List(Vec<String>),
    Joined(String),
}

impl IdListInput {
    /// Ids that fail to parse are dropped, like ids that do not resolve.
    pub fn into_ids(self) -> Vec<Uuid> {
        let raw: Vec<String> = match self {
            Self::List(list) => list,
            Self::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        raw.iter()
            .filter_map(|id| Uuid::parse_str(id.trim()).ok())
            .collect()
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// At least eight characters with a lowercase and an uppercase letter, a
/// digit and a symbol.
pub fn check_password_strength(password: &str) -> std::result::Result<(), String> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    let lower = password.chars().any(|c| c.is_lowercase());
    let upper = password.chars().any(|c| c.is_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let symbol = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    if long_enough && lower && upper && digit && symbol {
        Ok(())
    } else {
        Err(format!(
            "Password must be at least {} characters and include upper and lower case letters, a number and a symbol",
            MIN_PASSWORD_LEN
        ))
    }
}
