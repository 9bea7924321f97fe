//! Input rules shared by the repositories.
//!
//! Everything here is pure and synchronous; callers run these checks before
//! any statement is built so a bad request never reaches the store.

use std::sync::OnceLock;

use chrono::{Months, NaiveDate};
use regex::Regex;

use crate::error::{Error, Result};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const EMAIL_MAX_LEN: usize = 254;
pub const COMMANDER_NAME_MIN_LEN: usize = 2;
pub const COMMANDER_NAME_MAX_LEN: usize = 100;
/// The fixed five-symbol color alphabet, in canonical order.
pub const COLOR_ALPHABET: &str = "WUBRG";
pub const PLAYER_COUNT_MIN: i32 = 2;
pub const PLAYER_COUNT_MAX: i32 = 8;
pub const ROUNDS_MIN: i32 = 1;
pub const ROUNDS_MAX: i32 = 50;
pub const NOTES_MAX_LEN: usize = 1000;

/// Normalize and validate a username: trimmed, lower-cased, 3-32 chars
/// drawn from `[a-z0-9_]`. The returned string is what gets stored, so
/// username uniqueness is case-insensitive by construction.
pub fn normalize_username(username: &str) -> Result<String> {
    let username = username.trim().to_lowercase();

    if username.len() < USERNAME_MIN_LEN || username.len() > USERNAME_MAX_LEN {
        return Err(Error::Validation(format!(
            "username must be {USERNAME_MIN_LEN}-{USERNAME_MAX_LEN} characters"
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(Error::Validation(
            "username may only contain a-z, 0-9 and _".to_string(),
        ));
    }

    Ok(username)
}

/// Normalize and validate an email address. This is a shape check, not an
/// RFC 5321 parser: one `@`, non-empty local part, dotted domain, no
/// whitespace. Stored lower-cased so the unique index is case-insensitive.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() || email.len() > EMAIL_MAX_LEN {
        return Err(Error::Validation(format!(
            "email must be 1-{EMAIL_MAX_LEN} characters"
        )));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(Error::Validation(
            "email must not contain whitespace".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(Error::Validation("email must contain @".to_string()));
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.contains('@') {
        return Err(Error::Validation("email address is malformed".to_string()));
    }

    Ok(email)
}

pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN || len > PASSWORD_MAX_LEN {
        return Err(Error::Validation(format!(
            "password must be {PASSWORD_MIN_LEN}-{PASSWORD_MAX_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a commander name: trimmed, 2-100 chars. Display case is
/// preserved; per-owner uniqueness compares the lower-cased form.
pub fn validate_commander_name(name: &str) -> Result<String> {
    let name = name.trim();
    let len = name.chars().count();

    if len < COMMANDER_NAME_MIN_LEN || len > COMMANDER_NAME_MAX_LEN {
        return Err(Error::Validation(format!(
            "commander name must be {COMMANDER_NAME_MIN_LEN}-{COMMANDER_NAME_MAX_LEN} characters"
        )));
    }

    Ok(name.to_string())
}

/// Canonicalize a color identity: a non-empty, duplicate-free subset of
/// `WUBRG`, case-insensitive on input, serialized in WUBRG order so string
/// equality is set equality (`"gu"` and `"UG"` both store as `"UG"`).
/// Duplicates are rejected rather than collapsed; a doubled symbol is a
/// client bug worth surfacing.
pub fn canonical_colors(colors: &str) -> Result<String> {
    let upper = colors.trim().to_uppercase();

    if upper.is_empty() {
        return Err(Error::Validation(
            "color identity must contain at least one symbol".to_string(),
        ));
    }

    for c in upper.chars() {
        if !COLOR_ALPHABET.contains(c) {
            return Err(Error::Validation(format!(
                "color identity may only contain {COLOR_ALPHABET}, got '{c}'"
            )));
        }
    }

    for c in COLOR_ALPHABET.chars() {
        if upper.matches(c).count() > 1 {
            return Err(Error::Validation(format!(
                "color identity contains duplicate symbol '{c}'"
            )));
        }
    }

    Ok(COLOR_ALPHABET.chars().filter(|c| upper.contains(*c)).collect())
}

pub fn validate_player_count(player_count: i32) -> Result<()> {
    if !(PLAYER_COUNT_MIN..=PLAYER_COUNT_MAX).contains(&player_count) {
        return Err(Error::Validation(format!(
            "player count must be {PLAYER_COUNT_MIN}-{PLAYER_COUNT_MAX}"
        )));
    }
    Ok(())
}

pub fn validate_rounds(rounds: i32) -> Result<()> {
    if !(ROUNDS_MIN..=ROUNDS_MAX).contains(&rounds) {
        return Err(Error::Validation(format!(
            "rounds must be {ROUNDS_MIN}-{ROUNDS_MAX}"
        )));
    }
    Ok(())
}

/// A game date must not be in the future and not more than a year old.
/// `today` is injected so the window is testable.
pub fn validate_game_date(date: NaiveDate, today: NaiveDate) -> Result<()> {
    if date > today {
        return Err(Error::Validation(
            "game date must not be in the future".to_string(),
        ));
    }

    let oldest = today
        .checked_sub_months(Months::new(12))
        .unwrap_or(NaiveDate::MIN);
    if date < oldest {
        return Err(Error::Validation(
            "game date must not be older than one year".to_string(),
        ));
    }

    Ok(())
}

fn spam_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(https?://|www\.)").expect("Invalid regex pattern defined in code")
    })
}

/// Notes are capped at 1000 chars and must not carry links; free-text game
/// notes are the one field spammers reach for.
pub fn validate_notes(notes: &str) -> Result<()> {
    if notes.chars().count() > NOTES_MAX_LEN {
        return Err(Error::Validation(format!(
            "notes must be at most {NOTES_MAX_LEN} characters"
        )));
    }

    if spam_pattern().is_match(notes) {
        return Err(Error::Validation("notes must not contain links".to_string()));
    }

    Ok(())
}

/// Page bounds for list operations: `limit` must be 1..=`max`, offset is
/// unrestricted.
pub fn validate_page(limit: u64, max: u64) -> Result<()> {
    if limit == 0 || limit > max {
        return Err(Error::Validation(format!("limit must be 1-{max}")));
    }
    Ok(())
}

/// Reject internally inconsistent date ranges before any query executes.
pub fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<()> {
    if let (Some(from), Some(to)) = (from, to)
        && from > to
    {
        return Err(Error::Validation(
            "date_from must not be after date_to".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn usernames_normalize_to_lowercase() {
        assert_eq!(normalize_username("  Alice_99 ").unwrap(), "alice_99");
        assert_eq!(normalize_username("BOB").unwrap(), "bob");
    }

    #[test]
    fn usernames_reject_bad_length_and_alphabet() {
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username(&"a".repeat(33)).is_err());
        assert!(normalize_username("al ice").is_err());
        assert!(normalize_username("al.ice").is_err());
        assert!(normalize_username("alicé").is_err());
    }

    #[test]
    fn emails_are_shape_checked() {
        assert_eq!(normalize_email(" A@Example.COM ").unwrap(), "a@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@nodot").is_err());
        assert!(normalize_email("a b@example.com").is_err());
    }

    #[test]
    fn colors_canonicalize_to_wubrg_order() {
        assert_eq!(canonical_colors("u").unwrap(), "U");
        assert_eq!(canonical_colors("gu").unwrap(), "UG");
        assert_eq!(canonical_colors("bRw").unwrap(), "WBR");
        assert_eq!(canonical_colors("grbuw").unwrap(), "WUBRG");
    }

    #[test]
    fn colors_reject_empty_duplicates_and_strays() {
        assert!(canonical_colors("").is_err());
        assert!(canonical_colors("  ").is_err());
        assert!(canonical_colors("UU").is_err());
        assert!(canonical_colors("Wx").is_err());
    }

    #[test]
    fn player_count_boundaries() {
        assert!(validate_player_count(1).is_err());
        assert!(validate_player_count(2).is_ok());
        assert!(validate_player_count(8).is_ok());
        assert!(validate_player_count(9).is_err());
    }

    #[test]
    fn rounds_boundaries() {
        assert!(validate_rounds(0).is_err());
        assert!(validate_rounds(1).is_ok());
        assert!(validate_rounds(50).is_ok());
        assert!(validate_rounds(51).is_err());
    }

    #[test]
    fn game_dates_stay_inside_the_window() {
        let today = day("2026-08-24");
        assert!(validate_game_date(today, today).is_ok());
        assert!(validate_game_date(day("2026-08-25"), today).is_err());
        assert!(validate_game_date(day("2025-08-24"), today).is_ok());
        assert!(validate_game_date(day("2025-08-23"), today).is_err());
    }

    #[test]
    fn notes_reject_links_and_overlength() {
        assert!(validate_notes("close game, sol ring turn one").is_ok());
        assert!(validate_notes("buy now https://spam.example").is_err());
        assert!(validate_notes("visit WWW.spam.example").is_err());
        assert!(validate_notes(&"x".repeat(1001)).is_err());
    }

    #[test]
    fn commander_names_are_trimmed_and_bounded() {
        assert_eq!(validate_commander_name(" Urza ").unwrap(), "Urza");
        assert!(validate_commander_name("x").is_err());
        assert!(validate_commander_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn inconsistent_date_ranges_are_rejected() {
        assert!(validate_date_range(Some(day("2026-02-01")), Some(day("2026-01-01"))).is_err());
        assert!(validate_date_range(Some(day("2026-01-01")), Some(day("2026-01-01"))).is_ok());
        assert!(validate_date_range(None, Some(day("2026-01-01"))).is_ok());
    }

    #[test]
    fn page_limits_are_bounded() {
        assert!(validate_page(0, 100).is_err());
        assert!(validate_page(1, 100).is_ok());
        assert!(validate_page(100, 100).is_ok());
        assert!(validate_page(101, 100).is_err());
    }
}
