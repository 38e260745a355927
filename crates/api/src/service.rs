//! Shared business logic: framework-agnostic pure functions.
//!
//! Route handlers stay thin adapters: they load rows, call into these rules,
//! and write the outcome back.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::{LoanAction, LoanStatus, PollStatus, RegistrationStatus, ServiceError};

// ─── Validation ─────────────────────────────────────────────────────────────

/// Validate and normalize a user display name. Returns the trimmed name.
pub fn validate_display_name(name: &str) -> Result<String, ServiceError> {
    let trimmed = name.trim().to_string();
    if trimmed.is_empty() || trimmed.chars().count() > 64 {
        return Err(ServiceError::BadRequest(
            "display name must be 1-64 characters".into(),
        ));
    }
    Ok(trimmed)
}

/// Validate a library slug (its subdomain). Returns the lowercased slug.
pub fn validate_slug(slug: &str) -> Result<String, ServiceError> {
    let slug = slug.trim().to_lowercase();
    let len_ok = (3..=40).contains(&slug.len());
    let chars_ok = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !len_ok || !chars_ok || slug.starts_with('-') || slug.ends_with('-') {
        return Err(ServiceError::BadRequest(
            "slug must be 3-40 characters of a-z, 0-9 and inner hyphens".into(),
        ));
    }
    Ok(slug)
}

fn validate_text(value: &str, field: &str, max: usize) -> Result<String, ServiceError> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() || trimmed.chars().count() > max {
        return Err(ServiceError::BadRequest(format!(
            "{field} must be 1-{max} characters"
        )));
    }
    Ok(trimmed)
}

pub fn validate_library_name(name: &str) -> Result<String, ServiceError> {
    validate_text(name, "library name", 100)
}

pub fn validate_game_title(title: &str) -> Result<String, ServiceError> {
    validate_text(title, "title", 200)
}

pub fn validate_copies_owned(copies: i64) -> Result<i64, ServiceError> {
    if copies < 1 {
        return Err(ServiceError::BadRequest(
            "copies_owned must be at least 1".into(),
        ));
    }
    Ok(copies)
}

pub fn validate_bgg_username(username: &str) -> Result<String, ServiceError> {
    validate_text(username, "bgg_username", 64)
}

pub fn validate_attendee_name(name: &str) -> Result<String, ServiceError> {
    validate_text(name, "attendee_name", 100)
}

/// Shared by events, polls and tournaments.
pub fn validate_title(title: &str) -> Result<String, ServiceError> {
    validate_text(title, "title", 200)
}

/// Optional contact address: blank means none, otherwise it needs an `@`.
pub fn validate_optional_email(email: Option<&str>) -> Result<Option<String>, ServiceError> {
    match email.map(str::trim).filter(|e| !e.is_empty()) {
        None => Ok(None),
        Some(e) if e.contains('@') && e.len() <= 254 => Ok(Some(e.to_lowercase())),
        Some(_) => Err(ServiceError::BadRequest("invalid email address".into())),
    }
}

pub fn validate_event_capacity(max_attendees: Option<i64>) -> Result<Option<i64>, ServiceError> {
    match max_attendees {
        Some(m) if m < 1 => Err(ServiceError::BadRequest(
            "max_attendees must be at least 1".into(),
        )),
        other => Ok(other),
    }
}

/// A contact message that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMessage {
    pub sender_name: String,
    pub sender_email: String,
    pub message: String,
}

pub fn validate_message(
    sender_name: &str,
    sender_email: &str,
    message: &str,
) -> Result<ValidatedMessage, ServiceError> {
    let sender_name = validate_text(sender_name, "sender_name", 100)?;
    let sender_email = sender_email.trim().to_lowercase();
    if !sender_email.contains('@') || sender_email.len() > 254 {
        return Err(ServiceError::BadRequest("invalid email address".into()));
    }
    let message = validate_text(message, "message", 2000)?;
    Ok(ValidatedMessage {
        sender_name,
        sender_email,
        message,
    })
}

// ─── Time ───────────────────────────────────────────────────────────────────

/// Format a timestamp the way SQLite's `datetime('now')` does.
pub fn sqlite_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

// ─── Rate limiting ──────────────────────────────────────────────────────────

pub const RATE_LIMIT_WINDOW_SECS: i64 = 3600;
pub const DEFAULT_MESSAGE_RATE_LIMIT: u32 = 5;

/// Lower bound of the counting window ending at `now`.
pub fn rate_limit_cutoff(now: DateTime<Utc>) -> String {
    sqlite_timestamp(now - Duration::seconds(RATE_LIMIT_WINDOW_SECS))
}

/// `recent` is the number of rows already stored inside the window.
pub fn check_rate_limit(recent: i64, limit: u32) -> Result<(), ServiceError> {
    if recent >= i64::from(limit) {
        return Err(ServiceError::TooManyRequests(
            "too many messages, try again later".into(),
        ));
    }
    Ok(())
}

/// Pick the client address from proxy headers: first `X-Forwarded-For`
/// entry, then `X-Real-IP`, then `"unknown"`.
pub fn client_ip(forwarded_for: Option<&str>, real_ip: Option<&str>) -> String {
    forwarded_for
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| real_ip.map(str::trim).filter(|s| !s.is_empty()))
        .unwrap_or("unknown")
        .to_string()
}

// ─── Loans ──────────────────────────────────────────────────────────────────

/// How the caller relates to a loan.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoanActor {
    pub is_lender: bool,
    pub is_borrower: bool,
}

/// Check who may perform `action` and whether the edge exists.
/// Returns the status to store.
pub fn plan_loan_transition(
    current: LoanStatus,
    action: LoanAction,
    actor: LoanActor,
) -> Result<LoanStatus, ServiceError> {
    let allowed = if action.is_borrower_action() {
        actor.is_borrower
    } else {
        actor.is_lender
    };
    if !allowed {
        return Err(ServiceError::Forbidden(format!(
            "not allowed to {} this loan",
            action_verb(action)
        )));
    }
    let next = action.target();
    if !current.can_transition_to(next) {
        return Err(ServiceError::Conflict(format!(
            "cannot move loan from {current} to {next}"
        )));
    }
    Ok(next)
}

fn action_verb(action: LoanAction) -> &'static str {
    match action {
        LoanAction::Approve => "approve",
        LoanAction::Decline => "decline",
        LoanAction::Activate => "activate",
        LoanAction::Return => "return",
        LoanAction::Cancel => "cancel",
    }
}

/// A new request is accepted only while some copy is not held by an
/// approved or active loan.
pub fn check_loan_availability(copies_owned: i64, held: i64) -> Result<(), ServiceError> {
    if held >= copies_owned {
        return Err(ServiceError::Conflict(
            "all copies of this game are currently lent out".into(),
        ));
    }
    Ok(())
}

// ─── Events ─────────────────────────────────────────────────────────────────

/// Decide where a new registration lands.
///
/// `registered` counts rows with status `registered`; `last_position` is the
/// highest waitlist position currently in use.
pub fn registration_placement(
    max_attendees: Option<i64>,
    registered: i64,
    last_position: Option<i64>,
) -> (RegistrationStatus, Option<i64>) {
    match max_attendees {
        Some(max) if registered >= max => (
            RegistrationStatus::Waitlisted,
            Some(last_position.unwrap_or(0) + 1),
        ),
        _ => (RegistrationStatus::Registered, None),
    }
}

// ─── Trades ─────────────────────────────────────────────────────────────────

/// Lowercase and collapse whitespace so titles compare loosely.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// BGG ids win when both sides carry one; otherwise titles are compared.
pub fn want_matches(
    want_bgg_id: Option<&str>,
    want_title: &str,
    game_bgg_id: Option<&str>,
    game_title: &str,
) -> bool {
    match (non_empty(want_bgg_id), non_empty(game_bgg_id)) {
        (Some(a), Some(b)) => a == b,
        _ => normalize_title(want_title) == normalize_title(game_title),
    }
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

// ─── Game matching for imports ──────────────────────────────────────────────

/// Lookup of a library's games by BGG id and by normalized title.
#[derive(Debug, Default)]
pub struct GameCatalog {
    by_bgg_id: HashMap<String, String>,
    by_title: HashMap<String, String>,
}

impl GameCatalog {
    /// Build from `(game_id, bgg_id, title)` rows. The first game seen wins
    /// when two share a key.
    pub fn new<I, S>(games: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<S>, S)>,
        S: AsRef<str>,
    {
        let mut catalog = Self::default();
        for (id, bgg_id, title) in games {
            let id = id.as_ref().to_string();
            if let Some(bgg) = bgg_id.as_ref().and_then(|b| non_empty(Some(b.as_ref()))) {
                catalog
                    .by_bgg_id
                    .entry(bgg.to_string())
                    .or_insert_with(|| id.clone());
            }
            catalog
                .by_title
                .entry(normalize_title(title.as_ref()))
                .or_insert(id);
        }
        catalog
    }

    /// Exact BGG id first, then case-insensitive title.
    pub fn find(&self, bgg_id: Option<&str>, title: &str) -> Option<&str> {
        non_empty(bgg_id)
            .and_then(|b| self.by_bgg_id.get(b))
            .or_else(|| self.by_title.get(&normalize_title(title)))
            .map(String::as_str)
    }
}

// ─── Polls ──────────────────────────────────────────────────────────────────

pub const DEFAULT_MAX_VOTES_PER_VOTER: i64 = 1;

pub fn check_vote(
    status: PollStatus,
    votes_by_voter: i64,
    max_votes_per_voter: i64,
    already_voted_option: bool,
) -> Result<(), ServiceError> {
    if status == PollStatus::Closed {
        return Err(ServiceError::Conflict("poll is closed".into()));
    }
    if already_voted_option {
        return Err(ServiceError::Conflict(
            "already voted for this option".into(),
        ));
    }
    if votes_by_voter >= max_votes_per_voter {
        return Err(ServiceError::Conflict(format!(
            "at most {max_votes_per_voter} vote(s) per voter"
        )));
    }
    Ok(())
}

// ─── Tournaments ────────────────────────────────────────────────────────────

/// Validate a result for a match and return the loser's id.
pub fn match_loser<'a>(
    player1_id: &'a str,
    player2_id: &'a str,
    winner_id: &str,
    existing_winner: Option<&str>,
) -> Result<&'a str, ServiceError> {
    if existing_winner.is_some() {
        return Err(ServiceError::Conflict("match already has a result".into()));
    }
    if winner_id == player1_id {
        Ok(player2_id)
    } else if winner_id == player2_id {
        Ok(player1_id)
    } else {
        Err(ServiceError::BadRequest(
            "winner must be one of the match players".into(),
        ))
    }
}
