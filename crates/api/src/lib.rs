//! Shared API types, business rules, and SQL builders for GameTaverns.
//!
//! This crate is the **single source of truth** for request/response types.
//! The server, the typed client and the CLI all build on it. With the
//! `backend` feature it also carries the schema, the `sea-query` builders and
//! the framework-agnostic rules the route handlers call into.

use serde::{Deserialize, Serialize};

#[cfg(feature = "backend")]
pub mod crypto;
#[cfg(feature = "backend")]
pub mod db;
#[cfg(feature = "backend")]
pub mod service;

// ─── Shared Enums ────────────────────────────────────────────────────────────

/// Lifecycle state of a game loan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Requested,
    Approved,
    Active,
    Returned,
    Declined,
    Cancelled,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Approved => "approved",
            Self::Active => "active",
            Self::Returned => "returned",
            Self::Declined => "declined",
            Self::Cancelled => "cancelled",
        }
    }

    pub const ALL: [LoanStatus; 6] = [
        Self::Requested,
        Self::Approved,
        Self::Active,
        Self::Returned,
        Self::Declined,
        Self::Cancelled,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(Self::Requested),
            "approved" => Some(Self::Approved),
            "active" => Some(Self::Active),
            "returned" => Some(Self::Returned),
            "declined" => Some(Self::Declined),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Allowed edges: `requested → approved → active → returned`, and
    /// `requested → declined | cancelled`.
    pub fn can_transition_to(&self, next: LoanStatus) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Approved)
                | (Self::Requested, Self::Declined)
                | (Self::Requested, Self::Cancelled)
                | (Self::Approved, Self::Active)
                | (Self::Active, Self::Returned)
        )
    }

    /// Loans in these states hold a copy of the game.
    pub fn holds_copy(&self) -> bool {
        matches!(self, Self::Approved | Self::Active)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action requested on an existing loan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoanAction {
    Approve,
    Decline,
    Activate,
    Return,
    Cancel,
}

impl LoanAction {
    /// Status the loan moves to when this action succeeds.
    pub fn target(&self) -> LoanStatus {
        match self {
            Self::Approve => LoanStatus::Approved,
            Self::Decline => LoanStatus::Declined,
            Self::Activate => LoanStatus::Active,
            Self::Return => LoanStatus::Returned,
            Self::Cancel => LoanStatus::Cancelled,
        }
    }

    /// Only the borrower cancels; every other action belongs to the lender.
    pub fn is_borrower_action(&self) -> bool {
        matches!(self, Self::Cancel)
    }
}

/// Status of an event registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Registered,
    Waitlisted,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Waitlisted => "waitlisted",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registered" => Some(Self::Registered),
            "waitlisted" => Some(Self::Waitlisted),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a poll still accepts votes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    Open,
    Closed,
}

impl PollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PollStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Health / generic ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

// ─── Auth ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub display_name: String,
}

/// Returned once on registration; the raw key is never stored.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub display_name: String,
    pub api_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user_id: String,
    pub display_name: String,
    pub is_admin: bool,
}

// ─── Libraries ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLibraryRequest {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateLibraryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryResponse {
    pub id: String,
    pub owner_id: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListLibrariesResponse {
    pub libraries: Vec<LibraryResponse>,
}

// ─── Games ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGameRequest {
    pub title: String,
    pub bgg_id: Option<String>,
    pub copies_owned: Option<i64>,
    pub is_for_trade: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateGameRequest {
    pub title: Option<String>,
    pub bgg_id: Option<String>,
    pub copies_owned: Option<i64>,
    pub is_for_trade: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResponse {
    pub id: String,
    pub library_id: String,
    pub title: String,
    pub bgg_id: Option<String>,
    pub copies_owned: i64,
    pub is_for_trade: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListGamesResponse {
    pub games: Vec<GameResponse>,
}

// ─── Play sessions ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerInput {
    pub player_name: String,
    pub bgg_username: Option<String>,
    pub score: Option<String>,
    #[serde(default)]
    pub is_winner: bool,
    #[serde(default)]
    pub is_first_play: bool,
    pub color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub game_id: String,
    pub played_at: String,
    pub duration_minutes: Option<i64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub players: Vec<PlayerInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerResponse {
    pub id: String,
    pub player_name: String,
    pub bgg_username: Option<String>,
    pub score: Option<String>,
    pub is_winner: bool,
    pub is_first_play: bool,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: String,
    pub library_id: String,
    pub game_id: String,
    pub game_title: String,
    pub played_at: String,
    pub duration_minutes: Option<i64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub bgg_play_id: Option<String>,
    pub created_at: String,
    pub players: Vec<PlayerResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionResponse>,
}

// ─── BGG play import ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BggImportRequest {
    pub bgg_username: String,
    pub library_id: String,
    #[serde(default)]
    pub update_existing: bool,
}

/// Summary of one import run. Each play is written independently, so the
/// counters can mix successes and failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BggImportResponse {
    pub success: bool,
    pub imported: u32,
    pub updated: u32,
    pub skipped: u32,
    pub failed: u32,
    pub total_plays: u32,
    pub unmatched_games: Vec<String>,
    pub errors: Vec<String>,
}

// ─── Loans ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanRequest {
    pub game_id: String,
    pub notes: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanTransitionRequest {
    pub action: LoanAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanResponse {
    pub id: String,
    pub library_id: String,
    pub game_id: String,
    pub borrower_id: String,
    pub status: LoanStatus,
    pub notes: Option<String>,
    pub due_date: Option<String>,
    pub requested_at: String,
    pub approved_at: Option<String>,
    pub borrowed_at: Option<String>,
    pub returned_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListLoansResponse {
    pub loans: Vec<LoanResponse>,
}

// ─── Trades ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct TradeWantRequest {
    pub title: String,
    pub bgg_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeWantResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub bgg_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListTradeWantsResponse {
    pub wants: Vec<TradeWantResponse>,
}

/// A game offered for trade in someone else's library that satisfies one of
/// the caller's wants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TradeMatch {
    pub want_id: String,
    pub want_title: String,
    pub game_id: String,
    pub game_title: String,
    pub bgg_id: Option<String>,
    pub library_id: String,
    pub library_name: String,
    pub owner_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TradeMatchesResponse {
    pub matches: Vec<TradeMatch>,
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub event_date: String,
    pub location: Option<String>,
    pub max_attendees: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: String,
    pub library_id: String,
    pub title: String,
    pub description: Option<String>,
    pub event_date: String,
    pub location: Option<String>,
    pub max_attendees: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListEventsResponse {
    pub events: Vec<EventResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventRegistrationRequest {
    pub attendee_name: String,
    pub attendee_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub id: String,
    pub event_id: String,
    pub attendee_name: String,
    pub attendee_email: Option<String>,
    pub status: RegistrationStatus,
    pub waitlist_position: Option<i64>,
    pub registered_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListRegistrationsResponse {
    pub registrations: Vec<RegistrationResponse>,
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub library_id: String,
    pub game_id: Option<String>,
    pub sender_name: String,
    pub sender_email: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub library_id: String,
    pub game_id: Option<String>,
    pub sender_name: String,
    pub sender_email: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Vec<MessageResponse>,
}

// ─── Polls ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct PollOptionInput {
    pub label: String,
    pub game_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePollRequest {
    pub title: String,
    pub description: Option<String>,
    pub max_votes_per_voter: Option<i64>,
    pub options: Vec<PollOptionInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOptionResponse {
    pub id: String,
    pub label: String,
    pub game_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResponse {
    pub id: String,
    pub library_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: PollStatus,
    pub max_votes_per_voter: i64,
    pub created_at: String,
    pub options: Vec<PollOptionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListPollsResponse {
    pub polls: Vec<PollResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteRequest {
    pub option_id: String,
    pub voter_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollOptionResult {
    pub option_id: String,
    pub label: String,
    pub votes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PollResultsResponse {
    pub poll_id: String,
    pub status: PollStatus,
    pub total_votes: i64,
    pub results: Vec<PollOptionResult>,
}

// ─── Tournaments ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct TournamentPlayerInput {
    pub player_name: String,
    pub seed: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    pub game_id: Option<String>,
    #[serde(default)]
    pub players: Vec<TournamentPlayerInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentPlayerResponse {
    pub id: String,
    pub player_name: String,
    pub seed: Option<i64>,
    pub wins: i64,
    pub losses: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub id: String,
    pub round: i64,
    pub player1_id: String,
    pub player2_id: String,
    pub winner_id: Option<String>,
    pub played_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentResponse {
    pub id: String,
    pub library_id: String,
    pub name: String,
    pub game_id: Option<String>,
    pub created_at: String,
    pub players: Vec<TournamentPlayerResponse>,
    pub matches: Vec<MatchResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateMatchRequest {
    pub round: i64,
    pub player1_id: String,
    pub player2_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResultRequest {
    pub winner_id: String,
}

// ─── Service Error ───────────────────────────────────────────────────────────

/// Framework-agnostic error returned by service functions.
/// Each backend converts this into its own HTTP response type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(String),
    Internal(String),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::TooManyRequests(_) => 429,
            Self::Internal(_) => 500,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::TooManyRequests(m)
            | Self::Internal(m) => m,
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServiceError {}

// ─── Error envelope ──────────────────────────────────────────────────────────

/// JSON error shape `{ "success": false, "error": "..." }` returned by all
/// error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

impl From<&ServiceError> for ApiError {
    fn from(e: &ServiceError) -> Self {
        Self::new(e.message())
    }
}
