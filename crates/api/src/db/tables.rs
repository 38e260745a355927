//! Compile-time–checked column identifiers for all tables.

use sea_query::Iden;

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    DisplayName,
    ApiKeyHash,
    IsAdmin,
    CreatedAt,
}

#[derive(Iden)]
pub enum Libraries {
    Table,
    Id,
    OwnerId,
    Slug,
    Name,
    Description,
    IsPublic,
    CreatedAt,
}

#[derive(Iden)]
pub enum Games {
    Table,
    Id,
    LibraryId,
    Title,
    BggId,
    CopiesOwned,
    IsForTrade,
    CreatedAt,
}

#[derive(Iden)]
pub enum GameSessions {
    Table,
    Id,
    LibraryId,
    GameId,
    PlayedAt,
    DurationMinutes,
    Location,
    Notes,
    BggPlayId,
    CreatedAt,
}

#[derive(Iden)]
pub enum GameSessionPlayers {
    Table,
    Id,
    SessionId,
    PlayerName,
    BggUsername,
    Score,
    IsWinner,
    IsFirstPlay,
    Color,
}

#[derive(Iden)]
pub enum GameLoans {
    Table,
    Id,
    LibraryId,
    GameId,
    BorrowerId,
    Status,
    Notes,
    DueDate,
    RequestedAt,
    ApprovedAt,
    BorrowedAt,
    ReturnedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum TradeWants {
    Table,
    Id,
    UserId,
    Title,
    BggId,
    Notes,
    CreatedAt,
}

#[derive(Iden)]
pub enum LibraryEvents {
    Table,
    Id,
    LibraryId,
    Title,
    Description,
    EventDate,
    Location,
    MaxAttendees,
    CreatedAt,
}

#[derive(Iden)]
pub enum EventRegistrations {
    Table,
    Id,
    EventId,
    AttendeeName,
    AttendeeEmail,
    AttendeeUserId,
    Status,
    WaitlistPosition,
    RegisteredAt,
}

#[derive(Iden)]
pub enum LibraryMessages {
    Table,
    Id,
    LibraryId,
    GameId,
    SenderName,
    SenderEmail,
    Message,
    SenderIpHash,
    IsRead,
    CreatedAt,
}

#[derive(Iden)]
pub enum Polls {
    Table,
    Id,
    LibraryId,
    Title,
    Description,
    Status,
    MaxVotesPerVoter,
    CreatedAt,
}

#[derive(Iden)]
pub enum PollOptions {
    Table,
    Id,
    PollId,
    GameId,
    Label,
    Position,
}

#[derive(Iden)]
pub enum PollVotes {
    Table,
    Id,
    PollId,
    OptionId,
    VoterId,
    CreatedAt,
}

#[derive(Iden)]
pub enum Tournaments {
    Table,
    Id,
    LibraryId,
    GameId,
    Name,
    CreatedAt,
}

#[derive(Iden)]
pub enum TournamentPlayers {
    Table,
    Id,
    TournamentId,
    PlayerName,
    Seed,
    Wins,
    Losses,
}

#[derive(Iden)]
pub enum TournamentMatches {
    Table,
    Id,
    TournamentId,
    Round,
    #[iden = "player1_id"]
    Player1Id,
    #[iden = "player2_id"]
    Player2Id,
    WinnerId,
    PlayedAt,
}
