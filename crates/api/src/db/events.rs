//! Library event and registration query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::{EventRegistrations, LibraryEvents};
use crate::RegistrationStatus;

/// Order must match `event_from_row()`.
fn event_select() -> sea_query::SelectStatement {
    Query::select()
        .columns([
            LibraryEvents::Id,
            LibraryEvents::LibraryId,
            LibraryEvents::Title,
            LibraryEvents::Description,
            LibraryEvents::EventDate,
            LibraryEvents::Location,
            LibraryEvents::MaxAttendees,
            LibraryEvents::CreatedAt,
        ])
        .from(LibraryEvents::Table)
        .to_owned()
}

/// Order must match `registration_from_row()`.
fn registration_select() -> sea_query::SelectStatement {
    Query::select()
        .columns([
            EventRegistrations::Id,
            EventRegistrations::EventId,
            EventRegistrations::AttendeeName,
            EventRegistrations::AttendeeEmail,
            EventRegistrations::Status,
            EventRegistrations::WaitlistPosition,
            EventRegistrations::RegisteredAt,
        ])
        .from(EventRegistrations::Table)
        .to_owned()
}

pub struct EventParams<'a> {
    pub id: &'a str,
    pub library_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub event_date: &'a str,
    pub location: Option<&'a str>,
    pub max_attendees: Option<i64>,
}

pub fn insert(p: &EventParams<'_>) -> Built {
    Query::insert()
        .into_table(LibraryEvents::Table)
        .columns([
            LibraryEvents::Id,
            LibraryEvents::LibraryId,
            LibraryEvents::Title,
            LibraryEvents::Description,
            LibraryEvents::EventDate,
            LibraryEvents::Location,
            LibraryEvents::MaxAttendees,
        ])
        .values_panic([
            p.id.into(),
            p.library_id.into(),
            p.title.into(),
            p.description.map(|s| s.to_string()).into(),
            p.event_date.into(),
            p.location.map(|s| s.to_string()).into(),
            p.max_attendees.into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn get(id: &str) -> Built {
    event_select()
        .and_where(Expr::col(LibraryEvents::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Events of a library, soonest first.
pub fn list_by_library(library_id: &str) -> Built {
    event_select()
        .and_where(Expr::col(LibraryEvents::LibraryId).eq(library_id))
        .order_by(LibraryEvents::EventDate, Order::Asc)
        .build(SqliteQueryBuilder)
}

// ── Registrations ──────────────────────────────────────────────────────────

pub fn registration_insert(
    id: &str,
    event_id: &str,
    attendee_name: &str,
    attendee_email: Option<&str>,
    status: RegistrationStatus,
    waitlist_position: Option<i64>,
) -> Built {
    Query::insert()
        .into_table(EventRegistrations::Table)
        .columns([
            EventRegistrations::Id,
            EventRegistrations::EventId,
            EventRegistrations::AttendeeName,
            EventRegistrations::AttendeeEmail,
            EventRegistrations::Status,
            EventRegistrations::WaitlistPosition,
        ])
        .values_panic([
            id.into(),
            event_id.into(),
            attendee_name.into(),
            attendee_email.map(|s| s.to_string()).into(),
            status.as_str().into(),
            waitlist_position.into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn registration_get(id: &str) -> Built {
    registration_select()
        .and_where(Expr::col(EventRegistrations::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Registrations in arrival order.
pub fn registration_list(event_id: &str) -> Built {
    registration_select()
        .and_where(Expr::col(EventRegistrations::EventId).eq(event_id))
        .order_by(EventRegistrations::RegisteredAt, Order::Asc)
        .order_by_expr(Expr::cust("rowid"), Order::Asc)
        .build(SqliteQueryBuilder)
}

pub fn count_registered(event_id: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(EventRegistrations::Table)
        .and_where(Expr::col(EventRegistrations::EventId).eq(event_id))
        .and_where(
            Expr::col(EventRegistrations::Status).eq(RegistrationStatus::Registered.as_str()),
        )
        .build(SqliteQueryBuilder)
}

/// Highest waitlist position in use (NULL when the waitlist is empty).
pub fn max_waitlist_position(event_id: &str) -> Built {
    Query::select()
        .expr(Func::max(Expr::col(EventRegistrations::WaitlistPosition)))
        .from(EventRegistrations::Table)
        .and_where(Expr::col(EventRegistrations::EventId).eq(event_id))
        .and_where(
            Expr::col(EventRegistrations::Status).eq(RegistrationStatus::Waitlisted.as_str()),
        )
        .build(SqliteQueryBuilder)
}

/// Id of the waitlisted registration at the head of the queue.
pub fn waitlist_head(event_id: &str) -> Built {
    Query::select()
        .column(EventRegistrations::Id)
        .from(EventRegistrations::Table)
        .and_where(Expr::col(EventRegistrations::EventId).eq(event_id))
        .and_where(
            Expr::col(EventRegistrations::Status).eq(RegistrationStatus::Waitlisted.as_str()),
        )
        .order_by(EventRegistrations::WaitlistPosition, Order::Asc)
        .limit(1)
        .build(SqliteQueryBuilder)
}

pub fn set_status(id: &str, status: RegistrationStatus, waitlist_position: Option<i64>) -> Built {
    Query::update()
        .table(EventRegistrations::Table)
        .values([
            (EventRegistrations::Status, status.as_str().into()),
            (EventRegistrations::WaitlistPosition, waitlist_position.into()),
        ])
        .and_where(Expr::col(EventRegistrations::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Move every waitlisted entry behind `position` one slot forward.
pub fn shift_waitlist_after(event_id: &str, position: i64) -> Built {
    Query::update()
        .table(EventRegistrations::Table)
        .value(
            EventRegistrations::WaitlistPosition,
            Expr::col(EventRegistrations::WaitlistPosition).sub(1),
        )
        .and_where(Expr::col(EventRegistrations::EventId).eq(event_id))
        .and_where(
            Expr::col(EventRegistrations::Status).eq(RegistrationStatus::Waitlisted.as_str()),
        )
        .and_where(Expr::col(EventRegistrations::WaitlistPosition).gt(position))
        .build(SqliteQueryBuilder)
}

/// Drop a cancelled registration so the attendee can sign up again.
pub fn delete_cancelled(event_id: &str, attendee_name: &str) -> Built {
    Query::delete()
        .from_table(EventRegistrations::Table)
        .and_where(Expr::col(EventRegistrations::EventId).eq(event_id))
        .and_where(Expr::col(EventRegistrations::AttendeeName).eq(attendee_name))
        .and_where(
            Expr::col(EventRegistrations::Status).eq(RegistrationStatus::Cancelled.as_str()),
        )
        .build(SqliteQueryBuilder)
}
