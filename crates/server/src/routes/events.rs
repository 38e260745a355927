use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use gametaverns_api::{
    CreateEventRequest, EventRegistrationRequest, EventResponse, ListEventsResponse,
    ListRegistrationsResponse, RegistrationResponse, RegistrationStatus, db, service,
};

use crate::error::{ApiErr, ApiJson, is_constraint_violation};
use crate::routes::auth::AuthUser;
use crate::routes::{clean, new_id, owned_library, visible_library};
use crate::storage::{
    Db, event_from_row, registration_from_row, sq_count, sq_execute, sq_query_map, sq_query_opt,
    sq_query_row,
};

fn load_event(conn: &Connection, id: &str) -> Result<EventResponse, ApiErr> {
    sq_query_opt(conn, db::events::get(id), event_from_row)
        .map_err(ApiErr::from_db("load event"))?
        .ok_or_else(|| ApiErr::not_found("event not found"))
}

fn load_registration(conn: &Connection, id: &str) -> Result<RegistrationResponse, ApiErr> {
    sq_query_opt(conn, db::events::registration_get(id), registration_from_row)
        .map_err(ApiErr::from_db("load registration"))?
        .ok_or_else(|| ApiErr::not_found("registration not found"))
}

pub async fn list_events(
    State(db): State<Db>,
    Path(library_id): Path<String>,
    user: Option<AuthUser>,
) -> Result<Json<ListEventsResponse>, ApiErr> {
    let conn = db.conn();
    visible_library(&conn, &library_id, user.as_ref())?;
    let events = sq_query_map(&conn, db::events::list_by_library(&library_id), event_from_row)
        .map_err(ApiErr::from_db("list events"))?;
    Ok(Json(ListEventsResponse { events }))
}

pub async fn create_event(
    State(db): State<Db>,
    Path(library_id): Path<String>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), ApiErr> {
    let title = service::validate_title(&req.title)?;
    let max_attendees = service::validate_event_capacity(req.max_attendees)?;
    let event_date = req.event_date.trim();
    if event_date.is_empty() {
        return Err(ApiErr::bad_request("event_date is required"));
    }

    let conn = db.conn();
    owned_library(&conn, &library_id, &user)?;
    let id = new_id();
    sq_execute(
        &conn,
        db::events::insert(&db::events::EventParams {
            id: &id,
            library_id: &library_id,
            title: &title,
            description: clean(req.description.as_deref()),
            event_date,
            location: clean(req.location.as_deref()),
            max_attendees,
        }),
    )
    .map_err(ApiErr::from_db("insert event"))?;

    Ok((StatusCode::CREATED, Json(load_event(&conn, &id)?)))
}

/// POST /api/events/{id}/registrations: open to anyone who can see the
/// library. Past capacity the attendee lands on the waitlist.
pub async fn register(
    State(db): State<Db>,
    Path(event_id): Path<String>,
    user: Option<AuthUser>,
    ApiJson(req): ApiJson<EventRegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiErr> {
    let attendee_name = service::validate_attendee_name(&req.attendee_name)?;
    let attendee_email = service::validate_optional_email(req.attendee_email.as_deref())?;

    let conn = db.conn();
    let event = load_event(&conn, &event_id)?;
    visible_library(&conn, &event.library_id, user.as_ref())?;

    let tx = conn
        .unchecked_transaction()
        .map_err(ApiErr::from_db("begin registration"))?;
    // A cancelled registration does not hold the attendee's name.
    sq_execute(&tx, db::events::delete_cancelled(&event_id, &attendee_name))
        .map_err(ApiErr::from_db("clear cancelled registration"))?;

    let registered = sq_count(&tx, db::events::count_registered(&event_id))
        .map_err(ApiErr::from_db("count registrations"))?;
    // MAX() yields one row holding NULL when the waitlist is empty.
    let last_position: Option<i64> = sq_query_row(
        &tx,
        db::events::max_waitlist_position(&event_id),
        |row| row.get(0),
    )
    .map_err(ApiErr::from_db("max waitlist position"))?;
    let (status, waitlist_position) =
        service::registration_placement(event.max_attendees, registered, last_position);

    let id = new_id();
    match sq_execute(
        &tx,
        db::events::registration_insert(
            &id,
            &event_id,
            &attendee_name,
            attendee_email.as_deref(),
            status,
            waitlist_position,
        ),
    ) {
        Ok(_) => {}
        Err(e) if is_constraint_violation(&e) => {
            return Err(ApiErr::conflict("this attendee is already registered"));
        }
        Err(e) => return Err(ApiErr::from_db("insert registration")(e)),
    }
    tx.commit().map_err(ApiErr::from_db("commit registration"))?;
    tracing::info!(%event_id, %status, ?waitlist_position, "event registration");

    Ok((StatusCode::CREATED, Json(load_registration(&conn, &id)?)))
}

fn status_rank(status: RegistrationStatus) -> u8 {
    match status {
        RegistrationStatus::Registered => 0,
        RegistrationStatus::Waitlisted => 1,
        RegistrationStatus::Cancelled => 2,
    }
}

/// GET /api/events/{id}/registrations: owner view: registered first, then
/// the waitlist in order, then cancellations.
pub async fn list_registrations(
    State(db): State<Db>,
    Path(event_id): Path<String>,
    user: AuthUser,
) -> Result<Json<ListRegistrationsResponse>, ApiErr> {
    let conn = db.conn();
    let event = load_event(&conn, &event_id)?;
    owned_library(&conn, &event.library_id, &user)?;

    let mut registrations = sq_query_map(
        &conn,
        db::events::registration_list(&event_id),
        registration_from_row,
    )
    .map_err(ApiErr::from_db("list registrations"))?;
    registrations.sort_by_key(|r| (status_rank(r.status), r.waitlist_position.unwrap_or(0)));

    Ok(Json(ListRegistrationsResponse { registrations }))
}

/// DELETE /api/events/{id}/registrations/{registration_id}
///
/// Freeing a seat promotes the head of the waitlist; leaving the waitlist
/// closes the gap behind it.
pub async fn cancel_registration(
    State(db): State<Db>,
    Path((event_id, registration_id)): Path<(String, String)>,
    user: AuthUser,
) -> Result<Json<RegistrationResponse>, ApiErr> {
    let conn = db.conn();
    let event = load_event(&conn, &event_id)?;
    owned_library(&conn, &event.library_id, &user)?;

    let registration = load_registration(&conn, &registration_id)?;
    if registration.event_id != event_id {
        return Err(ApiErr::not_found("registration not found"));
    }

    if registration.status == RegistrationStatus::Cancelled {
        return Err(ApiErr::conflict("registration already cancelled"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(ApiErr::from_db("begin cancellation"))?;
    sq_execute(
        &tx,
        db::events::set_status(&registration_id, RegistrationStatus::Cancelled, None),
    )
    .map_err(ApiErr::from_db("cancel registration"))?;
    match (registration.status, registration.waitlist_position) {
        (RegistrationStatus::Registered, _) => promote_waitlist_head(&tx, &event_id)?,
        (RegistrationStatus::Waitlisted, Some(position)) => {
            sq_execute(&tx, db::events::shift_waitlist_after(&event_id, position))
                .map_err(ApiErr::from_db("shift waitlist"))?;
        }
        _ => {}
    }
    tx.commit().map_err(ApiErr::from_db("commit cancellation"))?;

    load_registration(&conn, &registration_id).map(Json)
}

fn promote_waitlist_head(conn: &Connection, event_id: &str) -> Result<(), ApiErr> {
    let Some(head_id) = sq_query_opt(conn, db::events::waitlist_head(event_id), |row| {
        row.get::<_, String>(0)
    })
    .map_err(ApiErr::from_db("waitlist head"))?
    else {
        return Ok(());
    };

    let head = load_registration(conn, &head_id)?;
    sq_execute(
        conn,
        db::events::set_status(&head_id, RegistrationStatus::Registered, None),
    )
    .map_err(ApiErr::from_db("promote registration"))?;
    sq_execute(
        conn,
        db::events::shift_waitlist_after(event_id, head.waitlist_position.unwrap_or(1)),
    )
    .map_err(ApiErr::from_db("shift waitlist"))?;
    tracing::info!(event_id, registration_id = %head_id, "promoted from waitlist");
    Ok(())
}
