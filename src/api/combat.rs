//! Combat API - combatant management and turn stepping
//!
//! Every mutating endpoint applies one session operation, flushes the
//! session to the database and answers with the updated session view.
//! Operations on unknown ids change nothing and still answer 200.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{AppState, ErrorResponse};
use crate::combat::MonsterRecord;
use crate::ddb::FetchError;
use crate::session::{CombatSession, SessionView};

const DEFAULT_MONSTER_HP: i32 = 20;
const DEFAULT_MONSTER_AC: i32 = 13;

/// Character import request
#[derive(Debug, Deserialize)]
struct AddCharacterRequest {
    /// Character id on the sheet service
    id: String,
}

/// Monster entry request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddMonsterRequest {
    name: String,
    #[serde(default = "default_max_hp")]
    max_hp: i32,
    /// Explicit null means unknown armor class
    #[serde(default = "default_ac")]
    ac: Option<i32>,
    #[serde(default)]
    dex_mod: i32,
}

fn default_max_hp() -> i32 {
    DEFAULT_MONSTER_HP
}

fn default_ac() -> Option<i32> {
    Some(DEFAULT_MONSTER_AC)
}

#[derive(Debug, Deserialize)]
struct InitiativeRequest {
    /// Null clears the initiative
    #[serde(default)]
    value: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct AmountRequest {
    #[serde(default = "default_amount")]
    amount: i32,
}

fn default_amount() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
struct NoteRequest {
    #[serde(default)]
    note: Option<String>,
}

/// Response for a newly added combatant
#[derive(Debug, Serialize)]
struct CreatedResponse {
    id: String,
    session: SessionView,
}

/// Build the combat router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/combatants/character", post(add_character))
        .route("/combatants/monster", post(add_monster))
        .route("/combatants/{id}", delete(remove_combatant))
        .route("/combatants/{id}/initiative", put(set_initiative))
        .route("/combatants/{id}/roll", post(roll_initiative))
        .route("/combatants/{id}/damage", post(damage))
        .route("/combatants/{id}/heal", post(heal))
        .route("/combatants/{id}/note", put(set_note))
        .route("/combat/roll-monsters", post(roll_all_monsters))
        .route("/combat/sort", post(sort_and_jump))
        .route("/combat/next", post(next_turn))
        .route("/combat/prev", post(prev_turn))
}

/// Apply one operation under the session lock, then persist
async fn mutate<F>(state: &AppState, op: F) -> Json<SessionView>
where
    F: FnOnce(&mut CombatSession),
{
    let mut session = state.session.write().await;
    op(&mut *session);
    session.flush(&state.db).await;
    Json(session.view())
}

fn error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// GET /session
async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.read().await.view())
}

/// POST /combatants/character
/// Fetches the sheet before taking the session lock
async fn add_character(
    State(state): State<AppState>,
    Json(request): Json<AddCharacterRequest>,
) -> impl IntoResponse {
    let record = match state.ddb.fetch_character(&request.id).await {
        Ok(record) => record,
        Err(FetchError::EmptyId) => {
            return error(StatusCode::BAD_REQUEST, FetchError::EmptyId.to_string())
        }
        Err(e) => {
            warn!("Character import {} failed: {}", request.id.trim(), e);
            return error(StatusCode::BAD_GATEWAY, e.to_string());
        }
    };

    let id = record.id.clone();
    let mut session = state.session.write().await;
    if !session.add_character(record) {
        return error(
            StatusCode::CONFLICT,
            format!("Character {} is already in combat", id),
        );
    }
    session.flush(&state.db).await;

    (
        StatusCode::CREATED,
        Json(CreatedResponse {
            id,
            session: session.view(),
        }),
    )
        .into_response()
}

/// POST /combatants/monster
async fn add_monster(
    State(state): State<AppState>,
    Json(request): Json<AddMonsterRequest>,
) -> impl IntoResponse {
    let name = request.name.trim();
    if name.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Monster name is required");
    }

    let record = MonsterRecord {
        name: name.to_string(),
        max_hp: request.max_hp,
        ac: request.ac,
        dex_mod: request.dex_mod,
    };

    let mut session = state.session.write().await;
    let id = session.add_monster(record);
    session.flush(&state.db).await;

    (
        StatusCode::CREATED,
        Json(CreatedResponse {
            id,
            session: session.view(),
        }),
    )
        .into_response()
}

/// DELETE /combatants/{id}
async fn remove_combatant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    mutate(&state, |s| {
        s.remove(&id);
    })
    .await
}

/// PUT /combatants/{id}/initiative
async fn set_initiative(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<InitiativeRequest>,
) -> impl IntoResponse {
    mutate(&state, |s| {
        s.set_initiative(&id, request.value);
    })
    .await
}

/// POST /combatants/{id}/roll
async fn roll_initiative(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    mutate(&state, |s| {
        s.roll_initiative(&id);
    })
    .await
}

/// POST /combatants/{id}/damage
async fn damage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> impl IntoResponse {
    mutate(&state, |s| {
        s.damage(&id, request.amount);
    })
    .await
}

/// POST /combatants/{id}/heal
async fn heal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> impl IntoResponse {
    mutate(&state, |s| {
        s.heal(&id, request.amount);
    })
    .await
}

/// PUT /combatants/{id}/note
async fn set_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<NoteRequest>,
) -> impl IntoResponse {
    mutate(&state, |s| {
        s.set_note(&id, request.note);
    })
    .await
}

/// POST /combat/roll-monsters
async fn roll_all_monsters(State(state): State<AppState>) -> impl IntoResponse {
    mutate(&state, |s| {
        s.roll_all_monsters();
    })
    .await
}

/// POST /combat/sort
async fn sort_and_jump(State(state): State<AppState>) -> impl IntoResponse {
    mutate(&state, CombatSession::sort_and_jump_to_top).await
}

/// POST /combat/next
async fn next_turn(State(state): State<AppState>) -> impl IntoResponse {
    mutate(&state, |s| {
        s.advance_turn();
    })
    .await
}

/// POST /combat/prev
async fn prev_turn(State(state): State<AppState>) -> impl IntoResponse {
    mutate(&state, |s| {
        s.retreat_turn();
    })
    .await
}
