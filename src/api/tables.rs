use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::AppState;
use crate::domain::TableSession;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    pub number: String,
    pub capacity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDto {
    pub id: Uuid,
    pub number: String,
    pub capacity: i64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub id: Uuid,
    pub token: String,
    pub table_id: Uuid,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub guest_count: i64,
    pub is_active: bool,
}

impl From<TableSession> for SessionDto {
    fn from(session: TableSession) -> Self {
        SessionDto {
            id: session.id,
            token: session.token,
            table_id: session.table_id,
            customer_name: session.customer_name,
            customer_phone: session.customer_phone,
            guest_count: session.guest_count,
            is_active: session.is_active,
        }
    }
}

pub async fn create_table(
    State(state): State<AppState>,
    Json(body): Json<CreateTableRequest>,
) -> Result<(StatusCode, Json<TableDto>), AppError> {
    if body.number.trim().is_empty() {
        return Err(AppError::BadRequest("Table number is required".to_string()));
    }
    let table = state.repo.create_table(&body.number, body.capacity).await?;
    Ok((
        StatusCode::CREATED,
        Json(TableDto {
            id: table.id,
            number: table.number,
            capacity: table.capacity,
            status: table.status.as_str().to_string(),
            session: None,
        }),
    ))
}

pub async fn list_tables(State(state): State<AppState>) -> Result<Json<Vec<TableDto>>, AppError> {
    let tables = state.repo.list_tables().await?;
    Ok(Json(
        tables
            .into_iter()
            .map(|(table, session)| TableDto {
                id: table.id,
                number: table.number,
                capacity: table.capacity,
                status: table.status.as_str().to_string(),
                session: session.map(SessionDto::from),
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatTableRequest {
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub guest_count: i64,
}

pub async fn seat_table(
    Path(table_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<SeatTableRequest>,
) -> Result<(StatusCode, Json<SessionDto>), AppError> {
    let session = state
        .repo
        .seat_table(
            table_id,
            &body.customer_name,
            body.customer_phone.as_deref(),
            body.guest_count,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(SessionDto::from(session))))
}

pub async fn list_active_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionDto>>, AppError> {
    let sessions = state.repo.list_active_sessions().await?;
    Ok(Json(sessions.into_iter().map(SessionDto::from).collect()))
}
