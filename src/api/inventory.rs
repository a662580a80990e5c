use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{actor_from_headers, AppState};
use crate::domain::{Ingredient, Qty, StockReason};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIngredientRequest {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub opening_stock: Option<Qty>,
    #[serde(default)]
    pub min_stock: Option<Qty>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientDto {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub current_stock: String,
    pub min_stock: String,
    pub is_low: bool,
}

impl From<Ingredient> for IngredientDto {
    fn from(ingredient: Ingredient) -> Self {
        let is_low = ingredient.is_low();
        IngredientDto {
            id: ingredient.id,
            name: ingredient.name,
            unit: ingredient.unit,
            current_stock: ingredient.current_stock.to_canonical_string(),
            min_stock: ingredient.min_stock.to_canonical_string(),
            is_low,
        }
    }
}

pub async fn create_ingredient(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<CreateIngredientRequest>,
) -> Result<(StatusCode, Json<IngredientDto>), AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Ingredient name is required".to_string(),
        ));
    }
    let actor = actor_from_headers(&headers);
    let ingredient = state
        .repo
        .create_ingredient(
            &body.name,
            &body.unit,
            body.opening_stock.unwrap_or_else(Qty::zero),
            body.min_stock.unwrap_or_else(Qty::zero),
            actor.name.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(IngredientDto::from(ingredient))))
}

pub async fn list_ingredients(
    State(state): State<AppState>,
) -> Result<Json<Vec<IngredientDto>>, AppError> {
    let ingredients = state.repo.list_ingredients().await?;
    Ok(Json(
        ingredients.into_iter().map(IngredientDto::from).collect(),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockRequest {
    pub change: Qty,
    pub reason: String,
}

pub async fn adjust_stock(
    Path(ingredient_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<AdjustStockRequest>,
) -> Result<Json<IngredientDto>, AppError> {
    let reason = StockReason::parse(body.reason.trim().to_uppercase().as_str())
        .ok_or_else(|| AppError::BadRequest("Invalid stock reason".to_string()))?;

    let actor = actor_from_headers(&headers);
    let ingredient = state
        .repo
        .adjust_stock(ingredient_id, body.change, reason, actor.name.as_deref())
        .await?;
    Ok(Json(IngredientDto::from(ingredient)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryDto {
    pub id: i64,
    pub change: String,
    pub reason: String,
    pub actor: Option<String>,
    pub created_at: String,
}

pub async fn get_ledger(
    Path(ingredient_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<LedgerEntryDto>>, AppError> {
    state
        .repo
        .get_ingredient(ingredient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient not found".to_string()))?;

    let entries = state.repo.get_ledger(ingredient_id).await?;
    Ok(Json(
        entries
            .into_iter()
            .map(|entry| LedgerEntryDto {
                id: entry.id,
                change: entry.change.to_canonical_string(),
                reason: entry.reason.as_str().to_string(),
                actor: entry.actor,
                created_at: entry.created_at.to_rfc3339(),
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLineDto {
    pub ingredient_id: Uuid,
    pub quantity: Qty,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub lines: Vec<PurchaseLineDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub message: String,
    pub lines_received: usize,
}

pub async fn record_purchase(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    let lines: Vec<(Uuid, Qty)> = body
        .lines
        .iter()
        .map(|line| (line.ingredient_id, line.quantity))
        .collect();

    let actor = actor_from_headers(&headers);
    state
        .repo
        .record_purchase(&lines, actor.name.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            message: "Purchase recorded".to_string(),
            lines_received: lines.len(),
        }),
    ))
}
