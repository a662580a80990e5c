use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{actor_from_headers, AppState};
use crate::db::repo::{ItemRequest, OrderFilter};
use crate::domain::{
    format_order_number, Money, OrderPaymentStatus, OrderStatus, OrderType, PaymentMethod,
};
use crate::error::AppError;

// =============================================================================
// Create
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub order_type: String,
    pub session_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub id: Uuid,
    pub order_id: String,
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), AppError> {
    let order_type = OrderType::parse(body.order_type.trim().to_uppercase().as_str())
        .ok_or_else(|| AppError::BadRequest("Invalid order type".to_string()))?;

    let order = state
        .repo
        .create_order(
            order_type,
            body.session_id,
            body.customer_name.as_deref(),
            body.customer_phone.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            id: order.id,
            order_id: format_order_number(order.order_number),
        }),
    ))
}

// =============================================================================
// Items (replace-all)
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub product_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceItemsRequest {
    pub items: Vec<ItemDto>,
    pub discount_amount: Option<Money>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceItemsResponse {
    pub message: String,
    pub total: String,
}

pub async fn replace_items(
    Path(order_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<ReplaceItemsRequest>,
) -> Result<Json<ReplaceItemsResponse>, AppError> {
    let items: Vec<ItemRequest> = body
        .items
        .iter()
        .map(|i| ItemRequest {
            product_id: i.product_id,
            combo_id: i.combo_id,
            quantity: i.quantity,
        })
        .collect();

    let total = state
        .repo
        .replace_items(order_id, &items, body.discount_amount)
        .await?;

    Ok(Json(ReplaceItemsResponse {
        message: "Items added successfully".to_string(),
        total: total.to_canonical_string(),
    }))
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    pub method: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayResponse {
    pub message: String,
    pub bill_number: String,
    pub final_amount: String,
}

pub async fn pay_order(
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(body): Json<PayRequest>,
) -> Result<Json<PayResponse>, AppError> {
    let method = PaymentMethod::parse(body.method.trim().to_uppercase().as_str())
        .ok_or_else(|| AppError::BadRequest("Invalid payment method".to_string()))?;

    let actor = actor_from_headers(&headers);
    let outcome = state
        .repo
        .settle_order(order_id, method, actor.name.as_deref())
        .await?;

    // Invoice delivery happens after the commit and never affects the result.
    if state.notifier.is_configured() {
        if let Some(phone) = outcome.customer_phone.clone() {
            let notifier = state.notifier.clone();
            let bill = outcome.bill_number.clone();
            let name = outcome.customer_name.clone();
            let total = outcome.final_amount;
            tokio::spawn(async move {
                notifier
                    .send_invoice(&bill, name.as_deref(), &phone, total)
                    .await;
            });
        }
    }

    Ok(Json(PayResponse {
        message: "Payment successful".to_string(),
        bill_number: outcome.bill_number,
        final_amount: outcome.final_amount.to_canonical_string(),
    }))
}

// =============================================================================
// Cancel / status
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub id: Uuid,
    pub status: String,
    pub message: String,
}

pub async fn cancel_order(
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<CancelResponse>, AppError> {
    let actor = actor_from_headers(&headers);
    if !actor.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins can cancel orders".to_string(),
        ));
    }

    state.repo.cancel_order(order_id).await?;

    Ok(Json(CancelResponse {
        id: order_id,
        status: OrderStatus::Cancelled.as_str().to_string(),
        message: "Order cancelled".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub id: Uuid,
    pub status: String,
}

pub async fn update_status(
    Path(order_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let next = OrderStatus::parse(body.status.trim().to_uppercase().as_str())
        .ok_or_else(|| AppError::BadRequest("Invalid status value".to_string()))?;

    let order = state.repo.update_order_status(order_id, next).await?;

    Ok(Json(StatusResponse {
        id: order.id,
        status: order.status.as_str().to_string(),
    }))
}

// =============================================================================
// Detail / list
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    pub product_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    pub quantity: i64,
    pub base_price: String,
    pub gst_percent: String,
    pub gst_amount: String,
    pub price_at_time: String,
    pub line_total: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailResponse {
    pub id: Uuid,
    pub order_id: String,
    pub bill_number: Option<String>,
    pub order_type: String,
    pub table_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub total_amount: String,
    pub discount_amount: String,
    pub items: Vec<OrderItemDto>,
}

pub async fn get_order(
    Path(order_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<OrderDetailResponse>, AppError> {
    let order = state
        .repo
        .get_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    let items = state
        .repo
        .get_order_items(order_id)
        .await?
        .into_iter()
        .map(|item| OrderItemDto {
            product_id: item.product_id,
            combo_id: item.combo_id,
            quantity: item.quantity,
            base_price: item.base_price.to_canonical_string(),
            gst_percent: item.gst_percent.to_canonical_string(),
            gst_amount: item.gst_amount.to_canonical_string(),
            price_at_time: item.price_at_time.to_canonical_string(),
            line_total: item.line_total().to_canonical_string(),
        })
        .collect();

    Ok(Json(OrderDetailResponse {
        id: order.id,
        order_id: format_order_number(order.order_number),
        bill_number: order.bill_number,
        order_type: order.order_type.as_str().to_string(),
        table_id: order.table_id,
        session_id: order.session_id,
        customer_name: order.customer_name,
        customer_phone: order.customer_phone,
        status: order.status.as_str().to_string(),
        payment_status: order.payment_status.as_str().to_string(),
        total_amount: order.total_amount.to_canonical_string(),
        discount_amount: order.discount_amount.to_canonical_string(),
        items,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    pub filter: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryDto {
    pub id: Uuid,
    pub order_id: String,
    pub bill_number: Option<String>,
    pub order_type: String,
    pub status: String,
    pub payment_status: String,
    pub total_amount: String,
    pub customer_name: Option<String>,
}

pub async fn list_orders(
    Query(params): Query<ListOrdersQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderSummaryDto>>, AppError> {
    let filter = match params.filter.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(key) => Some(
            OrderFilter::parse(&key.to_lowercase())
                .ok_or_else(|| AppError::BadRequest("Invalid filter".to_string()))?,
        ),
    };

    let statuses = parse_csv(params.status.as_deref(), |s| OrderStatus::parse(s))
        .map_err(|v| AppError::BadRequest(format!("Invalid status value: {}", v)))?;
    let payment_statuses = parse_csv(params.payment_status.as_deref(), |s| {
        OrderPaymentStatus::parse(s)
    })
    .map_err(|v| AppError::BadRequest(format!("Invalid payment status value: {}", v)))?;

    let limit = params.limit.unwrap_or(50).clamp(1, 200);

    let orders = state
        .repo
        .list_orders(filter, &statuses, &payment_statuses, limit)
        .await?;

    Ok(Json(
        orders
            .into_iter()
            .map(|order| OrderSummaryDto {
                id: order.id,
                order_id: format_order_number(order.order_number),
                bill_number: order.bill_number,
                order_type: order.order_type.as_str().to_string(),
                status: order.status.as_str().to_string(),
                payment_status: order.payment_status.as_str().to_string(),
                total_amount: order.total_amount.to_canonical_string(),
                customer_name: order.customer_name,
            })
            .collect(),
    ))
}

fn parse_csv<T>(input: Option<&str>, parse: impl Fn(&str) -> Option<T>) -> Result<Vec<T>, String> {
    let Some(input) = input else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for part in input.split(',') {
        let part = part.trim().to_uppercase();
        if part.is_empty() {
            continue;
        }
        match parse(&part) {
            Some(value) => out.push(value),
            None => return Err(part),
        }
    }
    Ok(out)
}

// =============================================================================
// Invoice
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineDto {
    pub name: String,
    pub quantity: i64,
    pub base_price: String,
    pub gst_percent: String,
    pub gst_amount: String,
    pub line_total: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub bill_number: Option<String>,
    pub order_type: String,
    pub customer_name: Option<String>,
    pub subtotal: String,
    pub total_gst: String,
    pub grand_total: String,
    pub discount: String,
    pub final_amount: String,
    pub payment_method: Option<String>,
    pub payment_status: String,
    pub items: Vec<InvoiceLineDto>,
}

pub async fn get_invoice(
    Path(order_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let order = state
        .repo
        .get_order(order_id)
        .await?
        .filter(|o| o.status == OrderStatus::Completed)
        .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))?;

    let items = state.repo.get_order_items(order_id).await?;
    let payment = state.repo.get_success_payment(order_id).await?;

    let mut subtotal = Money::zero();
    let mut total_gst = Money::zero();
    let mut grand_total = Money::zero();
    let mut lines = Vec::with_capacity(items.len());

    for item in &items {
        let base_total = item.base_price.times(item.quantity);
        let gst_total = item.gst_amount.times(item.quantity);
        let line_total = item.line_total();
        subtotal = subtotal + base_total;
        total_gst = total_gst + gst_total;
        grand_total = grand_total + line_total;

        let name = match (item.product_id, item.combo_id) {
            (Some(id), _) => state.repo.product_name(id).await?.unwrap_or_default(),
            (None, Some(id)) => state.repo.combo_name(id).await?.unwrap_or_default(),
            (None, None) => String::new(),
        };

        lines.push(InvoiceLineDto {
            name,
            quantity: item.quantity,
            base_price: item.base_price.to_canonical_string(),
            gst_percent: item.gst_percent.to_canonical_string(),
            gst_amount: item.gst_amount.to_canonical_string(),
            line_total: line_total.to_canonical_string(),
        });
    }

    let final_amount = grand_total.saturating_sub(order.discount_amount);

    Ok(Json(InvoiceResponse {
        bill_number: order.bill_number,
        order_type: order.order_type.as_str().to_string(),
        customer_name: order.customer_name,
        subtotal: subtotal.to_canonical_string(),
        total_gst: total_gst.to_canonical_string(),
        grand_total: grand_total.to_canonical_string(),
        discount: order.discount_amount.to_canonical_string(),
        final_amount: final_amount.to_canonical_string(),
        payment_method: payment.map(|p| p.method.as_str().to_string()),
        payment_status: order.payment_status.as_str().to_string(),
        items: lines,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInvoiceResponse {
    pub message: String,
}

pub async fn send_invoice(
    Path(order_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<SendInvoiceResponse>, AppError> {
    let order = state
        .repo
        .get_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if order.payment_status != OrderPaymentStatus::Paid {
        return Err(AppError::Conflict("Order not paid yet".to_string()));
    }
    let Some(phone) = order.customer_phone.as_deref() else {
        return Err(AppError::BadRequest(
            "Customer phone not available".to_string(),
        ));
    };
    let Some(bill_number) = order.bill_number.as_deref() else {
        return Err(AppError::Internal("Order has no bill number".to_string()));
    };

    let sent = state
        .notifier
        .send_invoice(
            bill_number,
            order.customer_name.as_deref(),
            phone,
            order.final_amount(),
        )
        .await;

    if !sent {
        return Err(AppError::Internal(
            "Failed to send invoice notification".to_string(),
        ));
    }

    Ok(Json(SendInvoiceResponse {
        message: "Invoice sent".to_string(),
    }))
}
