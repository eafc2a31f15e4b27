//! Sale endpoints.
//!
//! ```text
//! POST /sales          commit an order          → 201 SaleResponse
//! GET  /sales          newest first, paginated  → 200 SaleListResponse
//! GET  /sales/{id}     one sale with COGS       → 200 SaleDetailResponse
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::AppState;
use larder_core::{CommittedSale, MenuItemId, OrderLine, Sale, SaleCostLog, SaleDetail, SaleId};
use larder_db::DbError;

// =============================================================================
// DTOs
// =============================================================================
//
// Money crosses the wire as integer cents: a line's `subtotal` is
// `subtotalCents` and a sale's `totalAmount` is `totalAmountCents`.

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub lines: Vec<OrderLine>,
}

/// One sale line; `subtotalCents` = `unitPriceCents` × `quantity`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineResponse {
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<&SaleDetail> for SaleLineResponse {
    fn from(detail: &SaleDetail) -> Self {
        SaleLineResponse {
            menu_item_id: detail.menu_item_id,
            quantity: detail.quantity,
            unit_price_cents: detail.unit_price_cents,
            subtotal_cents: detail.subtotal_cents,
        }
    }
}

/// A committed sale. `totalAmountCents` is the sale total in cents.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub sale_id: SaleId,
    pub sale_date: DateTime<Utc>,
    pub total_amount_cents: i64,
    pub lines: Vec<SaleLineResponse>,
}

impl From<&CommittedSale> for SaleResponse {
    fn from(committed: &CommittedSale) -> Self {
        SaleResponse {
            sale_id: committed.sale.id,
            sale_date: committed.sale.sale_date,
            total_amount_cents: committed.sale.total_cents,
            lines: committed.details.iter().map(SaleLineResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLogResponse {
    pub sale_detail_id: i64,
    pub store_item_id: i64,
    pub quantity_used: i64,
    pub cost_at_time_of_sale_cents: i64,
}

impl From<&SaleCostLog> for CostLogResponse {
    fn from(log: &SaleCostLog) -> Self {
        CostLogResponse {
            sale_detail_id: log.sale_detail_id,
            store_item_id: log.store_item_id,
            quantity_used: log.quantity_used,
            cost_at_time_of_sale_cents: log.cost_at_time_of_sale_cents,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetailResponse {
    #[serde(flatten)]
    pub sale: SaleResponse,
    pub cost_logs: Vec<CostLogResponse>,
    pub cost_of_goods_cents: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleSummary {
    pub sale_id: SaleId,
    pub sale_date: DateTime<Utc>,
    pub total_amount_cents: i64,
}

impl From<&Sale> for SaleSummary {
    fn from(sale: &Sale) -> Self {
        SaleSummary {
            sale_id: sale.id,
            sale_date: sale.sale_date,
            total_amount_cents: sale.total_cents,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSalesQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleListResponse {
    pub data: Vec<SaleSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn create_sale(
    State(state): State<AppState>,
    Json(body): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), ApiError> {
    let committed = state.db.sale_commits().commit(&body.lines).await?;
    Ok((StatusCode::CREATED, Json(SaleResponse::from(&committed))))
}

pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<ListSalesQuery>,
) -> Result<Json<SaleListResponse>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.sales_page_size_limit.max(1);
    let per_page = query.per_page.unwrap_or(20).max(1).min(limit);

    let result = state.db.sales().list(page, per_page).await?;

    Ok(Json(SaleListResponse {
        data: result.sales.iter().map(SaleSummary::from).collect(),
        total: result.total,
        page: result.page,
        per_page: result.per_page,
    }))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<SaleId>,
) -> Result<Json<SaleDetailResponse>, ApiError> {
    let committed = state
        .db
        .sales()
        .get_committed(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", id))?;

    // Stored rows that cannot be totalled are a server-side fault
    let cost_of_goods = committed
        .cost_of_goods()
        .map_err(|e| ApiError::database(&DbError::Invalid(e)))?;

    Ok(Json(SaleDetailResponse {
        sale: SaleResponse::from(&committed),
        cost_logs: committed.cost_logs.iter().map(CostLogResponse::from).collect(),
        cost_of_goods_cents: cost_of_goods.cents(),
    }))
}
