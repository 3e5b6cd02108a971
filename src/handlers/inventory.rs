use crate::handlers::common::success_response;
use crate::{
    services::inventory::{StockOverview, VariantStock},
    ApiResult, AppState,
};
use axum::extract::{Json, Path, State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateStockRequest {
    pub stock: i32,
}

pub async fn update_variant_stock(
    State(state): State<AppState>,
    Path(variant_id): Path<i32>,
    Json(payload): Json<UpdateStockRequest>,
) -> ApiResult<VariantStock> {
    let stock = state
        .services
        .inventory
        .update_variant_stock(variant_id, payload.stock)
        .await?;
    Ok(success_response(stock))
}

pub async fn stock_overview(State(state): State<AppState>) -> ApiResult<StockOverview> {
    let overview = state.services.inventory.stock_overview().await?;
    Ok(success_response(overview))
}
