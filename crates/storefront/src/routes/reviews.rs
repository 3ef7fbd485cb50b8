//! Product review handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use hey_harvest_core::pagination::{DEFAULT_LIMIT, Paginated};
use hey_harvest_core::review::Eligibility;
use hey_harvest_core::{OrderId, ProductId, ReviewId};

use super::{ApiJson, ApiPath, ApiQuery, ApiResponse, page_request};
use crate::db::reviews::ReviewRepository;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Review;
use crate::services::reviews::{ReviewService, ReviewSubmission};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit))
        .route("/product/{product_id}", get(for_product))
        .route("/eligibility/{product_id}", get(eligibility))
}

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub rating: i64,
    pub title: String,
    pub comment: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedReview {
    pub review_id: ReviewId,
}

#[instrument(skip(state))]
pub async fn for_product(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiQuery(query): ApiQuery<ReviewListQuery>,
) -> Result<Json<ApiResponse<Paginated<Review>>>> {
    let reviews = ReviewRepository::new(state.pool())
        .list_for_product(product_id, page_request(query.page, query.limit, DEFAULT_LIMIT))
        .await?;
    Ok(ApiResponse::ok(reviews))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn eligibility(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<ApiResponse<Eligibility>>> {
    let eligibility = ReviewService::new(state.pool())
        .eligibility(user.id, product_id)
        .await?;
    Ok(ApiResponse::ok(eligibility))
}

/// Submit a review for a delivered purchase.
#[instrument(skip(state, user, body), fields(user_id = %user.id, product_id = %body.product_id))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<ReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubmittedReview>>)> {
    let product_id = body.product_id;
    let review_id = ReviewService::new(state.pool())
        .submit(
            user.id,
            ReviewSubmission {
                product_id,
                order_id: body.order_id,
                rating: body.rating,
                title: body.title,
                comment: body.comment,
                images: body.images,
            },
        )
        .await?;

    // Rating aggregates changed.
    state.catalog().invalidate(product_id).await;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Thank you for your review", SubmittedReview { review_id }),
    ))
}
