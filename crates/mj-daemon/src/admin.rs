//! Admin HTTP handlers.
//!
//! Every handler starts with [`require_admin`]; the gate runs before the
//! database is touched so a closed admin surface answers the same with or
//! without a pool.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post, put},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use mj_catalog::{categories_for, validate_draft, ProductDraft, ProductFilter, Section};
use mj_checkout::OrderStatus;
use mj_db::{DeleteOutcome, SalesFilter, StatusChange};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::{
    api_types::{
        CategoryOption, OrderDetailResponse, OrderListQuery, ReorderRequest, ReorderResponse,
        SetStatusRequest, SetStatusResponse,
    },
    error::ApiError,
    identity::require_admin,
    routes::db,
    state::{AppState, BusMsg},
};

type ApiResult<T> = Result<T, ApiError>;

/// Actor recorded in the status history for admin changes.
const ADMIN_ACTOR: &str = "admin";

pub(crate) fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/admin/products", get(products_list).post(product_create))
        .route("/v1/admin/products/reorder", post(products_reorder))
        .route(
            "/v1/admin/products/:id",
            put(product_update).delete(product_delete),
        )
        .route(
            "/v1/admin/sections/:section/categories",
            get(section_categories),
        )
        .route("/v1/admin/orders", get(orders_list))
        .route("/v1/admin/orders/:id", get(order_detail))
        .route("/v1/admin/orders/:id/status", post(order_set_status))
        .route("/v1/admin/customers", get(customers_list))
        .route("/v1/admin/customers/:id", axum::routing::delete(customer_delete))
        .route("/v1/admin/sales", get(sales))
        .route("/v1/admin/stream", get(stream))
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Everything, sold out included, in manual order.
pub(crate) async fn products_list(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;
    let list = mj_db::list_products(db(&st)?, &ProductFilter::default()).await?;
    Ok(Json(list).into_response())
}

pub(crate) async fn product_create(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(draft): Json<ProductDraft>,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;
    validate_draft(&draft).map_err(ApiError::Invalid)?;

    let p = mj_db::insert_product(db(&st)?, &draft).await?;
    info!(product_id = p.id, "admin/product created");
    Ok((StatusCode::CREATED, Json(p)).into_response())
}

pub(crate) async fn product_update(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(draft): Json<ProductDraft>,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;
    validate_draft(&draft).map_err(ApiError::Invalid)?;

    let p = mj_db::update_product(db(&st)?, id, &draft)
        .await?
        .ok_or(ApiError::NotFound("product"))?;
    info!(product_id = p.id, "admin/product updated");
    Ok(Json(p).into_response())
}

pub(crate) async fn product_delete(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;
    match mj_db::delete_product(db(&st)?, id).await? {
        DeleteOutcome::Deleted => {
            info!(product_id = id, "admin/product deleted");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        DeleteOutcome::NotFound => Err(ApiError::NotFound("product")),
        DeleteOutcome::Referenced => Err(ApiError::Conflict(
            "product appears on existing orders; mark it sold out instead".into(),
        )),
    }
}

pub(crate) async fn products_reorder(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;
    let updated = mj_db::reorder_products(db(&st)?, &req.ids).await?;
    Ok(Json(ReorderResponse { updated }).into_response())
}

/// Category picker for the product form. Pure taxonomy, no database.
pub(crate) async fn section_categories(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(section): Path<String>,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;
    let section = Section::parse(&section.to_ascii_uppercase())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let opts: Vec<CategoryOption> = categories_for(section)
        .iter()
        .map(|c| CategoryOption {
            slug: *c,
            title: c.display_title(),
        })
        .collect();
    Ok(Json(opts).into_response())
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub(crate) async fn orders_list(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<OrderListQuery>,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;
    let status = q
        .status
        .as_deref()
        .map(OrderStatus::parse)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let list = mj_db::list_orders(db(&st)?, status, q.customer_id).await?;
    Ok(Json(list).into_response())
}

pub(crate) async fn order_detail(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;
    let pool = db(&st)?;
    let order = mj_db::fetch_order(pool, id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    let lines = mj_db::order_lines(pool, id).await?;
    let history = mj_db::order_history(pool, id).await?;
    Ok(Json(OrderDetailResponse {
        order,
        lines,
        history,
    })
    .into_response())
}

/// Forward-only status change. Going backwards is 409.
pub(crate) async fn order_set_status(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<SetStatusRequest>,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;
    let next = OrderStatus::parse(&req.status).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    match mj_db::set_order_status(db(&st)?, id, next, ADMIN_ACTOR, &req.notes).await? {
        StatusChange::Applied { transition, order } => {
            info!(
                order_id = id,
                from = transition.from.as_str(),
                to = transition.to.as_str(),
                "admin/order status"
            );
            let _ = st.bus.send(BusMsg::OrderStatus {
                order_id: id,
                status: order.status,
                paid: order.paid,
            });
            Ok(Json(SetStatusResponse {
                changed: true,
                order,
            })
            .into_response())
        }
        StatusChange::Unchanged(order) => Ok(Json(SetStatusResponse {
            changed: false,
            order,
        })
        .into_response()),
        StatusChange::Refused(e) => Err(ApiError::Conflict(e.to_string())),
        StatusChange::NotFound => Err(ApiError::NotFound("order")),
    }
}

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

pub(crate) async fn customers_list(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;
    let list = mj_db::list_customers(db(&st)?).await?;
    Ok(Json(list).into_response())
}

/// Their orders stay (detached from the account); the cart goes with them.
pub(crate) async fn customer_delete(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;
    if mj_db::delete_customer(db(&st)?, id).await? {
        info!(customer_id = id, "admin/customer deleted");
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Err(ApiError::NotFound("customer"))
    }
}

// ---------------------------------------------------------------------------
// GET /v1/admin/sales
// ---------------------------------------------------------------------------

pub(crate) async fn sales(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(filter): Query<SalesFilter>,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(ApiError::BadRequest("from must not be after to".into()));
        }
    }
    let report = mj_db::sales_report(db(&st)?, &filter).await?;
    Ok(Json(report).into_response())
}

// ---------------------------------------------------------------------------
// GET /v1/admin/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    require_admin(&st, &headers)?;

    let mut out = HeaderMap::new();
    out.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    out.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    Ok((out, Sse::new(events).keep_alive(KeepAlive::new())).into_response())
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::OrderPlaced { .. } => "order_placed",
                    BusMsg::OrderStatus { .. } => "order_status",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
