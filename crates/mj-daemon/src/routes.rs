//! Axum router and storefront HTTP handlers for mj-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Admin handlers live in `admin.rs`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mj_catalog::ProductFilter;
use mj_checkout::{CartAdjustment, CheckoutRequest};
use mj_db::{
    AddOutcome, CheckoutPreview, CreateCustomerOutcome, DecrementOutcome, NewCustomer,
    PlaceOrderOutcome, ProfileUpdate,
};
use mj_notify::OrderConfirmation;
use sqlx::PgPool;
use tracing::info;

use crate::{
    admin,
    api_types::{
        CartAction, CartAdjustedResponse, CartClearedResponse, CartCountResponse,
        CartItemRequest, CartResponse, CheckoutQuery, HealthResponse, OrderDetailResponse,
        OrderPlacedResponse, ProductDetailResponse, StockQuery, StockResponse,
    },
    error::ApiError,
    identity::{cart_owner, cart_owner_or_mint, customer_id, session_headers},
    state::{uptime_secs, AppState, BusMsg},
};

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        // catalog
        .route("/v1/products", get(products))
        .route("/v1/products/featured", get(featured))
        .route("/v1/products/:id", get(product_detail))
        .route("/v1/categories/:slug/products", get(category_products))
        .route("/v1/filters", get(filters))
        .route("/v1/stock", get(stock))
        // cart
        .route("/v1/cart", get(cart).delete(cart_clear))
        .route("/v1/cart/count", get(cart_count))
        .route(
            "/v1/cart/items/:product_id",
            post(cart_item_update).delete(cart_item_remove),
        )
        // checkout
        .route("/v1/checkout", get(checkout_preview).post(checkout_place))
        .route("/v1/tracking/:order_id/:token", get(tracking))
        // customers
        .route("/v1/profile", get(profile).put(profile_update))
        .route("/v1/customers", post(customer_create))
        .merge(admin::admin_routes())
        .with_state(state)
}

/// The pool, or 503 when the daemon runs without a database.
pub(crate) fn db(st: &AppState) -> ApiResult<&PgPool> {
    st.db.as_ref().ok_or(ApiError::DbUnavailable)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            uptime_secs: uptime_secs(),
            db_configured: st.db.is_some(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub(crate) async fn products(
    State(st): State<Arc<AppState>>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Response> {
    let list = mj_db::list_products(db(&st)?, &filter).await?;
    Ok(Json(list).into_response())
}

pub(crate) async fn featured(State(st): State<Arc<AppState>>) -> ApiResult<Response> {
    let list = mj_db::featured_products(db(&st)?, st.config.catalog.featured_limit).await?;
    Ok(Json(list).into_response())
}

pub(crate) async fn product_detail(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let pool = db(&st)?;
    let product = mj_db::fetch_product(pool, id)
        .await?
        .ok_or(ApiError::NotFound("product"))?;
    let related = mj_db::related_products(pool, id, st.config.catalog.related_limit).await?;
    Ok(Json(ProductDetailResponse { product, related }).into_response())
}

pub(crate) async fn category_products(
    State(st): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<Response> {
    let listing = mj_db::products_by_category(db(&st)?, &slug).await?;
    Ok(Json(listing).into_response())
}

pub(crate) async fn filters(State(st): State<Arc<AppState>>) -> ApiResult<Response> {
    let opts = mj_db::filter_options(db(&st)?).await?;
    Ok(Json(opts).into_response())
}

/// Live stock for the product page's quantity picker.
pub(crate) async fn stock(
    State(st): State<Arc<AppState>>,
    Query(q): Query<StockQuery>,
) -> ApiResult<Response> {
    let ids = parse_ids(&q.ids)?;
    let pool = db(&st)?;
    let stock = mj_db::stock_levels(pool, &ids).await?;
    Ok(Json(StockResponse { stock }).into_response())
}

fn parse_ids(raw: &str) -> ApiResult<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("invalid product id: {s}")))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

pub(crate) async fn cart(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let pool = db(&st)?;
    let Some(owner) = cart_owner(&headers)? else {
        // No identity yet: nothing to look up.
        return Ok(Json(CartResponse {
            lines: Vec::new(),
            item_count: 0,
            subtotal_cents: 0,
        })
        .into_response());
    };
    let cart_id = mj_db::resolve_cart(pool, owner)
        .await?
        .ok_or(ApiError::NotFound("customer"))?;

    let lines = mj_db::cart_lines(pool, cart_id).await?;
    let item_count = lines.iter().map(|l| i64::from(l.quantity)).sum();
    let subtotal_cents = lines.iter().map(|l| l.line_total_cents()).sum();
    Ok(Json(CartResponse {
        lines,
        item_count,
        subtotal_cents,
    })
    .into_response())
}

pub(crate) async fn cart_count(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let pool = db(&st)?;
    let count = match cart_owner(&headers)? {
        Some(owner) => match mj_db::resolve_cart(pool, owner).await? {
            Some(cart_id) => mj_db::cart_item_count(pool, cart_id).await?,
            None => 0,
        },
        None => 0,
    };
    Ok(Json(CartCountResponse { count }).into_response())
}

/// `{action: "add", quantity}` adds units; `{action: "remove"}` takes one off.
pub(crate) async fn cart_item_update(
    State(st): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<CartItemRequest>,
) -> ApiResult<Response> {
    let pool = db(&st)?;
    let (owner, minted) = cart_owner_or_mint(&headers)?;
    let echo = session_headers(minted);

    match req.action {
        CartAction::Add => {
            let outcome = mj_db::add_to_cart(pool, owner, product_id, req.quantity).await?;
            let status = match &outcome {
                AddOutcome::Added { .. } => StatusCode::OK,
                AddOutcome::InvalidQuantity => StatusCode::BAD_REQUEST,
                AddOutcome::ProductNotFound | AddOutcome::UnknownCustomer => StatusCode::NOT_FOUND,
                AddOutcome::InsufficientStock { .. } | AddOutcome::LimitReached { .. } => {
                    StatusCode::CONFLICT
                }
            };
            Ok((status, echo, Json(outcome)).into_response())
        }
        CartAction::Remove => {
            let cart_id = mj_db::resolve_cart(pool, owner)
                .await?
                .ok_or(ApiError::NotFound("customer"))?;
            let outcome = mj_db::decrement_cart_item(pool, cart_id, product_id).await?;
            let status = match outcome {
                DecrementOutcome::NotInCart => StatusCode::NOT_FOUND,
                _ => StatusCode::OK,
            };
            Ok((status, echo, Json(outcome)).into_response())
        }
    }
}

pub(crate) async fn cart_item_remove(
    State(st): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let pool = db(&st)?;
    let owner = cart_owner(&headers)?.ok_or(ApiError::NotFound("cart"))?;
    let cart_id = mj_db::resolve_cart(pool, owner)
        .await?
        .ok_or(ApiError::NotFound("customer"))?;

    if mj_db::remove_cart_item(pool, cart_id, product_id).await? {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Err(ApiError::NotFound("cart line"))
    }
}

pub(crate) async fn cart_clear(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let pool = db(&st)?;
    let removed_lines = match cart_owner(&headers)? {
        Some(owner) => match mj_db::resolve_cart(pool, owner).await? {
            Some(cart_id) => mj_db::clear_cart(pool, cart_id).await?,
            None => return Err(ApiError::NotFound("customer")),
        },
        None => 0,
    };
    Ok(Json(CartClearedResponse { removed_lines }).into_response())
}

// ---------------------------------------------------------------------------
// Checkout
// ---------------------------------------------------------------------------

/// Gatekeeper + quote. A cart that had to be adjusted comes back as 409 so
/// the client shows the notices and re-renders the cart.
pub(crate) async fn checkout_preview(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<CheckoutQuery>,
) -> ApiResult<Response> {
    let pool = db(&st)?;
    let owner = cart_owner(&headers)?.ok_or(ApiError::BadRequest("cart is empty".into()))?;
    let policy = st.config.shipping_policy();

    match mj_db::prepare_checkout(pool, owner, q.shipping, &policy).await? {
        CheckoutPreview::Empty => Err(ApiError::BadRequest("cart is empty".into())),
        CheckoutPreview::UnknownCustomer => Err(ApiError::NotFound("customer")),
        CheckoutPreview::Adjusted { adjustments } => Ok(cart_adjusted(adjustments)),
        ready @ CheckoutPreview::Ready { .. } => Ok(Json(ready).into_response()),
    }
}

fn cart_adjusted(adjustments: Vec<CartAdjustment>) -> Response {
    let messages = adjustments.iter().map(|a| a.message()).collect();
    (
        StatusCode::CONFLICT,
        Json(CartAdjustedResponse {
            error: "stock changed; review your cart".to_string(),
            code: "CART_ADJUSTED".to_string(),
            adjustments,
            messages,
        }),
    )
        .into_response()
}

/// Place the order. The confirmation is sent after commit and can never
/// fail the request.
pub(crate) async fn checkout_place(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<Response> {
    let pool = db(&st)?;
    let owner = cart_owner(&headers)?.ok_or(ApiError::BadRequest("cart is empty".into()))?;
    let policy = st.config.shipping_policy();

    let placed = match mj_db::place_order(pool, owner, &req, &policy).await? {
        PlaceOrderOutcome::Placed(p) => p,
        PlaceOrderOutcome::EmptyCart => return Err(ApiError::BadRequest("cart is empty".into())),
        PlaceOrderOutcome::UnknownCustomer => return Err(ApiError::NotFound("customer")),
        PlaceOrderOutcome::CartAdjusted { adjustments } => return Ok(cart_adjusted(adjustments)),
        PlaceOrderOutcome::Rejected(e) => return Err(ApiError::BadRequest(e.to_string())),
    };

    let confirmation = OrderConfirmation::for_order(&st.config, &placed);
    mj_notify::dispatch_best_effort(Arc::clone(&st.notifier), confirmation);

    let _ = st.bus.send(BusMsg::OrderPlaced {
        order_id: placed.order_id,
        total_cents: placed.quote.total_cents,
        guest: owner.customer_id().is_none(),
    });
    info!(order_id = placed.order_id, "checkout/place");

    let tracking_url = st
        .config
        .tracking_url(placed.order_id, placed.tracking_token.as_str());
    Ok((
        StatusCode::CREATED,
        Json(OrderPlacedResponse {
            order_id: placed.order_id,
            status: placed.status,
            shipping: placed.shipping,
            payment: placed.payment,
            paid: placed.paid,
            destination: placed.destination,
            subtotal_cents: placed.quote.subtotal_cents,
            shipping_cents: placed.quote.shipping_cents,
            total_cents: placed.quote.total_cents,
            tracking_token: placed.tracking_token.as_str().to_string(),
            tracking_url,
        }),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// GET /v1/tracking/:order_id/:token
// ---------------------------------------------------------------------------

/// Guest order lookup. A wrong token is indistinguishable from a missing order.
pub(crate) async fn tracking(
    State(st): State<Arc<AppState>>,
    Path((order_id, token)): Path<(i64, String)>,
) -> ApiResult<Response> {
    let pool = db(&st)?;
    let order = mj_db::fetch_order_for_tracking(pool, order_id, &token)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    let lines = mj_db::order_lines(pool, order_id).await?;
    let history = mj_db::order_history(pool, order_id).await?;
    Ok(Json(OrderDetailResponse {
        order,
        lines,
        history,
    })
    .into_response())
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

pub(crate) async fn profile(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let pool = db(&st)?;
    let id = customer_id(&headers)?.ok_or(ApiError::IdentityRequired)?;
    let c = mj_db::fetch_customer(pool, id)
        .await?
        .ok_or(ApiError::NotFound("customer"))?;
    Ok(Json(c).into_response())
}

pub(crate) async fn profile_update(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(upd): Json<ProfileUpdate>,
) -> ApiResult<Response> {
    let pool = db(&st)?;
    let id = customer_id(&headers)?.ok_or(ApiError::IdentityRequired)?;
    if matches!(upd.full_name.as_deref().map(str::trim), Some("")) {
        return Err(ApiError::BadRequest("full_name cannot be blank".into()));
    }
    let c = mj_db::update_customer_profile(pool, id, &upd)
        .await?
        .ok_or(ApiError::NotFound("customer"))?;
    Ok(Json(c).into_response())
}

/// Called by the upstream auth service when an account is created.
pub(crate) async fn customer_create(
    State(st): State<Arc<AppState>>,
    Json(new): Json<NewCustomer>,
) -> ApiResult<Response> {
    let pool = db(&st)?;
    if new.full_name.trim().is_empty() {
        return Err(ApiError::BadRequest("full_name is required".into()));
    }
    if !new.email.contains('@') {
        return Err(ApiError::BadRequest("a valid email is required".into()));
    }

    match mj_db::insert_customer(pool, &new).await? {
        CreateCustomerOutcome::Created(c) => {
            info!(customer_id = c.id, "customer created");
            Ok((StatusCode::CREATED, Json(c)).into_response())
        }
        CreateCustomerOutcome::EmailTaken => {
            Err(ApiError::Conflict("email already registered".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_ids;

    #[test]
    fn stock_ids_parse_and_reject_garbage() {
        assert_eq!(parse_ids("1, 2,3,").unwrap(), vec![1, 2, 3]);
        assert!(parse_ids("").unwrap().is_empty());
        assert!(parse_ids("1,x").is_err());
    }
}

