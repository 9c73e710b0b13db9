//! Request identity.
//!
//! Customer login happens upstream; the proxy forwards the customer id in
//! `x-customer-id`. Guests carry a cart session uuid in `x-cart-session`,
//! minted here on their first cart write and echoed back in the response.
//! Admin calls carry `Authorization: Bearer <token>`.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use mj_db::CartOwner;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub const CUSTOMER_HEADER: &str = "x-customer-id";
pub const SESSION_HEADER: &str = "x-cart-session";

/// Customer id from the trusted header. Absent is `Ok(None)`; garbage is 400.
pub fn customer_id(headers: &HeaderMap) -> Result<Option<i64>, ApiError> {
    let Some(raw) = headers.get(CUSTOMER_HEADER) else {
        return Ok(None);
    };
    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid {CUSTOMER_HEADER} header")))
}

fn session_id(headers: &HeaderMap) -> Result<Option<Uuid>, ApiError> {
    let Some(raw) = headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    raw.to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid {SESSION_HEADER} header")))
}

/// Cart owner for read paths. `None` when the caller has no identity yet.
/// A customer id wins over a session.
pub fn cart_owner(headers: &HeaderMap) -> Result<Option<CartOwner>, ApiError> {
    if let Some(id) = customer_id(headers)? {
        return Ok(Some(CartOwner::Customer(id)));
    }
    Ok(session_id(headers)?.map(CartOwner::Guest))
}

/// Cart owner for write paths. A guest without a session gets a fresh one;
/// the second value is the session to echo back when one was minted.
pub fn cart_owner_or_mint(headers: &HeaderMap) -> Result<(CartOwner, Option<Uuid>), ApiError> {
    match cart_owner(headers)? {
        Some(owner) => Ok((owner, None)),
        None => {
            let s = Uuid::new_v4();
            Ok((CartOwner::Guest(s), Some(s)))
        }
    }
}

/// Response headers carrying a freshly minted session, if any.
pub fn session_headers(minted: Option<Uuid>) -> HeaderMap {
    let mut out = HeaderMap::new();
    if let Some(s) = minted {
        if let Ok(v) = HeaderValue::from_str(&s.to_string()) {
            out.insert(HeaderName::from_static(SESSION_HEADER), v);
        }
    }
    out
}

/// Admin gate. Fail-closed: with no token configured nothing gets in.
pub fn require_admin(st: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = st.admin_token.as_deref() else {
        return Err(ApiError::AdminClosed);
    };
    let presented = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(ApiError::Unauthorized)?;

    if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
