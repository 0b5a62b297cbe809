//! Builds the [`RequestContext`] handed to every orchestrator call.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tollgate_core::context::RequestContext;

use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Request metadata plus the operation deadline from
/// [`ServerConfig::operation_deadline`](crate::config::ServerConfig::operation_deadline)
/// and a cancellation token that fires on forced shutdown.
#[derive(Debug, Clone)]
pub struct RequestCtx(pub RequestContext);

fn header(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// First hop of `X-Forwarded-For`, else the socket peer address.
fn client_ip(parts: &Parts) -> Option<String> {
    header(&parts.headers, FORWARDED_FOR_HEADER)
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

impl FromRequestParts<AppState> for RequestCtx {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let mut ctx = RequestContext::new()
            .with_timeout(state.config.operation_deadline())
            .with_cancel_token(state.shutdown.child_token());

        if let Some(id) = header(&parts.headers, REQUEST_ID_HEADER) {
            ctx = ctx.with_request_id(id);
        }
        if let Some(agent) = header(&parts.headers, USER_AGENT) {
            ctx = ctx.with_user_agent(agent);
        }
        if let Some(ip) = client_ip(parts) {
            ctx = ctx.with_ip_address(ip);
        }

        Ok(RequestCtx(ctx))
    }
}
