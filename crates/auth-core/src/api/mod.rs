//! Axum integration for the request gate
//!
//! Routing and handlers belong to the embedding application; this module
//! only runs the [`RequestAuthenticator`] and carries the resulting
//! [`AuthContext`] through the request as an extension — an explicit value,
//! not ambient per-request state.

use std::convert::Infallible;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::authn::{AuthContext, RequestAuthenticator};

/// Middleware for `axum::middleware::from_fn_with_state`: authenticates the
/// request and injects the outcome. Anonymous requests pass through.
pub async fn authenticate_request(
    State(authenticator): State<Arc<RequestAuthenticator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let context = authenticator.authenticate(authorization.as_deref()).await;
    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Handlers take `AuthContext` as an extractor. A request that never passed
/// the middleware reads as anonymous.
#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .unwrap_or(AuthContext::Anonymous))
    }
}
