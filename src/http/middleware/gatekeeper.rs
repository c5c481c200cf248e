//! Gatekeeper middleware.
//! Runs every non-excluded request through [`Gatekeeper::evaluate`].

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::gatekeeper::{Decision, Gatekeeper};

pub async fn gatekeeper_middleware(
    State(gatekeeper): State<Arc<Gatekeeper>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Excluded paths (static assets, the log endpoint) skip evaluation and logging.
    if gatekeeper.is_excluded(request.uri().path()) {
        return next.run(request).await;
    }

    match gatekeeper.evaluate(&request) {
        Decision::Pass => next.run(request).await,
        decision => decision.into_response(),
    }
}
