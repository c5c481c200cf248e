use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// Why a request was terminated with an error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    PhpProbe,
    BlockedPath,
    RateLimited,
}

impl BlockReason {
    pub fn status(self) -> StatusCode {
        match self {
            BlockReason::PhpProbe | BlockReason::BlockedPath => StatusCode::FORBIDDEN,
            BlockReason::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Plaintext body sent to the client. Deliberately says nothing about rules.
    pub fn body(self) -> &'static str {
        match self {
            BlockReason::PhpProbe | BlockReason::BlockedPath => "Forbidden",
            BlockReason::RateLimited => "Too Many Requests",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockReason::PhpProbe => "php_probe",
            BlockReason::BlockedPath => "blocked_path",
            BlockReason::RateLimited => "rate_limited",
        }
    }
}

/// Why a request was sent elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    AdminUnauthenticated,
    UnsafeRedirectTarget,
}

impl RedirectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RedirectReason::AdminUnauthenticated => "admin_unauthenticated",
            RedirectReason::UnsafeRedirectTarget => "unsafe_redirect_target",
        }
    }
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Continue to the application unmodified.
    Pass,
    /// Terminate with an error status and short plaintext body.
    Block { reason: BlockReason },
    /// Terminate with a temporary redirect.
    Redirect { location: String, reason: RedirectReason },
}

impl Decision {
    pub fn block(reason: BlockReason) -> Self {
        Decision::Block { reason }
    }

    pub fn redirect(location: impl Into<String>, reason: RedirectReason) -> Self {
        Decision::Redirect {
            location: location.into(),
            reason,
        }
    }

    /// Status the client will see; 200 stands for pass-through.
    pub fn status(&self) -> StatusCode {
        match self {
            Decision::Pass => StatusCode::OK,
            Decision::Block { reason } => reason.status(),
            Decision::Redirect { .. } => StatusCode::FOUND,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Decision::Pass => "pass",
            Decision::Block { .. } => "block",
            Decision::Redirect { .. } => "redirect",
        }
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Decision::Pass => None,
            Decision::Block { reason } => Some(reason.as_str()),
            Decision::Redirect { reason, .. } => Some(reason.as_str()),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Decision::Pass)
    }
}

impl IntoResponse for Decision {
    fn into_response(self) -> Response {
        match self {
            Decision::Pass => StatusCode::OK.into_response(),
            Decision::Block { reason } => (reason.status(), reason.body()).into_response(),
            Decision::Redirect { location, .. } => {
                (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
            }
        }
    }
}
