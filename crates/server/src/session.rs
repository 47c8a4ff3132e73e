// Request session: who owns the records a request touches and whether the
// caller wants generated output persisted.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

pub const OWNER_HEADER: &str = "x-gpulaw-owner";
pub const SESSION_HEADER: &str = "x-gpulaw-session";

/// Configured placeholder identity, provided to the extractor through state.
#[derive(Debug, Clone)]
pub struct DefaultOwner(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionKind {
    /// Generated documents are persisted when a case is supplied.
    #[default]
    Durable,
    /// Nothing generated in this session is ever persisted.
    Ephemeral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub owner_id: String,
    pub kind: SessionKind,
}

impl Session {
    pub fn persists_generation(&self) -> bool {
        self.kind == SessionKind::Durable
    }
}

impl<S> FromRequestParts<S> for Session
where
    DefaultOwner: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let DefaultOwner(default_owner) = DefaultOwner::from_ref(state);

        let owner_id = header_value(parts, OWNER_HEADER).unwrap_or(default_owner);
        let kind = match header_value(parts, SESSION_HEADER) {
            Some(value) if value.eq_ignore_ascii_case("ephemeral") => SessionKind::Ephemeral,
            _ => SessionKind::Durable,
        };

        Ok(Session { owner_id, kind })
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
