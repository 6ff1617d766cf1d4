//! Single-use token activation
//!
//! Reads an impersonation token from the configured query parameter and, if
//! the token consumer accepts it, stages the activation payload in the
//! session for a downstream authentication step. This middleware never
//! authenticates by itself, and token failures of any kind degrade to a
//! no-op so unauthenticated or already-resolved requests are unaffected.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::json;

use crate::session::Session;
use crate::state::AppState;
use crate::tokens::IMPERSONATION_SESSION_KEY;

fn token_from_query(query: &str, param: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == param && !value.is_empty()).then(|| value.to_string())
    })
}

/// Consume an impersonation token and stage its payload, if one is present.
pub async fn activate_impersonation(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let token = req
        .uri()
        .query()
        .and_then(|q| token_from_query(q, &state.config.impersonation.query_parameter));

    let Some(token) = token else {
        return next.run(req).await;
    };

    let session = req.extensions().get::<Session>().cloned();

    match state.tokens.consume(&token).await {
        Ok(Some(activation)) => {
            tracing::info!(
                principal_id = %activation.principal_id,
                auth_guard = %activation.auth_guard,
                "impersonation token activated"
            );
            if let Some(session) = session {
                session.put(
                    IMPERSONATION_SESSION_KEY,
                    json!({
                        "principal_id": activation.principal_id,
                        "auth_guard": activation.auth_guard,
                    }),
                );
            }
        }
        Ok(None) => {
            tracing::debug!("impersonation token not accepted, continuing");
        }
        Err(err) => {
            tracing::debug!(error = %err, "impersonation token check unavailable, continuing");
        }
    }

    next.run(req).await
}
