// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bearer-token boundary for the read API.
//!
//! Every request outside the configured allow-list must carry
//! `Authorization: Bearer <jwt>`. Claims checked: `exp` (expired tokens are
//! rejected) and authorization (`is_superuser`, or at least one entry in
//! `roles`).
//!
//! With `jwt_secret` unset the token signature is NOT verified, matching the
//! upstream identity service contract where tokens are minted and validated
//! elsewhere. Setting `jwt_secret` switches on HS256 verification.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;

/// Claims inspected at the boundary. Unknown claims are ignored.
#[derive(Debug, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub is_superuser: bool,
    pub exp: i64,
}

impl Claims {
    /// A token must grant something: superuser, or at least one role.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.is_superuser || !self.roles.is_empty()
    }
}

/// Shared verification state for the middleware.
pub struct AuthLayer {
    free_paths: Vec<String>,
    key: DecodingKey,
    validation: Validation,
}

impl AuthLayer {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        let key = match &config.jwt_secret {
            Some(secret) => DecodingKey::from_secret(secret.as_bytes()),
            None => {
                warn!("No JWT secret configured, token signatures will not be verified");
                validation.insecure_disable_signature_validation();
                DecodingKey::from_secret(&[])
            }
        };
        Self {
            free_paths: config.free_paths.clone(),
            key,
            validation,
        }
    }

    #[must_use]
    pub fn is_free(&self, path: &str) -> bool {
        self.free_paths.iter().any(|free| free == path)
    }

    /// Decode and validate a token. Expiry is always enforced.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        Ok(decode::<Claims>(token, &self.key, &self.validation)?.claims)
    }
}

/// Middleware rejecting unauthenticated requests with 401.
pub async fn require_bearer(
    State(auth): State<Arc<AuthLayer>>,
    request: Request,
    next: Next,
) -> Response {
    if auth.is_free(request.uri().path()) {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return unauthorized("Missing bearer token");
    };

    match auth.verify(token) {
        Ok(claims) if claims.is_authorized() => next.run(request).await,
        Ok(_) => unauthorized("Insufficient claims"),
        Err(err) => {
            debug!(error = %err, "Bearer token rejected");
            unauthorized("Invalid bearer token")
        }
    }
}

fn unauthorized(detail: &str) -> Response {
    crate::metrics::record_auth_rejection();
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": detail}))).into_response()
}
