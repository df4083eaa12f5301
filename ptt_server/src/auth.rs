//! Access tokens.
//!
//! A user trades their API key at `/auth` for a short-lived HS256 JWT. The token carries the user, their organization
//! and their roles, so that `/api` requests need no database round trip to authenticate.
use std::{
    future::{ready, Ready},
    sync::Arc,
};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    prelude::*,
};
use log::debug;
use ptt_engine::db_types::{Actor, Role, Roles};
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub user_id: i64,
    pub org_id: i64,
    pub roles: Roles,
}

impl JwtClaims {
    pub fn new(user_id: i64, org_id: i64, roles: Roles) -> Self {
        Self { user_id, org_id, roles }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// The identity the engine acts for.
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.org_id, self.roles.clone())
    }
}

impl From<Actor> for JwtClaims {
    fn from(actor: Actor) -> Self {
        Self { user_id: actor.user_id, org_id: actor.org_id, roles: actor.roles }
    }
}

/// Handlers take `JwtClaims` as an argument. The claims are placed in the request extensions by
/// [`crate::middleware::JwtMiddlewareFactory`], so this only works on routes behind that middleware.
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned();
        ready(claims.ok_or(ServerError::AuthenticationError(AuthError::MissingToken)))
    }
}

fn signing_key(config: &AuthConfig) -> Hs256Key {
    Hs256Key::new(config.jwt_secret.reveal().as_bytes())
}

pub struct TokenIssuer {
    key: Hs256Key,
    expiry: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: signing_key(config), expiry: config.token_expiry }
    }

    /// Issue a new access token for the given actor.
    /// This method DOES NOT check that the actor is legitimate. That must be done (with the API key) before calling
    /// `issue_token`.
    pub fn issue_token(&self, actor: Actor, duration: Option<chrono::Duration>) -> Result<String, ServerError> {
        let claims = JwtClaims::from(actor);
        let time_options = TimeOptions::default();
        let duration = duration.unwrap_or(self.expiry);
        let claims = Claims::new(claims).set_duration_and_issuance(&time_options, duration);
        let header = Header::empty().with_token_type("JWT");
        Hs256.token(&header, &claims, &self.key).map_err(|e| ServerError::CouldNotSerializeAccessToken(e.to_string()))
    }
}

/// Validates access tokens. Cheap to clone; the middleware keeps one per worker.
#[derive(Clone)]
pub struct TokenVerifier {
    key: Arc<Hs256Key>,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: Arc::new(signing_key(config)) }
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let untrusted = UntrustedToken::new(token).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let token: Token<JwtClaims> = Hs256
            .validator(self.key.as_ref())
            .validate(&untrusted)
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        let time_options = TimeOptions::default();
        token.claims().validate_expiration(&time_options).map_err(|e| AuthError::ValidationError(e.to_string()))?;
        let (_, claims) = token.into_parts();
        debug!("🔑️ Access token validated for user #{}", claims.custom.user_id);
        Ok(claims.custom)
    }
}
