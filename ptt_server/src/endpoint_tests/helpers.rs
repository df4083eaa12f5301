use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App, ResponseError};
use chrono::{Duration, Utc};
use log::debug;
use ptt_engine::db_types::{Actor, Money, OrgType, Organization, PttStatus, PttToken, Role};
use serde_json::json;

use crate::{
    auth::{TokenIssuer, TokenVerifier},
    config::AuthConfig,
    middleware::{JwtMiddlewareFactory, ACCESS_TOKEN_HEADER},
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new("endpoint-tests-only-f1c9e0a7b2d84c6e9a35", Duration::hours(1))
}

pub fn issue_token(user_id: i64, org_id: i64, roles: &[Role], valid_for: Duration) -> String {
    let issuer = TokenIssuer::new(&get_auth_config());
    issuer.issue_token(Actor::new(user_id, org_id, roles.to_vec()), Some(valid_for)).expect("Failed to sign token")
}

/// Sends the request through the JWT middleware and whatever `configure` registers. Errors raised by middleware are
/// rendered the way actix would render them for a client.
pub async fn send_request<F>(req: TestRequest, access_token: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let mut req = req;
    if !access_token.is_empty() {
        req = req.insert_header((ACCESS_TOKEN_HEADER, access_token));
    }
    let verifier = TokenVerifier::new(&get_auth_config());
    let app = App::new().wrap(JwtMiddlewareFactory::new(verifier)).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let (_, res) = res.into_parts();
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
    }
}

pub async fn get_request<F>(access_token: &str, path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    send_request(TestRequest::get().uri(path), access_token, configure).await
}

pub async fn post_request<F>(access_token: &str, path: &str, body: serde_json::Value, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    send_request(TestRequest::post().uri(path).set_json(body), access_token, configure).await
}

/// A credit-backed token from importer `importer` at bank `bank`.
pub fn ptt(id: i64, status: PttStatus, bank: i64, importer: i64) -> PttToken {
    serde_json::from_value(json!({
        "id": id,
        "amount": 250_000,
        "currency": "USD",
        "status": status,
        "maturity_date": "2030-06-30",
        "backing_type": "credit",
        "issuer_bank": bank,
        "current_owner": importer,
        "original_importer": importer,
        "exporter": null,
        "conditions": { "required_documents": [], "notes": null },
        "created_at": "2026-03-01T09:00:00Z",
        "updated_at": "2026-03-01T09:00:00Z"
    }))
    .expect("Invalid token fixture")
}

pub fn organization(id: i64, name: &str, org_type: OrgType) -> Organization {
    Organization {
        id,
        name: name.to_string(),
        org_type,
        treasury_balance: Money::from(1_000_000),
        credit_limit: Money::from(500_000),
        credit_used: Money::default(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
