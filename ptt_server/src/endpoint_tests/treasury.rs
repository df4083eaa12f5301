use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Duration;
use ptt_engine::{
    db_types::{Money, OrgType, Role},
    events::EventProducers,
    lifecycle::LifecycleError,
    PttFlowApi,
    PttFlowError,
};
use serde_json::{json, Value};

use super::{
    helpers::{issue_token, organization, post_request},
    mocks::MockPttBackend,
};
use crate::routes::{DepositRoute, WithdrawRoute};

// Org 4 holds 1,000,000 in its treasury.
fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockPttBackend::new();
    db.expect_adjust_treasury().returning(|org_id, delta, _| {
        let mut org = organization(org_id, "Harbour Bank", OrgType::Bank);
        match org.treasury_balance.checked_add(delta) {
            None => Err(PttFlowError::InvalidRequest("The treasury balance would overflow".into())),
            Some(balance) if balance.is_negative() => Err(LifecycleError::InsufficientTreasury {
                org_id,
                required: -delta,
                available: org.treasury_balance,
            }
            .into()),
            Some(balance) => {
                org.treasury_balance = balance;
                Ok(org)
            },
        }
    });
    db.expect_clone().returning(MockPttBackend::new);
    let api = PttFlowApi::new(db, EventProducers::default());
    cfg.service(DepositRoute::<MockPttBackend>::new())
        .service(WithdrawRoute::<MockPttBackend>::new())
        .app_data(web::Data::new(api));
}

fn admin_token() -> String {
    issue_token(1, 1, &[Role::User, Role::Admin], Duration::minutes(10))
}

#[actix_web::test]
async fn withdrawal_within_balance() {
    let body = json!({ "org_id": 4, "amount": 250_000, "memo": "payroll" });
    let (status, body) = post_request(&admin_token(), "/treasury/withdraw", body, configure).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let org: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(org["treasury_balance"], 750_000);
}

#[actix_web::test]
async fn overdrawn_treasury_is_unprocessable() {
    let body = json!({ "org_id": 4, "amount": 1_000_001, "memo": "too much" });
    let (status, body) = post_request(&admin_token(), "/treasury/withdraw", body, configure).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "was: {body}");
    assert!(body.contains("treasury"), "was: {body}");
}

#[actix_web::test]
async fn overflowing_deposit_is_a_bad_request() {
    let body = json!({ "org_id": 4, "amount": Money::from(i64::MAX), "memo": "windfall" });
    let (status, body) = post_request(&admin_token(), "/treasury/deposit", body, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "was: {body}");
}
