use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Duration, Utc};
use ptt_engine::{
    db_types::{ActionStatus, ActionType, NewPendingAction, PendingAction, PttStatus, Role},
    events::EventProducers,
    ApprovalApi,
    GatePolicy,
    PttFlowApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{get_request, issue_token, post_request, ptt},
    mocks::MockPttBackend,
};
use crate::routes::{ApproveActionRoute, IssuePttRoute, PendingActionsRoute, SettlePttRoute};

// Token 5 was requested by importer org 3 from bank org 4.
const BANK: i64 = 4;
const IMPORTER: i64 = 3;

fn pending_action(id: i64, action: NewPendingAction) -> PendingAction {
    PendingAction {
        id,
        action_type: action.action_type,
        target_id: action.target_id,
        ptt_id: action.ptt_id,
        org_id: action.org_id,
        maker_id: action.maker_id,
        checker_id: None,
        status: ActionStatus::Pending,
        memo: action.memo,
        reason: None,
        created_at: Utc::now(),
        decided_at: None,
    }
}

/// A backend holding token 5 in `status`. Issuing it succeeds, and new pending actions get id 11.
fn backend(status: PttStatus) -> MockPttBackend {
    let mut db = MockPttBackend::new();
    db.expect_fetch_ptt().returning(move |id| Ok((id == 5).then(|| ptt(5, status, BANK, IMPORTER))));
    db.expect_issue_ptt().returning(|id| Ok(ptt(id, PttStatus::Issued, BANK, IMPORTER)));
    db.expect_insert_pending_action().returning(|action| Ok(pending_action(11, action)));
    db.expect_fetch_pending_actions()
        .withf(|org_id, status| *org_id == Some(BANK) && status.is_none())
        .returning(|_, _| {
            let action = NewPendingAction {
                action_type: ActionType::IssuePtt,
                target_id: 5,
                ptt_id: 5,
                org_id: BANK,
                maker_id: 20,
                memo: None,
            };
            Ok(vec![pending_action(11, action)])
        });
    db.expect_clone().returning(MockPttBackend::new);
    db
}

fn configure_with(status: PttStatus, policy: GatePolicy) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let producers = EventProducers::default();
        let ptt_api = PttFlowApi::new(backend(status), producers.clone());
        let approval_api = ApprovalApi::new(backend(status), producers, policy);
        cfg.service(IssuePttRoute::<MockPttBackend>::new())
            .service(SettlePttRoute::<MockPttBackend>::new())
            .service(PendingActionsRoute::<MockPttBackend>::new())
            .service(ApproveActionRoute::<MockPttBackend>::new())
            .app_data(web::Data::new(ptt_api))
            .app_data(web::Data::new(approval_api));
    }
}

fn configure(cfg: &mut ServiceConfig) {
    configure_with(PttStatus::Requested, GatePolicy::default())(cfg)
}

#[actix_web::test]
async fn maker_issuance_is_queued() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(20, BANK, &[Role::User, Role::Maker], Duration::minutes(10));
    let (status, body) = post_request(&token, "/ptt/5/issue", json!({ "memo": "Q3 shipment" }), configure).await;
    assert_eq!(status, StatusCode::ACCEPTED, "was: {body}");
    let action: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(action["id"], 11);
    assert_eq!(action["action_type"], "issue_ptt");
    assert_eq!(action["status"], "pending");
    assert_eq!(action["target_id"], 5);
    assert_eq!(action["maker_id"], 20);
    assert_eq!(action["memo"], "Q3 shipment");
}

#[actix_web::test]
async fn issuance_by_a_user_without_maker_executes() {
    let token = issue_token(21, BANK, &[Role::User], Duration::minutes(10));
    let (status, body) = post_request(&token, "/ptt/5/issue", json!({}), configure).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let ptt: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ptt["status"], "issued");
}

#[actix_web::test]
async fn makers_with_checker_rights_execute_directly() {
    let token = issue_token(22, BANK, &[Role::User, Role::Maker, Role::Checker], Duration::minutes(10));
    let (status, body) = post_request(&token, "/ptt/5/issue", json!({}), configure).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
}

#[actix_web::test]
async fn maker_cannot_queue_for_another_bank() {
    let token = issue_token(23, 9, &[Role::User, Role::Maker], Duration::minutes(10));
    let (status, _) = post_request(&token, "/ptt/5/issue", json!({}), configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn doomed_actions_never_reach_the_queue() {
    // Token 5 is already locked, so it cannot be issued again
    let token = issue_token(20, BANK, &[Role::User, Role::Maker], Duration::minutes(10));
    let configure = configure_with(PttStatus::Locked, GatePolicy::default());
    let (status, _) = post_request(&token, "/ptt/5/issue", json!({}), configure).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn settlement_is_gated_only_when_configured() {
    let token = issue_token(20, BANK, &[Role::User, Role::Maker], Duration::minutes(10));
    let gated = GatePolicy::default().with_settlement_gated(true);
    let configure = configure_with(PttStatus::Redeemable, gated);
    let (status, body) = post_request(&token, "/ptt/5/settle", json!({}), configure).await;
    assert_eq!(status, StatusCode::ACCEPTED, "was: {body}");
    let action: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(action["action_type"], "settle_ptt");
}

#[actix_web::test]
async fn only_checkers_may_approve() {
    let token = issue_token(20, BANK, &[Role::User, Role::Maker], Duration::minutes(10));
    let (status, body) = post_request(&token, "/pending_actions/11/approve", json!({}), configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("requires [Checker]"), "was: {body}");
}

#[actix_web::test]
async fn pending_actions_are_scoped_to_own_organization() {
    // The org_id in the query is ignored without ReadAll
    let token = issue_token(24, BANK, &[Role::User, Role::Checker], Duration::minutes(10));
    let (status, body) = get_request(&token, "/pending_actions?org_id=3", configure).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let actions: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(actions[0]["org_id"], BANK);
}
