use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Duration;
use ptt_engine::{
    db_types::{Actor, OrgType, PttStatus, Role},
    AccountApi,
};

use super::{
    helpers::{get_request, issue_token, organization, ptt, send_request},
    mocks::MockAccountManager,
};
use crate::{
    auth::{JwtClaims, TokenIssuer},
    config::AuthConfig,
    routes::{CheckTokenRoute, OrganizationsRoute, PttByIdRoute},
};

#[actix_web::test]
async fn check_token_without_headers() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("", "/check_token", configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        r#"{"error":"Authentication Error. No access token was found in the request. Authenticate at /auth first."}"#
    );
}

#[actix_web::test]
async fn check_token_expired() {
    let token = issue_token(1, 1, &[Role::User], Duration::hours(-2));
    let (status, body) = get_request(&token, "/check_token", configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is invalid"), "was: {body}");
}

#[actix_web::test]
async fn check_token_garbage() {
    let (status, body) = get_request("not.a.token", "/check_token", configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("not in the correct format"), "was: {body}");
}

#[actix_web::test]
async fn check_token_signed_with_another_secret() {
    let other = AuthConfig::new("some-other-server-secret-0123456789abcdef", Duration::hours(1));
    let token = TokenIssuer::new(&other).issue_token(Actor::new(1, 1, vec![Role::User, Role::Admin]), None).unwrap();
    let (status, _) = get_request(&token, "/check_token", configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn check_token_valid() {
    let token = issue_token(12, 4, &[Role::User, Role::Checker], Duration::minutes(10));
    let (status, body) = get_request(&token, "/check_token", configure).await;
    assert_eq!(status, StatusCode::OK);
    let claims: JwtClaims = serde_json::from_str(&body).unwrap();
    assert_eq!(claims, JwtClaims::new(12, 4, vec![Role::User, Role::Checker]));
}

#[actix_web::test]
async fn bearer_tokens_are_accepted() {
    let token = issue_token(12, 4, &[Role::User], Duration::minutes(10));
    let req = actix_web::test::TestRequest::get()
        .uri("/check_token")
        .insert_header(("Authorization", format!("Bearer {token}")));
    let (status, _) = send_request(req, "", configure).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn organizations_requires_read_all() {
    let token = issue_token(2, 2, &[Role::User, Role::Maker, Role::Checker], Duration::minutes(10));
    let (status, body) = get_request(&token, "/organizations", configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("/organizations requires [ReadAll]"), "was: {body}");

    let token = issue_token(2, 2, &[Role::User, Role::ReadAll], Duration::minutes(10));
    let (status, body) = get_request(&token, "/organizations", configure).await;
    assert_eq!(status, StatusCode::OK);
    let orgs: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(orgs.as_array().map(|a| a.len()), Some(2));
    assert_eq!(orgs[1]["org_type"], "bank");
}

#[actix_web::test]
async fn admins_bypass_role_checks() {
    let token = issue_token(1, 9, &[Role::Admin], Duration::minutes(10));
    let (status, _) = get_request(&token, "/organizations", configure).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn tokens_of_other_organizations_are_hidden() {
    // Token 5 belongs to importer 3 and bank 4
    let outsider = issue_token(30, 8, &[Role::User], Duration::minutes(10));
    let (status, _) = get_request(&outsider, "/ptt/5", configure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let importer = issue_token(31, 3, &[Role::User], Duration::minutes(10));
    let (status, body) = get_request(&importer, "/ptt/5", configure).await;
    assert_eq!(status, StatusCode::OK);
    let token: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(token["status"], "issued");

    let auditor = issue_token(32, 8, &[Role::User, Role::ReadAll], Duration::minutes(10));
    let (status, _) = get_request(&auditor, "/ptt/5", configure).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get_request(&importer, "/ptt/6", configure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn configure(cfg: &mut ServiceConfig) {
    let mut account_manager = MockAccountManager::new();
    account_manager.expect_fetch_organizations().returning(|| {
        Ok(vec![organization(3, "Acme Imports", OrgType::Importer), organization(4, "First Bank", OrgType::Bank)])
    });
    account_manager
        .expect_fetch_ptt()
        .returning(|id| Ok((id == 5).then(|| ptt(5, PttStatus::Issued, 4, 3))));
    let accounts_api = AccountApi::new(account_manager);
    cfg.service(CheckTokenRoute::new())
        .service(OrganizationsRoute::<MockAccountManager>::new())
        .service(PttByIdRoute::<MockAccountManager>::new())
        .app_data(web::Data::new(accounts_api));
}
