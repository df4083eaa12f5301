use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use log::*;
use ptt_engine::{
    db_types::{Actor, Role},
    hash_api_key,
    traits::AuthApiError,
    AuthApi,
};

use super::{helpers::get_auth_config, mocks::MockAuthManager};
use crate::{
    auth::{JwtClaims, TokenIssuer, TokenVerifier},
    config::ServerOptions,
    routes::{AuthRoute, API_KEY_HEADER},
};

const API_KEY: &str = "ptt_0f3e9c2b7a6d41e8b5c0d9a8f7e6d5c4";

#[actix_web::test]
async fn login_without_api_key() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(None, Ok(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"No API key was provided in the ptt_api_key header"}"#);
}

#[actix_web::test]
async fn login_with_blank_api_key() {
    let (status, _) = post_request(Some("   "), Ok(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn login_with_unknown_api_key() {
    let (status, body) = post_request(Some("ptt_not_a_real_key"), Ok(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. The API key is not recognised."}"#);
}

#[actix_web::test]
async fn login_when_backend_fails() {
    let (status, body) = post_request(Some(API_KEY), Err(AuthApiError::DatabaseError("disk full".into()))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("disk full"), "was: {body}");
}

#[actix_web::test]
async fn login_with_valid_api_key() {
    let actor = Actor::new(7, 3, vec![Role::User, Role::Maker]);
    let (status, token) = post_request(Some(API_KEY), Ok(Some(actor))).await;
    assert_eq!(status, StatusCode::OK);
    let claims = TokenVerifier::new(&get_auth_config()).verify(&token).unwrap();
    assert_eq!(claims, JwtClaims::new(7, 3, vec![Role::User, Role::Maker]));
}

fn configure_app(lookup: Result<Option<Actor>, AuthApiError>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let mut auth_manager = MockAuthManager::new();
        // Only the hash of the real key resolves to the actor
        let expected_hash = hash_api_key(API_KEY);
        auth_manager.expect_fetch_actor_for_key_hash().returning(move |hash| match &lookup {
            Ok(Some(actor)) if hash == expected_hash => Ok(Some(actor.clone())),
            Ok(_) => Ok(None),
            Err(e) => Err(e.clone()),
        });
        let auth_api = AuthApi::new(auth_manager);
        let jwt_signer = TokenIssuer::new(&get_auth_config());
        cfg.app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(jwt_signer))
            .app_data(web::Data::new(ServerOptions::default()))
            .service(AuthRoute::<MockAuthManager>::new());
    }
}

async fn post_request(api_key: Option<&str>, lookup: Result<Option<Actor>, AuthApiError>) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri("/auth");
    if let Some(key) = api_key {
        req = req.insert_header((API_KEY_HEADER, key));
    }
    let app = App::new().configure(configure_app(lookup));
    let app = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::call_service(&app, req.to_request()).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}
