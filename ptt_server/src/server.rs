use std::{io::Write, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use ptt_engine::{
    db_types::{NewOrganization, NewUser, OrgType, Role},
    events::{EventHandlers, EventHooks, EventProducers},
    traits::PttDatabase,
    AccountApi,
    ApprovalApi,
    AuthApi,
    GatePolicy,
    PttFlowApi,
    SqliteDatabase,
};
use tempfile::NamedTempFile;

use crate::{
    auth::{TokenIssuer, TokenVerifier},
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    middleware::JwtMiddlewareFactory,
    routes::{
        health,
        AcceptOfferRoute,
        ApproveActionRoute,
        ApproveDocumentRoute,
        AuthRoute,
        CancelPttRoute,
        CheckTokenRoute,
        CreateOrganizationRoute,
        CreateUserRoute,
        CreditLimitRoute,
        DepositRoute,
        DocumentsRoute,
        IssuePttRoute,
        LockPttRoute,
        MakeOfferRoute,
        MarketplaceRoute,
        MyLedgerRoute,
        MyOrganizationRoute,
        MyPttsRoute,
        OrganizationsRoute,
        PendingActionsRoute,
        PttByIdRoute,
        PttHistoryRoute,
        RejectActionRoute,
        RejectDocumentRoute,
        RequestPttRoute,
        SearchPttsRoute,
        SettlePttRoute,
        TransferPttRoute,
        UpdateRolesRoute,
        UploadDocumentRoute,
        WithdrawOfferRoute,
        WithdrawRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.auto_migrate {
        info!("🗃️ Running database migrations");
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    bootstrap_admin(&db).await?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, event_hooks());
    let producers = handlers.producers();
    tokio::spawn(handlers.start_handlers());
    let _worker = start_expiry_worker(db.clone(), producers.clone(), config.request_timeout);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The default subscribers. They only log for now; anything that must react to a committed change subscribes here.
fn event_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_status_changed(|ev| {
            Box::pin(async move {
                info!("📬️ Token #{} moved from {} to {}", ev.ptt.id, ev.old_status, ev.new_status());
            })
        })
        .on_settled(|ev| {
            Box::pin(async move {
                info!("📬️ Token #{} settled for {}. {} ledger entries", ev.ptt.id, ev.ptt.amount, ev.ledger.len());
            })
        })
        .on_action_decided(|ev| {
            Box::pin(async move {
                info!("📬️ Pending action #{} is now {}", ev.action.id, ev.action.status);
            })
        });
    hooks
}

/// Creates the platform operator and its first admin on an empty database. The admin's API key is written to a
/// temporary file, since it is never stored in clear.
async fn bootstrap_admin(db: &SqliteDatabase) -> Result<(), ServerError> {
    let auth_api = AuthApi::new(db.clone());
    if !auth_api.needs_bootstrap().await? {
        return Ok(());
    }
    warn!("🔑️ No users exist yet. Creating the bootstrap administrator.");
    let operator = db
        .insert_organization(NewOrganization::new("Platform operator", OrgType::Operator))
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let new_user = NewUser {
        org_id: operator.id,
        name: "admin".into(),
        email: None,
        roles: vec![Role::User, Role::ReadAll, Role::Admin],
    };
    let (admin, api_key) = auth_api.create_user(new_user).await?;
    let mut file = NamedTempFile::new()?;
    writeln!(file, "{}", api_key.reveal())?;
    let (_, path) = file.keep().map_err(|e| ServerError::InitializeError(e.to_string()))?;
    warn!(
        "🚨️🚨️🚨️ The API key for the bootstrap administrator (user #{}) has been written to {}. Move it somewhere safe \
         and delete the file. 🚨️🚨️🚨️",
        admin.id,
        path.display()
    );
    Ok(())
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let policy = GatePolicy::default().with_settlement_gated(config.gate_settlement);
    let options = ServerOptions::from_config(&config);
    let verifier = TokenVerifier::new(&config.auth);
    let srv = HttpServer::new(move || {
        let ptt_api = PttFlowApi::new(db.clone(), producers.clone());
        let approval_api = ApprovalApi::new(db.clone(), producers.clone(), policy.clone());
        let accounts_api = AccountApi::new(db.clone());
        let auth_api = AuthApi::new(db.clone());
        let jwt_signer = TokenIssuer::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ptt::access_log"))
            .app_data(web::Data::new(ptt_api))
            .app_data(web::Data::new(approval_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(jwt_signer))
            .app_data(web::Data::new(options));
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(verifier.clone()))
            .service(CheckTokenRoute::new())
            .service(MyOrganizationRoute::<SqliteDatabase>::new())
            .service(OrganizationsRoute::<SqliteDatabase>::new())
            .service(CreateOrganizationRoute::<SqliteDatabase>::new())
            .service(CreateUserRoute::<SqliteDatabase>::new())
            .service(UpdateRolesRoute::<SqliteDatabase>::new())
            .service(MyPttsRoute::<SqliteDatabase>::new())
            .service(SearchPttsRoute::<SqliteDatabase>::new())
            .service(RequestPttRoute::<SqliteDatabase>::new())
            .service(PttByIdRoute::<SqliteDatabase>::new())
            .service(PttHistoryRoute::<SqliteDatabase>::new())
            .service(IssuePttRoute::<SqliteDatabase>::new())
            .service(LockPttRoute::<SqliteDatabase>::new())
            .service(TransferPttRoute::<SqliteDatabase>::new())
            .service(SettlePttRoute::<SqliteDatabase>::new())
            .service(CancelPttRoute::<SqliteDatabase>::new())
            .service(UploadDocumentRoute::<SqliteDatabase>::new())
            .service(DocumentsRoute::<SqliteDatabase>::new())
            .service(ApproveDocumentRoute::<SqliteDatabase>::new())
            .service(RejectDocumentRoute::<SqliteDatabase>::new())
            .service(MarketplaceRoute::<SqliteDatabase>::new())
            .service(MakeOfferRoute::<SqliteDatabase>::new())
            .service(AcceptOfferRoute::<SqliteDatabase>::new())
            .service(WithdrawOfferRoute::<SqliteDatabase>::new())
            .service(MyLedgerRoute::<SqliteDatabase>::new())
            .service(DepositRoute::<SqliteDatabase>::new())
            .service(WithdrawRoute::<SqliteDatabase>::new())
            .service(CreditLimitRoute::<SqliteDatabase>::new())
            .service(PendingActionsRoute::<SqliteDatabase>::new())
            .service(ApproveActionRoute::<SqliteDatabase>::new())
            .service(RejectActionRoute::<SqliteDatabase>::new());
        app.service(health).service(AuthRoute::<SqliteDatabase>::new()).service(auth_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
