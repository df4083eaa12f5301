//! Request handler definitions
//!
//! Define each route and its handler here. Handlers should stay thin: pull the actor out of the JWT claims, call the
//! engine API and turn the result into a response. Any rule about *who* may do *what* to a token lives in the engine.
//!
//! Every handler is async. Database work happens on the sqlx pool, so a slow query never blocks an actix worker.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use ptt_engine::{
    db_types::{
        ActionType,
        Actor,
        LockConditions,
        NewDocument,
        NewOrganization,
        NewPttRequest,
        NewUser,
        PttToken,
        Role,
    },
    ptt_objects::PttQueryFilter,
    traits::{AccountManagement, ApprovalManagement, AuthManagement, PttDatabase},
    AccountApi,
    ApprovalApi,
    AuthApi,
    PttFlowApi,
};

use crate::{
    auth::{JwtClaims, TokenIssuer},
    config::ServerOptions,
    data_objects::{
        ActionMemo,
        ApprovalDecision,
        CreatedUser,
        CreditLimitParams,
        JsonResponse,
        MarketListing,
        OfferParams,
        PendingActionQuery,
        ReasonParams,
        RoleUpdateRequest,
        TransferParams,
        TreasuryParams,
    },
    errors::ServerError,
    helpers::get_remote_ip,
};

pub const API_KEY_HEADER: &str = "ptt_api_key";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(auth => Post "/auth" impl AuthManagement);
/// Route handler for the auth endpoint
///
/// Users supply their API key in the `ptt_api_key` header. If the key belongs to a user, the server issues a JWT
/// carrying the user's id, organization and roles. The JWT is valid for a limited period (`PTT_JWT_EXPIRY_SECS`) and
/// will NOT refresh. Role changes take effect on the next login.
pub async fn auth<A>(
    req: HttpRequest,
    api: web::Data<AuthApi<A>>,
    signer: web::Data<TokenIssuer>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    A: AuthManagement,
{
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".into());
    trace!("💻️ Received auth request from {peer}");
    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .ok_or(ServerError::MissingApiKey)?;
    let actor = api.authenticate(api_key).await.map_err(|e| {
        info!("💻️ Failed login attempt from {peer}. {e}");
        ServerError::from(e)
    })?;
    debug!("💻️ User #{} of org #{} logged in from {peer}", actor.user_id, actor.org_id);
    let access_token = signer.issue_token(actor, None)?;
    trace!("💻️ Issued access token");
    Ok(HttpResponse::Ok().content_type("application/json").body(access_token))
}

route!(check_token => Get "/check_token" requires [Role::User]);
pub async fn check_token(claims: JwtClaims) -> impl Responder {
    debug!("💻️ Access token for user #{} is valid", claims.user_id);
    HttpResponse::Ok().json(claims)
}

//----------------------------------------------   Organizations  ----------------------------------------------------
route!(my_organization => Get "/organization" impl AccountManagement where requires [Role::User]);
/// Balances and token counts for the caller's own organization.
pub async fn my_organization<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET organization summary for org #{}", claims.org_id);
    let summary = api
        .org_summary(claims.org_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Organization {} does not exist", claims.org_id)))?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(organizations => Get "/organizations" impl AccountManagement where requires [Role::ReadAll]);
pub async fn organizations<B: AccountManagement>(api: web::Data<AccountApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET organizations");
    let orgs = api.organizations().await?;
    Ok(HttpResponse::Ok().json(orgs))
}

route!(create_organization => Post "/organizations" impl PttDatabase where requires [Role::Admin]);
pub async fn create_organization<B: PttDatabase>(
    claims: JwtClaims,
    body: web::Json<NewOrganization>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let org = body.into_inner();
    debug!("💻️ POST create organization {} ({})", org.name, org.org_type);
    let org = api.create_organization(&claims.actor(), org).await?;
    Ok(HttpResponse::Created().json(org))
}

//----------------------------------------------   Users & Roles  ----------------------------------------------------
route!(create_user => Post "/users" impl AuthManagement where requires [Role::Admin]);
/// Creates a user and returns their API key. The key is not stored and cannot be recovered later.
pub async fn create_user<A: AuthManagement>(
    body: web::Json<NewUser>,
    api: web::Data<AuthApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let user = body.into_inner();
    debug!("💻️ POST create user {} for org #{}", user.name, user.org_id);
    let (user, api_key) = api.create_user(user).await?;
    let roles = api.roles_for_user(user.id).await?;
    info!("💻️ Created user #{} with roles {roles:?}", user.id);
    Ok(HttpResponse::Created().json(CreatedUser { user, roles, api_key: api_key.into_inner() }))
}

route!(update_roles => Post "/roles" impl AuthManagement where requires [Role::Admin]);
pub async fn update_roles<A: AuthManagement>(
    body: web::Json<RoleUpdateRequest>,
    api: web::Data<AuthApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let RoleUpdateRequest { user_id, apply, revoke } = body.into_inner();
    debug!("💻️ POST update roles for user #{user_id}. Apply {apply:?}, revoke {revoke:?}");
    if !apply.is_empty() {
        api.assign_roles(user_id, &apply).await?;
    }
    let removed = if revoke.is_empty() { 0 } else { api.remove_roles(user_id, &revoke).await? };
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!(
        "Roles updated for user {user_id}. {} applied, {removed} revoked.",
        apply.len()
    ))))
}

//----------------------------------------------   Tokens  ----------------------------------------------------
route!(my_ptts => Get "/ptt" impl AccountManagement where requires [Role::User]);
/// Every token the caller's organization takes part in.
pub async fn my_ptts<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET tokens for org #{}", claims.org_id);
    let tokens = api.ptts_for_org(claims.org_id).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

route!(ptt_by_id => Get "/ptt/{id}" impl AccountManagement where requires [Role::User]);
/// Fetches a token. Users only see tokens their organization takes part in, unless they hold `ReadAll`. Tokens that
/// the caller may not see return 404, whether they exist or not.
pub async fn ptt_by_id<B: AccountManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ptt_id = path.into_inner();
    debug!("💻️ GET token #{ptt_id} for user #{}", claims.user_id);
    let ptt = visible_ptt(&claims.actor(), ptt_id, api.as_ref()).await?;
    Ok(HttpResponse::Ok().json(ptt))
}

route!(ptt_history => Get "/ptt/{id}/history" impl AccountManagement where requires [Role::User]);
pub async fn ptt_history<B: AccountManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ptt_id = path.into_inner();
    debug!("💻️ GET status history for token #{ptt_id}");
    visible_ptt(&claims.actor(), ptt_id, api.as_ref()).await?;
    let history = api.status_history(ptt_id).await?;
    Ok(HttpResponse::Ok().json(history))
}

async fn visible_ptt<B: AccountManagement>(
    actor: &Actor,
    ptt_id: i64,
    api: &AccountApi<B>,
) -> Result<PttToken, ServerError> {
    api.ptt_for_actor(actor, ptt_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Token {ptt_id} does not exist")))
}

route!(search_ptts => Get "/search/ptt" impl AccountManagement where requires [Role::ReadAll]);
pub async fn search_ptts<B: AccountManagement>(
    query: web::Query<PttQueryFilter>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET token search for [{query}]");
    let tokens = api.search_ptts(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

//----------------------------------------------   Lifecycle  ----------------------------------------------------
route!(request_ptt => Post "/ptt/request" impl PttDatabase where requires [Role::User]);
pub async fn request_ptt<B: PttDatabase>(
    claims: JwtClaims,
    body: web::Json<NewPttRequest>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST token request from org #{}", claims.org_id);
    let ptt = api.request_ptt(&claims.actor(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(ptt))
}

/// Queues `action_type` for a checker if the policy says this actor may not execute it alone. Returns the `202
/// Accepted` response in that case, and `None` when the handler should go ahead and execute the action directly.
async fn submit_if_gated<B>(
    approvals: &ApprovalApi<B>,
    actor: &Actor,
    action_type: ActionType,
    target_id: i64,
    memo: Option<web::Json<ActionMemo>>,
) -> Result<Option<HttpResponse>, ServerError>
where
    B: PttDatabase + ApprovalManagement,
{
    if !approvals.requires_approval(&actor.roles, action_type) {
        return Ok(None);
    }
    let memo = memo.and_then(|m| m.into_inner().memo);
    let action = approvals.submit(actor, action_type, target_id, memo).await?;
    info!("💻️ {action_type} on #{target_id} by user #{} is awaiting approval as action #{}", actor.user_id, action.id);
    Ok(Some(HttpResponse::Accepted().json(action)))
}

route!(issue_ptt => Post "/ptt/{id}/issue" impl PttDatabase, ApprovalManagement where requires [Role::User]);
/// The issuing bank issues a requested token. Makers without checker rights get a pending action instead.
pub async fn issue_ptt<B>(
    claims: JwtClaims,
    path: web::Path<i64>,
    memo: Option<web::Json<ActionMemo>>,
    api: web::Data<PttFlowApi<B>>,
    approvals: web::Data<ApprovalApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PttDatabase + ApprovalManagement,
{
    let ptt_id = path.into_inner();
    let actor = claims.actor();
    debug!("💻️ POST issue token #{ptt_id} by user #{}", actor.user_id);
    if let Some(queued) = submit_if_gated(&approvals, &actor, ActionType::IssuePtt, ptt_id, memo).await? {
        return Ok(queued);
    }
    let ptt = api.issue_ptt(&actor, ptt_id).await?;
    Ok(HttpResponse::Ok().json(ptt))
}

route!(lock_ptt => Post "/ptt/{id}/lock" impl PttDatabase where requires [Role::User]);
pub async fn lock_ptt<B: PttDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<LockConditions>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ptt_id = path.into_inner();
    debug!("💻️ POST lock token #{ptt_id}");
    let ptt = api.lock_ptt(&claims.actor(), ptt_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ptt))
}

route!(transfer_ptt => Post "/ptt/{id}/transfer" impl PttDatabase where requires [Role::User]);
pub async fn transfer_ptt<B: PttDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<TransferParams>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ptt_id = path.into_inner();
    let exporter_id = body.exporter_id;
    debug!("💻️ POST transfer token #{ptt_id} to org #{exporter_id}");
    let ptt = api.transfer_ptt(&claims.actor(), ptt_id, exporter_id).await?;
    Ok(HttpResponse::Ok().json(ptt))
}

route!(settle_ptt => Post "/ptt/{id}/settle" impl PttDatabase, ApprovalManagement where requires [Role::User]);
/// The issuing bank pays the holder. Only gated when the server runs with `PTT_GATE_SETTLEMENT`.
pub async fn settle_ptt<B>(
    claims: JwtClaims,
    path: web::Path<i64>,
    memo: Option<web::Json<ActionMemo>>,
    api: web::Data<PttFlowApi<B>>,
    approvals: web::Data<ApprovalApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PttDatabase + ApprovalManagement,
{
    let ptt_id = path.into_inner();
    let actor = claims.actor();
    debug!("💻️ POST settle token #{ptt_id} by user #{}", actor.user_id);
    if let Some(queued) = submit_if_gated(&approvals, &actor, ActionType::SettlePtt, ptt_id, memo).await? {
        return Ok(queued);
    }
    let result = api.settle_payment(&actor, ptt_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(cancel_ptt => Post "/ptt/{id}/cancel" impl PttDatabase where requires [Role::User]);
pub async fn cancel_ptt<B: PttDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<ReasonParams>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ptt_id = path.into_inner();
    debug!("💻️ POST cancel token #{ptt_id}");
    let ptt = api.cancel_ptt(&claims.actor(), ptt_id, &body.reason).await?;
    Ok(HttpResponse::Ok().json(ptt))
}

//----------------------------------------------   Documents  ----------------------------------------------------
route!(upload_document => Post "/ptt/{id}/documents" impl PttDatabase where requires [Role::User]);
/// Records the metadata of a shipping document. The file itself lives in external storage, referred to by
/// `storage_ref`.
pub async fn upload_document<B: PttDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<NewDocument>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ptt_id = path.into_inner();
    debug!("💻️ POST {} document for token #{ptt_id}", body.document_type);
    let doc = api.upload_document(&claims.actor(), ptt_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(doc))
}

route!(documents => Get "/ptt/{id}/documents" impl AccountManagement where requires [Role::User]);
pub async fn documents<B: AccountManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ptt_id = path.into_inner();
    debug!("💻️ GET documents for token #{ptt_id}");
    visible_ptt(&claims.actor(), ptt_id, api.as_ref()).await?;
    let docs = api.documents_for_ptt(ptt_id).await?;
    Ok(HttpResponse::Ok().json(docs))
}

route!(approve_document => Post "/documents/{id}/approve" impl PttDatabase where requires [Role::User]);
pub async fn approve_document<B: PttDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let doc_id = path.into_inner();
    debug!("💻️ POST approve document #{doc_id}");
    let result = api.approve_document(&claims.actor(), doc_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(reject_document => Post "/documents/{id}/reject" impl PttDatabase where requires [Role::User]);
pub async fn reject_document<B: PttDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<ReasonParams>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let doc_id = path.into_inner();
    debug!("💻️ POST reject document #{doc_id}");
    let result = api.reject_document(&claims.actor(), doc_id, &body.reason).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Marketplace  ----------------------------------------------------
route!(marketplace => Get "/marketplace" impl AccountManagement where requires [Role::User]);
/// Redeemable tokens and their open discount offers.
pub async fn marketplace<B: AccountManagement>(api: web::Data<AccountApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET marketplace");
    let listings = api.marketplace().await?.into_iter().map(MarketListing::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(listings))
}

route!(make_offer => Post "/ptt/{id}/offers" impl PttDatabase where requires [Role::User]);
pub async fn make_offer<B: PttDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<OfferParams>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ptt_id = path.into_inner();
    debug!("💻️ POST offer of {} on token #{ptt_id} from org #{}", body.amount, claims.org_id);
    let offer = api.make_offer(&claims.actor(), ptt_id, body.amount).await?;
    Ok(HttpResponse::Created().json(offer))
}

route!(accept_offer => Post "/offers/{id}/accept" impl PttDatabase, ApprovalManagement where requires [Role::User]);
/// The holder sells the token to the funder. Makers without checker rights get a pending action instead.
pub async fn accept_offer<B>(
    claims: JwtClaims,
    path: web::Path<i64>,
    memo: Option<web::Json<ActionMemo>>,
    api: web::Data<PttFlowApi<B>>,
    approvals: web::Data<ApprovalApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PttDatabase + ApprovalManagement,
{
    let offer_id = path.into_inner();
    let actor = claims.actor();
    debug!("💻️ POST accept offer #{offer_id} by user #{}", actor.user_id);
    if let Some(queued) = submit_if_gated(&approvals, &actor, ActionType::AcceptOffer, offer_id, memo).await? {
        return Ok(queued);
    }
    let result = api.accept_offer(&actor, offer_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(withdraw_offer => Post "/offers/{id}/withdraw" impl PttDatabase where requires [Role::User]);
pub async fn withdraw_offer<B: PttDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let offer_id = path.into_inner();
    debug!("💻️ POST withdraw offer #{offer_id}");
    let offer = api.withdraw_offer(&claims.actor(), offer_id).await?;
    Ok(HttpResponse::Ok().json(offer))
}

//----------------------------------------------   Treasury  ----------------------------------------------------
route!(my_ledger => Get "/ledger" impl AccountManagement where requires [Role::User]);
pub async fn my_ledger<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET ledger for org #{}", claims.org_id);
    let ledger = api.ledger_for_org(claims.org_id).await?;
    Ok(HttpResponse::Ok().json(ledger))
}

route!(deposit => Post "/treasury/deposit" impl PttDatabase where requires [Role::Admin]);
pub async fn deposit<B: PttDatabase>(
    claims: JwtClaims,
    body: web::Json<TreasuryParams>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let TreasuryParams { org_id, amount, memo } = body.into_inner();
    info!("💻️ POST deposit of {amount} for org #{org_id} by user #{}", claims.user_id);
    let org = api.deposit(&claims.actor(), org_id, amount, &memo).await?;
    Ok(HttpResponse::Ok().json(org))
}

route!(withdraw => Post "/treasury/withdraw" impl PttDatabase where requires [Role::Admin]);
pub async fn withdraw<B: PttDatabase>(
    claims: JwtClaims,
    body: web::Json<TreasuryParams>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let TreasuryParams { org_id, amount, memo } = body.into_inner();
    info!("💻️ POST withdrawal of {amount} for org #{org_id} by user #{}", claims.user_id);
    let org = api.withdraw(&claims.actor(), org_id, amount, &memo).await?;
    Ok(HttpResponse::Ok().json(org))
}

route!(credit_limit => Post "/credit_limit" impl PttDatabase where requires [Role::Admin]);
pub async fn credit_limit<B: PttDatabase>(
    claims: JwtClaims,
    body: web::Json<CreditLimitParams>,
    api: web::Data<PttFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let CreditLimitParams { org_id, limit } = body.into_inner();
    info!("💻️ POST credit limit of {limit} for org #{org_id} by user #{}", claims.user_id);
    let org = api.set_credit_limit(&claims.actor(), org_id, limit).await?;
    Ok(HttpResponse::Ok().json(org))
}

//----------------------------------------------   Maker / Checker  ----------------------------------------------------
route!(pending_actions => Get "/pending_actions" impl PttDatabase, ApprovalManagement where requires [Role::User]);
/// The approval queue of the caller's organization. Users with `ReadAll` may pick any organization with `org_id`, or
/// leave it out to see every queue.
pub async fn pending_actions<B>(
    claims: JwtClaims,
    query: web::Query<PendingActionQuery>,
    approvals: web::Data<ApprovalApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PttDatabase + ApprovalManagement,
{
    let PendingActionQuery { status, org_id } = query.into_inner();
    let org_id = if claims.has_role(Role::ReadAll) || claims.has_role(Role::Admin) {
        org_id
    } else {
        Some(claims.org_id)
    };
    debug!("💻️ GET pending actions for {org_id:?} with status {status:?}");
    let actions = approvals.list(org_id, status).await?;
    Ok(HttpResponse::Ok().json(actions))
}

route!(approve_action => Post "/pending_actions/{id}/approve" impl PttDatabase, ApprovalManagement where requires [Role::Checker]);
/// Approves a pending action and executes it. If execution fails, the action stays in the queue and the error is
/// returned.
pub async fn approve_action<B>(
    claims: JwtClaims,
    path: web::Path<i64>,
    approvals: web::Data<ApprovalApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PttDatabase + ApprovalManagement,
{
    let action_id = path.into_inner();
    debug!("💻️ POST approve action #{action_id} by user #{}", claims.user_id);
    let (action, outcome) = approvals.approve(&claims.actor(), action_id).await?;
    Ok(HttpResponse::Ok().json(ApprovalDecision { action, outcome }))
}

route!(reject_action => Post "/pending_actions/{id}/reject" impl PttDatabase, ApprovalManagement where requires [Role::Checker]);
pub async fn reject_action<B>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<ReasonParams>,
    approvals: web::Data<ApprovalApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PttDatabase + ApprovalManagement,
{
    let action_id = path.into_inner();
    debug!("💻️ POST reject action #{action_id} by user #{}", claims.user_id);
    let action = approvals.reject(&claims.actor(), action_id, &body.reason).await?;
    Ok(HttpResponse::Ok().json(action))
}
