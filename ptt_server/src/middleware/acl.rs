//! Access control list middleware for the PTT server.
//! This middleware can be placed on any route or service behind the [`super::JwtMiddlewareFactory`].
//!
//! It checks the claims that the JWT middleware stored in the request extensions against the required roles for the
//! route. If the user holds every required role (or is an admin), the request continues. Otherwise, a 403 Forbidden
//! response is returned.

use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::{ok, Ready};
use log::*;
use ptt_engine::db_types::Role;

use crate::{
    auth::JwtClaims,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

/// Admins pass every role check.
pub fn claims_satisfy(claims: &JwtClaims, required_roles: &[Role]) -> bool {
    claims.has_role(Role::Admin) || required_roles.iter().all(|role| claims.has_role(*role))
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let jwt_claims = req
                .extensions()
                .get::<JwtClaims>()
                .cloned()
                .ok_or_else(|| {
                    warn!("🔑️ No JWT claims found in request extensions for {}", req.path());
                    ServerError::AuthenticationError(AuthError::MissingToken)
                })?;
            if claims_satisfy(&jwt_claims, &required_roles) {
                service.call(req).await
            } else {
                debug!("🔑️ User #{} lacks one of {required_roles:?} for {}", jwt_claims.user_id, req.path());
                Err(ServerError::InsufficientPermissions(format!("{} requires {required_roles:?}", req.path())).into())
            }
        })
    }
}
