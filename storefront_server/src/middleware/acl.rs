//! Access control list middleware for the storefront server.
//! This middleware can be placed on any route or service.
//!
//! It reads the caller's [`Identity`] from the request headers and checks its roles against the roles the route
//! requires. Requests without an identity get a 401 Unauthorized response, and requests missing a required role get a
//! 403 Forbidden response. Otherwise the request continues to the handler.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;
use storefront_engine::db_types::Role;

use crate::{errors::ServerError, identity::Identity};

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
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let identity = Identity::from_headers(req.headers()).ok_or_else(|| {
                warn!("💻️ No identity found on request to restricted route {}", req.path());
                ServerError::MissingIdentity
            })?;
            if identity.has_all_roles(&required_roles) {
                service.call(req).await
            } else {
                let required = required_roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ");
                info!("💻️ {} tried to access {} without the required roles [{required}]", identity.actor, req.path());
                Err(ServerError::InsufficientPermissions(format!("This route requires [{required}]")).into())
            }
        })
    }
}
