//! Admin guard middleware for the referral payout server.
//!
//! Admin routes require an `X-Admin-Id` and an `X-Admin-Key` header. The key is compared in constant time against the
//! [`AdminApiKey`] registered as app data. On success, the caller's id is stored in the request extensions as an
//! [`AdminIdentity`], which handlers can take as an extractor. Otherwise, a 401 Unauthorized response is returned.
use std::{
    future::{ready, Ready},
    pin::Pin,
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    web,
    Error,
    FromRequest,
    HttpMessage,
    HttpRequest,
};
use futures::Future;
use log::{trace, warn};
use referral_common::Secret;

use crate::signatures::constant_time_eq;

pub const ADMIN_ID_HEADER: &str = "X-Admin-Id";
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// The shared key admin callers must present. Register it with `App::app_data(web::Data::new(..))`.
#[derive(Clone, Default)]
pub struct AdminApiKey(pub Secret<String>);

/// The id of the admin who made the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity(pub String);

impl AdminIdentity {
    pub fn id(&self) -> &str {
        self.0.as_str()
    }
}

impl FromRequest for AdminIdentity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let identity = req.extensions().get::<AdminIdentity>().cloned();
        ready(identity.ok_or_else(|| ErrorUnauthorized("This route requires admin credentials")))
    }
}

#[derive(Default)]
pub struct AdminGuardFactory;

impl AdminGuardFactory {
    pub fn new() -> Self {
        AdminGuardFactory
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminGuardFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminGuardService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminGuardService { service: Rc::new(service) }))
    }
}

pub struct AdminGuardService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminGuardService<S>
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
        Box::pin(async move {
            let identity = check_admin_credentials(&req)?;
            trace!("💻️ Admin {} authorised for {}", identity.id(), req.path());
            req.extensions_mut().insert(identity);
            service.call(req).await
        })
    }
}

fn check_admin_credentials(req: &ServiceRequest) -> Result<AdminIdentity, Error> {
    let configured = req.app_data::<web::Data<AdminApiKey>>().map(|k| k.0.clone()).unwrap_or_default();
    if configured.is_empty() {
        warn!("💻️ No admin API key is configured. Denying access to {}", req.path());
        return Err(ErrorUnauthorized("Admin access is not configured"));
    }
    let header = |name: &str| {
        req.headers().get(name).and_then(|v| v.to_str().ok()).map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    };
    let (admin_id, key) = match (header(ADMIN_ID_HEADER), header(ADMIN_KEY_HEADER)) {
        (Some(id), Some(key)) => (id, key),
        _ => {
            warn!("💻️ Admin credentials missing from request to {}. Denying access.", req.path());
            return Err(ErrorUnauthorized("Admin credentials are required"));
        },
    };
    if constant_time_eq(key.as_bytes(), configured.reveal().as_bytes()) {
        Ok(AdminIdentity(admin_id))
    } else {
        warn!("💻️ Invalid admin key presented by '{admin_id}' for {}. Denying access.", req.path());
        Err(ErrorUnauthorized("Invalid admin credentials"))
    }
}
