//! Webhook signature middleware for Actix Web.
//!
//! Wrap a webhook route in a [`SignatureMiddlewareFactory`] to reject any call whose signature does not verify under
//! the provider's [`SignatureScheme`]. Rejected calls receive a 401 and never reach the handler.
//!
//! Verifying the signature requires the raw body, so the middleware reads the payload and then puts it back for the
//! handler to consume.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorUnauthorized},
    http::header::HeaderMap,
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use referral_common::Secret;

use crate::signatures::{SignatureHeaders, SignatureScheme};

pub struct SignatureMiddlewareFactory {
    scheme: SignatureScheme,
    secret: Secret<String>,
    tolerance_secs: i64,
    // If false, then the middleware will not check the signature and always allow the call
    enabled: bool,
}

impl SignatureMiddlewareFactory {
    pub fn new(scheme: SignatureScheme, secret: Secret<String>, tolerance_secs: i64, enabled: bool) -> Self {
        SignatureMiddlewareFactory { scheme, secret, tolerance_secs, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService {
            scheme: self.scheme,
            secret: self.secret.clone(),
            tolerance_secs: self.tolerance_secs,
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct SignatureMiddlewareService<S> {
    scheme: SignatureScheme,
    secret: Secret<String>,
    tolerance_secs: i64,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.reveal().clone();
        let scheme = self.scheme;
        let tolerance = self.tolerance_secs;
        let enabled = self.enabled;
        Box::pin(async move {
            trace!("🔐️ Checking {scheme} signature for request to {}", req.path());
            if !enabled {
                trace!("🔐️ Signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {e:?}");
                ErrorBadRequest("Failed to extract request data.")
            })?;
            let headers = signature_headers(scheme, req.headers());
            match scheme.verify(&secret, &headers, data.as_ref(), tolerance) {
                Ok(()) => {
                    trace!("🔐️ {scheme} signature check for request ✅️");
                    req.set_payload(bytes_to_payload(data));
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🔐️ Rejecting {scheme} webhook call. {e}");
                    Err(ErrorUnauthorized("Invalid webhook signature."))
                },
            }
        })
    }
}

fn signature_headers(scheme: SignatureScheme, headers: &HeaderMap) -> SignatureHeaders {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);
    SignatureHeaders {
        signature: header(scheme.signature_header()),
        timestamp: header(scheme.timestamp_header()),
        token: scheme.token_header().and_then(header),
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
