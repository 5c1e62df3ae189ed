//! Request handler definitions
//!
//! Define each route and its handler here. Webhook handlers live in [`crate::webhook_routes`].
//!
//! Handlers must not block the worker thread. Every database or payment provider call is a future, so a slow payout
//! only holds up its own request:
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use referral_engine::{traits::ReferralManagement, PaymentTransfer, ReferralApi, ReferralFlowApi, ReferralGatewayDatabase};

use crate::{
    data_objects::{CreateReferralRequest, RejectRequest},
    errors::ServerError,
    middleware::AdminIdentity,
};

// Actix cannot handle generics in handlers, so the route structs are generated by the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
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
                        .to($name);
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

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires admin) => {
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
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AdminGuardFactory::new());
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

//----------------------------------------------   Referrals  ----------------------------------------------------
route!(create_referral => Post "/referrals" impl ReferralGatewayDatabase, PaymentTransfer where requires admin);
/// A professional's referral report, entered by an admin. The referral starts out `pending`.
pub async fn create_referral<B, P>(
    admin: AdminIdentity,
    body: web::Json<CreateReferralRequest>,
    api: web::Data<ReferralFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ReferralGatewayDatabase,
    P: PaymentTransfer,
{
    let req = body.into_inner();
    debug!(
        "💻️ POST referral by {} for professional #{} and candidate {}",
        admin.id(),
        req.professional_id,
        req.candidate_email
    );
    let referral = api.create_referral(req.professional_id, &req.candidate_email, req.referral_type).await?;
    Ok(HttpResponse::Ok().json(referral))
}

route!(unpaid_referrals => Get "/referrals/unpaid" impl ReferralManagement where requires admin);
/// Verified referrals that have not been paid. Operators use this list to find failed or deferred payouts.
pub async fn unpaid_referrals<B: ReferralManagement>(
    api: web::Data<ReferralApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET unpaid referrals");
    let referrals = api.get_unpaid_verified_referrals().await?;
    Ok(HttpResponse::Ok().json(referrals))
}

route!(referral_by_id => Get "/referrals/{id}" impl ReferralManagement where requires admin);
pub async fn referral_by_id<B: ReferralManagement>(
    path: web::Path<i64>,
    api: web::Data<ReferralApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET referral #{id}");
    let referral = api.get_referral_by_id(id).await?;
    Ok(HttpResponse::Ok().json(referral))
}

route!(referral_events => Get "/referrals/{id}/events" impl ReferralManagement where requires admin);
pub async fn referral_events<B: ReferralManagement>(
    path: web::Path<i64>,
    api: web::Data<ReferralApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET audit trail for referral #{id}");
    let events = api.get_events_for_referral(id).await?;
    Ok(HttpResponse::Ok().json(events))
}

route!(referrals_for_professional => Get "/referrals/professional/{id}" impl ReferralManagement where requires admin);
pub async fn referrals_for_professional<B: ReferralManagement>(
    path: web::Path<i64>,
    api: web::Data<ReferralApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET referrals for professional #{id}");
    let referrals = api.get_referrals_for_professional(id).await?;
    Ok(HttpResponse::Ok().json(referrals))
}

route!(referrals_for_candidate => Get "/referrals/candidate/{id}" impl ReferralManagement where requires admin);
pub async fn referrals_for_candidate<B: ReferralManagement>(
    path: web::Path<i64>,
    api: web::Data<ReferralApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET referrals for candidate #{id}");
    let referrals = api.get_referrals_for_candidate(id).await?;
    Ok(HttpResponse::Ok().json(referrals))
}

route!(verify_referral => Post "/referrals/{id}/verify" impl ReferralGatewayDatabase, PaymentTransfer where requires admin);
/// Manual verification. The referral is verified by the calling admin and, if the professional is eligible, paid out.
///
/// Eligibility problems are not errors: the response carries the reason and the referral stays verified. A payment
/// provider failure is returned as a 502, and the payout can be retried with the `payout` endpoint.
pub async fn verify_referral<B, P>(
    admin: AdminIdentity,
    path: web::Path<i64>,
    api: web::Data<ReferralFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ReferralGatewayDatabase,
    P: PaymentTransfer,
{
    let id = path.into_inner();
    info!("💻️ Admin {} is verifying referral #{id}", admin.id());
    let outcome = api.verify_referral(id, admin.id()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(referral_payout => Post "/referrals/{id}/payout" impl ReferralGatewayDatabase, PaymentTransfer where requires admin);
/// Re-triggers the payout of a verified referral. Calling this for a referral that has been paid returns the original
/// payout, flagged `already_paid`.
pub async fn referral_payout<B, P>(
    admin: AdminIdentity,
    path: web::Path<i64>,
    api: web::Data<ReferralFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ReferralGatewayDatabase,
    P: PaymentTransfer,
{
    let id = path.into_inner();
    info!("💻️ Admin {} requested a payout for referral #{id}", admin.id());
    let outcome = api.process_referral_payout(id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(reject_referral => Post "/referrals/{id}/reject" impl ReferralGatewayDatabase, PaymentTransfer where requires admin);
pub async fn reject_referral<B, P>(
    admin: AdminIdentity,
    path: web::Path<i64>,
    body: web::Json<RejectRequest>,
    api: web::Data<ReferralFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: ReferralGatewayDatabase,
    P: PaymentTransfer,
{
    let id = path.into_inner();
    let reason = body.into_inner().reason;
    info!("💻️ Admin {} is rejecting referral #{id}. Reason: {reason}", admin.id());
    let referral = api.reject_referral(id, &reason).await?;
    Ok(HttpResponse::Ok().json(referral))
}
