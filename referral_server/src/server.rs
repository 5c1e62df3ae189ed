use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use futures::FutureExt;
use log::*;
use referral_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    PaymentTransfer,
    ReferralApi,
    ReferralFlowApi,
    ReferralGatewayDatabase,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, WebhookConfig},
    errors::ServerError,
    integrations::stripe::StripePayouts,
    middleware::{AdminApiKey, SignatureMiddlewareFactory},
    routes::{
        health,
        CreateReferralRoute,
        ReferralByIdRoute,
        ReferralEventsRoute,
        ReferralPayoutRoute,
        ReferralsForCandidateRoute,
        ReferralsForProfessionalRoute,
        RejectReferralRoute,
        UnpaidReferralsRoute,
        VerifyReferralRoute,
    },
    signatures::SignatureScheme,
    webhook_routes::{MailWebhookRoute, MeetingWebhookRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let payments =
        StripePayouts::new(config.stripe.clone()).map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
    let hooks = create_event_hooks();
    let handlers = EventHandlers::new(config.event_buffer_size, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, payments, producers)?;
    srv.await.map_err(ServerError::from)
}

/// The notification hooks of a standalone server. Delivery to users (email, push) is up to the deployment, so the
/// default hook records each notification in the log.
pub fn create_event_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_notification(|ev| {
        async move {
            info!("📬️ Notification for user #{}: {} {}", ev.user_id, ev.kind, ev.payload);
        }
        .boxed()
    });
    hooks
}

pub fn create_server_instance<B, P>(
    config: ServerConfig,
    db: B,
    payments: P,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    B: ReferralGatewayDatabase + Send + 'static,
    P: PaymentTransfer + Clone + Send + 'static,
{
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let flow_api = ReferralFlowApi::new(db.clone(), payments.clone(), producers.clone(), config.policy.clone());
        let referral_api = ReferralApi::new(db.clone());
        let webhooks = config.webhooks.clone();
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("rps::access_log"))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(referral_api))
            .app_data(web::Data::new(AdminApiKey(config.admin_api_key.clone())))
            .app_data(web::Data::new(config.webhooks.clone()))
            .service(health)
            .configure(configure_admin_api::<B, P>)
            .configure(move |cfg| configure_webhooks::<B, P>(cfg, &webhooks))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    info!("🚀️ Referral payout server listening on {host}:{port}");
    Ok(srv)
}

/// Registers the admin API under `/api`. Every route in this scope is behind the admin guard.
pub fn configure_admin_api<B, P>(cfg: &mut web::ServiceConfig)
where
    B: ReferralGatewayDatabase + 'static,
    P: PaymentTransfer + 'static,
{
    // `/referrals/unpaid` must be registered before `/referrals/{id}`
    cfg.service(
        web::scope("/api")
            .service(CreateReferralRoute::<B, P>::new())
            .service(UnpaidReferralsRoute::<B>::new())
            .service(ReferralsForProfessionalRoute::<B>::new())
            .service(ReferralsForCandidateRoute::<B>::new())
            .service(ReferralByIdRoute::<B>::new())
            .service(ReferralEventsRoute::<B>::new())
            .service(VerifyReferralRoute::<B, P>::new())
            .service(ReferralPayoutRoute::<B, P>::new())
            .service(RejectReferralRoute::<B, P>::new()),
    );
}

/// Registers the signed webhook endpoints, `/webhook/mail` and `/webhook/meeting`.
pub fn configure_webhooks<B, P>(cfg: &mut web::ServiceConfig, config: &WebhookConfig)
where
    B: ReferralGatewayDatabase + 'static,
    P: PaymentTransfer + 'static,
{
    let mail_signatures = SignatureMiddlewareFactory::new(
        SignatureScheme::Mail,
        config.mail_secret.clone(),
        config.tolerance_secs,
        config.signature_checks,
    );
    let meeting_signatures = SignatureMiddlewareFactory::new(
        SignatureScheme::Meeting,
        config.meeting_secret.clone(),
        config.tolerance_secs,
        config.signature_checks,
    );
    cfg.service(web::scope("/webhook/mail").wrap(mail_signatures).service(MailWebhookRoute::<B, P>::new()))
        .service(web::scope("/webhook/meeting").wrap(meeting_signatures).service(MeetingWebhookRoute::new()));
}
