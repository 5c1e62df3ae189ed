use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use log::debug;
use referral_common::Secret;
use referral_engine::{
    db_types::{NewCandidate, NewProfessional},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, tear_down},
    ReferralApi,
    ReferralFlowApi,
    ReferralGatewayDatabase,
    ReferralPolicy,
    SqliteDatabase,
};

use super::mocks::MockPayments;
use crate::{
    config::WebhookConfig,
    middleware::{AdminApiKey, ADMIN_ID_HEADER, ADMIN_KEY_HEADER},
    server::{configure_admin_api, configure_webhooks},
    signatures::SignatureScheme,
};

pub const ADMIN_KEY: &str = "admin-test-key";
pub const MAIL_SECRET: &str = "mail-webhook-test-secret";
pub const MEETING_SECRET: &str = "meeting-webhook-test-secret";
pub const PLATFORM_EMAIL: &str = "referrals@mentorhub.io";

pub type TestFlowApi = ReferralFlowApi<SqliteDatabase, MockPayments, EventProducers>;

/// Sends a request to a fresh app built with `configure`.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let service = test::init_service(App::new().configure(configure)).await;
    call(&service, req).await
}

/// Sends a request to an app that has already been initialised. Errors raised by middleware are turned into their
/// response status, as the HTTP server would do.
pub async fn call<S, B>(service: &S, req: TestRequest) -> (StatusCode, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    debug!("🚀️ Making request");
    match test::try_call_service(service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}

pub fn with_admin(req: TestRequest) -> TestRequest {
    req.insert_header((ADMIN_ID_HEADER, "alex")).insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
}

pub fn webhook_config() -> WebhookConfig {
    WebhookConfig {
        mail_secret: Secret::new(MAIL_SECRET.to_string()),
        meeting_secret: Secret::new(MEETING_SECRET.to_string()),
        tolerance_secs: 300,
        signature_checks: true,
    }
}

pub fn signed_mail_request(body: &str, timestamp: i64) -> TestRequest {
    let ts = timestamp.to_string();
    let signature = SignatureScheme::Mail.sign(MAIL_SECRET, &ts, "tok_abc", body.as_bytes()).unwrap();
    TestRequest::post()
        .uri("/webhook/mail")
        .insert_header(("X-Mail-Signature", signature))
        .insert_header(("X-Mail-Timestamp", ts))
        .insert_header(("X-Mail-Token", "tok_abc"))
        .set_payload(body.to_string())
}

pub fn signed_meeting_request(body: &str, timestamp: i64) -> TestRequest {
    let ts = timestamp.to_string();
    let signature = SignatureScheme::Meeting.sign(MEETING_SECRET, &ts, "", body.as_bytes()).unwrap();
    TestRequest::post()
        .uri("/webhook/meeting")
        .insert_header(("x-zm-signature", signature))
        .insert_header(("x-zm-request-timestamp", ts))
        .set_payload(body.to_string())
}

/// A referral flow backed by a fresh SQLite database, with professional `pat@acme.com` (payout account `acct_pat`) and
/// candidate `casey@gmail.com` registered.
pub async fn flow_api(payments: MockPayments) -> TestFlowApi {
    let url = prepare_test_env().await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let policy = ReferralPolicy::default().with_platform_email(PLATFORM_EMAIL);
    let api = ReferralFlowApi::new(db, payments, EventProducers::default(), policy);
    let pro = NewProfessional::new("pat@acme.com", "Pat").with_payout_account("acct_pat");
    api.register_professional(pro).await.expect("Error registering professional");
    api.register_candidate(NewCandidate::new("casey@gmail.com", "Casey")).await.expect("Error registering candidate");
    api
}

/// Registers the full admin API and the webhooks against the given flow.
pub fn configure_flow(api: TestFlowApi) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let referral_api = ReferralApi::new(api.db().clone());
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(referral_api))
            .app_data(web::Data::new(AdminApiKey(Secret::new(ADMIN_KEY.to_string()))))
            .app_data(web::Data::new(webhook_config()));
        configure_admin_api::<SqliteDatabase, MockPayments>(cfg);
        configure_webhooks::<SqliteDatabase, MockPayments>(cfg, &webhook_config());
    }
}

pub async fn close_db(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    let _ = db.close().await;
    tear_down(&url).await;
}
