use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use chrono::Utc;
use referral_engine::traits::{TransferError, TransferReceipt};
use serde_json::Value;

use super::{
    helpers::{
        call,
        close_db,
        configure_flow,
        flow_api,
        send_request,
        signed_mail_request,
        signed_meeting_request,
        webhook_config,
        MEETING_SECRET,
    },
    mocks::MockPayments,
};
use crate::{server::configure_webhooks, signatures::url_validation_token};

const REFERRAL_EMAIL: &str = r#"[{
    "from": "Pat <pat@acme.com>",
    "to": "hiring@acme.com",
    "cc": "referrals@mentorhub.io, casey@gmail.com",
    "subject": "Introducing Casey",
    "text": "Casey would be a great fit.",
    "messageId": "<intro-1@acme.com>"
}]"#;

#[actix_web::test]
async fn signed_referral_email_is_processed() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockPayments::new();
    payments
        .expect_transfer()
        .withf(|req| req.idempotency_key == "referral-1" && req.destination == "acct_pat" && req.amount == 5000)
        .times(1)
        .returning(|_| Ok(TransferReceipt::new("tr_001")));
    let api = flow_api(payments).await;
    let db = api.db().clone();
    let service = test::init_service(App::new().configure(configure_flow(api))).await;

    let (status, body) = call(&service, signed_mail_request(REFERRAL_EMAIL, Utc::now().timestamp())).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    let outcome = &json["outcomes"][0];
    assert_eq!(outcome["result"], "processed");
    assert_eq!(outcome["referral_id"], 1);
    assert_eq!(outcome["status"], "rewarded");
    assert_eq!(outcome["new_referral"], true);
    assert_eq!(outcome["payout"]["outcome"], "paid");
    assert_eq!(outcome["payout"]["transfer_id"], "tr_001");

    // The provider redelivers the same email. Nothing new happens, and no second transfer is requested.
    let (status, body) = call(&service, signed_mail_request(REFERRAL_EMAIL, Utc::now().timestamp())).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["outcomes"][0]["new_referral"], false);
    assert_eq!(json["outcomes"][0]["status"], "rewarded");
    close_db(db).await;
}

#[actix_web::test]
async fn payout_failures_are_still_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockPayments::new();
    payments.expect_transfer().times(1).returning(|_| Err(TransferError::Unavailable("timeout".into())));
    let api = flow_api(payments).await;
    let db = api.db().clone();
    let (status, body) =
        send_request(signed_mail_request(REFERRAL_EMAIL, Utc::now().timestamp()), configure_flow(api)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    let outcome = &json["outcomes"][0];
    assert_eq!(outcome["status"], "verified");
    assert!(outcome["payout_error"].as_str().unwrap().contains("timeout"));
    close_db(db).await;
}

#[actix_web::test]
async fn invalid_mail_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockPayments::new();
    payments.expect_transfer().never();
    let api = flow_api(payments).await;
    let db = api.db().clone();
    let service = test::init_service(App::new().configure(configure_flow(api))).await;
    let now = Utc::now().timestamp();

    // Body altered after signing
    let req = signed_mail_request(REFERRAL_EMAIL, now).set_payload(REFERRAL_EMAIL.replace("casey", "sam"));
    let (status, _) = call(&service, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Signed too long ago
    let (status, _) = call(&service, signed_mail_request(REFERRAL_EMAIL, now - 301)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // No signature headers at all
    let req = TestRequest::post().uri("/webhook/mail").set_payload(REFERRAL_EMAIL);
    let (status, body) = call(&service, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Invalid webhook signature.");

    // Nothing reached the state machine
    let admin_req = super::helpers::with_admin(TestRequest::get().uri("/api/referrals/professional/1"));
    let (status, body) = call(&service, admin_req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
    close_db(db).await;
}

#[actix_web::test]
async fn unreadable_payloads_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let api = flow_api(MockPayments::new()).await;
    let db = api.db().clone();
    let (status, body) =
        send_request(signed_mail_request("this is not json", Utc::now().timestamp()), configure_flow(api)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().starts_with("Invalid mail event payload."));
    close_db(db).await;
}

fn configure_meeting(cfg: &mut web::ServiceConfig) {
    use referral_engine::SqliteDatabase;
    cfg.app_data(web::Data::new(webhook_config()));
    configure_webhooks::<SqliteDatabase, MockPayments>(cfg, &webhook_config());
}

#[actix_web::test]
async fn meeting_url_validation() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"event": "endpoint.url_validation", "payload": {"plainToken": "qgg8vlvZRS6UYooatFL8Aw"}}"#;
    let (status, body) = send_request(signed_meeting_request(body, Utc::now().timestamp()), configure_meeting).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["plainToken"], "qgg8vlvZRS6UYooatFL8Aw");
    let expected = url_validation_token(MEETING_SECRET, "qgg8vlvZRS6UYooatFL8Aw").unwrap();
    assert_eq!(json["encryptedToken"], expected);
}

#[actix_web::test]
async fn other_meeting_events_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"event": "meeting.ended", "payload": {"object": {"id": "123"}}, "event_ts": 1717000000000}"#;
    let (status, body) = send_request(signed_meeting_request(body, Utc::now().timestamp()), configure_meeting).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
}

#[actix_web::test]
async fn invalid_meeting_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"event": "endpoint.url_validation", "payload": {"plainToken": "abc"}}"#;
    let req = signed_meeting_request(body, Utc::now().timestamp()).insert_header(("x-zm-signature", "v0=deadbeef"));
    let (status, _) = send_request(req, configure_meeting).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // A mail-style signature is not accepted on the meeting endpoint
    let req = signed_mail_request(body, Utc::now().timestamp()).uri("/webhook/meeting");
    let (status, _) = send_request(req, configure_meeting).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
