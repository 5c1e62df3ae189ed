use actix_web::{http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::Utc;
use referral_common::Secret;
use referral_engine::{
    db_types::{PaymentStatus, Professional, Referral, ReferralStatus, ReferralType},
    traits::{TransferError, TransferReceipt},
    ReferralApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{call, close_db, configure_flow, flow_api, send_request, with_admin, ADMIN_KEY},
    mocks::{MockPayments, MockReferralStore},
};
use crate::{
    middleware::{AdminApiKey, ADMIN_ID_HEADER, ADMIN_KEY_HEADER},
    routes::{
        ReferralByIdRoute,
        ReferralEventsRoute,
        ReferralsForCandidateRoute,
        ReferralsForProfessionalRoute,
        UnpaidReferralsRoute,
    },
};

fn sample_referral(id: i64, status: ReferralStatus) -> Referral {
    Referral {
        id,
        professional_id: 1,
        candidate_id: 2,
        referral_type: ReferralType::Link,
        status,
        email_details: None,
        email_domain_verified: false,
        verification_details: None,
        rejection_reason: None,
        reward_amount: None,
        payment_status: PaymentStatus::Pending,
        payment_id: None,
        payout_date: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn configure_queries(cfg: &mut ServiceConfig) {
    let mut store = MockReferralStore::new();
    store.expect_fetch_referral().returning(|id| Ok((id == 4).then(|| sample_referral(4, ReferralStatus::Pending))));
    store.expect_fetch_professional().returning(|id| {
        Ok((id == 1).then(|| Professional {
            id: 1,
            email: "pat@acme.com".into(),
            name: "Pat".into(),
            payout_account_id: None,
            successful_referrals: 0,
        }))
    });
    store.expect_fetch_referrals_for_professional().returning(|_| Ok(vec![sample_referral(4, ReferralStatus::Pending)]));
    store.expect_fetch_referrals_for_candidate().returning(|_| Ok(vec![]));
    store
        .expect_fetch_unpaid_verified_referrals()
        .returning(|| Ok(vec![sample_referral(5, ReferralStatus::Verified), sample_referral(6, ReferralStatus::Verified)]));
    store.expect_fetch_events_for_referral().returning(|_| Ok(vec![]));
    // Same registration order as the server
    cfg.service(
        web::scope("/api")
            .service(UnpaidReferralsRoute::<MockReferralStore>::new())
            .service(ReferralsForProfessionalRoute::<MockReferralStore>::new())
            .service(ReferralsForCandidateRoute::<MockReferralStore>::new())
            .service(ReferralByIdRoute::<MockReferralStore>::new())
            .service(ReferralEventsRoute::<MockReferralStore>::new()),
    )
    .app_data(web::Data::new(ReferralApi::new(store)))
    .app_data(web::Data::new(AdminApiKey(Secret::new(ADMIN_KEY.to_string()))));
}

#[actix_web::test]
async fn admin_credentials_are_required() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/referrals/4");
    let (status, body) = send_request(req, configure_queries).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Admin credentials are required");

    let req = TestRequest::get().uri("/api/referrals/4").insert_header((ADMIN_KEY_HEADER, ADMIN_KEY));
    let (status, _) = send_request(req, configure_queries).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::get()
        .uri("/api/referrals/4")
        .insert_header((ADMIN_ID_HEADER, "alex"))
        .insert_header((ADMIN_KEY_HEADER, "admin-test-kez"));
    let (status, body) = send_request(req, configure_queries).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Invalid admin credentials");
}

#[actix_web::test]
async fn admin_api_is_closed_without_a_key() {
    let _ = env_logger::try_init().ok();
    let configure = |cfg: &mut ServiceConfig| {
        configure_queries(cfg);
        // Later registrations override the key from `configure_queries`
        cfg.app_data(web::Data::new(AdminApiKey::default()));
    };
    let (status, body) = send_request(with_admin(TestRequest::get().uri("/api/referrals/4")), configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Admin access is not configured");
}

#[actix_web::test]
async fn fetch_referral_by_id() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(with_admin(TestRequest::get().uri("/api/referrals/4")), configure_queries).await;
    assert_eq!(status, StatusCode::OK);
    let referral: Referral = serde_json::from_str(&body).unwrap();
    assert_eq!(referral.id, 4);
    assert_eq!(referral.status, ReferralStatus::Pending);

    let (status, body) = send_request(with_admin(TestRequest::get().uri("/api/referrals/9")), configure_queries).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Referral #9 does not exist"}"#);

    let (status, _) = send_request(with_admin(TestRequest::get().uri("/api/referrals/9/events")), configure_queries).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn referral_lists() {
    let _ = env_logger::try_init().ok();
    let req = with_admin(TestRequest::get().uri("/api/referrals/unpaid"));
    let (status, body) = send_request(req, configure_queries).await;
    assert_eq!(status, StatusCode::OK);
    let referrals: Vec<Referral> = serde_json::from_str(&body).unwrap();
    assert_eq!(referrals.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5, 6]);

    let req = with_admin(TestRequest::get().uri("/api/referrals/professional/1"));
    let (status, body) = send_request(req, configure_queries).await;
    assert_eq!(status, StatusCode::OK);
    let referrals: Vec<Referral> = serde_json::from_str(&body).unwrap();
    assert_eq!(referrals.len(), 1);

    let req = with_admin(TestRequest::get().uri("/api/referrals/professional/2"));
    let (status, _) = send_request(req, configure_queries).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = with_admin(TestRequest::get().uri("/api/referrals/candidate/77"));
    let (status, body) = send_request(req, configure_queries).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[actix_web::test]
async fn create_verify_and_pay() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockPayments::new();
    payments
        .expect_transfer()
        .withf(|req| req.idempotency_key == "referral-1" && req.currency == "usd")
        .times(1)
        .returning(|_| Ok(TransferReceipt::new("tr_100")));
    let api = flow_api(payments).await;
    let db = api.db().clone();
    let service = test::init_service(App::new().configure(configure_flow(api))).await;

    let body = json!({"professionalId": 1, "candidateEmail": "Casey@Gmail.com", "referralType": "link"});
    let req = with_admin(TestRequest::post().uri("/api/referrals").set_json(body));
    let (status, body) = call(&service, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let referral: Referral = serde_json::from_str(&body).unwrap();
    assert_eq!(referral.id, 1);
    assert_eq!(referral.status, ReferralStatus::Pending);

    let (status, body) = call(&service, with_admin(TestRequest::post().uri("/api/referrals/1/verify"))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome["referral"]["status"], "rewarded");
    assert_eq!(outcome["referral"]["payment_status"], "paid");
    assert_eq!(outcome["referral"]["payment_id"], "tr_100");
    assert_eq!(outcome["referral"]["verification_details"]["verified_by"], "alex");
    assert_eq!(outcome["referral"]["verification_details"]["verification_method"], "manual-review");
    assert_eq!(outcome["payout"]["outcome"], "paid");
    assert_eq!(outcome["payout"]["already_paid"], false);

    // Paying out again returns the original payout without a second transfer
    let (status, body) = call(&service, with_admin(TestRequest::post().uri("/api/referrals/1/payout"))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome["transfer_id"], "tr_100");
    assert_eq!(outcome["already_paid"], true);

    // A rewarded referral cannot be rejected
    let req = with_admin(TestRequest::post().uri("/api/referrals/1/reject").set_json(json!({"reason": "Too late"})));
    let (status, _) = call(&service, req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(&service, with_admin(TestRequest::get().uri("/api/referrals/unpaid"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
    close_db(db).await;
}

#[actix_web::test]
async fn failed_payouts_can_be_retried() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockPayments::new();
    let mut seq = mockall::Sequence::new();
    payments
        .expect_transfer()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(TransferError::Unavailable("connection reset".into())));
    payments
        .expect_transfer()
        .withf(|req| req.idempotency_key == "referral-1")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(TransferReceipt::new("tr_200")));
    let api = flow_api(payments).await;
    let db = api.db().clone();
    let service = test::init_service(App::new().configure(configure_flow(api))).await;

    let body = json!({"professionalId": 1, "candidateEmail": "casey@gmail.com"});
    let (status, _) = call(&service, with_admin(TestRequest::post().uri("/api/referrals").set_json(body))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&service, with_admin(TestRequest::post().uri("/api/referrals/1/verify"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("connection reset"));

    let (status, body) = call(&service, with_admin(TestRequest::get().uri("/api/referrals/unpaid"))).await;
    assert_eq!(status, StatusCode::OK);
    let unpaid: Vec<Referral> = serde_json::from_str(&body).unwrap();
    assert_eq!(unpaid.len(), 1);
    assert_eq!(unpaid[0].status, ReferralStatus::Verified);
    assert_eq!(unpaid[0].payment_status, PaymentStatus::Pending);
    assert!(unpaid[0].payment_id.is_none());

    let (status, body) = call(&service, with_admin(TestRequest::post().uri("/api/referrals/1/payout"))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome["outcome"], "paid");
    assert_eq!(outcome["transfer_id"], "tr_200");
    assert_eq!(outcome["already_paid"], false);
    close_db(db).await;
}

#[actix_web::test]
async fn rejections() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockPayments::new();
    payments.expect_transfer().never();
    let api = flow_api(payments).await;
    let db = api.db().clone();
    let service = test::init_service(App::new().configure(configure_flow(api))).await;

    let body = json!({"professionalId": 1, "candidateEmail": "casey@gmail.com", "referralType": "other"});
    let (status, _) = call(&service, with_admin(TestRequest::post().uri("/api/referrals").set_json(body))).await;
    assert_eq!(status, StatusCode::OK);

    let req = with_admin(TestRequest::post().uri("/api/referrals/1/reject").set_json(json!({"reason": "  "})));
    let (status, _) = call(&service, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = with_admin(
        TestRequest::post().uri("/api/referrals/1/reject").set_json(json!({"reason": "Candidate applied directly"})),
    );
    let (status, body) = call(&service, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let referral: Referral = serde_json::from_str(&body).unwrap();
    assert_eq!(referral.status, ReferralStatus::Rejected);
    assert_eq!(referral.rejection_reason.as_deref(), Some("Candidate applied directly"));

    let (status, _) = call(&service, with_admin(TestRequest::post().uri("/api/referrals/1/verify"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = call(&service, with_admin(TestRequest::post().uri("/api/referrals/1/payout"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = call(&service, with_admin(TestRequest::post().uri("/api/referrals/8/verify"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    close_db(db).await;
}

#[actix_web::test]
async fn unknown_parties_are_not_found() {
    let _ = env_logger::try_init().ok();
    let api = flow_api(MockPayments::new()).await;
    let db = api.db().clone();
    let service = test::init_service(App::new().configure(configure_flow(api))).await;

    let body = json!({"professionalId": 42, "candidateEmail": "casey@gmail.com"});
    let (status, _) = call(&service, with_admin(TestRequest::post().uri("/api/referrals").set_json(body))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body = json!({"professionalId": 1, "candidateEmail": "nobody@gmail.com"});
    let (status, body) = call(&service, with_admin(TestRequest::post().uri("/api/referrals").set_json(body))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("nobody@gmail.com"));
    close_db(db).await;
}
