use std::str::FromStr;

use cucumber::{then, when};
use log::*;
use referral_common::Cents;
use referral_engine::{
    db_types::{PaymentStatus, ReferralStatus},
    mail_types::InboundEmail,
    InboundOutcome,
    ReferralManagement,
};

use crate::cucumber::{referral_world::PLATFORM_EMAIL, ReferralWorld};

#[when(expr = "'{word}' emails '{word}' about '{word}' with message id '{word}'")]
async fn referral_email(world: &mut ReferralWorld, from: String, to: String, candidate: String, message_id: String) {
    let cc = format!("{PLATFORM_EMAIL}, {candidate}");
    let email = InboundEmail::new(&from, &to, &cc).with_subject("An introduction").with_message_id(message_id);
    let outcome = world.api().process_inbound_email(&email).await.expect("Error processing inbound email");
    debug!("🚀️ Inbound email outcome: {outcome:?}");
    assert!(matches!(outcome, InboundOutcome::Processed { .. }), "Email was not processed: {outcome:?}");
}

#[when(expr = "'{word}' emails '{word}' about '{word}' without copying the platform")]
async fn email_without_platform(world: &mut ReferralWorld, from: String, to: String, candidate: String) {
    let email = InboundEmail::new(&from, &to, &candidate);
    let outcome = world.api().process_inbound_email(&email).await.expect("Error processing inbound email");
    assert_eq!(outcome, InboundOutcome::Ignored);
}

#[when(expr = "'{word}' reports a referral for '{word}'")]
async fn report_referral(world: &mut ReferralWorld, professional: String, candidate: String) {
    let referral = world.report_referral(&professional, &candidate).await;
    assert_eq!(referral.status, ReferralStatus::Pending);
}

#[when(expr = "admin '{word}' verifies the referral for '{word}'")]
async fn verify_referral(world: &mut ReferralWorld, admin: String, candidate: String) {
    let referral = world.referral_for(&candidate).await;
    match world.api().verify_referral(referral.id, &admin).await {
        Ok(outcome) => debug!("🚀️ Verification outcome: {:?}", outcome.payout),
        Err(e) => warn!("🚀️ Verification of referral #{} did not complete. {e}", referral.id),
    }
}

#[when(expr = "the referral for '{word}' is rejected because {string}")]
async fn reject_referral(world: &mut ReferralWorld, candidate: String, reason: String) {
    let referral = world.referral_for(&candidate).await;
    let result = world.api().reject_referral(referral.id, &reason).await;
    debug!("🚀️ Rejection result: {result:?}");
}

#[when(expr = "the payment provider fails the next {int} transfer(s)")]
async fn provider_fails(world: &mut ReferralWorld, count: usize) {
    world.payments().fail_next(count);
}

#[when(expr = "the payout for the referral for '{word}' is retried")]
async fn retry_payout(world: &mut ReferralWorld, candidate: String) {
    let referral = world.referral_for(&candidate).await;
    match world.api().process_referral_payout(referral.id).await {
        Ok(outcome) => debug!("🚀️ Payout outcome: {outcome:?}"),
        Err(e) => warn!("🚀️ Payout of referral #{} failed. {e}", referral.id),
    }
}

#[then(expr = "the referral for '{word}' is {word}")]
async fn check_status(world: &mut ReferralWorld, candidate: String, status: String) {
    let expected = ReferralStatus::from_str(&status).expect("Not a valid referral status");
    let referral = world.referral_for(&candidate).await;
    assert_eq!(referral.status, expected, "Referral #{} has the wrong status", referral.id);
}

#[then(expr = "the referral for '{word}' has payment status {word}")]
async fn check_payment_status(world: &mut ReferralWorld, candidate: String, status: String) {
    let expected = PaymentStatus::from_str(&status).expect("Not a valid payment status");
    let referral = world.referral_for(&candidate).await;
    assert_eq!(referral.payment_status, expected, "Referral #{} has the wrong payment status", referral.id);
}

#[then(expr = "the referral for '{word}' was rewarded with {int} cents")]
async fn check_reward(world: &mut ReferralWorld, candidate: String, amount: i64) {
    let referral = world.referral_for(&candidate).await;
    assert_eq!(referral.reward_amount, Some(Cents::from(amount)));
    assert!(referral.payment_id.is_some(), "Rewarded referral has no payment id");
    assert!(referral.payout_date.is_some(), "Rewarded referral has no payout date");
}

#[then(expr = "the referral for '{word}' was verified {word}")]
async fn check_verification_method(world: &mut ReferralWorld, candidate: String, method: String) {
    let referral = world.referral_for(&candidate).await;
    let details = referral.verification_details.expect("Referral was not verified");
    assert_eq!(details.is_automatic(), method == "automatically", "Verified by {}", details.verification_method);
}

#[then(expr = "the referral for '{word}' has rejection reason {string}")]
async fn check_rejection_reason(world: &mut ReferralWorld, candidate: String, reason: String) {
    let referral = world.referral_for(&candidate).await;
    assert_eq!(referral.rejection_reason.as_deref(), Some(reason.as_str()));
}

#[then(expr = "professional '{word}' has {int} successful referral(s)")]
async fn check_successful_referrals(world: &mut ReferralWorld, email: String, count: i64) {
    let pro = world.api().db().fetch_professional_by_email(&email).await.expect("Error fetching professional");
    let pro = pro.expect("Professional does not exist");
    assert_eq!(pro.successful_referrals, count);
}

#[then(expr = "professional '{word}' has {int} referral(s) on record")]
async fn check_referral_count(world: &mut ReferralWorld, email: String, count: usize) {
    let pid = world.professional_id(&email).await;
    let referrals = world.api().db().fetch_referrals_for_professional(pid).await.expect("Error fetching referrals");
    assert_eq!(referrals.len(), count);
}

#[then(expr = "{int} transfer(s) was/were made")]
async fn check_transfer_count(world: &mut ReferralWorld, count: usize) {
    assert_eq!(world.payments().transfer_count(), count);
}

#[then(expr = "{int} transfer request(s) was/were sent")]
async fn check_transfer_calls(world: &mut ReferralWorld, count: usize) {
    assert_eq!(world.payments().calls().len(), count);
}
