use cucumber::given;
use referral_engine::{
    db_types::{NewCandidate, NewProfessional},
    ReferralPolicy,
};

use crate::cucumber::{referral_world::ReferralSystem, ReferralWorld};

#[given("a fresh install")]
async fn fresh_install(world: &mut ReferralWorld) {
    world.system = Some(ReferralSystem::new(ReferralPolicy::default()).await);
}

#[given(expr = "a fresh install with a cap of {int} reward(s) per professional")]
async fn fresh_install_with_cap(world: &mut ReferralWorld, cap: u64) {
    world.system = Some(ReferralSystem::new(ReferralPolicy::default().with_max_rewards(cap)).await);
}

#[given(expr = "a fresh install with a cooldown of {int} day(s)")]
async fn fresh_install_with_cooldown(world: &mut ReferralWorld, days: u64) {
    world.system = Some(ReferralSystem::new(ReferralPolicy::default().with_cooldown_days(days)).await);
}

#[given(expr = "professional '{word}' with payout account '{word}'")]
async fn professional_with_account(world: &mut ReferralWorld, email: String, account: String) {
    let pro = NewProfessional::new(email.as_str(), "Test Professional").with_payout_account(account);
    world.api().register_professional(pro).await.expect("Error registering professional");
}

#[given(expr = "professional '{word}' without a payout account")]
async fn professional_without_account(world: &mut ReferralWorld, email: String) {
    let pro = NewProfessional::new(email.as_str(), "Test Professional");
    world.api().register_professional(pro).await.expect("Error registering professional");
}

#[given(expr = "candidate '{word}'")]
async fn candidate(world: &mut ReferralWorld, email: String) {
    let candidate = NewCandidate::new(email.as_str(), "Test Candidate");
    world.api().register_candidate(candidate).await.expect("Error registering candidate");
}
