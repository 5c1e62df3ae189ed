mod referral_world;
mod setups;
mod steps;

pub use referral_world::ReferralWorld;
