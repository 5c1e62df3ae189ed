mod helpers;
mod mocks;
mod referrals;
mod webhooks;
