#![allow(dead_code)]

pub mod fake_payments;
pub mod prepare_env;
