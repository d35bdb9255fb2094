pub mod override_rules;
pub mod requests;
