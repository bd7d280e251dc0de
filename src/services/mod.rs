pub mod auth;
pub mod checkout;
pub mod contact;
pub mod email;
pub mod gateway_settings;
pub mod payments;
pub mod reconcile;
pub mod slots;
pub mod validation;
