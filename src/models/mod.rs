pub mod booking;
pub mod catalog;
pub mod payment;
pub mod settings;

pub use booking::{Booking, BookingDraft, PaymentStatus};
pub use catalog::{find_service, Service, CATALOG};
pub use payment::{Payment, PaymentRecordStatus};
pub use settings::{GatewaySettings, MaskedSettings, MASKED_PLACEHOLDER, SETTINGS_ID};
