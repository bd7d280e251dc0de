//! The booking wizard as a state machine: calendar, form, payment, confirmation.
//!
//! No IO happens here. The caller performs the create-payment-intent request
//! and the booking status lookup, then feeds the results back in.

use chrono::NaiveDate;
use thiserror::Error;

use crate::errors::FieldErrors;
use crate::models::{BookingDraft, PaymentStatus, Service};
use crate::services::checkout::{CheckoutRequest, CheckoutResponse};
use crate::services::slots::SlotSchedule;
use crate::services::validation::{validate_contact, ContactDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Calendar,
    Form,
    Payment,
    Confirmation,
}

#[derive(Debug, Error, PartialEq)]
pub enum WizardError {
    #[error("action not allowed on the {actual:?} step (expected {expected:?})")]
    WrongStep {
        expected: WizardStep,
        actual: WizardStep,
    },
    #[error("{0} is not an open booking day")]
    DateUnavailable(NaiveDate),
    #[error("{0} is not an offered time slot")]
    TimeNotOffered(String),
    #[error("select a date first")]
    NoDateSelected,
    #[error("pick both a date and a time to continue")]
    SlotIncomplete,
    #[error("contact details are invalid")]
    InvalidContact(FieldErrors),
    #[error("no payment has been started")]
    PaymentNotStarted,
    #[error("status belongs to booking {0}, not this one")]
    BookingMismatch(String),
    #[error("cannot go back from the {0:?} step")]
    CannotGoBack(WizardStep),
}

#[derive(Debug, Clone)]
pub struct BookingWizard {
    service: Service,
    schedule: SlotSchedule,
    step: WizardStep,
    date: Option<NaiveDate>,
    time: Option<String>,
    contact: Option<ContactDetails>,
    booking_id: Option<String>,
    client_secret: Option<String>,
    payment_error: Option<String>,
    confirmed_status: Option<PaymentStatus>,
}

impl BookingWizard {
    pub fn new(service: Service) -> Self {
        Self::with_schedule(service, SlotSchedule::default())
    }

    pub fn with_schedule(service: Service, schedule: SlotSchedule) -> Self {
        Self {
            service,
            schedule,
            step: WizardStep::Calendar,
            date: None,
            time: None,
            contact: None,
            booking_id: None,
            client_secret: None,
            payment_error: None,
            confirmed_status: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    pub fn contact(&self) -> Option<&ContactDetails> {
        self.contact.as_ref()
    }

    pub fn booking_id(&self) -> Option<&str> {
        self.booking_id.as_deref()
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    pub fn payment_error(&self) -> Option<&str> {
        self.payment_error.as_deref()
    }

    /// Status last read back from the server, if any.
    pub fn confirmed_status(&self) -> Option<PaymentStatus> {
        self.confirmed_status
    }

    fn expect_step(&self, expected: WizardStep) -> Result<(), WizardError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(WizardError::WrongStep {
                expected,
                actual: self.step,
            })
        }
    }

    /// Picking a new date clears any time already chosen.
    pub fn select_date(&mut self, date: NaiveDate, today: NaiveDate) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Calendar)?;
        if !self.schedule.is_bookable(date, today) {
            return Err(WizardError::DateUnavailable(date));
        }
        if self.date != Some(date) {
            self.time = None;
        }
        self.date = Some(date);
        Ok(())
    }

    pub fn select_time(&mut self, label: &str) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Calendar)?;
        if self.date.is_none() {
            return Err(WizardError::NoDateSelected);
        }
        if !self.schedule.is_offered(label) {
            return Err(WizardError::TimeNotOffered(label.to_string()));
        }
        self.time = Some(label.to_string());
        Ok(())
    }

    pub fn can_leave_calendar(&self) -> bool {
        self.step == WizardStep::Calendar && self.date.is_some() && self.time.is_some()
    }

    pub fn next_from_calendar(&mut self) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Calendar)?;
        if !self.can_leave_calendar() {
            return Err(WizardError::SlotIncomplete);
        }
        self.step = WizardStep::Form;
        Ok(())
    }

    /// On failure the wizard stays on the form and the per-field errors are returned.
    pub fn submit_form(&mut self, contact: ContactDetails) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Form)?;
        validate_contact(&contact).map_err(WizardError::InvalidContact)?;
        self.contact = Some(contact);
        self.step = WizardStep::Payment;
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), WizardError> {
        self.step = match self.step {
            WizardStep::Form => WizardStep::Calendar,
            WizardStep::Payment => WizardStep::Form,
            other => return Err(WizardError::CannotGoBack(other)),
        };
        self.payment_error = None;
        Ok(())
    }

    /// Body for `POST /api/create-payment-intent`.
    pub fn booking_request(&self) -> Result<CheckoutRequest, WizardError> {
        self.expect_step(WizardStep::Payment)?;
        let (Some(date), Some(time)) = (self.date, self.time.as_ref()) else {
            return Err(WizardError::SlotIncomplete);
        };
        let contact = self.contact.clone().unwrap_or_default();

        Ok(CheckoutRequest {
            amount: self.service.price,
            booking_data: BookingDraft {
                service_id: self.service.id.to_string(),
                service_name: self.service.name.to_string(),
                service_price: self.service.price,
                service_duration: self.service.duration.to_string(),
                first_name: contact.first_name,
                last_name: contact.last_name,
                email: contact.email,
                phone: contact.phone,
                message: contact.message,
                appointment_date: date.format("%Y-%m-%d").to_string(),
                appointment_time: time.clone(),
            },
        })
    }

    pub fn payment_started(&mut self, response: CheckoutResponse) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Payment)?;
        self.booking_id = Some(response.booking_id);
        self.client_secret = Some(response.client_secret);
        self.payment_error = None;
        Ok(())
    }

    /// Keeps everything entered so far so the user can retry in place.
    pub fn payment_failed(&mut self, message: &str) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Payment)?;
        self.payment_error = Some(message.to_string());
        Ok(())
    }

    pub fn payment_succeeded(&mut self) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Payment)?;
        if self.booking_id.is_none() {
            return Err(WizardError::PaymentNotStarted);
        }
        self.payment_error = None;
        self.step = WizardStep::Confirmation;
        Ok(())
    }

    /// Records the status read back from `GET /api/bookings/:id`.
    ///
    /// A failed booking returns the wizard to the payment step with an error.
    pub fn confirm_from_status(
        &mut self,
        booking_id: &str,
        status: PaymentStatus,
    ) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Confirmation)?;
        if self.booking_id.as_deref() != Some(booking_id) {
            return Err(WizardError::BookingMismatch(booking_id.to_string()));
        }
        self.confirmed_status = Some(status);
        if status == PaymentStatus::Failed {
            self.step = WizardStep::Payment;
            self.payment_error = Some("Payment failed. Please try again.".to_string());
        }
        Ok(())
    }
}
