use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::Serialize;

/// Fixed-width appointment slots offered on the booking calendar.
///
/// Slots are requests, not reservations: nothing here consults existing bookings.
#[derive(Debug, Clone, Serialize)]
pub struct SlotSchedule {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub step_minutes: i64,
    pub days: Vec<Weekday>,
}

impl Default for SlotSchedule {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            step_minutes: 30,
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

impl SlotSchedule {
    /// Every slot start between `open` (inclusive) and `close` (exclusive),
    /// labelled like "9:00 am".
    pub fn time_slots(&self) -> Vec<String> {
        if self.step_minutes <= 0 {
            return vec![];
        }

        let step = Duration::minutes(self.step_minutes);
        let mut slots = vec![];
        let mut t = self.open;
        while t < self.close {
            slots.push(format_slot(t));
            let (next, wrapped) = t.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            t = next;
        }
        slots
    }

    /// Open weekday that is not before `today`.
    pub fn is_bookable(&self, date: NaiveDate, today: NaiveDate) -> bool {
        date >= today && self.days.contains(&date.weekday())
    }

    pub fn slots_for(&self, date: NaiveDate, today: NaiveDate) -> Vec<String> {
        if self.is_bookable(date, today) {
            self.time_slots()
        } else {
            vec![]
        }
    }

    pub fn is_offered(&self, label: &str) -> bool {
        self.time_slots().iter().any(|s| s == label)
    }

    /// First open day strictly after `after`, looking at most two weeks ahead.
    pub fn next_available(&self, after: NaiveDate) -> Option<NaiveDate> {
        (1..=14)
            .filter_map(|i| after.checked_add_signed(Duration::days(i)))
            .find(|d| self.days.contains(&d.weekday()))
    }
}

fn format_slot(t: NaiveTime) -> String {
    t.format("%-I:%M %P").to_string()
}
