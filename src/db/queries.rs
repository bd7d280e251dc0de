use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{format_timestamp, now_timestamp, parse_timestamp};
use crate::models::{
    Booking, GatewaySettings, Payment, PaymentRecordStatus, PaymentStatus, SETTINGS_ID,
};

const BOOKING_COLUMNS: &str = "id, service_id, service_name, service_price, service_duration, \
     first_name, last_name, email, phone, message, appointment_date, appointment_time, \
     payment_status, payment_intent_id, idempotency_key, created_at, updated_at";

const PAYMENT_COLUMNS: &str =
    "id, booking_id, amount, currency, status, stripe_payment_intent_id, created_at, updated_at";

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, service_id, service_name, service_price, service_duration,
            first_name, last_name, email, phone, message, appointment_date, appointment_time,
            payment_status, payment_intent_id, idempotency_key, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            booking.id,
            booking.service_id,
            booking.service_name,
            booking.service_price,
            booking.service_duration,
            booking.first_name,
            booking.last_name,
            booking.email,
            booking.phone,
            booking.message,
            booking.appointment_date,
            booking.appointment_time,
            booking.payment_status.as_str(),
            booking.payment_intent_id,
            booking.idempotency_key,
            format_timestamp(&booking.created_at),
            format_timestamp(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let booking = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;
    booking.transpose()
}

pub fn get_booking_by_idempotency_key(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE idempotency_key = ?1");
    let booking = conn
        .query_row(&sql, params![key], |row| Ok(parse_booking_row(row)))
        .optional()?;
    booking.transpose()
}

pub fn get_bookings_by_payment_intent(
    conn: &Connection,
    intent_id: &str,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE payment_intent_id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![intent_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Links a booking to its gateway payment intent. Returns false when the booking is gone.
pub fn set_booking_payment_intent(
    conn: &Connection,
    booking_id: &str,
    intent_id: &str,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET payment_intent_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![intent_id, now_timestamp(), booking_id],
    )?;
    Ok(count > 0)
}

/// Plain assignment keyed by intent id, so replays converge. Returns rows touched.
pub fn update_booking_status_by_intent(
    conn: &Connection,
    intent_id: &str,
    status: PaymentStatus,
) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE bookings SET payment_status = ?1, updated_at = ?2 WHERE payment_intent_id = ?3",
        params![status.as_str(), now_timestamp(), intent_id],
    )?;
    Ok(count)
}

pub fn list_bookings(
    conn: &Connection,
    status_filter: Option<PaymentStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE payment_status = ?1 \
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
            ),
            vec![
                Box::new(status.as_str()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC, rowid DESC LIMIT ?1"
            ),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Largest age accepted for the orphan report and sweep: one year.
pub const MAX_ORPHAN_AGE_MINUTES: i64 = 60 * 24 * 365;

/// `now - older_than_minutes`, or `None` when the age is negative or above
/// [`MAX_ORPHAN_AGE_MINUTES`].
pub fn orphan_cutoff(now: NaiveDateTime, older_than_minutes: i64) -> Option<NaiveDateTime> {
    if !(0..=MAX_ORPHAN_AGE_MINUTES).contains(&older_than_minutes) {
        return None;
    }
    now.checked_sub_signed(chrono::Duration::try_minutes(older_than_minutes)?)
}

/// Pending bookings created before `cutoff` whose checkout never finished linking:
/// either no intent id, or an intent id with no payment row.
pub fn find_orphaned_bookings(
    conn: &Connection,
    cutoff: &NaiveDateTime,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings b
         WHERE b.payment_status = 'pending'
           AND b.created_at < ?1
           AND (b.payment_intent_id IS NULL
                OR NOT EXISTS (
                    SELECT 1 FROM payments p WHERE p.stripe_payment_intent_id = b.payment_intent_id
                ))
         ORDER BY b.created_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![format_timestamp(cutoff)], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize)]
pub struct BookingCounts {
    pub all: i64,
    pub pending: i64,
    pub completed: i64,
    pub failed: i64,
}

pub fn count_bookings_by_status(conn: &Connection) -> anyhow::Result<BookingCounts> {
    let mut stmt =
        conn.prepare("SELECT payment_status, COUNT(*) FROM bookings GROUP BY payment_status")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = BookingCounts::default();
    for row in rows {
        let (status, n) = row?;
        counts.all += n;
        match PaymentStatus::parse(&status) {
            PaymentStatus::Pending => counts.pending += n,
            PaymentStatus::Completed => counts.completed += n,
            PaymentStatus::Failed => counts.failed += n,
        }
    }
    Ok(counts)
}

pub struct DashboardStats {
    pub counts: BookingCounts,
    pub total_revenue: f64,
    pub recent_bookings: Vec<Booking>,
}

pub fn get_dashboard_stats(conn: &Connection) -> anyhow::Result<DashboardStats> {
    let counts = count_bookings_by_status(conn)?;

    let total_revenue: f64 = conn.query_row(
        "SELECT COALESCE(SUM(service_price), 0.0) FROM bookings WHERE payment_status = 'completed'",
        [],
        |row| row.get(0),
    )?;

    let recent_bookings = list_bookings(conn, None, 5)?;

    Ok(DashboardStats {
        counts,
        total_revenue,
        recent_bookings,
    })
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let status_str: String = row.get(12)?;
    let created_at_str: String = row.get(15)?;
    let updated_at_str: String = row.get(16)?;

    Ok(Booking {
        id: row.get(0)?,
        service_id: row.get(1)?,
        service_name: row.get(2)?,
        service_price: row.get(3)?,
        service_duration: row.get(4)?,
        first_name: row.get(5)?,
        last_name: row.get(6)?,
        email: row.get(7)?,
        phone: row.get(8)?,
        message: row.get(9)?,
        appointment_date: row.get(10)?,
        appointment_time: row.get(11)?,
        payment_status: PaymentStatus::parse(&status_str),
        payment_intent_id: row.get(13)?,
        idempotency_key: row.get(14)?,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

// ── Payments ──

pub fn create_payment(conn: &Connection, payment: &Payment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO payments (id, booking_id, amount, currency, status, stripe_payment_intent_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            payment.id,
            payment.booking_id,
            payment.amount,
            payment.currency,
            payment.status.as_str(),
            payment.stripe_payment_intent_id,
            format_timestamp(&payment.created_at),
            format_timestamp(&payment.updated_at),
        ],
    )?;
    Ok(())
}

pub fn payment_exists_for_intent(conn: &Connection, intent_id: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM payments WHERE stripe_payment_intent_id = ?1",
        params![intent_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_payments_for_intent(conn: &Connection, intent_id: &str) -> anyhow::Result<Vec<Payment>> {
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE stripe_payment_intent_id = ?1 ORDER BY created_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![intent_id], |row| {
        let status_str: String = row.get(4)?;
        let created_at_str: String = row.get(6)?;
        let updated_at_str: String = row.get(7)?;
        Ok(Payment {
            id: row.get(0)?,
            booking_id: row.get(1)?,
            amount: row.get(2)?,
            currency: row.get(3)?,
            status: PaymentRecordStatus::parse(&status_str),
            stripe_payment_intent_id: row.get(5)?,
            created_at: parse_timestamp(&created_at_str),
            updated_at: parse_timestamp(&updated_at_str),
        })
    })?;

    let mut payments = vec![];
    for row in rows {
        payments.push(row?);
    }
    Ok(payments)
}

pub fn update_payment_status_by_intent(
    conn: &Connection,
    intent_id: &str,
    status: PaymentRecordStatus,
) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE payments SET status = ?1, updated_at = ?2 WHERE stripe_payment_intent_id = ?3",
        params![status.as_str(), now_timestamp(), intent_id],
    )?;
    Ok(count)
}

// ── Settings ──

pub fn get_settings(conn: &Connection) -> anyhow::Result<GatewaySettings> {
    let settings = conn
        .query_row(
            "SELECT stripe_publishable_key, stripe_secret_key, stripe_webhook_secret
             FROM admin_settings WHERE id = ?1",
            params![SETTINGS_ID],
            |row| {
                Ok(GatewaySettings {
                    stripe_publishable_key: row.get(0)?,
                    stripe_secret_key: row.get(1)?,
                    stripe_webhook_secret: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(settings.unwrap_or_default())
}

/// Writes the provided fields; `None` leaves the stored value untouched.
pub fn save_settings(conn: &Connection, update: &GatewaySettings) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO admin_settings (id, stripe_publishable_key, stripe_secret_key, stripe_webhook_secret, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
           stripe_publishable_key = COALESCE(excluded.stripe_publishable_key, admin_settings.stripe_publishable_key),
           stripe_secret_key = COALESCE(excluded.stripe_secret_key, admin_settings.stripe_secret_key),
           stripe_webhook_secret = COALESCE(excluded.stripe_webhook_secret, admin_settings.stripe_webhook_secret),
           updated_at = excluded.updated_at",
        params![
            SETTINGS_ID,
            update.stripe_publishable_key,
            update.stripe_secret_key,
            update.stripe_webhook_secret,
            now_timestamp(),
        ],
    )?;
    Ok(())
}
