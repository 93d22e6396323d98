//! Display formatting for timestamps and currency.

use chrono::{DateTime, FixedOffset, Local, SecondsFormat, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// `DD/MM/YYYY, HH:MM:SS`, as shown on task stamps and log entries.
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// Current wall-clock time in the local offset.
pub fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

pub fn display_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.format(DISPLAY_TIMESTAMP_FORMAT).to_string()
}

/// ISO-8601 UTC with millisecond precision, e.g. `2026-01-19T13:00:00.000Z`.
pub fn iso_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Brazilian real formatting: `R$ 1.234,56`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {grouped},{fraction}")
}
