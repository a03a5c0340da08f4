//! Phone-number and one-time-code input handling.

use chrono::{DateTime, Duration, Utc};

/// Keeps only ASCII digits from a phone-number field.
///
/// # Examples
///
/// ```
/// use phoneid_core::session::phone_digits;
///
/// assert_eq!(phone_digits("(555) 123-4567"), "5551234567");
/// ```
#[must_use]
pub fn phone_digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Digits of the national number, dropping a leading `+<calling code>` the
/// user typed.
///
/// # Examples
///
/// ```
/// use phoneid_core::session::national_digits;
///
/// assert_eq!(national_digits("+1 555 123 4567", "+1"), "5551234567");
/// assert_eq!(national_digits("555 123 4567", "+1"), "5551234567");
/// ```
#[must_use]
pub fn national_digits(input: &str, calling_code: &str) -> String {
    let digits = phone_digits(input);
    let code = phone_digits(calling_code);
    if code.is_empty() || !input.trim_start().starts_with('+') {
        return digits;
    }
    digits
        .strip_prefix(code.as_str())
        .map_or_else(|| digits.clone(), str::to_string)
}

/// Returns whether `input` holds enough digits to request a code.
#[must_use]
pub fn has_min_digits(input: &str, min_digits: usize) -> bool {
    input.chars().filter(char::is_ascii_digit).count() >= min_digits
}

/// Sanitizes a one-time-code field: digits only, truncated to `length`.
///
/// # Examples
///
/// ```
/// use phoneid_core::session::sanitize_code;
///
/// assert_eq!(sanitize_code("12a3 4567", 6), "123456");
/// ```
#[must_use]
pub fn sanitize_code(input: &str, length: usize) -> String {
    input
        .chars()
        .filter(char::is_ascii_digit)
        .take(length)
        .collect()
}

/// Rate limit between verification-code requests.
#[derive(Debug, Clone)]
pub struct ResendCooldown {
    period: Duration,
    until: Option<DateTime<Utc>>,
}

impl ResendCooldown {
    /// Creates an idle cooldown of `period_secs` seconds.
    #[must_use]
    pub fn new(period_secs: u64) -> Self {
        Self {
            period: Duration::seconds(i64::try_from(period_secs).unwrap_or(i64::MAX)),
            until: None,
        }
    }

    /// Starts the cooldown at `now`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.until = now.checked_add_signed(self.period);
    }

    /// Clears the cooldown.
    pub fn reset(&mut self) {
        self.until = None;
    }

    /// Whole seconds left at `now` (rounded up), `None` once elapsed.
    #[must_use]
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        let until = self.until?;
        let left = until.signed_duration_since(now);
        if left <= Duration::zero() {
            return None;
        }
        let millis = u64::try_from(left.num_milliseconds()).unwrap_or(0);
        Some(millis.div_ceil(1000))
    }
}
