//! Sign-in session: phone verification and reconciliation.
//!
//! - [`SessionState`] / [`SessionEvent`]: the pure state machine
//! - [`SessionController`]: drives it with backend calls and publishes
//!   [`SessionSnapshot`]s to subscribers
//! - input helpers for the phone and code fields

mod controller;
mod input;
mod state;

pub use controller::{AbandonReason, SessionController, SessionSnapshot};
pub use input::{has_min_digits, national_digits, phone_digits, sanitize_code, ResendCooldown};
pub use state::{Screen, SessionEvent, SessionState};
