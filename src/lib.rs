//! `PhoneID` Core Library
//!
//! Client core for phone-number sign-up: one-time-code verification,
//! session reconciliation against the profile store, profile creation and
//! editing with username availability checks, and data deletion.
//!
//! The managed backend (auth, document store, object storage) is injected
//! through the traits in [`backend`]; UI shells observe controllers through
//! callbacks that return cancellable [`observer::Subscription`]s.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod deletion;
pub mod error;
pub mod logging;
pub mod observer;
pub mod profile;
pub mod session;

pub use api::PhoneIdCore;
pub use config::{CoreConfig, ProfileKey};
pub use error::{CoreError, Result};
