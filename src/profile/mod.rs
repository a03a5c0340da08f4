//! Profile creation and editing.
//!
//! - [`ProfileForm`]: field state and the save-enabled rule
//! - [`UsernameChecker`]: debounced availability checks
//! - [`ProfileSaver`]: photo upload, then document write
//! - [`ProfileListener`]: live document and photo loading for editing

mod availability;
mod form;
mod listener;
mod save;
mod types;
mod username;

pub use availability::UsernameChecker;
pub use form::ProfileForm;
pub use listener::{PhotoSource, ProfileEvent, ProfileListener};
pub use save::{ProfileSaver, SaveMode};
pub use types::{ProfileDocument, ProfileDraft, ProfileUpdate};
pub use username::{
    normalize_username, sanitize_name, suggest_username, validate_username, UsernameStatus,
};
