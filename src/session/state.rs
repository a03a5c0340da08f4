//! Session reconciliation state machine.
//!
//! [`SessionState::apply`] is a pure transition function: the controller
//! performs backend calls, turns their outcomes into [`SessionEvent`]s and
//! stores whatever state `apply` returns.
//!
//! ```text
//! Unauthenticated ──PhoneSubmitted──► AwaitingCode ──CodeSent──► AwaitingVerification
//!        ▲                                 │                             │
//!        └──────── CodeRequestFailed ──────┘                  Reconciled (code accepted)
//!        │                                                               ▼
//!        ├──────────── Abandoned ◄──────── AuthenticatedNoProfile ──ProfileSaved──┐
//!        │                                                                        ▼
//!        └──────────── SignedOut ◄───────────────────────── AuthenticatedWithProfile
//! ```

use crate::backend::{AuthUser, PhoneNumber, VerificationHandle};
use crate::error::{CoreError, Result};
use crate::profile::ProfileDocument;

/// Where the user is in the sign-up/sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No credential.
    #[default]
    Unauthenticated,
    /// Phone number submitted, waiting for the backend to send a code.
    AwaitingCode {
        /// Number the code is being sent to.
        phone: PhoneNumber,
    },
    /// Code sent, waiting for the user to enter it.
    AwaitingVerification {
        /// Number the code was sent to.
        phone: PhoneNumber,
        /// Handle to exchange together with the code.
        handle: VerificationHandle,
    },
    /// Signed in but no profile document yet (incomplete sign-up).
    AuthenticatedNoProfile {
        /// Signed-in user.
        user: AuthUser,
    },
    /// Signed in with a profile.
    AuthenticatedWithProfile {
        /// Signed-in user.
        user: AuthUser,
        /// Their profile document.
        profile: ProfileDocument,
    },
}

/// Outcome fed into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// User submitted a phone number.
    PhoneSubmitted(PhoneNumber),
    /// Backend issued a verification handle.
    CodeSent(VerificationHandle),
    /// Backend refused to send a code.
    CodeRequestFailed,
    /// Wrong or expired code.
    VerificationFailed,
    /// A credential is present and the profile lookup finished.
    Reconciled {
        /// Credential owner.
        user: AuthUser,
        /// Profile document, if one exists.
        profile: Option<ProfileDocument>,
    },
    /// Profile document written.
    ProfileSaved(ProfileDocument),
    /// Profile creation abandoned and the credential deleted.
    Abandoned,
    /// Credential gone (sign-out, revocation, account deletion).
    SignedOut,
}

impl SessionEvent {
    /// Name used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PhoneSubmitted(_) => "PhoneSubmitted",
            Self::CodeSent(_) => "CodeSent",
            Self::CodeRequestFailed => "CodeRequestFailed",
            Self::VerificationFailed => "VerificationFailed",
            Self::Reconciled { .. } => "Reconciled",
            Self::ProfileSaved(_) => "ProfileSaved",
            Self::Abandoned => "Abandoned",
            Self::SignedOut => "SignedOut",
        }
    }
}

/// Screen the UI shell should show for a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Phone number / code entry.
    Login,
    /// Profile creation form.
    CreateProfile,
    /// Main dashboard.
    Dashboard,
}

impl SessionState {
    /// Name used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Unauthenticated",
            Self::AwaitingCode { .. } => "AwaitingCode",
            Self::AwaitingVerification { .. } => "AwaitingVerification",
            Self::AuthenticatedNoProfile { .. } => "AuthenticatedNoProfile",
            Self::AuthenticatedWithProfile { .. } => "AuthenticatedWithProfile",
        }
    }

    /// Returns the screen to present.
    #[must_use]
    pub const fn screen(&self) -> Screen {
        match self {
            Self::Unauthenticated | Self::AwaitingCode { .. } | Self::AwaitingVerification { .. } => {
                Screen::Login
            }
            Self::AuthenticatedNoProfile { .. } => Screen::CreateProfile,
            Self::AuthenticatedWithProfile { .. } => Screen::Dashboard,
        }
    }

    /// Returns the signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::AuthenticatedNoProfile { user } | Self::AuthenticatedWithProfile { user, .. } => {
                Some(user)
            }
            _ => None,
        }
    }

    /// Returns true once a code has been sent (the code field is enabled).
    #[must_use]
    pub const fn is_verification_sent(&self) -> bool {
        matches!(self, Self::AwaitingVerification { .. })
    }

    /// Computes the state after `event`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] if `event` cannot happen in
    /// this state.
    pub fn apply(self, event: &SessionEvent) -> Result<Self> {
        match (self, event) {
            (
                Self::Unauthenticated | Self::AwaitingVerification { .. },
                SessionEvent::PhoneSubmitted(phone),
            ) => Ok(Self::AwaitingCode {
                phone: phone.clone(),
            }),
            (Self::AwaitingCode { phone }, SessionEvent::CodeSent(handle)) => {
                Ok(Self::AwaitingVerification {
                    phone,
                    handle: handle.clone(),
                })
            }
            (Self::AwaitingCode { .. }, SessionEvent::CodeRequestFailed) => {
                Ok(Self::Unauthenticated)
            }
            (state @ Self::AwaitingVerification { .. }, SessionEvent::VerificationFailed) => {
                Ok(state)
            }
            (_, SessionEvent::Reconciled { user, profile }) => Ok(match profile {
                Some(profile) => Self::AuthenticatedWithProfile {
                    user: user.clone(),
                    profile: profile.clone(),
                },
                None => Self::AuthenticatedNoProfile { user: user.clone() },
            }),
            (
                Self::AuthenticatedNoProfile { user } | Self::AuthenticatedWithProfile { user, .. },
                SessionEvent::ProfileSaved(profile),
            ) => Ok(Self::AuthenticatedWithProfile {
                user,
                profile: profile.clone(),
            }),
            (Self::AuthenticatedNoProfile { .. }, SessionEvent::Abandoned)
            | (_, SessionEvent::SignedOut) => Ok(Self::Unauthenticated),
            (state, event) => Err(CoreError::InvalidTransition {
                state: state.name(),
                event: event.name(),
            }),
        }
    }
}
