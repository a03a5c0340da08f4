//! Username rules and suggestions.

use rand::Rng;

/// Outcome of checking a username candidate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UsernameStatus {
    /// Nothing checked yet.
    #[default]
    Idle,
    /// Uniqueness query in flight.
    Checking,
    /// Contains characters other than ASCII letters and digits.
    Invalid,
    /// Shorter than the minimum length.
    TooShort {
        /// Required length.
        min_length: usize,
    },
    /// Same as the current username (edit flow).
    Unchanged,
    /// No other profile uses it.
    Available,
    /// Another profile uses it.
    Taken,
    /// The uniqueness query failed.
    Error(String),
}

impl UsernameStatus {
    /// Returns whether the form may be submitted with this username.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available | Self::Unchanged)
    }

    /// Returns whether a result is still pending.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Idle | Self::Checking)
    }

    /// Message shown under the username field.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Idle => String::new(),
            Self::Checking => "Checking…".to_string(),
            Self::Invalid => "Usernames can only contain letters and digits.".to_string(),
            Self::TooShort { min_length } => {
                format!("Username must be at least {min_length} characters.")
            }
            Self::Unchanged => "Username unchanged.".to_string(),
            Self::Available => "Username is available!".to_string(),
            Self::Taken => "Username is already taken.".to_string(),
            Self::Error(message) => format!("Error: {message}"),
        }
    }
}

/// Normalizes a username for storage and comparison.
#[must_use]
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Checks the local rules for a username candidate.
///
/// Returns the final status if the rules decide it, or `None` if the
/// backend has to be asked. Rules apply in order: character set, length,
/// then (edit flow, `original` given) equality with the current username.
///
/// # Examples
///
/// ```
/// use phoneid_core::profile::{validate_username, UsernameStatus};
///
/// assert_eq!(validate_username("ada_1", 4, None), Some(UsernameStatus::Invalid));
/// assert_eq!(validate_username("Ada1", 4, Some("ada1")), Some(UsernameStatus::Unchanged));
/// assert_eq!(validate_username("ada12", 4, None), None);
/// ```
#[must_use]
pub fn validate_username(
    raw: &str,
    min_length: usize,
    original: Option<&str>,
) -> Option<UsernameStatus> {
    if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Some(UsernameStatus::Invalid);
    }
    if raw.chars().count() < min_length {
        return Some(UsernameStatus::TooShort { min_length });
    }
    if original.is_some_and(|orig| normalize_username(raw) == normalize_username(orig)) {
        return Some(UsernameStatus::Unchanged);
    }
    None
}

/// Keeps only letters, as the name fields allow.
///
/// # Examples
///
/// ```
/// use phoneid_core::profile::sanitize_name;
///
/// assert_eq!(sanitize_name("Ada-Marie 2"), "AdaMarie");
/// ```
#[must_use]
pub fn sanitize_name(input: &str) -> String {
    input.chars().filter(|c| c.is_alphabetic()).collect()
}

/// Suggests `first + last + NNN` in lowercase, NNN in `100..=999`.
///
/// Empty when both names are empty.
pub fn suggest_username<R: Rng + ?Sized>(first_name: &str, last_name: &str, rng: &mut R) -> String {
    if first_name.is_empty() && last_name.is_empty() {
        return String::new();
    }
    let suffix: u16 = rng.gen_range(100..=999);
    format!("{first_name}{last_name}{suffix}")
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rejects_non_alphanumeric_before_length() {
        assert_eq!(validate_username("a_", 4, None), Some(UsernameStatus::Invalid));
        assert_eq!(validate_username("ada lovelace", 4, None), Some(UsernameStatus::Invalid));
        assert_eq!(validate_username("adé1", 4, None), Some(UsernameStatus::Invalid));
    }

    #[test]
    fn short_usernames_are_too_short() {
        assert_eq!(
            validate_username("ada", 4, None),
            Some(UsernameStatus::TooShort { min_length: 4 })
        );
        assert_eq!(
            validate_username("", 4, None),
            Some(UsernameStatus::TooShort { min_length: 4 })
        );
        assert_eq!(validate_username("ada1", 4, None), None);
    }

    #[test]
    fn unchanged_only_in_edit_flow() {
        assert_eq!(
            validate_username("ADA1", 4, Some("ada1")),
            Some(UsernameStatus::Unchanged)
        );
        assert_eq!(validate_username("ada2", 4, Some("ada1")), None);
        assert_eq!(validate_username("ada1", 4, None), None);
    }

    #[test]
    fn availability_flags() {
        assert!(UsernameStatus::Available.is_available());
        assert!(UsernameStatus::Unchanged.is_available());
        assert!(!UsernameStatus::Taken.is_available());
        assert!(!UsernameStatus::Checking.is_available());
        assert!(!UsernameStatus::Error("x".to_string()).is_available());
        assert!(UsernameStatus::Checking.is_pending());
    }

    #[test]
    fn messages() {
        assert_eq!(UsernameStatus::Checking.message(), "Checking…");
        assert_eq!(
            UsernameStatus::TooShort { min_length: 4 }.message(),
            "Username must be at least 4 characters."
        );
        assert_eq!(UsernameStatus::Available.message(), "Username is available!");
        assert_eq!(UsernameStatus::Taken.message(), "Username is already taken.");
        assert_eq!(UsernameStatus::Unchanged.message(), "Username unchanged.");
        assert_eq!(
            UsernameStatus::Error("offline".to_string()).message(),
            "Error: offline"
        );
    }

    #[test]
    fn suggestion_has_three_digit_suffix() {
        let mut rng = StdRng::seed_from_u64(7);
        let suggestion = suggest_username("Ada", "Lovelace", &mut rng);

        let (name, suffix) = suggestion.split_at(suggestion.len() - 3);
        assert_eq!(name, "adalovelace");
        let n: u16 = suffix.parse().unwrap();
        assert!((100..=999).contains(&n));
    }

    #[test]
    fn suggestion_empty_without_names() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(suggest_username("", "", &mut rng).is_empty());
        assert!(!suggest_username("", "Lovelace", &mut rng).is_empty());
    }

    #[test]
    fn sanitize_name_keeps_letters() {
        assert_eq!(sanitize_name("O'Brien"), "OBrien");
        assert_eq!(sanitize_name("123"), "");
    }
}
