//! Profile completeness predicate.

use crate::models::UserProfile;

fn has_min_trimmed_length(value: Option<&str>, min_length: usize) -> bool {
    value.map(|v| v.trim().chars().count() >= min_length) == Some(true)
}

fn has_non_empty_trimmed_value(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()) == Some(true)
}

/// A profile is complete when first and last name each trim to at least
/// two characters and the phone number trims to non-empty. An absent
/// profile is never complete. Pure and total.
pub fn is_profile_complete(profile: Option<&UserProfile>) -> bool {
    let Some(profile) = profile else {
        return false;
    };

    has_min_trimmed_length(profile.first_name.as_deref(), 2)
        && has_min_trimmed_length(profile.last_name.as_deref(), 2)
        && has_non_empty_trimmed_value(profile.phone.as_deref())
}
