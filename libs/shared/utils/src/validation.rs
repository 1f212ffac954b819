use std::sync::LazyLock;

use regex::Regex;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9][0-9\s\-().]{5,19}$").unwrap()
});

// Auth backend uids: opaque, path-safe tokens.
static UID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]{1,128}$").unwrap());

pub fn validate_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL.is_match(email)
}

/// Empty phone numbers are allowed; profiles may omit them.
pub fn validate_phone(phone: &str) -> bool {
    phone.is_empty() || PHONE.is_match(phone)
}

/// Identifiers end up inside database paths, so they must not contain
/// separators or the reserved `. $ # [ ] /` characters.
pub fn validate_uid(uid: &str) -> bool {
    UID.is_match(uid)
}
