//! Push-sequence handling for job names.
//!
//! Service job names end with a push number (`myapp-main-v004`). When a
//! description carries no explicit sequence it is derived from that suffix.

use regex::Regex;
use std::sync::LazyLock;

static PUSH_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^.+-v(\d{3,})$").unwrap());

/// `v%03d` sequence for a name ending in `-vNNN` (three or more digits).
///
/// Returns `None` when the name has no push suffix or the number does not
/// fit; callers treat both as "no sequence".
pub fn push_sequence(name: &str) -> Option<String> {
    let captures = PUSH_SUFFIX.captures(name)?;
    let number: u64 = captures.get(1)?.as_str().parse().ok()?;
    Some(format!("v{:03}", number))
}
