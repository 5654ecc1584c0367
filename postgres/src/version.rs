//! Server version parsing.
//!
//! Versions use Postgres' numeric format: `MAJOR * 10000 + MINOR * 100 + PATCH`.

use std::num::NonZeroI32;

/// Parses the `server_version` parameter reported on connection startup.
///
/// Accepts strings such as `16.2`, `15.4 (Debian 15.4-1.pgdg120+1)` or `17beta1`.
pub fn extract_server_version(server_version_str: impl AsRef<str>) -> Option<NonZeroI32> {
    let version_part = server_version_str.as_ref().split_whitespace().next()?;

    let mut components = version_part.split('.').map(|component| {
        let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<i32>().unwrap_or(0)
    });

    let major = components.next().unwrap_or(0);
    let minor = components.next().unwrap_or(0);
    let patch = components.next().unwrap_or(0);

    NonZeroI32::new(major * 10000 + minor * 100 + patch)
}
