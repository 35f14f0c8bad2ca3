//! Reserved device-name guard
//!
//! Some Windows releases crash or hang when a path contains a DOS device name
//! such as `CON` or `AUX`. Deployments on such targets install a
//! [`ReservedNameGuard`] on the validator; everyone else runs without one.

use std::fmt;

/// Device names rejected by [`ReservedNameGuard::default`].
pub const RESERVED_DEVICE_NAMES: [&str; 6] = ["con", "com", "nul", "aux", "clock$", "config$"];

/// Capability consulted by the validator for every retained path segment.
pub trait PathGuard: Send + Sync + fmt::Debug {
    /// Returns `true` if `segment` must not be served.
    fn is_reserved(&self, segment: &str) -> bool;
}

/// Rejects segments naming a reserved device.
#[derive(Debug, Clone)]
pub struct ReservedNameGuard {
    names: Vec<String>,
}

impl Default for ReservedNameGuard {
    fn default() -> Self {
        Self::new(RESERVED_DEVICE_NAMES)
    }
}

impl ReservedNameGuard {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(|n| n.into().to_ascii_lowercase()).collect(),
        }
    }
}

impl PathGuard for ReservedNameGuard {
    fn is_reserved(&self, segment: &str) -> bool {
        self.names.iter().any(|name| matches_device(segment, name))
    }
}

/// Case-insensitive match of `segment` against a device name. One extra
/// trailing character still matches unless it is alphanumeric, so `aux:` is
/// reserved and `auxi` is not.
fn matches_device(segment: &str, name: &str) -> bool {
    let seg = segment.as_bytes();
    let name = name.as_bytes();

    if seg.len() < name.len() || seg.len() > name.len() + 1 {
        return false;
    }
    if !seg[..name.len()].eq_ignore_ascii_case(name) {
        return false;
    }

    match seg.get(name.len()) {
        None => true,
        Some(last) => !last.is_ascii_alphanumeric(),
    }
}
