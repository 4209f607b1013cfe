//! Tier gate.

use jifra_types::{ProPassword, Tier};

/// Plain equality check of the submitted password against the configured one.
#[must_use]
pub fn is_pro(submitted: &str, stored: &ProPassword) -> bool {
    submitted == stored.as_str()
}

#[must_use]
pub fn tier_for(submitted: &str, stored: &ProPassword) -> Tier {
    if is_pro(submitted, stored) {
        Tier::Pro
    } else {
        Tier::Free
    }
}
