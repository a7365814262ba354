use std::sync::LazyLock;

use chrono::{Local, NaiveDateTime};
use regex::Regex;

/// Source of the local wall clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

// One octet: 0-255, no leading zeros except for "0" itself.
static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    let octet = r"(25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9][0-9]|[0-9])";
    Regex::new(&format!(r"^{octet}\.{octet}\.{octet}\.{octet}$")).expect("IPv4 pattern is valid")
});

/// Strict dotted-quad IPv4 check.
pub fn is_valid_ipv4(address: &str) -> bool {
    IPV4.is_match(address)
}
