//! Offset pagination over the post listing.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 2;
pub const MAX_LIMIT: u32 = 100;

/// A 1-based page of `limit` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Builds a page from already-parsed numbers. Zero or negative values
    /// fall back to the defaults; `limit` is capped at [`MAX_LIMIT`].
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page
            .filter(|p| *p >= 1)
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(DEFAULT_PAGE);
        let limit = limit
            .filter(|l| *l >= 1)
            .map(|l| l.min(i64::from(MAX_LIMIT)) as u32)
            .unwrap_or(DEFAULT_LIMIT);
        Self { page, limit }
    }

    /// Lenient parsing of raw query parameters. The leading integer of each
    /// value is used (`"3abc"` and `"3.5"` read as 3); values without one
    /// are treated as absent.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        Self::new(page.and_then(leading_int), limit.and_then(leading_int))
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Whether items exist beyond this page, given the total number of matches.
    pub fn has_more(&self, total: u64) -> bool {
        u64::from(self.page) * u64::from(self.limit) < total
    }
}

/// Optional sign followed by the leading run of ASCII digits. Runs too long
/// for an `i64` saturate.
fn leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (negative, rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude = rest[..digits].bytes().fold(0i64, |acc, d| {
        acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}
