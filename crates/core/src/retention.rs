//! Naming and expiry rules of the legal retention archive.
//!
//! When an account is closed, its data is archived into a remote folder
//! named `YYYY-MM-DD:pk:email:fullname` (cancellation date first). The
//! folder holds `account.json` plus one `{pk}-{slug}.pdf` per FOI request
//! and is deleted once the retention period has passed.

use chrono::{Duration, NaiveDate};

use crate::types::DbId;

/// Retention period in days (three years of 365 days).
pub const RETENTION_PERIOD_DAYS: i64 = 3 * 365;

/// Name the account export's first item must carry.
pub const ACCOUNT_EXPORT_NAME: &str = "account.json";

const FOLDER_SEPARATOR: char = ':';

/// Folder name for an archived account. Written with `:` separators.
pub fn archive_folder_name(
    cancelled_on: NaiveDate,
    user_id: DbId,
    email: &str,
    full_name: &str,
) -> String {
    format!(
        "{}{sep}{user_id}{sep}{email}{sep}{full_name}",
        cancelled_on.format("%Y-%m-%d"),
        sep = FOLDER_SEPARATOR
    )
}

/// Cancellation date of a folder name. `:` and `_` are both accepted as
/// separators; names whose first component is not an ISO date yield `None`.
pub fn parse_folder_date(name: &str) -> Option<NaiveDate> {
    let first = name.split([':', '_']).next()?;
    NaiveDate::parse_from_str(first.trim(), "%Y-%m-%d").ok()
}

/// Last non-empty path segment of a multistatus `href`, percent-decoded.
pub fn folder_segment_from_href(href: &str) -> Option<String> {
    let path = href.trim().split(['?', '#']).next()?;
    path.split('/')
        .rev()
        .find(|segment| !segment.is_empty())
        .map(percent_decode)
}

/// Whether an archive dated `archived_on` has outlived the retention period.
pub fn is_expired(archived_on: NaiveDate, today: NaiveDate) -> bool {
    archived_on + Duration::days(RETENTION_PERIOD_DAYS) < today
}

/// File name of a request's PDF inside the archive folder.
pub fn request_pdf_name(request_id: DbId, slug: &str) -> String {
    format!("{request_id}-{slug}.pdf")
}

/// Decode `%XX` escapes. Invalid escapes are kept as-is; invalid UTF-8 is
/// replaced.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Escape a single path segment for use in a URL. Unreserved characters and
/// the sub-delimiters allowed in paths (`:` and `@` included) pass through.
pub fn percent_encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'.'
            | b'_'
            | b'~'
            | b':'
            | b'@'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'=' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
