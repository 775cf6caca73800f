//! Object key layout for stored batches.
//!
//! Every batch lives at
//! `1/v1/{YYYY-MM-DD}/1/{public_user_id}/{SSSSS}__{suffix}.json.gz`, where the
//! date is the UTC ingestion date and `SSSSS` the zero padded number of
//! seconds since UTC midnight. The leading `1/`, `v1/` and the `1/` after the
//! date are fixed markers. Zero padding makes a lexicographic sort of the file
//! names chronological within one user and day.

use once_cell::sync::Lazy;
use regex::Regex;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::api::CaptureError;

pub const VERSION: &str = "v1";
pub const FILE_NAME_SUFFIX: &str = ".json.gz";

// Anchored at the start only; anything after the day is not checked.
static DATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("date regex is valid"));

pub fn validate_date(date: &str) -> Result<(), CaptureError> {
    if !DATE_REGEX.is_match(date) {
        return Err(CaptureError::InvalidDate);
    }
    Ok(())
}

/// Path parameters are joined into object keys and public URLs verbatim, so
/// none of them may carry URL syntax of their own.
pub fn validate_path_segment(segment: &str) -> Result<(), CaptureError> {
    if segment.contains(['/', '\\', '?', '#']) {
        return Err(CaptureError::InvalidPathSegment(segment.to_string()));
    }
    Ok(())
}

/// `YYYY-MM-DD`, the `Display` form of [`Date`].
pub fn date_str(date: Date) -> String {
    date.to_string()
}

/// Always below 86400, so it fits the five digit field.
pub fn seconds_since_midnight(now: OffsetDateTime) -> u32 {
    let (hour, minute, second) = now.to_offset(UtcOffset::UTC).time().as_hms();
    u32::from(hour) * 3600 + u32::from(minute) * 60 + u32::from(second)
}

/// Directory holding every user's batches for `date`.
pub fn users_prefix(date: &str) -> String {
    format!("1/{VERSION}/{date}/1/")
}

/// Directory holding one user's batches for `date`.
pub fn user_prefix(date: &str, public_user_id: &str) -> String {
    format!("{}{public_user_id}/", users_prefix(date))
}

pub fn batch_id(now: OffsetDateTime, suffix: &str) -> String {
    format!("{:05}__{suffix}", seconds_since_midnight(now))
}

/// Key a batch stored at `now` by `public_user_id` is written to.
pub fn batch_key(now: OffsetDateTime, public_user_id: &str, suffix: &str) -> String {
    let now = now.to_offset(UtcOffset::UTC);
    stored_batch_key(
        &date_str(now.date()),
        public_user_id,
        &batch_id(now, suffix),
    )
}

/// Key of an already stored batch, rebuilt from the parts a client sees.
pub fn stored_batch_key(date: &str, public_user_id: &str, batch_id: &str) -> String {
    format!(
        "{}{batch_id}{FILE_NAME_SUFFIX}",
        user_prefix(date, public_user_id)
    )
}

/// `None` when the file name is not a stored batch.
pub fn batch_id_from_file_name(file_name: &str) -> Option<&str> {
    file_name.strip_suffix(FILE_NAME_SUFFIX)
}

/// Last path segment of an object key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
