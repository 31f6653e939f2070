use chrono::{DateTime, Utc};

/// Seconds from the Unix epoch to `0001-01-01T00:00:00Z`.
const YEAR_ONE_UNIX_SECONDS: i64 = -62_135_596_800;

/// A timestamp counts as zero when it is the Unix epoch, the start of year
/// one (`0001-01-01T00:00:00Z`) or the minimum representable instant. Unset
/// upstream fields decode to one of these.
pub fn is_zero(at: &DateTime<Utc>) -> bool {
    if *at == DateTime::<Utc>::MIN_UTC {
        return true;
    }
    at.timestamp_subsec_nanos() == 0
        && (at.timestamp() == 0 || at.timestamp() == YEAR_ONE_UNIX_SECONDS)
}

pub fn zero() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}
