use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use tracing::warn;

const FALLBACK_SUFFIX_LEN: usize = 11;

/// Fresh record identifier: a v4 UUID from the OS random source, or a
/// timestamp-plus-suffix id when that source is unavailable.
pub fn new_id() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string(),
        Err(err) => {
            warn!(error = %err, "secure random source unavailable; using fallback id");
            fallback_id(Utc::now())
        }
    }
}

/// `<unix millis in base 36><random alphanumeric suffix>`.
pub fn fallback_id(now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(FALLBACK_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}{suffix}", to_base36(millis))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{TimeZone, Utc};

    use uuid::Uuid;

    use super::{fallback_id, new_id, to_base36};

    fn is_uuid(id: &str) -> bool {
        Uuid::parse_str(id).is_ok()
    }

    #[test]
    fn ids_are_v4_uuids_and_distinct() {
        let ids: HashSet<String> = (0..500).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| is_uuid(id)));
    }

    #[test]
    fn fallback_starts_with_base36_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap();
        let id = fallback_id(now);
        let prefix = to_base36(now.timestamp_millis() as u64);

        assert!(id.starts_with(&prefix));
        assert_eq!(id.len(), prefix.len() + 11);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(fallback_id(now), id);
    }

    #[test]
    fn base36_digits() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
