//! Identifier and timestamp helpers.
//!
//! Instance and request identifiers are time-ordered UUID v7 values so that
//! persisted instances sort by creation time.

mod ids;
pub mod timestamps;

pub use ids::{generate_uuid, InstanceId, RequestId};
pub use timestamps::{format_long_date, iso_timestamp, now_utc, parse_timestamp, Timestamp};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uuid_is_v7() {
        let id = generate_uuid();
        assert_eq!(id.get_version_num(), 7);
    }

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with("+00:00"));
    }
}
