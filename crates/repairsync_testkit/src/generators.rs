//! Property-based test generators using proptest.

use proptest::prelude::*;

/// Strategy for well-formed lowercase UUID strings.
pub fn uuid_strategy() -> impl Strategy<Value = String> {
    any::<u128>().prop_map(|n| ::uuid::Uuid::from_u128(n).to_string())
}

/// Strategy for ids that are not UUIDs: legacy numeric ids, short codes,
/// truncated or mis-grouped UUIDs.
pub fn malformed_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..100_000).prop_map(|n| n.to_string()),
        prop::string::string_regex("[A-Z]{2}-[0-9]{1,6}").expect("valid regex"),
        uuid_strategy().prop_map(|u| u[..u.len() - 1].to_owned()),
        uuid_strategy().prop_map(|u| u.replace('-', "")),
        uuid_strategy().prop_map(|u| format!("{{{u}}}")),
    ]
}

/// Strategy for `YYYY-MM-DD` date strings with their UTC-midnight epoch value.
pub fn date_string_strategy() -> impl Strategy<Value = (String, i64)> {
    // Days since 1970-01-01 covering 2000..2100.
    (10_957i64..47_482).prop_map(|days| {
        let (y, m, d) = civil_from_days(days);
        (format!("{y:04}-{m:02}-{d:02}"), days * 86_400_000)
    })
}

/// Converts days since the epoch into a proleptic Gregorian date.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = yoe + era * 400 + i64::from(m <= 2);
    (y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repairsync_core::is_valid_uuid;

    #[test]
    fn civil_dates() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
        assert_eq!(civil_from_days(11_016), (2000, 2, 29));
    }

    proptest! {
        #[test]
        fn generated_uuids_are_valid(id in uuid_strategy()) {
            prop_assert!(is_valid_uuid(&id));
        }

        #[test]
        fn malformed_ids_are_invalid(id in malformed_id_strategy()) {
            prop_assert!(!is_valid_uuid(&id));
        }
    }
}
