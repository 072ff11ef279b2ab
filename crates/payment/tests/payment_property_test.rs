// Property-based tests for decoding, formatting and history ordering

use chrono::DateTime;
use payment::format::{get_time_remaining_at, is_expired_at};
use payment::{dedup_and_sort, decode_memo, encode_memo, format_amount, normalize_address, parse_amount};
use proptest::prelude::*;
use serde_json::json;
use shared::models::{HistoryKind, HistoryRecord};

fn record(id: String, created_at: i64) -> HistoryRecord {
    HistoryRecord {
        id: id.clone(),
        kind: HistoryKind::Received,
        amount: 1,
        token: "0xa".to_string(),
        memo: String::new(),
        date: DateTime::from_timestamp(created_at, 0).unwrap(),
        paid: false,
        cancelled: false,
        payer: None,
        payee: None,
        created_at,
        expires_at: created_at,
        transaction_hash: id,
        request_address: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every address shape decodes to the same string
    #[test]
    fn prop_address_shapes_normalize_identically(address in "0x[0-9a-f]{1,64}") {
        for shape in [
            json!(address),
            json!({"inner": address}),
            json!({"address": address}),
            json!({"vec": [address]}),
        ] {
            prop_assert_eq!(normalize_address(&shape).unwrap(), address.clone());
        }
    }

    /// Encoding then decoding any text returns it unchanged
    #[test]
    fn prop_memo_round_trip(memo in any::<String>()) {
        let encoded = encode_memo(&memo);
        prop_assert_eq!(decode_memo(&encoded), memo);
        prop_assert_eq!(encode_memo(&decode_memo(&encoded)), encoded);
    }

    /// Malformed hex comes back untouched
    #[test]
    fn prop_malformed_memo_is_returned_as_is(memo in "0x[0-9a-f]{0,20}[g-z][0-9a-z]{0,10}") {
        prop_assert_eq!(decode_memo(&memo), memo);
    }

    /// Formatting then parsing an amount is lossless for both token precisions
    #[test]
    fn prop_amount_round_trip(amount in any::<u64>(), decimals in prop::sample::select(vec![6u8, 8u8])) {
        let display = format_amount(amount, decimals);
        prop_assert_eq!(parse_amount(&display, decimals).unwrap(), amount);
    }

    /// "Expired" is shown exactly when the request is expired
    #[test]
    fn prop_expiry_consistency(expires_at in 0i64..4_000_000_000, offset in -200_000i64..200_000) {
        let now = expires_at + offset;
        let expired = is_expired_at(expires_at, now);

        prop_assert_eq!(expired, now > expires_at);
        prop_assert_eq!(get_time_remaining_at(expires_at, now) == "Expired", expired);
    }

    /// History comes out unique by id and newest first
    #[test]
    fn prop_history_sorted_and_unique(entries in prop::collection::vec((0u8..20, 0i64..10_000), 0..40)) {
        let records: Vec<HistoryRecord> = entries
            .iter()
            .map(|(id, created_at)| record(format!("0x{}_create", id), *created_at))
            .collect();

        let result = dedup_and_sort(records);

        let mut ids: Vec<&str> = result.iter().map(|r| r.id.as_str()).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), total);

        for pair in result.windows(2) {
            prop_assert!(pair[0].created_at >= pair[1].created_at);
        }
    }
}
