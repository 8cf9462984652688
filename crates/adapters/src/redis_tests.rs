// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn encodes_semaphore_admission() {
    let tx = SortedTransaction::new("pool")
        .insert("a", 1000.0)
        .remove_by_score(f64::NEG_INFINITY, 900.0)
        .remove_by_rank(2, -1)
        .score("a");

    assert_eq!(
        encode_transaction(&tx),
        vec![
            "0", "4", "insert", "a", "1000", "rem_score", "-inf", "900", "rem_rank", "2", "-1",
            "score", "a",
        ]
    );
}

#[test]
fn encodes_preconditions_before_ops() {
    let tx = SortedTransaction::new("pool")
        .require_member("a")
        .rescore("a", 1.5);

    assert_eq!(
        encode_transaction(&tx),
        vec!["1", "a", "1", "rescore", "a", "1.5"]
    );
}

#[parameterized(
    pos_inf = { f64::INFINITY, "+inf" },
    neg_inf = { f64::NEG_INFINITY, "-inf" },
    whole = { 1700000000000.0, "1700000000000" },
    fraction = { 0.25, "0.25" },
)]
fn score_arguments(score: f64, expected: &str) {
    assert_eq!(score_arg(score), expected);
}

#[parameterized(
    zero = { Duration::ZERO, 1 },
    sub_milli = { Duration::from_micros(10), 1 },
    seconds = { Duration::from_secs(30), 30_000 },
)]
fn ttl_rounds_up_to_one_milli(ttl: Duration, expected: u64) {
    assert_eq!(ttl_millis(ttl), expected);
}

#[test]
fn decodes_committed_replies() {
    let ops = SortedTransaction::new("pool")
        .insert("a", 1.0)
        .remove_by_score(f64::NEG_INFINITY, 0.0)
        .score("a")
        .score("b")
        .ops;
    let raw = vec![
        Some("1".to_string()),
        Some("1".to_string()),
        Some("0".to_string()),
        Some("1".to_string()),
        None,
    ];

    assert_eq!(
        decode_replies(&ops, raw),
        Ok(TransactionOutcome::Committed(vec![
            OpReply::Count(1),
            OpReply::Count(0),
            OpReply::Score(Some(1.0)),
            OpReply::Score(None),
        ]))
    );
}

#[test]
fn decodes_aborted_marker() {
    let ops = SortedTransaction::new("pool").rescore("a", 1.0).ops;
    assert_eq!(
        decode_replies(&ops, vec![Some("0".to_string())]),
        Ok(TransactionOutcome::Aborted)
    );
}

#[parameterized(
    empty = { vec![] },
    bad_marker = { vec![Some("yes".to_string()), Some("1".to_string())] },
    short = { vec![Some("1".to_string())] },
    bad_count = { vec![Some("1".to_string()), Some("one".to_string())] },
    missing_count = { vec![Some("1".to_string()), None] },
)]
fn rejects_malformed_replies(raw: Vec<Option<String>>) {
    let ops = SortedTransaction::new("pool").insert("a", 1.0).ops;
    assert!(matches!(
        decode_replies(&ops, raw),
        Err(StoreError::Protocol(_))
    ));
}

#[test]
fn rejects_unparseable_score() {
    let ops = SortedTransaction::new("pool").score("a").ops;
    let raw = vec![Some("1".to_string()), Some("soon".to_string())];
    assert!(matches!(
        decode_replies(&ops, raw),
        Err(StoreError::Protocol(_))
    ));
}
