//! Property-based tests for the reconciler
//!
//! These verify the sequence invariants hold across arbitrary event
//! streams, including id collisions and interleaved edits.

use super::reconciler::TranscriptReconciler;
use super::turn::{Origin, ReceivedMessage};
use proptest::prelude::*;
use std::collections::HashSet;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_origin() -> impl Strategy<Value = Origin> {
    prop_oneof![Just(Origin::Local), Just(Origin::Remote)]
}

/// Ids from a tiny alphabet so collisions (edits) are common.
fn arb_message() -> impl Strategy<Value = ReceivedMessage> {
    (
        "[a-e]",
        arb_origin(),
        0i64..2_000_000,
        "[a-z ]{0,12}",
        proptest::option::of(0i64..2_000_000),
        any::<bool>(),
    )
        .prop_map(
            |(id, origin, timestamp, content, edit_timestamp, is_final)| ReceivedMessage {
                id,
                origin,
                timestamp,
                content,
                edit_timestamp,
                is_final,
            },
        )
}

fn arb_stream() -> impl Strategy<Value = Vec<ReceivedMessage>> {
    proptest::collection::vec(arb_message(), 0..40)
}

fn ingest_all(messages: &[ReceivedMessage]) -> TranscriptReconciler {
    let mut reconciler = TranscriptReconciler::new();
    for message in messages {
        reconciler
            .ingest(message.clone())
            .expect("generated ids are never blank");
    }
    reconciler
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// snapshot().len() equals the number of distinct ids seen.
    #[test]
    fn snapshot_len_equals_distinct_ids(messages in arb_stream()) {
        let reconciler = ingest_all(&messages);
        let distinct: HashSet<_> = messages.iter().map(|m| m.id.clone()).collect();
        prop_assert_eq!(reconciler.snapshot().len(), distinct.len());
    }

    /// The sequence preserves first-seen insertion order regardless of
    /// subsequent edits and their timestamps.
    #[test]
    fn insertion_order_is_stable(messages in arb_stream()) {
        let reconciler = ingest_all(&messages);

        let mut first_seen = Vec::new();
        for message in &messages {
            if !first_seen.contains(&message.id) {
                first_seen.push(message.id.clone());
            }
        }
        let snapshot_ids: Vec<_> =
            reconciler.snapshot().into_iter().map(|t| t.id).collect();
        prop_assert_eq!(snapshot_ids, first_seen);
    }

    /// Re-ingesting a known id never changes the sequence length.
    #[test]
    fn reingest_never_grows(messages in arb_stream(), edit in arb_message()) {
        let mut reconciler = ingest_all(&messages);
        let len_before = reconciler.len();
        let known = reconciler.snapshot().iter().any(|t| t.id == edit.id);
        reconciler.ingest(edit).unwrap();
        if known {
            prop_assert_eq!(reconciler.len(), len_before);
        } else {
            prop_assert_eq!(reconciler.len(), len_before + 1);
        }
    }

    /// Ingesting every event twice in immediate succession yields a state
    /// identical to ingesting each once.
    #[test]
    fn double_ingest_is_idempotent(messages in arb_stream()) {
        let once = ingest_all(&messages);

        let mut twice = TranscriptReconciler::new();
        for message in &messages {
            twice.ingest(message.clone()).unwrap();
            twice.ingest(message.clone()).unwrap();
        }
        prop_assert_eq!(once.snapshot(), twice.snapshot());
    }

    /// Finality is a one-way latch: a turn is final iff any delivery of
    /// its id was final.
    #[test]
    fn finality_latches(messages in arb_stream()) {
        let reconciler = ingest_all(&messages);
        for turn in reconciler.snapshot() {
            let ever_final = messages
                .iter()
                .any(|m| m.id == turn.id && m.is_final);
            prop_assert_eq!(turn.is_final, ever_final);
        }
    }

    /// A turn's content is always the most recent delivery's content.
    #[test]
    fn content_is_last_delivery(messages in arb_stream()) {
        let reconciler = ingest_all(&messages);
        for turn in reconciler.snapshot() {
            let last = messages
                .iter()
                .rev()
                .find(|m| m.id == turn.id)
                .expect("every turn came from a message");
            prop_assert_eq!(&turn.content, &last.content);
        }
    }
}
