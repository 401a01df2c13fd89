//! Property-based tests for the checklist codec.
//!
//! Uses proptest to verify:
//! 1. Any well-formed `Checklist` survives encode → decode round-trip,
//!    including unknown section types.
//! 2. `decode` is total: arbitrary strings never panic, and non-array
//!    input always yields the single fallback section wrapping the raw
//!    text verbatim.
//! 3. The completion percentage always lands in 0..=100.

use proptest::prelude::*;
use taskdeck_model::checklist::{Checklist, Section, Subtask, SubtaskId, DEFAULT_SECTION_TITLE};
use uuid::Uuid;

// --- Strategies ---

fn arb_subtask() -> impl Strategy<Value = Subtask> {
    (any::<u128>(), "[^\x00]{0,64}", any::<bool>()).prop_map(|(n, content, completed)| Subtask {
        id: SubtaskId::from_uuid(Uuid::from_u128(n)),
        content,
        completed,
    })
}

fn arb_heading() -> impl Strategy<Value = Section> {
    ("[^\x00]{0,32}", prop::collection::vec(arb_subtask(), 0..8))
        .prop_map(|(content, subtasks)| Section::Heading { content, subtasks })
}

/// Unknown sections seen in the wild: objects with a non-heading type tag.
fn arb_unknown() -> impl Strategy<Value = Section> {
    ("[a-z]{1,12}", "[^\x00\"\\\\]{0,32}")
        .prop_filter("heading is not an unknown type", |(kind, _)| kind != "heading")
        .prop_map(|(kind, body)| {
            Section::Unknown(serde_json::json!({ "type": kind, "body": body }))
        })
}

fn arb_checklist() -> impl Strategy<Value = Checklist> {
    prop::collection::vec(prop_oneof![4 => arb_heading(), 1 => arb_unknown()], 0..6).prop_map(
        |sections| {
            let mut checklist = Checklist::new();
            for section in sections {
                checklist.push_section(section);
            }
            checklist
        },
    )
}

// --- Property tests ---

proptest! {
    /// Any well-formed checklist survives an encode → decode round-trip.
    #[test]
    fn checklist_round_trip(checklist in arb_checklist()) {
        let encoded = checklist.encode();
        let decoded = Checklist::decode(Some(&encoded));
        prop_assert_eq!(checklist, decoded);
    }

    /// Decoding never panics, whatever the stored text looks like.
    #[test]
    fn decode_arbitrary_text_no_panic(raw in ".{0,512}") {
        let _ = Checklist::decode(Some(&raw));
    }

    /// Non-empty text that is not a JSON array decodes to exactly one
    /// fallback section holding the raw text as a single open subtask.
    #[test]
    fn non_array_text_takes_fallback(raw in "[a-zA-Z ]{1,64}") {
        let checklist = Checklist::decode(Some(&raw));
        prop_assert_eq!(checklist.sections().len(), 1);
        match &checklist.sections()[0] {
            Section::Heading { content, subtasks } => {
                prop_assert_eq!(content, DEFAULT_SECTION_TITLE);
                prop_assert_eq!(subtasks.len(), 1);
                prop_assert_eq!(&subtasks[0].content, &raw);
                prop_assert!(!subtasks[0].completed);
            }
            Section::Unknown(_) => prop_assert!(false, "expected fallback heading"),
        }
    }

    /// The aggregate percentage is always a valid 0..=100 value and is
    /// stable across a codec round-trip.
    #[test]
    fn percentage_in_range_and_codec_stable(checklist in arb_checklist()) {
        let pct = checklist.completion_percentage();
        prop_assert!(pct <= 100);
        let decoded = Checklist::decode(Some(&checklist.encode()));
        prop_assert_eq!(decoded.completion_percentage(), pct);
    }

    /// Setting every subtask completed drives the aggregate to 100 (or 0
    /// when there are no subtasks at all).
    #[test]
    fn all_completed_is_full(checklist in arb_checklist()) {
        let mut checklist = checklist;
        let ids: Vec<SubtaskId> = checklist
            .sections()
            .iter()
            .filter_map(|section| match section {
                Section::Heading { subtasks, .. } => {
                    Some(subtasks.iter().map(|s| s.id.clone()).collect::<Vec<_>>())
                }
                Section::Unknown(_) => None,
            })
            .flatten()
            .collect();
        for id in &ids {
            checklist.set_completed(id, true).expect("id came from the checklist");
        }
        let expected = u8::from(!ids.is_empty()) * 100;
        prop_assert_eq!(checklist.completion_percentage(), expected);
    }
}
