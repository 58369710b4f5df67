//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{json, Value};

use veriminutes_core::{canonical_json, Keypair};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate raw document bytes of at most `max_len`.
pub fn document(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a person's name.
pub fn person() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,12}".prop_map(String::from)
}

/// Generate a motion.
pub fn motion() -> impl Strategy<Value = Value> {
    (
        "[A-Za-z ]{3,60}",
        prop_oneof![Just("carried"), Just("failed"), Just("tabled")],
        person(),
    )
        .prop_map(|(text, result, mover)| json!({"text": text, "result": result, "mover": mover}))
}

/// Generate a minutes document. Notes may span several 64 KiB chunks when
/// `max_notes` allows it.
pub fn minutes(max_notes: usize) -> impl Strategy<Value = Value> {
    (
        "[A-Za-z0-9 ]{1,40}",
        (2020i32..2030, 1u32..=12, 1u32..=28),
        prop::collection::vec(person(), 1..10),
        prop::collection::vec(motion(), 0..5),
        prop::collection::vec(any::<u8>(), 0..=max_notes),
    )
        .prop_map(|(title, (y, m, d), attendees, motions, noise)| {
            let notes: String = noise.iter().map(|b| (b' ' + b % 95) as char).collect();
            json!({
                "title": title,
                "date": format!("{:04}-{:02}-{:02}", y, m, d),
                "attendees": attendees,
                "motions": motions,
                "notes": notes,
            })
        })
}

/// Canonical bytes of a generated minutes document.
pub fn minutes_bytes(max_notes: usize) -> impl Strategy<Value = Vec<u8>> {
    minutes(max_notes).prop_map(|doc| canonical_json(&doc))
}

/// A single-byte mutation: position (as an index into any length) and a
/// non-zero XOR mask.
pub fn mutation() -> impl Strategy<Value = (prop::sample::Index, u8)> {
    (any::<prop::sample::Index>(), 1u8..=255)
}

/// Apply a [`mutation`] to `bytes`.
pub fn apply_mutation(bytes: &mut [u8], (position, mask): &(prop::sample::Index, u8)) {
    if bytes.is_empty() {
        return;
    }
    let i = position.index(bytes.len());
    bytes[i] ^= mask;
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriminutes_core::parse_canonical;

    proptest! {
        #[test]
        fn generated_minutes_are_canonical(bytes in minutes_bytes(512)) {
            prop_assert!(parse_canonical(&bytes).is_ok());
        }

        #[test]
        fn mutation_changes_exactly_one_byte(mut bytes in document(256), m in mutation()) {
            prop_assume!(!bytes.is_empty());
            let original = bytes.clone();
            apply_mutation(&mut bytes, &m);
            let changed = original.iter().zip(&bytes).filter(|(a, b)| a != b).count();
            prop_assert_eq!(changed, 1);
        }
    }
}
