/// Property-based tests for value trees.
///
/// Uses `proptest` to generate random plaintext trees (mixed secure and plain
/// leaves, nested up to 3 levels) and checks:
/// - Round-trip: `decrypt(encrypt(t)) == t`, single-value and batched
/// - Batched and single-value conversion produce the same encrypted tree
/// - Chunking never reorders, drops or duplicates values
/// - JSON and YAML encoding round-trip, including the `secure` marker
/// - `is_secure` agrees with the number of collected secrets
///
/// Floats are drawn from "simple" decimals so that text encodings reproduce
/// them exactly.
use proptest::prelude::*;
use sealcfg_core::{
    chunk_by_size, collect_secrets, Base64Crypter, Batcher, EncryptedTree, PlaintextTree, Tree,
};
use std::collections::BTreeMap;

// ============================================================================
// Strategies
// ============================================================================

/// Object keys, including the reserved `secure` key.
fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => prop::string::string_regex("[a-z_][a-z0-9_]{0,8}").unwrap(),
        1 => Just("secure".to_string()),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,20}",
        Just(String::new()),
        Just("caf\u{00e9}".to_string()),
        Just("line1\nline2".to_string()),
        Just("true".to_string()),
        Just("42".to_string()),
    ]
}

fn arb_float() -> impl Strategy<Value = f64> {
    (-1_000_000i64..1_000_000i64, 1u32..4u32).prop_filter_map(
        "must have a fractional part",
        |(mantissa, decimals)| {
            let f = mantissa as f64 / 10f64.powi(decimals as i32);
            (f.fract() != 0.0).then_some(f)
        },
    )
}

fn arb_leaf() -> impl Strategy<Value = PlaintextTree> {
    prop_oneof![
        Just(PlaintextTree::Null),
        any::<bool>().prop_map(PlaintextTree::Bool),
        any::<i64>().prop_map(PlaintextTree::Int),
        arb_float().prop_map(PlaintextTree::Float),
        arb_text().prop_map(PlaintextTree::string),
        arb_text().prop_map(PlaintextTree::secure_string),
    ]
}

/// Trees up to `depth` levels deep. Object entries that would form the
/// reserved shape are dropped by the constructor filter.
fn arb_tree(depth: u32) -> BoxedStrategy<PlaintextTree> {
    if depth == 0 {
        return arb_leaf().boxed();
    }
    prop_oneof![
        3 => arb_leaf(),
        2 => prop::collection::vec(arb_tree(depth - 1), 0..5).prop_map(PlaintextTree::Array),
        2 => prop::collection::btree_map(arb_key(), arb_tree(depth - 1), 0..5)
            .prop_filter_map("reserved shape", |entries| PlaintextTree::object(entries).ok()),
    ]
    .boxed()
}

fn count_secure_leaves(tree: &PlaintextTree) -> usize {
    match tree {
        Tree::String(text) if text.is_secure() => 1,
        Tree::Array(items) => items.iter().map(count_secure_leaves).sum(),
        Tree::Object(object) => object.values().map(count_secure_leaves).sum(),
        _ => 0,
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// decrypt(encrypt(t)) == t through the single-value path.
    #[test]
    fn single_value_round_trip(tree in arb_tree(3)) {
        let encrypted = tree.encrypt(&Base64Crypter).unwrap();
        prop_assert_eq!(encrypted.decrypt(&Base64Crypter).unwrap(), tree);
    }

    /// decrypt(encrypt(t)) == t through the batched path, for any chunk bound.
    #[test]
    fn batched_round_trip(tree in arb_tree(3), chunk_size in 0usize..64) {
        let batcher = Batcher::with_chunk_size(chunk_size);
        let encrypted = batcher.encrypt(&tree, &Base64Crypter).unwrap();
        prop_assert_eq!(batcher.decrypt(&encrypted, &Base64Crypter).unwrap(), tree);
    }

    /// Batching changes the number of calls, never the result.
    #[test]
    fn batched_matches_single_value(tree in arb_tree(3), chunk_size in 0usize..64) {
        let batched = Batcher::with_chunk_size(chunk_size)
            .encrypt(&tree, &Base64Crypter)
            .unwrap();
        prop_assert_eq!(batched, tree.encrypt(&Base64Crypter).unwrap());
    }

    /// Flattening the chunks gives back the input, and only the first value
    /// of a chunk may push it past the bound.
    #[test]
    fn chunking_preserves_values(
        values in prop::collection::vec("[a-z]{0,12}", 0..40),
        bound in 0usize..32,
    ) {
        let chunks = chunk_by_size(&values, bound);
        let flattened: Vec<String> = chunks.iter().flat_map(|c| c.iter().cloned()).collect();
        prop_assert_eq!(&flattened, &values);
        for chunk in &chunks {
            prop_assert!(!chunk.is_empty());
            let bytes: usize = chunk.iter().map(String::len).sum();
            prop_assert!(chunk.len() == 1 || bytes <= bound);
        }
    }

    /// JSON encoding round-trips, including secure markers.
    #[test]
    fn json_round_trip(tree in arb_tree(3)) {
        let encrypted: EncryptedTree = tree.encrypt(&Base64Crypter).unwrap();
        let json = encrypted.to_json().unwrap();
        prop_assert_eq!(EncryptedTree::from_json(&json).unwrap(), encrypted);
    }

    /// YAML encoding round-trips, including secure markers.
    #[test]
    fn yaml_round_trip(tree in arb_tree(3)) {
        let yaml = tree.to_yaml().unwrap();
        prop_assert_eq!(PlaintextTree::from_yaml(&yaml).unwrap(), tree);
    }

    /// A tree is secure exactly when it has at least one secure leaf.
    #[test]
    fn secure_propagation(tree in arb_tree(3)) {
        let (_, pending) = collect_secrets(&[&tree]);
        prop_assert_eq!(pending.len(), count_secure_leaves(&tree));
        prop_assert_eq!(tree.is_secure(), !pending.is_empty());
        prop_assert_eq!(tree.secure_values().len(), pending.len());
    }

    /// A forest batches as one pass and reassembles per entry.
    #[test]
    fn forest_round_trip(
        entries in prop::collection::btree_map("[a-z]{1,6}", arb_tree(2), 0..6),
        chunk_size in 1usize..32,
    ) {
        let batcher = Batcher::with_chunk_size(chunk_size);
        let encrypted = batcher.encrypt_all(&entries, &Base64Crypter).unwrap();
        prop_assert_eq!(encrypted.len(), entries.len());
        let decrypted: BTreeMap<String, PlaintextTree> =
            batcher.decrypt_all(&encrypted, &Base64Crypter).unwrap();
        prop_assert_eq!(decrypted, entries);
    }
}
