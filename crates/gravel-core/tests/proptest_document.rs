//! Property-based tests for document-wide validation.
//!
//! Generates random release numbers and identifier sets, builds documents
//! through the lifecycle protocol, and checks the end-of-parse outcome.

use gravel_core::node::*;
use gravel_core::test_utils::*;
use gravel_core::tree::{DocumentError, ResourceTree};
use proptest::prelude::*;
use std::collections::HashSet;

// ===========================================================================
// Generators
// ===========================================================================

/// Identifier names drawn from a small pool so collisions are common.
fn arb_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(
        prop_oneof![
            Just("IDS_A"),
            Just("IDS_B"),
            Just("IDS_C"),
            Just("IDS_D"),
            Just("IDOK"),
            Just("IDC_STATIC"),
        ]
        .prop_map(str::to_string),
        0..max,
    )
}

/// Names that are not predefined system ids, in order of their first repeat.
fn expected_duplicates(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dups: Vec<String> = Vec::new();
    for name in names {
        if name == "IDOK" || name.starts_with("IDC_STATIC") {
            continue;
        }
        if !seen.insert(name.clone()) && !dups.contains(name) {
            dups.push(name.clone());
        }
    }
    dups
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #[test]
    fn release_order_decides_end_of_parse(latest in 0u32..50, current in 0u32..50) {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, &latest.to_string(), &current.to_string());
        let result = tree.end_node(root);
        if latest <= current {
            prop_assert!(result.is_ok());
            prop_assert!(tree.is_sealed());
        } else {
            let is_release_order = matches!(result, Err(DocumentError::ReleaseOrder { .. }));
            prop_assert!(is_release_order);
            prop_assert!(!tree.is_sealed());
        }
    }

    #[test]
    fn release_seq_bounded_by_current(current in 0u32..20, seq in 0u32..40) {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "0", &current.to_string());
        let release = tree.start_node(NodeKind::Release, Some(root)).unwrap();
        let result = tree.handle_attribute(release, ATTR_SEQ, &seq.to_string());
        prop_assert_eq!(result.is_ok(), seq <= current);
    }

    #[test]
    fn duplicate_ids_reported_in_first_repeat_order(names in arb_names(12)) {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        let section = tree.start_node(NodeKind::Identifiers, Some(root)).unwrap();
        for name in &names {
            add_identifier(&mut tree, section, name);
        }
        tree.end_node(section).unwrap();

        let expected = expected_duplicates(&names);
        match tree.end_node(root) {
            Ok(()) => prop_assert!(expected.is_empty()),
            Err(DocumentError::DuplicateKey(found)) => prop_assert_eq!(found, expected),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn conditional_copies_never_collide(names in arb_names(8)) {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        let release = start_release(&mut tree, root, "1");
        let messages = tree.start_node(NodeKind::Messages, Some(release)).unwrap();
        let unique: Vec<&String> = names
            .iter()
            .filter(|n| n.starts_with("IDS_"))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        for expr in ["lang == 'en'", "lang == 'fr'", "lang == 'de'"] {
            let cond = start_conditional(&mut tree, messages, expr);
            for name in &unique {
                add_message(&mut tree, cond, name);
            }
            tree.end_node(cond).unwrap();
        }
        tree.end_node(messages).unwrap();
        tree.end_node(release).unwrap();
        prop_assert!(tree.end_node(root).is_ok());
    }
}
