/// Tree construction, secure propagation, and the reserved-shape guard.
use sealcfg_core::{EncryptedTree, Object, PlaintextTree, SealError, Text, Tree};

fn obj(entries: Vec<(&str, PlaintextTree)>) -> PlaintextTree {
    PlaintextTree::object(entries).expect("object should build")
}

// ============================================================================
// Secure propagation
// ============================================================================

#[test]
fn scalars_are_not_secure() {
    assert!(!PlaintextTree::Null.is_secure());
    assert!(!PlaintextTree::Bool(true).is_secure());
    assert!(!PlaintextTree::Int(7).is_secure());
    assert!(!PlaintextTree::Float(1.5).is_secure());
    assert!(!PlaintextTree::string("plain").is_secure());
}

#[test]
fn secure_string_is_secure() {
    assert!(PlaintextTree::secure_string("s3cr3t").is_secure());
    assert!(EncryptedTree::secure_string("ciphertext").is_secure());
}

#[test]
fn empty_composites_are_not_secure() {
    assert!(!PlaintextTree::array([]).is_secure());
    assert!(!PlaintextTree::Object(Object::new()).is_secure());
}

#[test]
fn array_with_secure_element_is_secure() {
    let tree = PlaintextTree::array([
        PlaintextTree::Int(1),
        PlaintextTree::secure_string("x"),
    ]);
    assert!(tree.is_secure());
}

#[test]
fn deeply_nested_secure_leaf_propagates() {
    let tree = obj(vec![(
        "a",
        obj(vec![(
            "b",
            PlaintextTree::array([obj(vec![("c", PlaintextTree::secure_string("deep"))])]),
        )]),
    )]);
    assert!(tree.is_secure());
}

#[test]
fn composite_of_plain_leaves_is_not_secure() {
    let tree = obj(vec![
        ("a", PlaintextTree::string("x")),
        ("b", PlaintextTree::array([PlaintextTree::Bool(false)])),
    ]);
    assert!(!tree.is_secure());
}

// ============================================================================
// Reserved shape
// ============================================================================

#[test]
fn object_with_single_plain_secure_key_is_rejected() {
    let result = PlaintextTree::object([("secure", PlaintextTree::string("x"))]);
    assert!(matches!(
        result,
        Err(SealError::ReservedRepresentation { .. })
    ));
}

#[test]
fn object_with_single_non_string_secure_key_is_allowed() {
    let tree = PlaintextTree::object([("secure", PlaintextTree::Int(42))]).unwrap();
    assert_eq!(tree.as_object().unwrap().len(), 1);
}

#[test]
fn object_with_single_secure_leaf_under_secure_key_is_allowed() {
    // The wire form would be {"secure":{"secure":"x"}}, which is unambiguous.
    let tree = PlaintextTree::object([("secure", PlaintextTree::secure_string("x"))]);
    assert!(tree.is_ok());
}

#[test]
fn object_with_secure_key_and_siblings_is_allowed() {
    let tree = PlaintextTree::object([
        ("secure", PlaintextTree::string("x")),
        ("other", PlaintextTree::string("y")),
    ]);
    assert!(tree.is_ok());
}

#[test]
fn object_insert_that_creates_reserved_shape_fails() {
    let mut object: Object<sealcfg_core::Clear> = Object::new();
    let err = object
        .insert("secure", PlaintextTree::string("x"))
        .unwrap_err();
    assert!(matches!(err, SealError::ReservedRepresentation { .. }));
    assert!(object.is_empty());
}

#[test]
fn object_insert_replacing_only_secure_key_fails() {
    let mut object = Object::from_entries([("secure", PlaintextTree::Int(1))]).unwrap();
    assert!(object.insert("secure", PlaintextTree::string("x")).is_err());
    assert_eq!(object.get("secure"), Some(&PlaintextTree::Int(1)));
}

#[test]
fn object_remove_that_leaves_reserved_shape_fails() {
    let mut object = Object::from_entries([
        ("secure", PlaintextTree::string("x")),
        ("other", PlaintextTree::Int(1)),
    ])
    .unwrap();
    let err = object.remove("other").unwrap_err();
    assert!(matches!(err, SealError::ReservedRepresentation { .. }));
    assert_eq!(object.len(), 2);
}

#[test]
fn object_remove_of_secure_key_itself_is_allowed() {
    let mut object = Object::from_entries([
        ("secure", PlaintextTree::string("x")),
        ("other", PlaintextTree::Int(1)),
    ])
    .unwrap();
    let removed = object.remove("secure").unwrap();
    assert_eq!(removed, Some(PlaintextTree::string("x")));
    assert_eq!(object.len(), 1);
}

// ============================================================================
// Accessors
// ============================================================================

#[test]
fn text_exposes_value_and_flag() {
    let text: Text<sealcfg_core::Cipher> = Text::secure("abc");
    assert_eq!(text.value(), "abc");
    assert!(text.is_secure());
    assert_eq!(text.into_value(), "abc");
}

#[test]
fn as_str_reads_plain_and_secure_strings() {
    assert_eq!(PlaintextTree::string("a").as_str(), Some("a"));
    assert_eq!(PlaintextTree::secure_string("b").as_str(), Some("b"));
    assert_eq!(PlaintextTree::Int(1).as_str(), None);
}

#[test]
fn from_impls_build_leaves() {
    assert_eq!(PlaintextTree::from(true), Tree::Bool(true));
    assert_eq!(PlaintextTree::from(3i64), Tree::Int(3));
    assert_eq!(PlaintextTree::from("x"), PlaintextTree::string("x"));
    assert_eq!(
        PlaintextTree::from(vec![PlaintextTree::Null]),
        PlaintextTree::array([PlaintextTree::Null])
    );
}

#[test]
fn default_tree_is_null() {
    assert!(PlaintextTree::default().is_null());
}

#[test]
fn object_iterates_in_key_order() {
    let tree = obj(vec![
        ("zeta", PlaintextTree::Int(1)),
        ("alpha", PlaintextTree::Int(2)),
        ("mid", PlaintextTree::Int(3)),
    ]);
    let keys: Vec<&String> = tree.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["alpha", "mid", "zeta"]);
}
