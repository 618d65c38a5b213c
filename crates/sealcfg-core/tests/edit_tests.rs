/// Property paths and path-addressed edits: get, set, delete, merge.
use sealcfg_core::{Accessor, PlaintextTree, PropertyPath, SealError};

fn path(s: &str) -> PropertyPath {
    PropertyPath::parse(s).expect("path should parse")
}

fn json(s: &str) -> PlaintextTree {
    PlaintextTree::from_json(s).expect("fixture should decode")
}

// ============================================================================
// Path grammar
// ============================================================================

#[test]
fn parse_dotted_and_indexed_path() {
    let p = path("db.hosts[1].name");
    assert_eq!(
        p.accessors(),
        &[
            Accessor::Key("db".into()),
            Accessor::Key("hosts".into()),
            Accessor::Index(1),
            Accessor::Key("name".into()),
        ]
    );
}

#[test]
fn parse_quoted_key_with_dots() {
    let p = path(r#"servers["web.example.com"].port"#);
    assert_eq!(
        p.accessors(),
        &[
            Accessor::Key("servers".into()),
            Accessor::Key("web.example.com".into()),
            Accessor::Key("port".into()),
        ]
    );
}

#[test]
fn parse_leading_index() {
    assert_eq!(path("[0]").accessors(), &[Accessor::Index(0)]);
}

#[test]
fn parse_bare_key_after_index() {
    assert_eq!(
        path("name[3][0]nested").accessors(),
        &[
            Accessor::Key("name".into()),
            Accessor::Index(3),
            Accessor::Index(0),
            Accessor::Key("nested".into()),
        ]
    );
    assert_eq!(path("a[0]b"), path("a[0].b"));
}

#[test]
fn parse_empty_is_root() {
    assert!(path("").is_empty());
}

#[test]
fn parse_rejects_malformed_paths() {
    for bad in ["a.", "a..b", "a[", "a[x]", r#"a["b"#, "a]b", "a[0]]"] {
        assert!(
            matches!(PropertyPath::parse(bad), Err(SealError::InvalidPath { .. })),
            "expected {bad:?} to be rejected"
        );
    }
}

#[test]
fn display_round_trips_through_parse() {
    for text in ["a.b[0]", r#"a["x.y"][2].z"#, "[3][4]", r#"["quo\"te"]"#] {
        let p = path(text);
        assert_eq!(p.to_string(), text);
        assert_eq!(path(&p.to_string()), p);
    }
}

#[test]
fn negative_index_parses_but_never_resolves() {
    let p = path("items[-1]");
    assert_eq!(p.accessors()[1], Accessor::Index(-1));
    let tree = json(r#"{"items":[1,2]}"#);
    assert!(tree.get(&p).is_none());
}

// ============================================================================
// Get
// ============================================================================

#[test]
fn get_nested_values() {
    let tree = json(r#"{"a":{"b":[10,{"c":"x"}]}}"#);
    assert_eq!(tree.get(&path("a.b[0]")), Some(&PlaintextTree::Int(10)));
    assert_eq!(
        tree.get(&path("a.b[1].c")).and_then(|t| t.as_str()),
        Some("x")
    );
    assert_eq!(tree.get(&path("")), Some(&tree));
}

#[test]
fn get_missing_or_mismatched_is_none() {
    let tree = json(r#"{"a":[1]}"#);
    assert!(tree.get(&path("b")).is_none());
    assert!(tree.get(&path("a[5]")).is_none());
    assert!(tree.get(&path("a.x")).is_none());
    assert!(tree.get(&path("[0]")).is_none());
}

// ============================================================================
// Set
// ============================================================================

#[test]
fn set_creates_intermediate_containers() {
    let tree = PlaintextTree::Null
        .set(&path("a.b[0].c"), PlaintextTree::Int(1))
        .unwrap();
    assert_eq!(tree, json(r#"{"a":{"b":[{"c":1}]}}"#));
}

#[test]
fn set_replaces_existing_value_and_leaves_input_untouched() {
    let original = json(r#"{"a":1,"b":2}"#);
    let updated = original.set(&path("a"), PlaintextTree::string("x")).unwrap();
    assert_eq!(updated, json(r#"{"a":"x","b":2}"#));
    assert_eq!(original, json(r#"{"a":1,"b":2}"#));
}

#[test]
fn set_appends_at_array_length() {
    let tree = json(r#"{"names":["a","b","c"]}"#);
    let updated = tree
        .set(&path("names[3]"), PlaintextTree::string("d"))
        .unwrap();
    assert_eq!(updated, json(r#"{"names":["a","b","c","d"]}"#));
}

#[test]
fn set_appended_element_grows_nested_containers() {
    let tree = json(r#"["a","b","c"]"#);
    let updated = tree
        .set(&path("[3][0]nested"), PlaintextTree::string("value"))
        .unwrap();
    assert_eq!(updated, json(r#"["a","b","c",[{"nested":"value"}]]"#));
}

#[test]
fn set_past_append_position_is_out_of_range() {
    let tree = json(r#"{"names":["a","b","c"]}"#);
    let err = tree
        .set(&path("names[4]"), PlaintextTree::string("e"))
        .unwrap_err();
    match err {
        SealError::OutOfRange { path: at } => assert_eq!(at.to_string(), "names[4]"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn set_negative_index_is_out_of_range() {
    let tree = json(r#"{"names":[]}"#);
    assert!(matches!(
        tree.set(&path("names[-1]"), PlaintextTree::Int(0)),
        Err(SealError::OutOfRange { .. })
    ));
}

#[test]
fn set_index_into_nested_scalar_is_type_mismatch() {
    let tree = json(r#"{"a":"scalar"}"#);
    let err = tree.set(&path("a[0]"), PlaintextTree::Int(1)).unwrap_err();
    match err {
        SealError::TypeMismatch { path: at, expected } => {
            assert_eq!(at.to_string(), "a");
            assert_eq!(expected, "an array");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn set_key_on_array_is_type_mismatch() {
    let tree = json(r#"{"a":[1]}"#);
    assert!(matches!(
        tree.set(&path("a.b"), PlaintextTree::Int(1)),
        Err(SealError::TypeMismatch { .. })
    ));
}

#[test]
fn set_on_root_scalar_overwrites_it() {
    let tree = PlaintextTree::string("scalar");
    let updated = tree.set(&path("a"), PlaintextTree::Int(1)).unwrap();
    assert_eq!(updated, json(r#"{"a":1}"#));
}

#[test]
fn set_empty_path_replaces_whole_tree() {
    let tree = json(r#"{"a":1}"#);
    let updated = tree.set(&path(""), PlaintextTree::Bool(true)).unwrap();
    assert_eq!(updated, PlaintextTree::Bool(true));
}

#[test]
fn set_plain_string_under_secure_key_of_empty_object_is_reserved() {
    let err = PlaintextTree::Null
        .set(&path("key.secure"), PlaintextTree::string("value"))
        .unwrap_err();
    match err {
        SealError::ReservedRepresentation { path: at } => assert_eq!(at.to_string(), "key"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn set_secure_key_next_to_siblings_is_allowed() {
    let tree = json(r#"{"key":{"other":1}}"#);
    let updated = tree
        .set(&path("key.secure"), PlaintextTree::string("value"))
        .unwrap();
    assert_eq!(
        updated.get(&path("key.secure")),
        Some(&PlaintextTree::string("value"))
    );
}

#[test]
fn set_secure_leaf_keeps_its_flag() {
    let updated = PlaintextTree::Null
        .set(&path("db.password"), PlaintextTree::secure_string("hunter2"))
        .unwrap();
    assert!(updated.get(&path("db.password")).unwrap().is_secure());
    assert!(updated.is_secure());
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn delete_object_key() {
    let tree = json(r#"{"a":1,"b":2}"#);
    assert_eq!(tree.delete(&path("a")).unwrap(), json(r#"{"b":2}"#));
}

#[test]
fn delete_array_element_shifts_followers() {
    let tree = json(r#"{"names":["a","b","c"]}"#);
    assert_eq!(
        tree.delete(&path("names[0]")).unwrap(),
        json(r#"{"names":["b","c"]}"#)
    );
}

#[test]
fn delete_missing_targets_is_noop() {
    let tree = json(r#"{"names":["a","b","c"],"m":{"x":1}}"#);
    assert_eq!(tree.delete(&path("names[3]")).unwrap(), tree);
    assert_eq!(tree.delete(&path("m.y")).unwrap(), tree);
    assert_eq!(tree.delete(&path("nope.deeper")).unwrap(), tree);
    assert_eq!(tree.delete(&path("")).unwrap(), tree);
}

#[test]
fn delete_that_leaves_reserved_shape_fails() {
    let tree = json(r#"{"foo":{"bar":"baz","secure":"myvalue"}}"#);
    let err = tree.delete(&path("foo.bar")).unwrap_err();
    match err {
        SealError::ReservedRepresentation { path: at } => assert_eq!(at.to_string(), "foo"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn delete_nested_inside_array() {
    let tree = json(r#"{"a":[{"x":1,"y":2}]}"#);
    assert_eq!(
        tree.delete(&path("a[0].y")).unwrap(),
        json(r#"{"a":[{"x":1}]}"#)
    );
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn merge_objects_recursively() {
    let base = json(r#"{"a":{"x":1,"y":2},"b":true}"#);
    let overlay = json(r#"{"a":{"y":3,"z":4},"c":"new"}"#);
    assert_eq!(
        overlay.merge(&base),
        json(r#"{"a":{"x":1,"y":3,"z":4},"b":true,"c":"new"}"#)
    );
}

#[test]
fn merge_non_object_overlay_replaces_base() {
    let base = json(r#"{"a":{"x":1}}"#);
    let overlay = json(r#"{"a":[1,2]}"#);
    assert_eq!(overlay.merge(&base), json(r#"{"a":[1,2]}"#));
    assert_eq!(PlaintextTree::Int(5).merge(&base), PlaintextTree::Int(5));
}

#[test]
fn merge_keeps_secure_flags() {
    let base = json(r#"{"db":{"user":"admin"}}"#);
    let overlay = json(r#"{"db":{"password":{"secure":"pw"}}}"#);
    let merged = overlay.merge(&base);
    assert!(merged.get(&path("db.password")).unwrap().is_secure());
    assert_eq!(
        merged.get(&path("db.user")),
        Some(&PlaintextTree::string("admin"))
    );
}
