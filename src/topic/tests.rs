use super::*;

#[test]
fn test_valid_topics() {
    assert!(is_valid("orders"));
    assert!(is_valid("orders.created"));
    assert!(is_valid("a1.b2.c3.d4.e5"));
    assert!(is_valid("System.Heartbeat"));
}

#[test]
fn test_invalid_topics() {
    assert!(!is_valid(""));
    assert!(!is_valid("a.b.c.d.e.f"));
    assert!(!is_valid("1orders"));
    assert!(!is_valid("orders..created"));
    assert!(!is_valid(".orders"));
    assert!(!is_valid("orders."));
    assert!(!is_valid("orders-created"));
    assert!(!is_valid("orders.*"));
    assert!(!is_valid("orders:created"));
}

#[test]
fn test_length_limit() {
    let long_segment = format!("a{}", "b".repeat(254));
    assert_eq!(long_segment.len(), 255);
    assert!(is_valid(&long_segment));

    let too_long = format!("a{}", "b".repeat(255));
    assert!(!is_valid(&too_long));
}

#[test]
fn test_canonicalize_is_idempotent() {
    for name in ["Orders.Created", "a.B.c", "metrics", "X1.Y2"] {
        let once = canonicalize(name).unwrap();
        let twice = canonicalize(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(is_valid(&once), is_valid(name));
    }
    assert_eq!(canonicalize("Orders.Created").as_deref(), Some("orders.created"));
    assert_eq!(canonicalize("bad..topic"), None);
}

#[test]
fn test_parent() {
    assert_eq!(parent("a.b.c").as_deref(), Some("a.b"));
    assert_eq!(parent("a.b").as_deref(), Some("a"));
    assert_eq!(parent("a"), None);
    assert_eq!(parent("9.b"), None);
}

#[test]
fn test_direct_child_and_descendant() {
    assert!(is_direct_child("a.b", "a"));
    assert!(is_direct_child("A.B", "a"));
    assert!(!is_direct_child("a.b.c", "a"));
    assert!(!is_direct_child("a", "a"));

    assert!(is_descendant("a.b.c", "a"));
    assert!(is_descendant("a.b.c", "A.b"));
    assert!(!is_descendant("a", "a"));
    assert!(!is_descendant("a.b", "a.b"));
    assert!(!is_descendant("ab.c", "a"));
}

#[test]
fn test_matches_wildcards() {
    assert!(matches("a.b.c", "a.*.c"));
    assert!(matches("a.b.c", "a.>"));
    assert!(!matches("a.b", "a.*.c"));
    assert!(!matches("a", "a.>"));
    assert!(matches("a", "*"));
    assert!(matches("a.b.c", ">"));
    assert!(!matches("a.b.c", "a.*"));
}

#[test]
fn test_matches_is_case_insensitive() {
    assert!(matches("Orders.Created", "orders.CREATED"));
    assert!(matches("orders.created", "ORDERS.*"));
}

#[test]
fn test_tail_wildcard_must_be_last() {
    assert!(!matches("a.b.c", "a.>.c"));
    assert!(!matches("a.b", ">.b"));
}

#[test]
fn test_topic_newtype_compares_canonically() {
    let a: Topic = "Orders.Created".parse().unwrap();
    let b = Topic::try_from("orders.created").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "orders.created");
    assert_eq!(a.parent(), Some(Topic::new("orders").unwrap()));
    assert_eq!(a.segments().count(), 2);
    assert!(a.is_direct_child_of(&Topic::new("orders").unwrap()));
    assert!(a.matches("orders.>"));
}

#[test]
fn test_topic_newtype_rejects_invalid() {
    let err = Topic::new("orders..created").unwrap_err();
    assert!(matches!(err, SessionError::InvalidTopic(ref t) if t == "orders..created"));
}
