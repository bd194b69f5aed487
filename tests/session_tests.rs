use parkeasy::SessionStore;

#[test]
fn test_issue_and_resolve() {
    let store = SessionStore::new();
    let token = store.issue("alice");

    assert_eq!(token.len(), 48);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(store.resolve(&token).as_deref(), Some("alice"));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_tokens_are_unique_per_login() {
    let store = SessionStore::new();
    let first = store.issue("alice");
    let second = store.issue("alice");

    assert_ne!(first, second);
    // both sessions stay live
    assert_eq!(store.resolve(&first).as_deref(), Some("alice"));
    assert_eq!(store.resolve(&second).as_deref(), Some("alice"));
}

#[test]
fn test_revoke() {
    let store = SessionStore::new();
    let token = store.issue("bob");

    assert!(store.revoke(&token));
    assert!(store.resolve(&token).is_none());
    assert!(!store.revoke(&token));
    assert!(store.is_empty());
}

#[test]
fn test_unknown_token() {
    let store = SessionStore::new();
    assert!(store.resolve("deadbeef").is_none());
}
