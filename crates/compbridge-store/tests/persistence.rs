//! Store round trips through the filesystem.

use compbridge_store::{NewSnippet, SnippetStore};

#[test]
fn test_reopen_sees_saved_snippets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/dir/snippets.json");

    let mut store = SnippetStore::open(&path).unwrap();
    let saved = store
        .save(NewSnippet {
            name: "Card".into(),
            code: "const Card = () => <div>card</div>;".into(),
            tags: vec!["ui".into()],
            input_data: Some(r#"{"title": "Hi"}"#.into()),
            ..NewSnippet::default()
        })
        .unwrap();
    store
        .save(NewSnippet {
            name: "Badge".into(),
            code: "const Badge = () => <span>new</span>;".into(),
            ..NewSnippet::default()
        })
        .unwrap();

    let reopened = SnippetStore::open(&path).unwrap();
    assert_eq!(reopened.list().len(), 2);
    assert_eq!(reopened.get(saved.id), Some(&saved));
    assert_eq!(reopened.list()[1].name, "Badge");

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[0]["inputData"], r#"{"title": "Hi"}"#);
    assert!(raw[0]["createdAt"].is_string());
}

#[test]
fn test_delete_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snippets.json");
    let mut store = SnippetStore::open(&path).unwrap();
    let id = store
        .save(NewSnippet {
            name: "Gone".into(),
            code: "const Gone = () => null;".into(),
            ..NewSnippet::default()
        })
        .unwrap()
        .id;

    assert!(store.delete(id).unwrap());
    assert!(!store.delete(id).unwrap());
    assert!(SnippetStore::open(&path).unwrap().list().is_empty());
}
