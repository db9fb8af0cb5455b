use chrono::Utc;
use serde_json::json;
use snippet_share::models::{
    CreateSnippetRequest, REQUIRED_FIELDS_MESSAGE, Snippet, SnippetWithOwner,
    UpdateSnippetRequest, User,
};
use uuid::Uuid;

#[test]
fn test_snippet_with_owner_wire_shape() {
    // Snippet fields are flattened next to a nested `user` object, in camelCase.
    let owner = Uuid::new_v4();
    let record = SnippetWithOwner {
        snippet: Snippet {
            id: Uuid::new_v4(),
            title: "hello".to_string(),
            description: None,
            code: "print('hi')".to_string(),
            language: "python".to_string(),
            is_public: true,
            tags: vec!["greeting".to_string()],
            user_id: owner,
            created_at: Utc::now(),
        },
        user: User {
            id: owner,
            name: None,
            email: "owner@example.com".to_string(),
        },
    };

    let value = serde_json::to_value(&record).unwrap();

    assert_eq!(value["isPublic"], true);
    assert_eq!(value["userId"], owner.to_string());
    assert!(value.get("createdAt").is_some());
    assert!(value.get("is_public").is_none());
    assert!(value.get("snippet").is_none());
    assert_eq!(
        value["user"],
        json!({ "id": owner.to_string(), "name": null, "email": "owner@example.com" })
    );
}

#[test]
fn test_create_request_reads_camel_case() {
    let payload: CreateSnippetRequest = serde_json::from_value(json!({
        "title": "t",
        "code": "c",
        "language": "l",
        "isPublic": true,
        "tags": ["a"]
    }))
    .unwrap();

    let snippet = payload.validate().unwrap();
    assert!(snippet.is_public);
    assert_eq!(snippet.tags, vec!["a"]);
}

#[test]
fn test_create_request_defaults() {
    let payload: CreateSnippetRequest =
        serde_json::from_value(json!({ "title": "t", "code": "c", "language": "l" })).unwrap();

    let snippet = payload.validate().unwrap();
    assert!(!snippet.is_public);
    assert!(snippet.tags.is_empty());
    assert_eq!(snippet.description, None);
}

#[test]
fn test_create_request_rejects_empty_required_fields() {
    for body in [
        json!({ "title": "", "code": "c", "language": "l" }),
        json!({ "title": "t", "code": "", "language": "l" }),
        json!({ "title": "t", "code": "c" }),
        json!({}),
    ] {
        let payload: CreateSnippetRequest = serde_json::from_value(body).unwrap();
        assert_eq!(payload.validate().unwrap_err(), REQUIRED_FIELDS_MESSAGE);
    }
}

#[test]
fn test_update_request_is_full_replacement() {
    let payload: UpdateSnippetRequest =
        serde_json::from_value(json!({ "title": "t", "code": "c", "language": "l" })).unwrap();

    let changes = payload.into_changes().unwrap();
    assert_eq!(changes.description, None);
    assert!(!changes.is_public);
    assert!(changes.tags.is_empty());
}
