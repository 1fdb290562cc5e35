mod common;

use std::sync::Arc;

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use commentdav_dav::properties::PROP_MESSAGE;
use commentdav_dav::{xml, CommentsPlugin, CommentsTree, DavError, REPORT_FILTER_COMMENTS};
use commentdav_model::{Actor, CommentStore, ForObjectQuery, User, MAX_MESSAGE_LENGTH};
use common::{context, files_42, registry, seed_comment, Call, RecordingStore};
use http::header::{CONTENT_LOCATION, CONTENT_TYPE};
use http::{Method, Request, StatusCode};
use pretty_assertions::assert_eq;

const BASE: &str = "/remote.php/dav/";

fn plugin(store: &Arc<RecordingStore>, user: Option<&str>) -> CommentsPlugin {
    CommentsPlugin::new(CommentsTree::new(context(store, user), registry()), BASE)
}

fn post(path: &str, content_type: &str, body: &str) -> Request<Bytes> {
    Request::builder()
        .method(Method::POST)
        .uri(format!("{BASE}{path}"))
        .header(CONTENT_TYPE, content_type)
        .body(Bytes::from(body.to_string()))
        .unwrap()
}

fn json_comment(message: &str) -> String {
    serde_json::json!({
        "actorType": "users",
        "verb": "comment",
        "message": message,
    })
    .to_string()
}

fn filter_body(limit: &str, offset: &str, datetime: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<oc:filter-comments xmlns:D="DAV:" xmlns:oc="http://owncloud.org/ns">
    <oc:limit>{limit}</oc:limit>
    <oc:offset>{offset}</oc:offset>
    <oc:datetime>{datetime}</oc:datetime>
</oc:filter-comments>"#
    )
}

// ── create ───────────────────────────────────────────────────────

#[test]
fn create_comment() {
    let store = RecordingStore::new();
    let plugin = plugin(&store, Some("alice"));
    let request = post("comments/files/42", "application/json", &json_comment("my first comment"));

    let response = plugin.http_post(&request).unwrap().expect("handled");

    assert_eq!(response.status(), StatusCode::CREATED);
    let calls = store.mutations();
    assert_eq!(
        calls[0],
        Call::Create {
            actor: Actor::user("alice"),
            object: files_42(),
        }
    );
    let Call::Save(None) = calls[1] else {
        panic!("expected an insert, got {:?}", calls[1]);
    };
    assert_eq!(
        calls[2],
        Call::SetReadMark {
            uid: "alice".to_string(),
            object: files_42(),
        }
    );
    assert_eq!(calls.len(), 3);

    let saved = store
        .inner()
        .get_for_object(&files_42(), ForObjectQuery::all())
        .unwrap();
    assert_eq!(saved.len(), 1);
    let id = saved[0].id().unwrap();
    assert_eq!(saved[0].message(), "my first comment");
    assert_eq!(saved[0].verb(), "comment");
    assert_eq!(
        response.headers()[CONTENT_LOCATION],
        format!("{BASE}comments/files/42/{id}").as_str()
    );
}

#[test]
fn created_message_round_trips_through_properties() {
    let store = RecordingStore::new();
    let plugin = plugin(&store, Some("alice"));
    let message = "ünïcode & <markup> survive";
    plugin
        .http_post(&post("comments/files/42/", "application/json; charset=utf-8", &json_comment(message)))
        .unwrap()
        .expect("handled");

    let node = plugin
        .tree()
        .node_for_path("comments/files/42")
        .unwrap()
        .children()
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(
        node.properties(&[PROP_MESSAGE]).unwrap()[PROP_MESSAGE].as_deref(),
        Some(message)
    );
}

#[test]
fn content_location_trims_trailing_slash() {
    let store = RecordingStore::new();
    let response = plugin(&store, Some("alice"))
        .http_post(&post("comments/files/42/", "application/json", &json_comment("x")))
        .unwrap()
        .unwrap();
    let location = response.headers()[CONTENT_LOCATION].to_str().unwrap().to_string();
    assert!(location.starts_with(&format!("{BASE}comments/files/42/")));
    assert!(!location.contains("42//"));
}

#[test]
fn actor_id_comes_from_session() {
    let store = RecordingStore::new();
    let body = r#"{"actorType":"users","actorId":"bob","verb":"comment","message":"spoof"}"#;
    plugin(&store, Some("alice"))
        .http_post(&post("comments/files/42", "application/json", body))
        .unwrap();

    let saved = store
        .inner()
        .get_for_object(&files_42(), ForObjectQuery::all())
        .unwrap();
    assert_eq!(saved[0].actor(), &Actor::user("alice"));
}

#[test]
fn wrong_content_type_is_unsupported() {
    let store = RecordingStore::new();
    let err = plugin(&store, Some("alice"))
        .http_post(&post("comments/files/42", "text/plain", &json_comment("x")))
        .unwrap_err();
    assert!(matches!(err, DavError::UnsupportedMediaType(_)));
    assert!(store.mutations().is_empty());
}

#[test]
fn invalid_bodies_are_bad_requests() {
    let store = RecordingStore::new();
    let plugin = plugin(&store, Some("alice"));
    let cases = [
        "not json",
        r#"{"verb":"comment","message":"x"}"#,
        r#"{"actorType":"users","message":"x"}"#,
        r#"{"actorType":"users","verb":"comment"}"#,
        r#"{"actorType":"robots","verb":"comment","message":"x"}"#,
        r#"{"actorType":"guests","verb":"comment","message":"x"}"#,
        r#"{"actorType":"users","verb":"","message":"x"}"#,
        r#"{"actorType":"users","verb":"comment","message":"   "}"#,
    ];
    for body in cases {
        let err = plugin
            .http_post(&post("comments/files/42", "application/json", body))
            .unwrap_err();
        assert!(matches!(err, DavError::BadRequest(_)), "{body}: {err:?}");
    }
    assert!(store.mutations().is_empty());
}

#[test]
fn invalid_actor_names_the_actor() {
    let store = RecordingStore::new();
    let body = r#"{"actorType":"robots","verb":"comment","message":"x"}"#;
    match plugin(&store, Some("alice")).http_post(&post("comments/files/42", "application/json", body)) {
        Err(DavError::BadRequest(msg)) => assert_eq!(msg, "Invalid actor \"robots\""),
        other => panic!("unexpected result: {:?}", other.map(|r| r.map(|r| r.status()))),
    }
}

#[test]
fn overlong_message_is_rejected_without_read_marker() {
    let store = RecordingStore::new();
    let message = "x".repeat(MAX_MESSAGE_LENGTH + 1);
    let err = plugin(&store, Some("alice"))
        .http_post(&post("comments/files/42", "application/json", &json_comment(&message)))
        .unwrap_err();

    match err {
        DavError::BadRequest(msg) => assert!(msg.contains(&MAX_MESSAGE_LENGTH.to_string())),
        other => panic!("unexpected error: {other:?}"),
    }
    let calls = store.mutations();
    assert!(!calls.iter().any(|c| matches!(c, Call::Save(_) | Call::SetReadMark { .. })));
    assert!(
        store
            .inner()
            .get_for_object(&files_42(), ForObjectQuery::all())
            .unwrap()
            .is_empty()
    );
}

#[test]
fn anonymous_create_is_not_authenticated() {
    let store = RecordingStore::new();
    let err = plugin(&store, None)
        .http_post(&post("comments/files/42", "application/json", &json_comment("x")))
        .unwrap_err();
    assert!(matches!(err, DavError::NotAuthenticated));
    assert!(store.mutations().is_empty());
}

#[test]
fn create_on_missing_entity_is_not_found() {
    let store = RecordingStore::new();
    let err = plugin(&store, Some("alice"))
        .http_post(&post("comments/files/99", "application/json", &json_comment("x")))
        .unwrap_err();
    assert!(matches!(err, DavError::NotFound(_)));
}

#[test]
fn post_elsewhere_is_declined() {
    let store = RecordingStore::new();
    let plugin = plugin(&store, Some("alice"));
    let seeded = seed_comment(&store, "alice", &files_42(), "x");

    for path in [
        "files/alice/doc.txt".to_string(),
        "comments".to_string(),
        "comments/files".to_string(),
        format!("comments/files/42/{}", seeded.id().unwrap()),
    ] {
        let declined = plugin
            .http_post(&post(&path, "application/json", &json_comment("x")))
            .unwrap();
        assert!(declined.is_none(), "{path} should be declined");
    }

    let outside = Request::builder()
        .method(Method::POST)
        .uri("/other/comments/files/42")
        .header(CONTENT_TYPE, "application/json")
        .body(Bytes::from(json_comment("x")))
        .unwrap();
    assert!(plugin.http_post(&outside).unwrap().is_none());
    assert!(store.mutations().is_empty());
}

// ── report ───────────────────────────────────────────────────────

#[test]
fn report_passes_bounds_and_renders_multistatus() {
    let store = RecordingStore::new();
    for i in 0..12 {
        seed_comment(&store, "alice", &files_42(), &format!("comment {i}"));
    }
    let plugin = plugin(&store, Some("alice"));
    let body = filter_body("5", "10", "");

    let response = plugin
        .on_report(REPORT_FILTER_COMMENTS, body.as_bytes(), "comments/files/42")
        .unwrap()
        .expect("handled");

    assert_eq!(
        store.calls(),
        vec![Call::GetForObject {
            object: files_42(),
            query: ForObjectQuery {
                limit: 5,
                offset: 10,
                not_older_than: None,
            },
        }]
    );
    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "application/xml; charset=utf-8"
    );

    let text = String::from_utf8(response.body().to_vec()).unwrap();
    assert_eq!(text.matches("<d:response>").count(), 2);
    assert!(text.contains("<oc:message>comment 1</oc:message>"));
    assert!(text.contains("<oc:message>comment 0</oc:message>"));
    assert!(text.contains(&format!("<d:href>{BASE}comments/files/42/")));
}

#[test]
fn report_defaults_for_missing_parameters() {
    let store = RecordingStore::new();
    let body = r#"<oc:filter-comments xmlns:oc="http://owncloud.org/ns"/>"#;
    plugin(&store, Some("alice"))
        .on_report(REPORT_FILTER_COMMENTS, body.as_bytes(), "comments/files/42")
        .unwrap()
        .unwrap();
    assert_eq!(
        store.calls(),
        vec![Call::GetForObject {
            object: files_42(),
            query: ForObjectQuery::all(),
        }]
    );
}

#[test]
fn report_parses_datetime() {
    let store = RecordingStore::new();
    let body = filter_body("", "", "2016-01-10 18:48:00");
    plugin(&store, Some("alice"))
        .on_report(REPORT_FILTER_COMMENTS, body.as_bytes(), "comments/files/42")
        .unwrap()
        .unwrap();
    let since = Utc.with_ymd_and_hms(2016, 1, 10, 18, 48, 0).unwrap();
    assert_eq!(
        store.calls(),
        vec![Call::GetForObject {
            object: files_42(),
            query: ForObjectQuery {
                limit: 0,
                offset: 0,
                not_older_than: Some(since),
            },
        }]
    );
}

#[test]
fn report_rejects_bad_parameters() {
    let store = RecordingStore::new();
    let plugin = plugin(&store, Some("alice"));
    for body in [
        filter_body("five", "", ""),
        filter_body("", "-1", ""),
        filter_body("", "", "last tuesday"),
    ] {
        let err = plugin
            .on_report(REPORT_FILTER_COMMENTS, body.as_bytes(), "comments/files/42")
            .unwrap_err();
        assert!(matches!(err, DavError::BadRequest(_)), "{body}");
    }
    assert!(store.calls().is_empty());
}

#[test]
fn report_offset_past_every_comment_is_empty() {
    let store = RecordingStore::new();
    for i in 0..3 {
        seed_comment(&store, "alice", &files_42(), &format!("comment {i}"));
    }
    let body = filter_body("2", &usize::MAX.to_string(), "");

    let response = plugin(&store, Some("alice"))
        .on_report(REPORT_FILTER_COMMENTS, body.as_bytes(), "comments/files/42")
        .unwrap()
        .expect("handled");

    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    let text = String::from_utf8(response.body().to_vec()).unwrap();
    assert_eq!(text.matches("<d:response>").count(), 0);
}

#[test]
fn report_declines_other_reports_and_nodes() {
    let store = RecordingStore::new();
    let plugin = plugin(&store, Some("alice"));
    let body = filter_body("5", "0", "");

    let other = plugin
        .on_report("{DAV:}sync-collection", body.as_bytes(), "comments/files/42")
        .unwrap();
    assert!(other.is_none());

    let on_type = plugin
        .on_report(REPORT_FILTER_COMMENTS, body.as_bytes(), "comments/files")
        .unwrap();
    assert!(on_type.is_none());
    assert!(store.calls().is_empty());
}

#[test]
fn report_name_is_parsed_from_body() {
    let body = filter_body("1", "0", "");
    assert_eq!(xml::parse_report_name(body.as_bytes()).unwrap(), REPORT_FILTER_COMMENTS);
}

#[test]
fn report_marks_unread_for_current_user() {
    let store = RecordingStore::new();
    seed_comment(&store, "bob", &files_42(), "hi alice");
    store
        .inner()
        .set_read_mark(
            &files_42(),
            &User::new("alice", "Alice Liddell"),
            Some(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()),
        )
        .unwrap();

    let body = filter_body("", "", "");
    let response = plugin(&store, Some("alice"))
        .on_report(REPORT_FILTER_COMMENTS, body.as_bytes(), "comments/files/42")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(response.body().to_vec()).unwrap();
    assert!(text.contains("<oc:isUnread>true</oc:isUnread>"));
    assert!(text.contains("<oc:actorDisplayName>Bob</oc:actorDisplayName>"));
}
