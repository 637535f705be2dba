#![expect(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test code uses unwrap/panic for concise assertions"
)]

use chrono::{DateTime, TimeZone, Utc};
use graph_response::{
    ApiException, Connection, DeviceAuthState, DeviceCode, Error, ErrorClassifier, FieldBinding,
    FieldShape, Mappable, Mapper, ResponseProcessor, TypeDirectives, directives_for,
};
use serde_json::Value;

fn load_fixture(filename: &str) -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let path = format!("{manifest_dir}/tests/fixtures/{filename}");
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"))
}

fn load_json(filename: &str) -> Value {
    let data = load_fixture(filename);
    serde_json::from_str(&data).unwrap_or_else(|e| panic!("failed to parse {filename}: {e}"))
}

#[derive(serde::Deserialize)]
struct ErrorCase {
    name: String,
    status: u16,
    body: Value,
    kind: Option<String>,
}

// ──────────────────── Records ────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
struct GraphObject {
    id: String,
    created_time: Option<DateTime<Utc>>,
    trace: Vec<&'static str>,
}

impl Mappable for GraphObject {
    fn directives() -> TypeDirectives<Self> {
        TypeDirectives::new()
            .bind(FieldBinding::scalar("id", |o: &mut Self, v: String| o.id = v))
            .bind(
                FieldBinding::scalar("created_time", |o: &mut Self, v: DateTime<Utc>| {
                    o.created_time = Some(v);
                }),
            )
            .hook("base", |o: &mut Self| o.trace.push("base"))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Author {
    id: String,
    name: String,
}

impl Mappable for Author {
    fn directives() -> TypeDirectives<Self> {
        TypeDirectives::new()
            .bind(FieldBinding::scalar("id", |a: &mut Self, v: String| a.id = v))
            .bind(FieldBinding::scalar("name", |a: &mut Self, v: String| a.name = v))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Tag {
    name: String,
}

impl Mappable for Tag {
    fn directives() -> TypeDirectives<Self> {
        TypeDirectives::new()
            .bind(FieldBinding::scalar("name", |t: &mut Self, v: String| t.name = v))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Comment {
    object: GraphObject,
    message: String,
    from: Author,
}

impl Mappable for Comment {
    fn directives() -> TypeDirectives<Self> {
        TypeDirectives::new()
            .inherit(|c: &mut Self| &mut c.object)
            .bind(FieldBinding::scalar("message", |c: &mut Self, v: String| c.message = v))
            .bind(FieldBinding::record("from", |c: &mut Self, v: Author| c.from = v))
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    strum_macros::EnumString,
    strum_macros::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
enum PostType {
    #[default]
    Status,
    Link,
    Photo,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Post {
    object: GraphObject,
    message: String,
    post_type: PostType,
    like_count: i64,
    from: Author,
    tags: Vec<Tag>,
    comments: Connection<Comment>,
    is_popular: bool,
}

impl Mappable for Post {
    fn directives() -> TypeDirectives<Self> {
        TypeDirectives::new()
            .inherit(|p: &mut Self| &mut p.object)
            .bind(FieldBinding::scalar("message", |p: &mut Self, v: String| p.message = v))
            .bind(
                FieldBinding::enumeration("post_type", |p: &mut Self, v: PostType| p.post_type = v)
                    .from_key("type"),
            )
            .bind(FieldBinding::scalar("like_count", |p: &mut Self, v: i64| p.like_count = v))
            .bind(FieldBinding::record("from", |p: &mut Self, v: Author| p.from = v))
            .bind(
                FieldBinding::records("tags", |p: &mut Self, v: Vec<Tag>| p.tags = v)
                    .from_key("message_tags"),
            )
            .bind(
                FieldBinding::record("comments", |p: &mut Self, v: Connection<Comment>| {
                    p.comments = v;
                }),
            )
            .bind(FieldBinding::derived("is_popular"))
            .hook("popularity", |p: &mut Self| {
                p.is_popular = p.like_count >= 10;
                p.object.trace.push("post");
            })
    }
}

// ──────────────────── Mapping ────────────────────

#[test]
fn maps_post_fixture() {
    let body = load_fixture("post_with_comments.json");
    let mapped = ResponseProcessor::default()
        .process_with_report::<Post>(&body, 200)
        .unwrap();
    assert!(mapped.skipped.is_empty(), "skipped: {:?}", mapped.skipped);
    let post = mapped.value;

    assert_eq!(post.object.id, "19292868552_10150189643478553");
    assert_eq!(
        post.object.created_time,
        Some(Utc.with_ymd_and_hms(2011, 6, 1, 17, 31, 2).unwrap())
    );
    assert_eq!(post.post_type, PostType::Status);
    assert_eq!(post.like_count, 42);
    assert!(post.is_popular);
    assert_eq!(post.object.trace, ["base", "post"]);
    assert_eq!(post.from.name, "Facebook Developers");
}

#[test]
fn sequence_of_records_keeps_input_order() {
    let post: Post = ResponseProcessor::default()
        .process(&load_fixture("post_with_comments.json"), 200)
        .unwrap();
    let tags: Vec<_> = post.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tags, ["a", "b"]);
}

#[test]
fn nested_connection_and_placeholders() {
    let post: Post = ResponseProcessor::default()
        .process(&load_fixture("post_with_comments.json"), 200)
        .unwrap();
    let comments = &post.comments.data;
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].from.name, "First Commenter");
    assert_eq!(comments[0].object.trace, ["base"]);
    // `"from": []` stands for an absent object.
    assert_eq!(comments[1].from, Author::default());
    assert_eq!(
        comments[1].object.created_time,
        DateTime::from_timestamp(1_306_950_400, 0)
    );
    assert!(!post.comments.has_next());
}

#[test]
fn unknown_post_type_aborts_even_when_lenient() {
    let mut json = load_json("post_with_comments.json");
    json["type"] = Value::String("livestream".to_string());
    let err = ResponseProcessor::default()
        .process::<Post>(&json.to_string(), 200)
        .unwrap_err();
    match err {
        Error::Mapping(map_err) => assert_eq!(map_err.path(), "post_type"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn strict_mapper_reports_nested_path() {
    let mut json = load_json("post_with_comments.json");
    json["comments"]["data"][1]["created_time"] = Value::String("yesterday".to_string());

    let lenient = Mapper::default().map_with_report::<Post>(&json).unwrap();
    assert_eq!(lenient.skipped.len(), 1);
    assert_eq!(lenient.skipped[0].path(), "comments.data[1].created_time");
    assert_eq!(lenient.value.comments.data[1].object.created_time, None);

    let strict = Mapper::strict().map::<Post>(&json).unwrap_err();
    assert_eq!(strict.path(), "comments.data[1].created_time");
}

#[test]
fn directives_are_introspectable() {
    let directives = directives_for::<Post>();
    let names: Vec<_> = directives.fields().iter().map(|f| f.field()).collect();
    assert_eq!(
        names,
        [
            "id",
            "created_time",
            "message",
            "post_type",
            "like_count",
            "from",
            "tags",
            "comments",
            "is_popular"
        ]
    );
    let tags = directives.field("tags").unwrap();
    assert_eq!(tags.source_key(), "message_tags");
    assert_eq!(tags.shape(), FieldShape::Sequence);
    assert_eq!(
        directives.field("is_popular").unwrap().shape(),
        FieldShape::Derived
    );
    assert_eq!(
        directives.hook_names().collect::<Vec<_>>(),
        ["base", "popularity"]
    );
    assert!(std::ptr::eq(directives, directives_for::<Post>()));
}

// ──────────────────── Classification ────────────────────

#[test]
fn classifies_error_fixtures() {
    let cases: Vec<ErrorCase> = serde_json::from_value(load_json("error_bodies.json")).unwrap();
    assert!(!cases.is_empty());
    let classifier = ErrorClassifier::default();

    for case in &cases {
        let outcome = classifier.classify(&case.body, case.status);
        let kind = outcome.as_ref().err().map(ApiException::kind);
        assert_eq!(kind, case.kind.as_deref(), "case {:?}", case.name);

        let text = classifier.classify_text(&case.body.to_string(), case.status);
        assert_eq!(
            text.is_ok(),
            case.kind.is_none(),
            "text path disagrees for {:?}",
            case.name
        );
    }
}

#[test]
fn error_details_survive_classification() {
    let cases: Vec<ErrorCase> = serde_json::from_value(load_json("error_bodies.json")).unwrap();
    let slow_down = cases
        .iter()
        .find(|c| c.kind.as_deref() == Some("device_slow_down"))
        .unwrap();
    let err = ErrorClassifier::default()
        .classify(&slow_down.body, slow_down.status)
        .unwrap_err();
    let details = err.details().unwrap();
    assert_eq!(details.error_type, "OAuthException");
    assert_eq!(details.code, Some(31));
    assert_eq!(details.subcode, Some(1_349_172));
    assert_eq!(details.trace_id.as_deref(), Some("A3kq9PzY1bW"));
    assert_eq!(details.user_title.as_deref(), Some("Too many requests"));
    assert_eq!(details.raw, slow_down.body["error"]);
    assert_eq!(err.device_auth_state(), Some(DeviceAuthState::SlowDown));
}

#[test]
fn transient_hint_is_passed_through() {
    let cases: Vec<ErrorCase> = serde_json::from_value(load_json("error_bodies.json")).unwrap();
    for case in cases.iter().filter(|c| c.kind.is_some()) {
        let err = ErrorClassifier::default()
            .classify(&case.body, case.status)
            .unwrap_err();
        let expected = case.body["error"]
            .get("is_transient")
            .and_then(Value::as_bool);
        assert_eq!(err.is_transient(), expected, "case {:?}", case.name);
    }
}

#[test]
fn device_login_flow() {
    let fixture = load_json("device_login.json");
    let processor = ResponseProcessor::default();

    let code: DeviceCode = processor.process_value(&fixture["start"], 200).unwrap();
    assert_eq!(code.user_code, "A1NWZ9");
    assert_eq!(code.polling_interval, 5);

    let mut states = Vec::new();
    for poll in fixture["polls"].as_array().unwrap() {
        let status = if poll.get("error").is_some() {
            400
        } else {
            200
        };
        match processor.process_value::<DeviceCode>(poll, status) {
            Err(Error::Api(exception)) => {
                let state = exception.device_auth_state().unwrap();
                assert!(state.keep_polling());
                states.push(state);
            }
            Ok(_) => break,
            Err(other) => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(
        states,
        [
            DeviceAuthState::Pending,
            DeviceAuthState::SlowDown,
            DeviceAuthState::Pending
        ]
    );
}
