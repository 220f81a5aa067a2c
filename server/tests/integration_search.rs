use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;
use vsm_core::persist::{save_lexicon, save_meta, IndexPaths, MetaFile, FORMAT_VERSION};
use vsm_core::records::load_records;
use vsm_core::{Lexicon, RecordSource};

fn write_doc(docs: &Path, id: u32, title: &str, body: &str) {
    fs::write(docs.join(format!("{id}.content")), body).unwrap();
    fs::write(
        docs.join(format!("{id}.property")),
        format!("{title}\nhttp://example.com/{id}\n2024-01-0{}\n{id}.content\n", id + 1),
    )
    .unwrap();
}

fn build_corpus(root: &Path, docs: &[(&str, &str)]) -> IndexPaths {
    let docs_dir = root.join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    for (id, (title, body)) in docs.iter().enumerate() {
        write_doc(&docs_dir, id as u32, title, body);
    }

    let records = load_records(&docs_dir, docs.len()).unwrap();
    let lexicon = Lexicon::build_from_source(&RecordSource::new(&records)).unwrap();
    let paths = IndexPaths::new(root.join("index"));
    save_lexicon(&paths, &lexicon).unwrap();
    let meta = MetaFile {
        num_docs: docs.len() as u32,
        created_at: "2024-01-01T00:00:00Z".into(),
        version: FORMAT_VERSION,
        docs_dir: Some(docs_dir),
    };
    save_meta(&paths, &meta).unwrap();
    paths
}

fn build_tiny_index(root: &Path) -> IndexPaths {
    build_corpus(
        root,
        &[
            ("Doc 0", "Learning rust."),
            ("Doc 1", "rust systems programming, fast systems"),
            ("Doc 2", "Nothing relevant here."),
        ],
    )
}

fn reload_request() -> Request<Body> {
    Request::post("/index/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let paths = build_tiny_index(dir.path());
    let app = server::build_app(paths.root.to_string_lossy().to_string()).unwrap();

    let (status, json) = get(app, "/search?q=rust%20systems&k=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"].as_u64().unwrap(), 2);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr[0]["doc_id"].as_u64().unwrap(), 1);
    assert_eq!(arr[0]["score"].as_f64().unwrap(), 1.0);
    assert_eq!(arr[0]["title"], "Doc 1");
    assert_eq!(arr[0]["matches"]["systems"], serde_json::json!([1, 4]));
    assert_eq!(arr[1]["doc_id"].as_u64().unwrap(), 0);
    assert_eq!(arr[1]["vector"], serde_json::json!([1, 0]));
    assert!(arr[1]["snippet"].as_str().unwrap().contains("<em>rust</em>"));
}

#[tokio::test]
async fn unmatched_query_is_empty() {
    let dir = tempdir().unwrap();
    let paths = build_tiny_index(dir.path());
    let app = server::build_app(paths.root.to_string_lossy().to_string()).unwrap();

    let (status, json) = get(app, "/search?q=rust.").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"].as_u64().unwrap(), 0);
}

#[tokio::test]
async fn doc_endpoint_returns_record_and_text() {
    let dir = tempdir().unwrap();
    let paths = build_tiny_index(dir.path());
    let app = server::build_app(paths.root.to_string_lossy().to_string()).unwrap();

    let (_, json) = get(app.clone(), "/doc/0").await;
    assert_eq!(json["title"], "Doc 0");
    assert_eq!(json["text"], "Learning rust.");

    let (_, json) = get(app, "/doc/9").await;
    assert_eq!(json["error"], "not found");
}

#[tokio::test]
async fn reload_requires_admin_token() {
    let dir = tempdir().unwrap();
    let paths = build_tiny_index(dir.path());
    let app = server::build_app(paths.root.to_string_lossy().to_string()).unwrap();

    let req = Request::post("/index/reload").body(Body::empty()).unwrap();
    let (status, _) = send(app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reload_swaps_in_rewritten_lexicon() {
    let dir = tempdir().unwrap();
    let paths = build_tiny_index(dir.path());
    let app = server::build_app_with_token(paths.root.to_string_lossy().to_string(), Some("secret".into())).unwrap();

    save_lexicon(&paths, &Lexicon::build([(2, "relevant")])).unwrap();
    let (status, json) = send(app.clone(), reload_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_terms"].as_u64().unwrap(), 1);

    let (_, json) = get(app.clone(), "/search?q=relevant").await;
    assert_eq!(json["results"][0]["doc_id"].as_u64().unwrap(), 2);

    fs::write(paths.lexicon(), "relevant\nx\n0 \n\n").unwrap();
    let (status, _) = send(app.clone(), reload_request()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, json) = get(app, "/search?q=relevant").await;
    assert_eq!(json["total_hits"].as_u64().unwrap(), 1);
}

#[tokio::test]
async fn reload_picks_up_a_grown_corpus() {
    let dir = tempdir().unwrap();
    let paths = build_corpus(dir.path(), &[("Doc 0", "first doc0")]);
    let app = server::build_app_with_token(paths.root.to_string_lossy().to_string(), Some("secret".into())).unwrap();

    build_corpus(dir.path(), &[("Doc 0", "first doc0"), ("Doc 1", "second doc1"), ("Doc 2", "third doc2")]);
    let (status, json) = send(app.clone(), reload_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_docs"].as_u64().unwrap(), 3);

    let (_, json) = get(app.clone(), "/search?q=doc2").await;
    assert_eq!(json["total_hits"].as_u64().unwrap(), 1);
    let hit = &json["results"][0];
    assert_eq!(hit["doc_id"].as_u64().unwrap(), 2);
    assert_eq!(hit["title"], "Doc 2");
    assert_eq!(hit["snippet"], "third <em>doc2</em>");

    let (_, json) = get(app, "/doc/2").await;
    assert_eq!(json["text"], "third doc2");
}

#[tokio::test]
async fn snippet_highlights_keywords_without_nesting() {
    let dir = tempdir().unwrap();
    let paths = build_corpus(dir.path(), &[("Doc 0", "rust em doc0")]);
    let app = server::build_app(paths.root.to_string_lossy().to_string()).unwrap();

    let (_, json) = get(app, "/search?q=rust%20em").await;
    assert_eq!(json["results"][0]["snippet"], "<em>rust</em> <em>em</em> doc0");
}
