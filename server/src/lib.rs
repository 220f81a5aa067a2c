use anyhow::{Context, Result};
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vsm_core::persist::{load_index, IndexPaths};
use vsm_core::records::{load_records, read_content};
use vsm_core::tokenizer::split_query;
use vsm_core::{search, Lexicon, Record};

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: u32,
    pub score: f64,
    pub vector: Vec<u8>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub date: Option<String>,
    /// Keyword -> positions in this document.
    pub matches: BTreeMap<String, Vec<u32>>,
    pub snippet: Option<String>,
}

/// Everything a query reads, loaded and replaced as one unit.
pub struct LoadedIndex {
    pub lexicon: Lexicon,
    pub records: Vec<Record>,
    pub num_docs: u32,
}

impl LoadedIndex {
    /// Read `lexicon.txt`, `meta.json` and the corpus records of `paths`.
    pub fn load(paths: &IndexPaths) -> vsm_core::Result<Self> {
        let (lexicon, meta) = load_index(paths)?;
        let records = match &meta.docs_dir {
            Some(dir) => load_records(dir, meta.num_docs as usize)?,
            None => Vec::new(),
        };
        Ok(Self { lexicon, records, num_docs: meta.num_docs })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub index_paths_root: PathBuf,
    /// Swapped as a whole on reload; readers clone the inner Arc.
    pub index: Arc<RwLock<Arc<LoadedIndex>>>,
    pub admin_token: Option<String>,
}

pub fn build_app(index_dir: String) -> Result<Router> {
    build_app_with_token(index_dir, std::env::var("ADMIN_TOKEN").ok())
}

pub fn build_app_with_token(index_dir: String, admin_token: Option<String>) -> Result<Router> {
    let index_paths = IndexPaths::new(&index_dir);
    let loaded = LoadedIndex::load(&index_paths).with_context(|| format!("loading index from {index_dir}"))?;
    tracing::info!(num_docs = loaded.num_docs, num_terms = loaded.lexicon.len(), "index loaded");
    let app_state = AppState {
        index_paths_root: PathBuf::from(&index_dir),
        index: Arc::new(RwLock::new(Arc::new(loaded))),
        admin_token,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let index = state.index.read().clone();
    let results = search(&params.q, &index.lexicon, index.num_docs);
    let total_hits = results.len();
    let k = params.k.clamp(1, 100);

    let keywords = split_query(&params.q);
    let hits = results
        .into_iter()
        .take(k)
        .map(|r| {
            let record = index.records.get(r.doc_id as usize);
            let matches = r
                .matches
                .iter()
                .map(|m| (m.token.to_string(), m.posting.positions.clone()))
                .collect();
            SearchHit {
                doc_id: r.doc_id,
                score: r.score,
                vector: r.vector,
                title: record.map(|rec| rec.title.clone()),
                url: record.map(|rec| rec.url.clone()),
                date: record.map(|rec| rec.date.clone()),
                matches,
                snippet: record.and_then(|rec| snippet_from_file(&rec.file_path, &keywords)),
            }
        })
        .collect();

    let elapsed = start.elapsed();
    Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results: hits })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<u32>) -> Json<serde_json::Value> {
    let index = state.index.read().clone();
    if let Some(record) = index.records.get(doc_id as usize) {
        let mut obj = serde_json::json!({
            "doc_id": doc_id,
            "title": record.title,
            "url": record.url,
            "date": record.date,
        });
        if let Ok(text) = read_content(&record.file_path) {
            obj["text"] = serde_json::Value::String(text);
        }
        return Json(obj);
    }
    Json(serde_json::json!({ "error": "not found" }))
}

async fn reload_handler(State(state): State<AppState>, headers: axum::http::HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let paths = IndexPaths::new(&state.index_paths_root);
    // Load off to the side; the live index is only replaced on success.
    let fresh = tokio::task::spawn_blocking(move || LoadedIndex::load(&paths))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::warn!(error = %e, "reload failed, keeping current index");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    let num_terms = fresh.lexicon.len();
    let num_docs = fresh.num_docs;
    *state.index.write() = Arc::new(fresh);
    tracing::info!(num_docs, num_terms, "index reloaded");
    Ok(Json(serde_json::json!({ "num_docs": num_docs, "num_terms": num_terms })))
}

fn authorize(state: &AppState, headers: &axum::http::HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

fn snippet_from_file(path: &std::path::Path, keywords: &[&str]) -> Option<String> {
    let text = read_content(path).ok()?;
    if text.is_empty() { return None; }
    let first_idx = keywords.iter().find_map(|k| text.find(k));
    let snippet = match first_idx {
        Some(idx) => {
            let start = floor_char_boundary(&text, idx.saturating_sub(100));
            let end = floor_char_boundary(&text, (idx + 200).min(text.len()));
            text[start..end].to_string()
        }
        None => text.chars().take(200).collect(),
    };
    Some(highlight_terms(&snippet, keywords))
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn highlight_terms(snippet: &str, keywords: &[&str]) -> String {
    if keywords.is_empty() {
        return snippet.to_string();
    }
    // One pass over all keywords, so a keyword never matches inside inserted tags.
    let alternation = keywords.iter().map(|k| regex::escape(k)).collect::<Vec<_>>().join("|");
    // Whole tokens only, matching how documents are indexed.
    let Ok(pat) = regex::Regex::new(&format!(r"\b(?:{alternation})\b")) else {
        return snippet.to_string();
    };
    pat.replace_all(snippet, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_each_keyword_once() {
        assert_eq!(highlight_terms("rust em doc0", &["rust", "em"]), "<em>rust</em> <em>em</em> doc0");
    }

    #[test]
    fn highlight_ignores_partial_words() {
        assert_eq!(highlight_terms("rusty rust", &["rust"]), "rusty <em>rust</em>");
        assert_eq!(highlight_terms("plain", &[]), "plain");
    }
}
