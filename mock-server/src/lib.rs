//! In-memory mock of the Nexus views REST API.
//!
//! Implements enough of the wire contract for the client's integration
//! tests: per-project view storage with revision history, optimistic
//! concurrency (409 on a stale `rev`), tags, listing filters, and canned
//! `_search` / SPARQL responses. Views live in a map keyed by
//! `(org, project, id)` and every mutation appends a revision snapshot so
//! `?rev=` and `?tag=` fetches can serve historical content.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use urlencoding::encode;
use uuid::Uuid;

/// One revision of a view: the type-specific body plus the deprecation flag
/// as it stood at that revision.
#[derive(Clone, Debug)]
struct Revision {
    body: Value,
    deprecated: bool,
}

/// A stored view with its full history.
#[derive(Clone, Debug)]
struct StoredView {
    id: String,
    types: Vec<String>,
    rev: u64,
    deprecated: bool,
    /// Snapshot per revision, index 0 holding revision 1.
    revisions: Vec<Revision>,
    tags: HashMap<String, u64>,
}

type Key = (String, String, String);
type Db = Arc<RwLock<HashMap<Key, StoredView>>>;

#[derive(Clone)]
struct AppState {
    base_url: String,
    db: Db,
}

/// Build the router. `base_url` is used to mint `_self` and `_project`
/// URLs, so it must be the address clients actually reach the server on.
pub fn app(base_url: &str) -> Router {
    let state = AppState {
        base_url: base_url.trim_end_matches('/').to_string(),
        db: Arc::new(RwLock::new(HashMap::new())),
    };
    Router::new()
        .route("/views/{org}/{project}", get(list_views).post(create_view))
        .route("/views/{org}/{project}/graph/sparql", post(sparql_query))
        .route(
            "/views/{org}/{project}/{id}",
            get(fetch_view).put(upsert_view).delete(deprecate_view),
        )
        .route("/views/{org}/{project}/{id}/tags", put(tag_view))
        .route("/views/{org}/{project}/{id}/_search", post(elastic_query))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    let base_url = format!("http://{}", listener.local_addr()?);
    axum::serve(listener, app(&base_url)).await
}

#[derive(Deserialize)]
struct RevQuery {
    rev: Option<u64>,
}

#[derive(Deserialize)]
struct FetchQuery {
    rev: Option<u64>,
    tag: Option<String>,
}

#[derive(Deserialize)]
struct ListQuery {
    from: Option<usize>,
    size: Option<usize>,
    deprecated: Option<bool>,
    #[serde(rename = "type")]
    type_filter: Option<String>,
    q: Option<String>,
}

#[derive(Deserialize)]
struct TagBody {
    tag: String,
    rev: u64,
}

fn reason(status: StatusCode, msg: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"reason": msg})))
}

/// Split an incoming payload into type tags and the remaining body,
/// dropping metadata keys the server owns.
fn split_payload(mut payload: Value) -> (Vec<String>, Value) {
    let mut types = Vec::new();
    if let Value::Object(map) = &mut payload {
        match map.remove("@type") {
            Some(Value::String(tag)) => types.push(tag),
            Some(Value::Array(tags)) => {
                types = tags
                    .into_iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect();
            }
            _ => {}
        }
        map.remove("@id");
        map.retain(|key, _| !key.starts_with('_'));
    }
    (types, payload)
}

fn self_url(state: &AppState, org: &str, project: &str, id: &str) -> String {
    format!(
        "{}/views/{}/{}/{}",
        state.base_url,
        encode(org),
        encode(project),
        encode(id)
    )
}

fn project_url(state: &AppState, org: &str, project: &str) -> String {
    format!("{}/projects/{}/{}", state.base_url, encode(org), encode(project))
}

/// The metadata-only payload mutations return.
fn metadata(state: &AppState, org: &str, project: &str, view: &StoredView) -> Value {
    json!({
        "@id": view.id,
        "@type": view.types,
        "_self": self_url(state, org, project, &view.id),
        "_rev": view.rev,
        "_deprecated": view.deprecated,
    })
}

/// The full payload fetch returns: the body of the requested revision
/// overlaid with metadata.
fn full_payload(
    state: &AppState,
    org: &str,
    project: &str,
    view: &StoredView,
    rev: u64,
) -> Value {
    let revision = &view.revisions[(rev - 1) as usize];
    let mut payload = match revision.body.clone() {
        Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    payload.insert("@id".to_string(), json!(view.id));
    payload.insert("@type".to_string(), json!(view.types));
    payload.insert(
        "_self".to_string(),
        json!(self_url(state, org, project, &view.id)),
    );
    payload.insert("_rev".to_string(), json!(rev));
    payload.insert("_deprecated".to_string(), json!(revision.deprecated));
    payload.insert(
        "_project".to_string(),
        json!(project_url(state, org, project)),
    );
    Value::Object(payload)
}

async fn create_view(
    State(state): State<AppState>,
    Path((org, project)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let (types, body) = split_payload(payload);
    let id = format!("nxv:{}", Uuid::new_v4());

    let view = StoredView {
        id: id.clone(),
        types,
        rev: 1,
        deprecated: false,
        revisions: vec![Revision {
            body,
            deprecated: false,
        }],
        tags: HashMap::new(),
    };
    let meta = metadata(&state, &org, &project, &view);
    state.db.write().await.insert((org, project, id), view);
    (StatusCode::CREATED, Json(meta))
}

async fn upsert_view(
    State(state): State<AppState>,
    Path((org, project, id)): Path<(String, String, String)>,
    Query(query): Query<RevQuery>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let (types, body) = split_payload(payload);
    let mut db = state.db.write().await;
    let key = (org.clone(), project.clone(), id.clone());

    match query.rev {
        None => {
            if db.contains_key(&key) {
                return reason(StatusCode::CONFLICT, "view already exists");
            }
            let view = StoredView {
                id,
                types,
                rev: 1,
                deprecated: false,
                revisions: vec![Revision {
                    body,
                    deprecated: false,
                }],
                tags: HashMap::new(),
            };
            let meta = metadata(&state, &org, &project, &view);
            db.insert(key, view);
            (StatusCode::CREATED, Json(meta))
        }
        Some(rev) => {
            let Some(view) = db.get_mut(&key) else {
                return reason(StatusCode::NOT_FOUND, "view does not exist");
            };
            if rev != view.rev {
                return reason(StatusCode::CONFLICT, "incorrect revision provided");
            }
            if view.deprecated {
                return reason(StatusCode::BAD_REQUEST, "view is deprecated");
            }
            view.types = types;
            view.rev += 1;
            view.revisions.push(Revision {
                body,
                deprecated: false,
            });
            (StatusCode::OK, Json(metadata(&state, &org, &project, view)))
        }
    }
}

async fn fetch_view(
    State(state): State<AppState>,
    Path((org, project, id)): Path<(String, String, String)>,
    Query(query): Query<FetchQuery>,
) -> (StatusCode, Json<Value>) {
    if query.rev.is_some() && query.tag.is_some() {
        return reason(StatusCode::BAD_REQUEST, "rev and tag are mutually exclusive");
    }

    let db = state.db.read().await;
    let Some(view) = db.get(&(org.clone(), project.clone(), id)) else {
        return reason(StatusCode::NOT_FOUND, "view does not exist");
    };

    let target = match (&query.rev, &query.tag) {
        (Some(rev), _) => *rev,
        (_, Some(tag)) => match view.tags.get(tag) {
            Some(rev) => *rev,
            None => return reason(StatusCode::NOT_FOUND, "tag not found"),
        },
        _ => view.rev,
    };

    if target == 0 || target > view.rev {
        return reason(StatusCode::NOT_FOUND, "revision not found");
    }

    (
        StatusCode::OK,
        Json(full_payload(&state, &org, &project, view, target)),
    )
}

async fn deprecate_view(
    State(state): State<AppState>,
    Path((org, project, id)): Path<(String, String, String)>,
    Query(query): Query<RevQuery>,
) -> (StatusCode, Json<Value>) {
    let Some(rev) = query.rev else {
        return reason(StatusCode::BAD_REQUEST, "rev query parameter is required");
    };

    let mut db = state.db.write().await;
    let Some(view) = db.get_mut(&(org.clone(), project.clone(), id)) else {
        return reason(StatusCode::NOT_FOUND, "view does not exist");
    };

    if rev != view.rev {
        return reason(StatusCode::CONFLICT, "incorrect revision provided");
    }
    if view.deprecated {
        return reason(StatusCode::BAD_REQUEST, "view is already deprecated");
    }

    let body = view.revisions[(view.rev - 1) as usize].body.clone();
    view.rev += 1;
    view.deprecated = true;
    view.revisions.push(Revision {
        body,
        deprecated: true,
    });
    (StatusCode::OK, Json(metadata(&state, &org, &project, view)))
}

async fn tag_view(
    State(state): State<AppState>,
    Path((org, project, id)): Path<(String, String, String)>,
    Query(query): Query<RevQuery>,
    Json(input): Json<TagBody>,
) -> (StatusCode, Json<Value>) {
    let Some(rev) = query.rev else {
        return reason(StatusCode::BAD_REQUEST, "rev query parameter is required");
    };

    let mut db = state.db.write().await;
    let Some(view) = db.get_mut(&(org.clone(), project.clone(), id)) else {
        return reason(StatusCode::NOT_FOUND, "view does not exist");
    };

    if rev != view.rev {
        return reason(StatusCode::CONFLICT, "incorrect revision provided");
    }
    if input.rev == 0 || input.rev > view.rev {
        return reason(StatusCode::BAD_REQUEST, "target revision does not exist");
    }

    view.tags.insert(input.tag, input.rev);
    // Tagging consumes a revision number without changing content.
    let last = view.revisions[(view.rev - 1) as usize].clone();
    view.rev += 1;
    view.revisions.push(last);
    (
        StatusCode::CREATED,
        Json(metadata(&state, &org, &project, view)),
    )
}

async fn list_views(
    State(state): State<AppState>,
    Path((org, project)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> Json<Value> {
    let db = state.db.read().await;
    let project_ref = project_url(&state, &org, &project);

    let mut matches: Vec<&StoredView> = db
        .iter()
        .filter(|((o, p, _), _)| *o == org && *p == project)
        .map(|(_, view)| view)
        .filter(|view| match query.deprecated {
            Some(flag) => view.deprecated == flag,
            None => true,
        })
        .filter(|view| match &query.type_filter {
            Some(tag) => view.types.iter().any(|t| t == tag),
            None => true,
        })
        .filter(|view| match &query.q {
            Some(needle) => {
                let haystack = view.revisions[(view.rev - 1) as usize].body.to_string();
                view.id.contains(needle.as_str()) || haystack.contains(needle.as_str())
            }
            None => true,
        })
        .collect();
    matches.sort_by(|a, b| a.id.cmp(&b.id));

    let total = matches.len();
    let from = query.from.unwrap_or(0).min(total);
    let size = query.size.unwrap_or(20);

    let results: Vec<Value> = matches[from..]
        .iter()
        .take(size)
        .map(|view| {
            let mut meta = metadata(&state, &org, &project, view);
            meta["_project"] = json!(project_ref);
            meta
        })
        .collect();

    Json(json!({"_total": total, "_results": results}))
}

async fn elastic_query(
    State(state): State<AppState>,
    Path((org, project, id)): Path<(String, String, String)>,
    Json(_query): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let db = state.db.read().await;
    let Some(view) = db.get(&(org, project, id)) else {
        return reason(StatusCode::NOT_FOUND, "view does not exist");
    };

    // Canned ElasticSearch-shaped answer serving the view's current body.
    let source = view.revisions[(view.rev - 1) as usize].body.clone();
    (
        StatusCode::OK,
        Json(json!({
            "hits": {
                "total": {"value": 1, "relation": "eq"},
                "hits": [{"_id": view.id, "_source": source}]
            }
        })),
    )
}

async fn sparql_query(
    Path((_org, _project)): Path<(String, String)>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type != "application/sparql-query" {
        return reason(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected application/sparql-query",
        );
    }
    if body.trim().is_empty() {
        return reason(StatusCode::BAD_REQUEST, "empty query");
    }

    (
        StatusCode::OK,
        Json(json!({
            "head": {"vars": []},
            "results": {"bindings": []}
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_payload_extracts_type_array() {
        let (types, body) = split_payload(json!({
            "@type": ["View", "ElasticView"],
            "@id": "ignored",
            "_rev": 9,
            "mapping": {"dynamic": true}
        }));
        assert_eq!(types, vec!["View", "ElasticView"]);
        assert_eq!(body, json!({"mapping": {"dynamic": true}}));
    }

    #[test]
    fn split_payload_accepts_single_type_string() {
        let (types, body) = split_payload(json!({"@type": "SparqlView"}));
        assert_eq!(types, vec!["SparqlView"]);
        assert_eq!(body, json!({}));
    }

    #[test]
    fn split_payload_without_type_yields_empty_tags() {
        let (types, _) = split_payload(json!({"mapping": {}}));
        assert!(types.is_empty());
    }

    #[test]
    fn self_url_encodes_segments() {
        let state = AppState {
            base_url: "http://h".to_string(),
            db: Arc::new(RwLock::new(HashMap::new())),
        };
        assert_eq!(
            self_url(&state, "my org", "proj", "a/b"),
            "http://h/views/my%20org/proj/a%2Fb"
        );
    }
}
