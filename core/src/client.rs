//! Stateless request builder and response parser for the views API.
//!
//! # Design
//! `ViewsClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`. The
//! caller executes the actual HTTP round-trip, keeping the core deterministic
//! and free of I/O dependencies.
//!
//! Mutations run on the server's optimistic-concurrency check: every one of
//! them carries a `rev` query parameter, defaulting to the `_rev` of the
//! payload the caller supplies. A mismatch surfaces as
//! `ApiError::StaleRevision`; nothing is resolved locally.

use serde_json::{json, Value};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::path;
use crate::types::{
    JsonInput, ListOptions, View, ViewListing, DEFAULT_VIEW_TYPES, ELASTIC_TYPE, SPARQL_TYPE,
};

/// Synchronous, stateless client for the views API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network. Safe to share across threads; there is nothing to
/// share but the base URL.
#[derive(Debug, Clone)]
pub struct ViewsClient {
    base_url: String,
}

impl ViewsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a view from a structured or JSON-encoded body.
    ///
    /// Payloads without an `@type` get the default
    /// `["View", "ElasticView", "Alpha"]` tag set before sending. With no
    /// `id` the server assigns one (POST to the collection); with an `id`
    /// this is an upsert at that identity (PUT).
    pub fn build_create(
        &self,
        org: &str,
        project: &str,
        body: impl Into<JsonInput>,
        id: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let body = ensure_view_types(body.into().resolve()?);

        match id {
            None => HttpRequest::json(
                HttpMethod::Post,
                path::collection(&self.base_url, org, project),
                &body,
            ),
            Some(id) => HttpRequest::json(
                HttpMethod::Put,
                path::resource(&self.base_url, org, project, id),
                &body,
            ),
        }
    }

    /// Update a previously fetched view at a specific revision.
    ///
    /// The view must carry its `_self` URL, which addresses the request.
    /// `rev` defaults to the view's own `_rev`.
    pub fn build_update(&self, view: &View, rev: Option<u64>) -> Result<HttpRequest, ApiError> {
        let rev = rev.unwrap_or(view.rev);
        let body = serde_json::to_value(view)
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        HttpRequest::json(HttpMethod::Put, path::with_rev(&view.self_url, rev), &body)
    }

    /// Deprecate a view at a specific revision.
    ///
    /// Mirrors the update path, body included, but issues a DELETE. The view
    /// is marked deprecated server-side rather than removed.
    pub fn build_deprecate(&self, view: &View, rev: Option<u64>) -> Result<HttpRequest, ApiError> {
        let rev = rev.unwrap_or(view.rev);
        let body = serde_json::to_value(view)
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        HttpRequest::json(
            HttpMethod::Delete,
            path::with_rev(&view.self_url, rev),
            &body,
        )
    }

    /// Fetch a view, optionally pinned to a revision or a tag.
    ///
    /// `rev` and `tag` are mutually exclusive; supplying both fails before
    /// any request is built.
    pub fn build_fetch(
        &self,
        org: &str,
        project: &str,
        id: &str,
        rev: Option<u64>,
        tag: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        if rev.is_some() && tag.is_some() {
            return Err(ApiError::InvalidArgument(
                "rev and tag are mutually exclusive, choose one or the other".to_string(),
            ));
        }

        let mut url = path::resource(&self.base_url, org, project, id);
        if let Some(rev) = rev {
            url = format!("{url}?rev={rev}");
        }
        if let Some(tag) = tag {
            url = format!("{url}?tag={}", urlencoding::encode(tag));
        }

        Ok(HttpRequest::bare(HttpMethod::Get, url))
    }

    /// List the views of a project, paginated and filtered per `opts`.
    pub fn build_list(&self, org: &str, project: &str, opts: &ListOptions) -> HttpRequest {
        HttpRequest::bare(
            HttpMethod::Get,
            path::listing(&self.base_url, org, project, opts),
        )
    }

    /// Tag a revision of a view.
    ///
    /// `rev_to_tag` is the revision being labeled (default: the view's
    /// current one). `rev` guards the tagging operation itself against
    /// concurrent modification and is a separate knob; tagging consumes a new
    /// revision number even though the content does not change.
    pub fn build_tag(
        &self,
        view: &View,
        tag_value: &str,
        rev_to_tag: Option<u64>,
        rev: Option<u64>,
    ) -> Result<HttpRequest, ApiError> {
        let rev = rev.unwrap_or(view.rev);
        let rev_to_tag = rev_to_tag.unwrap_or(view.rev);

        let body = json!({
            "tag": tag_value,
            "rev": rev_to_tag,
        });

        HttpRequest::json(
            HttpMethod::Put,
            path::tags_with_rev(&view.self_url, rev),
            &body,
        )
    }

    /// Create an aggregate view referencing a set of member views.
    ///
    /// Each member contributes its owning project (the last two path
    /// segments of its `_project`) and its `@id`. Members must have been
    /// fetched, so `_project` is required.
    pub fn build_aggregate(
        &self,
        org: &str,
        project: &str,
        members: &[View],
        id: &str,
    ) -> Result<HttpRequest, ApiError> {
        let mut refs = Vec::with_capacity(members.len());
        for member in members {
            let project_url = member.project.as_deref().ok_or_else(|| {
                ApiError::MalformedInput(format!("member view {} has no _project", member.id))
            })?;
            refs.push(json!({
                "project": project_ref(project_url),
                "viewId": member.id,
            }));
        }

        let body = json!({
            "@context": {
                "nxv": "https://bluebrain.github.io/nexus/vocabulary/"
            },
            "@type": ["View", "AggregateElasticView", "Alpha"],
            "views": refs,
        });

        HttpRequest::json(
            HttpMethod::Put,
            path::resource(&self.base_url, org, project, id),
            &body,
        )
    }

    /// Run an ElasticSearch query against an indexed view.
    ///
    /// The query may be structured or a JSON-encoded string; strings are
    /// decoded before sending.
    pub fn build_elastic_query(
        &self,
        org: &str,
        project: &str,
        view_id: &str,
        query: impl Into<JsonInput>,
    ) -> Result<HttpRequest, ApiError> {
        let query = query.into().resolve()?;
        HttpRequest::json(
            HttpMethod::Post,
            path::search(&self.base_url, org, project, view_id),
            &query,
        )
    }

    /// Run a SPARQL query against the project's graph endpoint.
    pub fn build_sparql_query(&self, org: &str, project: &str, query: &str) -> HttpRequest {
        HttpRequest::sparql(path::sparql(&self.base_url, org, project), query)
    }

    /// Parse the metadata-only payload returned by mutations
    /// (create, update, deprecate, tag, aggregate).
    pub fn parse_metadata(&self, response: HttpResponse) -> Result<View, ApiError> {
        check_success(&response)?;
        serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    /// Parse a full view payload returned by fetch.
    pub fn parse_fetch(&self, response: HttpResponse) -> Result<View, ApiError> {
        check_success(&response)?;
        serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    /// Parse one page of listing results.
    pub fn parse_list(&self, response: HttpResponse) -> Result<ViewListing, ApiError> {
        check_success(&response)?;
        serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    /// Parse a query result (ElasticSearch or SPARQL) as raw JSON.
    pub fn parse_query(&self, response: HttpResponse) -> Result<Value, ApiError> {
        check_success(&response)?;
        serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }
}

/// Keep only the listing results carrying the given type tag. Local, no
/// network involved.
pub fn filter_by_type(listing: &ViewListing, type_tag: &str) -> Vec<View> {
    listing
        .results
        .iter()
        .filter(|view| view.has_type(type_tag))
        .cloned()
        .collect()
}

/// Keep only the ElasticSearch view metadata from a listing page.
pub fn keep_only_elastic(listing: &ViewListing) -> Vec<View> {
    filter_by_type(listing, ELASTIC_TYPE)
}

/// Keep only the SPARQL view metadata from a listing page.
pub fn keep_only_sparql(listing: &ViewListing) -> Vec<View> {
    filter_by_type(listing, SPARQL_TYPE)
}

/// Inject the default type tag set into a payload that carries none.
fn ensure_view_types(mut body: Value) -> Value {
    if let Value::Object(map) = &mut body {
        if !map.contains_key("@type") {
            map.insert("@type".to_string(), json!(DEFAULT_VIEW_TYPES));
        }
    }
    body
}

/// The `org/project` reference of a member view: the last two path segments
/// of its `_project` URL.
fn project_ref(project_url: &str) -> String {
    let segments: Vec<&str> = project_url.split('/').collect();
    let start = segments.len().saturating_sub(2);
    segments[start..].join("/")
}

/// Map non-success status codes to the appropriate `ApiError` variant.
///
/// Any 2xx passes: the server answers 201 on creations and 200 on updates,
/// and the caller treats them alike.
fn check_success(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        200..=299 => Ok(()),
        404 => Err(ApiError::NotFound),
        409 => Err(ApiError::StaleRevision {
            body: response.body.clone(),
        }),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE_URL: &str = "http://localhost:8080/v1";

    fn client() -> ViewsClient {
        ViewsClient::new(BASE_URL)
    }

    fn fetched_view(rev: u64) -> View {
        serde_json::from_value(json!({
            "@id": "view1",
            "@type": ["View", "ElasticView", "Alpha"],
            "_self": format!("{BASE_URL}/views/org/proj/view1"),
            "_rev": rev,
            "_deprecated": false,
            "_project": format!("{BASE_URL}/projects/org/proj"),
            "mapping": {"dynamic": false}
        }))
        .unwrap()
    }

    fn body_json(req: &HttpRequest) -> Value {
        serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
    }

    // --- create ---

    #[test]
    fn create_without_id_posts_to_collection() {
        let req = client()
            .build_create("org", "proj", json!({"mapping": {}}), None)
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, format!("{BASE_URL}/views/org/proj"));
    }

    #[test]
    fn create_with_id_puts_at_resource() {
        let req = client()
            .build_create("org", "proj", json!({"mapping": {}}), Some("my view"))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, format!("{BASE_URL}/views/org/proj/my%20view"));
    }

    #[test]
    fn create_injects_default_types_when_absent() {
        let req = client()
            .build_create("org", "proj", json!({"mapping": {}}), None)
            .unwrap();
        assert_eq!(
            body_json(&req)["@type"],
            json!(["View", "ElasticView", "Alpha"])
        );
    }

    #[test]
    fn create_keeps_explicit_types() {
        let req = client()
            .build_create("org", "proj", json!({"@type": ["SparqlView"]}), None)
            .unwrap();
        assert_eq!(body_json(&req)["@type"], json!(["SparqlView"]));
    }

    #[test]
    fn create_decodes_string_body() {
        let req = client()
            .build_create("org", "proj", r#"{"mapping": {"dynamic": true}}"#, None)
            .unwrap();
        assert_eq!(body_json(&req)["mapping"], json!({"dynamic": true}));
    }

    #[test]
    fn create_rejects_malformed_string_body() {
        let err = client()
            .build_create("org", "proj", "{not json", None)
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedInput(_)));
    }

    // --- update / deprecate ---

    #[test]
    fn update_uses_explicit_rev() {
        let view = fetched_view(3);
        let req = client().build_update(&view, Some(7)).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, format!("{BASE_URL}/views/org/proj/view1?rev=7"));
    }

    #[test]
    fn update_falls_back_to_payload_rev() {
        let view = fetched_view(3);
        let req = client().build_update(&view, None).unwrap();
        assert_eq!(req.path, format!("{BASE_URL}/views/org/proj/view1?rev=3"));
        assert_eq!(body_json(&req)["mapping"], json!({"dynamic": false}));
    }

    #[test]
    fn deprecate_sends_delete_with_body() {
        let view = fetched_view(2);
        let req = client().build_deprecate(&view, None).unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, format!("{BASE_URL}/views/org/proj/view1?rev=2"));
        assert!(req.body.is_some());
    }

    #[test]
    fn deprecate_uses_explicit_rev() {
        let view = fetched_view(2);
        let req = client().build_deprecate(&view, Some(5)).unwrap();
        assert_eq!(req.path, format!("{BASE_URL}/views/org/proj/view1?rev=5"));
    }

    // --- fetch ---

    #[test]
    fn fetch_plain() {
        let req = client()
            .build_fetch("org", "proj", "view1", None, None)
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, format!("{BASE_URL}/views/org/proj/view1"));
    }

    #[test]
    fn fetch_pinned_to_rev() {
        let req = client()
            .build_fetch("org", "proj", "view1", Some(2), None)
            .unwrap();
        assert_eq!(req.path, format!("{BASE_URL}/views/org/proj/view1?rev=2"));
    }

    #[test]
    fn fetch_pinned_to_tag_encodes_value() {
        let req = client()
            .build_fetch("org", "proj", "view1", None, Some("v1 final"))
            .unwrap();
        assert_eq!(
            req.path,
            format!("{BASE_URL}/views/org/proj/view1?tag=v1%20final")
        );
    }

    #[test]
    fn fetch_with_rev_and_tag_fails_before_building() {
        let err = client()
            .build_fetch("org", "proj", "view1", Some(2), Some("v1"))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    // --- tag ---

    #[test]
    fn tag_defaults_both_revisions_to_current() {
        let view = fetched_view(4);
        let req = client().build_tag(&view, "v1.0.0", None, None).unwrap();
        assert_eq!(
            req.path,
            format!("{BASE_URL}/views/org/proj/view1/tags?rev=4")
        );
        assert_eq!(body_json(&req), json!({"tag": "v1.0.0", "rev": 4}));
    }

    #[test]
    fn tag_separates_guard_rev_from_target_rev() {
        let view = fetched_view(4);
        let req = client()
            .build_tag(&view, "v1.0.0", Some(2), Some(4))
            .unwrap();
        assert_eq!(
            req.path,
            format!("{BASE_URL}/views/org/proj/view1/tags?rev=4")
        );
        assert_eq!(body_json(&req), json!({"tag": "v1.0.0", "rev": 2}));
    }

    // --- aggregate ---

    #[test]
    fn aggregate_extracts_member_project_refs() {
        let member = fetched_view(1);
        let req = client()
            .build_aggregate("org", "proj", &[member], "agg1")
            .unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, format!("{BASE_URL}/views/org/proj/agg1"));

        let body = body_json(&req);
        assert_eq!(body["@type"], json!(["View", "AggregateElasticView", "Alpha"]));
        assert_eq!(
            body["views"],
            json!([{"project": "org/proj", "viewId": "view1"}])
        );
    }

    #[test]
    fn aggregate_rejects_member_without_project() {
        let mut member = fetched_view(1);
        member.project = None;
        let err = client()
            .build_aggregate("org", "proj", &[member], "agg1")
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedInput(_)));
    }

    #[test]
    fn project_ref_takes_last_two_segments() {
        assert_eq!(project_ref("http://h/v1/projects/org1/proj1"), "org1/proj1");
        assert_eq!(project_ref("org1/proj1"), "org1/proj1");
        assert_eq!(project_ref("proj1"), "proj1");
    }

    // --- queries ---

    #[test]
    fn elastic_query_decodes_string() {
        let req = client()
            .build_elastic_query("org", "proj", "view1", r#"{"query": {"match_all": {}}}"#)
            .unwrap();
        assert_eq!(
            req.path,
            format!("{BASE_URL}/views/org/proj/view1/_search")
        );
        assert_eq!(body_json(&req), json!({"query": {"match_all": {}}}));
    }

    #[test]
    fn elastic_query_sends_structured_unchanged() {
        let query = json!({"query": {"term": {"@type": "Person"}}});
        let req = client()
            .build_elastic_query("org", "proj", "view1", query.clone())
            .unwrap();
        assert_eq!(body_json(&req), query);
    }

    #[test]
    fn elastic_query_rejects_bad_string() {
        let err = client()
            .build_elastic_query("org", "proj", "view1", "{{")
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedInput(_)));
    }

    #[test]
    fn sparql_query_targets_project_graph() {
        let req = client().build_sparql_query("org", "proj", "SELECT * WHERE { ?s ?p ?o }");
        assert_eq!(
            req.path,
            format!("{BASE_URL}/views/org/proj/graph/sparql")
        );
        assert_eq!(req.body.as_deref(), Some("SELECT * WHERE { ?s ?p ?o }"));
    }

    // --- parsing ---

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn parse_metadata_accepts_created_and_ok() {
        let body = r#"{"@id":"v","@type":["View"],"_self":"http://h/v","_rev":1}"#;
        for status in [200, 201] {
            let meta = client().parse_metadata(response(status, body)).unwrap();
            assert_eq!(meta.rev, 1);
        }
    }

    #[test]
    fn parse_surfaces_stale_revision() {
        let err = client()
            .parse_metadata(response(409, r#"{"reason":"incorrect revision"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::StaleRevision { .. }));
    }

    #[test]
    fn parse_surfaces_not_found() {
        let err = client().parse_fetch(response(404, "")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_surfaces_other_http_errors() {
        let err = client().parse_list(response(500, "boom")).unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, .. }));
    }

    #[test]
    fn parse_list_bad_json() {
        let err = client().parse_list(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    // --- local filtering ---

    fn listing_with_types(types: &[&[&str]]) -> ViewListing {
        let results = types
            .iter()
            .enumerate()
            .map(|(i, tags)| {
                serde_json::from_value(json!({
                    "@id": format!("v{i}"),
                    "@type": tags,
                    "_self": format!("http://h/v{i}"),
                    "_rev": 1
                }))
                .unwrap()
            })
            .collect();
        ViewListing {
            total: types.len() as u64,
            results,
        }
    }

    #[test]
    fn filter_by_type_honors_requested_tag() {
        let listing = listing_with_types(&[
            &["View", "ElasticView"],
            &["View", "SparqlView"],
            &["View", "ElasticView", "Alpha"],
        ]);

        let elastic = keep_only_elastic(&listing);
        assert_eq!(elastic.len(), 2);
        assert!(elastic.iter().all(|v| v.has_type(ELASTIC_TYPE)));

        let sparql = keep_only_sparql(&listing);
        assert_eq!(sparql.len(), 1);
        assert_eq!(sparql[0].id, "v1");
    }

    #[test]
    fn filter_by_type_with_unknown_tag_is_empty() {
        let listing = listing_with_types(&[&["View", "ElasticView"]]);
        assert!(filter_by_type(&listing, "AggregateElasticView").is_empty());
    }
}
