//! URL path and query-string construction.
//!
//! # Design
//! Pure functions from labels and options to complete URLs, kept apart from
//! request building so the wire contract is testable on its own. Every caller
//! -supplied path segment and query value is percent-encoded; revision
//! numbers are formatted directly since they are plain integers.

use urlencoding::encode;

use crate::types::ListOptions;

/// `{base}/views/{org}/{project}` — the view collection of a project.
pub fn collection(base: &str, org: &str, project: &str) -> String {
    format!("{base}/views/{}/{}", encode(org), encode(project))
}

/// `{base}/views/{org}/{project}/{id}` — a single view.
pub fn resource(base: &str, org: &str, project: &str, id: &str) -> String {
    format!("{}/{}", collection(base, org, project), encode(id))
}

/// `{base}/views/{org}/{project}/{id}/_search` — the ElasticSearch endpoint
/// of an indexed view.
pub fn search(base: &str, org: &str, project: &str, id: &str) -> String {
    format!("{}/_search", resource(base, org, project, id))
}

/// `{base}/views/{org}/{project}/graph/sparql` — the project-wide SPARQL
/// endpoint, not tied to a view id.
pub fn sparql(base: &str, org: &str, project: &str) -> String {
    format!("{}/graph/sparql", collection(base, org, project))
}

/// `{self_url}?rev={rev}` — a self-addressed mutation pinned to a revision.
pub fn with_rev(self_url: &str, rev: u64) -> String {
    format!("{self_url}?rev={rev}")
}

/// `{self_url}/tags?rev={rev}` — the tag sub-resource of a view.
pub fn tags_with_rev(self_url: &str, rev: u64) -> String {
    format!("{self_url}/tags?rev={rev}")
}

/// The listing URL with pagination and optional filters, in the order
/// `from`, `size`, `deprecated`, `type`, `q`.
pub fn listing(base: &str, org: &str, project: &str, opts: &ListOptions) -> String {
    let mut url = format!(
        "{}?from={}&size={}",
        collection(base, org, project),
        opts.from,
        opts.size
    );

    if let Some(deprecated) = opts.deprecated {
        url.push_str(if deprecated {
            "&deprecated=true"
        } else {
            "&deprecated=false"
        });
    }

    if let Some(type_filter) = &opts.type_filter {
        url.push_str("&type=");
        url.push_str(&encode(type_filter));
    }

    if let Some(query) = &opts.full_text_query {
        url.push_str("&q=");
        url.push_str(&encode(query));
    }

    url
}
