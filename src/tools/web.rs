//! Web tools: `web_search` (SerpAPI) and `web_fetch` (URL to markdown).

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{str_arg, truncate_output, ToolExecutor};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

impl ToolExecutor {
    pub(super) async fn web_search(&self, arguments: &Value) -> String {
        let query = str_arg(arguments, "query");
        if query.is_empty() {
            return "Error: No query provided".into();
        }
        let num_results = arguments
            .get("num_results")
            .and_then(Value::as_u64)
            .unwrap_or(5) as usize;

        if self.search_api_key.is_empty() {
            return "Error: SEARCH_API_KEY environment variable not set. Get API key from https://serpapi.com/".into();
        }

        debug!(query, num_results, "web search");
        let num = num_results.to_string();
        let resp = match self
            .http
            .get(&self.search_endpoint)
            .query(&[
                ("q", query),
                ("num", num.as_str()),
                ("api_key", self.search_api_key.as_str()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return format!("Error performing web search: {e}"),
        };

        if !resp.status().is_success() {
            return format!(
                "Error: Search API returned status {}",
                resp.status().as_u16()
            );
        }

        let data: SearchResponse = match resp.json().await {
            Ok(d) => d,
            Err(e) => return format!("Error performing web search: {e}"),
        };

        let results: Vec<String> = data
            .organic_results
            .into_iter()
            .take(num_results)
            .map(|item| {
                format!(
                    "**{}**\nURL: {}\n{}\n",
                    item.title.as_deref().unwrap_or("No title"),
                    item.link.as_deref().unwrap_or(""),
                    item.snippet.as_deref().unwrap_or("No description"),
                )
            })
            .collect();

        if results.is_empty() {
            "No results found".into()
        } else {
            results.join("\n")
        }
    }

    pub(super) async fn web_fetch(&self, arguments: &Value) -> String {
        let url = str_arg(arguments, "url");
        if url.is_empty() {
            return "Error: No URL provided".into();
        }
        let extract_main = arguments
            .get("extract_main_content")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let resp = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return format!(
                    "Error: Request to {url} timed out after {} seconds",
                    self.web_timeout.as_secs()
                );
            }
            Err(e) => return format!("Error fetching URL: {e}"),
        };

        let status = resp.status();
        if !status.is_success() {
            return format!(
                "Error: HTTP {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            );
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = if content_type.contains("text/html") {
            match resp.text().await {
                Ok(html) => html_to_markdown(&html, extract_main),
                Err(e) => return format!("Error fetching URL: {e}"),
            }
        } else if content_type.contains("text/plain") {
            match resp.text().await {
                Ok(text) => text,
                Err(e) => return format!("Error fetching URL: {e}"),
            }
        } else if content_type.contains("application/json") {
            match resp.json::<Value>().await {
                Ok(json) => format!(
                    "```json\n{}\n```",
                    serde_json::to_string_pretty(&json).unwrap_or_default()
                ),
                Err(e) => return format!("Error fetching URL: {e}"),
            }
        } else {
            format!("Content type {content_type} - binary content not displayed")
        };

        let body = truncate_output(body, self.max_output_length, "\n... (content truncated)");
        format!("Content from {url}:\n\n{body}")
    }
}

// ---------------------------------------------------------------------------
// HTML to markdown
// ---------------------------------------------------------------------------

/// Line width for rendered pages; wide enough that prose is rarely re-wrapped.
const TEXT_WIDTH: usize = 200;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in regex {pattern}: {e}"))
}

static MAIN_CONTAINERS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        re(r"(?is)<main\b[^>]*>(.*?)</main>"),
        re(r"(?is)<article\b[^>]*>(.*?)</article>"),
        re(r"(?is)<body\b[^>]*>(.*?)</body>"),
    ]
});
static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?is)<!--.*?-->|<head\b.*?</head>|<script\b.*?</script>|<style\b.*?</style>|<noscript\b.*?</noscript>")
});
static CHROME: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)<nav\b.*?</nav>|<footer\b.*?</footer>|<aside\b.*?</aside>"));
static TAG: LazyLock<Regex> = LazyLock::new(|| re(r"(?s)<[^>]+>"));
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| re(r"\n{3,}"));

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Convert an HTML document to markdown-flavoured text.
///
/// With `extract_main`, only the `<main>`, `<article>` or `<body>` content
/// (first one found) is kept and navigation chrome is dropped before the
/// remainder is rendered by `html2text`.
pub fn html_to_markdown(html: &str, extract_main: bool) -> String {
    let mut doc = NOISE.replace_all(html, "").into_owned();

    if extract_main {
        if let Some(inner) = MAIN_CONTAINERS
            .iter()
            .find_map(|r| r.captures(&doc).and_then(|c| c.get(1)))
        {
            doc = inner.as_str().to_string();
        }
        doc = CHROME.replace_all(&doc, "").into_owned();
    }

    let doc = match html2text::from_read(doc.as_bytes(), TEXT_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "html rendering failed, stripping tags instead");
            decode_entities(&TAG.replace_all(&doc, ""))
        }
    };

    let trimmed = doc
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_RUNS.replace_all(&trimmed, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use axum::extract::Query;
    use axum::http::header;
    use axum::response::{Html, IntoResponse};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn executor(dir: &tempfile::TempDir, config: ToolConfig) -> ToolExecutor {
        ToolExecutor::new(dir.path(), &config).unwrap()
    }

    /// Serve `app` on a loopback port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{addr}")
    }

    async fn site() -> String {
        serve(
            Router::new()
                .route(
                    "/page",
                    get(|| async {
                        Html("<html><body><nav>menu</nav><main><h1>Guide</h1><p>Step one &amp; two.</p></main></body></html>")
                    }),
                )
                .route("/notes.txt", get(|| async { "plain <b>text</b> as is" }))
                .route("/data", get(|| async { Json(json!({"name": "gym", "ok": true})) }))
                .route(
                    "/logo.png",
                    get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![0x89u8, b'P', b'N', b'G']).into_response() }),
                )
                .route("/long.txt", get(|| async { "x".repeat(50) }))
                .route(
                    "/missing",
                    get(|| async { axum::http::StatusCode::NOT_FOUND }),
                ),
        )
        .await
    }

    #[test]
    fn test_html_to_markdown_structure() {
        let html = r#"<html><head><title>t</title><style>p{}</style></head>
            <body><nav>menu</nav><main><h1>Guide</h1>
            <p>Read <a href="https://docs.rs">the docs</a> &amp; <strong>enjoy</strong>.</p>
            <ul><li>one</li><li>two</li></ul></main><footer>foot</footer></body></html>"#;
        let md = html_to_markdown(html, true);
        assert!(md.starts_with("# Guide"), "{md}");
        assert!(md.contains("the docs"));
        assert!(md.contains("https://docs.rs"));
        assert!(md.contains("enjoy"));
        assert!(md.contains(" & "));
        assert!(!md.contains("&amp;"));
        assert!(md.contains("one"));
        assert!(md.contains("two"));
        assert!(!md.contains("menu"));
        assert!(!md.contains("foot"));
        assert!(!md.contains("p{}"));
    }

    #[test]
    fn test_html_to_markdown_without_extraction_keeps_nav() {
        let html = "<body><nav>menu</nav><p>text</p></body>";
        let md = html_to_markdown(html, false);
        assert!(md.contains("menu"));
        assert!(md.contains("text"));
    }

    #[test]
    fn test_html_to_markdown_tolerates_unclosed_tags() {
        let html = "<body><div><p>first<p>second <b>bold<ul><li>item</body>";
        let md = html_to_markdown(html, true);
        assert!(md.contains("first"));
        assert!(md.contains("second"));
        assert!(md.contains("bold"));
        assert!(md.contains("item"));
        assert!(!md.contains('<'));
    }

    #[tokio::test]
    async fn test_web_fetch_renders_html() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(&dir, ToolConfig::default());
        let url = format!("{}/page", site().await);
        let out = exec.web_fetch(&json!({"url": url})).await;
        let prefix = format!("Content from {url}:\n\n");
        assert!(out.starts_with(&prefix), "{out}");
        assert!(out.contains("Guide"));
        assert!(out.contains("Step one & two."));
        assert!(!out.contains("menu"));
        assert!(!out.contains("<p>"));

        let out = exec
            .web_fetch(&json!({"url": url, "extract_main_content": false}))
            .await;
        assert!(out.contains("menu"));
    }

    #[tokio::test]
    async fn test_web_fetch_plain_json_and_binary() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(&dir, ToolConfig::default());
        let base = site().await;

        let url = format!("{base}/notes.txt");
        let out = exec.web_fetch(&json!({"url": url})).await;
        assert_eq!(out, format!("Content from {url}:\n\nplain <b>text</b> as is"));

        let url = format!("{base}/data");
        let out = exec.web_fetch(&json!({"url": url})).await;
        let pretty = serde_json::to_string_pretty(&json!({"name": "gym", "ok": true})).unwrap();
        assert_eq!(out, format!("Content from {url}:\n\n```json\n{pretty}\n```"));

        let url = format!("{base}/logo.png");
        let out = exec.web_fetch(&json!({"url": url})).await;
        assert_eq!(
            out,
            format!("Content from {url}:\n\nContent type image/png - binary content not displayed")
        );
    }

    #[tokio::test]
    async fn test_web_fetch_truncates_long_content() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolConfig {
            max_output_length: 10,
            ..ToolConfig::default()
        };
        let exec = executor(&dir, config);
        let url = format!("{}/long.txt", site().await);
        let out = exec.web_fetch(&json!({"url": url})).await;
        assert_eq!(
            out,
            format!("Content from {url}:\n\nxxxxxxxxxx\n... (content truncated)")
        );
    }

    #[tokio::test]
    async fn test_web_fetch_http_error_status() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(&dir, ToolConfig::default());
        let url = format!("{}/missing", site().await);
        let out = exec.web_fetch(&json!({"url": url})).await;
        assert_eq!(out, "Error: HTTP 404 - Not Found");
    }

    /// A search endpoint answering with `results` and checking the query.
    async fn search_api(results: Value) -> String {
        let app = Router::new().route(
            "/search",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let results = results.clone();
                async move {
                    assert_eq!(params["api_key"], "test-key");
                    assert_eq!(params["q"], "rust async");
                    Json(json!({ "organic_results": results }))
                }
            }),
        );
        format!("{}/search", serve(app).await)
    }

    fn search_config(endpoint: String) -> ToolConfig {
        ToolConfig {
            search_endpoint: endpoint,
            search_api_key: "test-key".into(),
            ..ToolConfig::default()
        }
    }

    #[tokio::test]
    async fn test_web_search_formats_and_caps_results() {
        let endpoint = search_api(json!([
            {"title": "Tokio", "link": "https://tokio.rs", "snippet": "An async runtime"},
            {"title": "Async book", "link": "https://rust-lang.github.io/async-book"},
            {"title": "Third", "link": "https://example.com", "snippet": "not shown"}
        ]))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(&dir, search_config(endpoint));

        let out = exec
            .web_search(&json!({"query": "rust async", "num_results": 2}))
            .await;
        assert_eq!(
            out,
            "**Tokio**\nURL: https://tokio.rs\nAn async runtime\n\n\
             **Async book**\nURL: https://rust-lang.github.io/async-book\nNo description\n"
        );
    }

    #[tokio::test]
    async fn test_web_search_without_results() {
        let endpoint = search_api(json!([])).await;
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(&dir, search_config(endpoint));
        let out = exec.web_search(&json!({"query": "rust async"})).await;
        assert_eq!(out, "No results found");
    }

    #[tokio::test]
    async fn test_web_search_requires_key() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(&dir, ToolConfig::default());
        let out = exec.web_search(&json!({"query": "rust async"})).await;
        assert!(out.starts_with("Error: SEARCH_API_KEY environment variable not set"));

        let out = exec.web_search(&json!({})).await;
        assert_eq!(out, "Error: No query provided");
    }

    #[tokio::test]
    async fn test_web_fetch_requires_url() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(&dir, ToolConfig::default());
        assert_eq!(exec.web_fetch(&json!({})).await, "Error: No URL provided");
    }

    #[tokio::test]
    async fn test_web_fetch_unreachable_host() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(&dir, ToolConfig::default());
        let out = exec.web_fetch(&json!({"url": "http://127.0.0.1:9/page"})).await;
        assert!(out.starts_with("Error"), "{out}");
    }
}
