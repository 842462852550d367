// src/server/inject.rs

//! Live-reload client injection into served HTML.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

/// Path of the Server-Sent Events endpoint the client subscribes to.
pub const RELOAD_PATH: &str = "/__assetdag/reload";

/// Client script: a `css` event re-fetches stylesheets in place, a
/// `reload` event reloads the page.
pub const RELOAD_SCRIPT: &str = r#"<script>
(function () {
  var source = new EventSource("/__assetdag/reload");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
  source.addEventListener("css", function () {
    document.querySelectorAll('link[rel="stylesheet"]').forEach(function (link) {
      var url = new URL(link.href);
      url.searchParams.set("__assetdag", Date.now());
      link.href = url.toString();
    });
  });
})();
</script>
"#;

/// Insert [`RELOAD_SCRIPT`] before the last `</body>` (any case), or append
/// it when the document has none.
pub fn inject_script(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + RELOAD_SCRIPT.len());
            out.push_str(&html[..idx]);
            out.push_str(RELOAD_SCRIPT);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{RELOAD_SCRIPT}"),
    }
}

fn is_html(res: &Response) -> bool {
    res.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"))
}

/// Middleware rewriting successful HTML responses to carry the client.
pub async fn inject_reload_script(req: Request, next: Next) -> Response {
    let res = next.run(req).await;
    if res.status() != StatusCode::OK || !is_html(&res) {
        return res;
    }

    let (mut parts, body) = res.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(err) => {
            warn!(error = %err, "failed to buffer HTML response for reload injection");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = String::from_utf8_lossy(&bytes);
    let injected = inject_script(&html);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(injected))
}
