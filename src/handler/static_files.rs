//! Static file serving module
//!
//! Maps a request onto the document root and serves files, index files,
//! directory listings and trailing-slash redirects.

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::router::RequestContext;
use crate::http::cache::{self, Validators};
use crate::http::path::{self, PathError};
use crate::http::{self as proto, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

/// Serve whatever the request path points at below the document root
pub async fn serve(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let target = match path::resolve(&state.document_root, ctx.path) {
        Ok(target) => target,
        Err(PathError::Malformed) => {
            return proto::build_error_response(
                StatusCode::BAD_REQUEST,
                Some("Bad request path"),
                ctx.is_head,
            );
        }
        Err(PathError::Escapes) => {
            logger::log_warning(&format!("Path traversal attempt blocked: {}", ctx.path));
            return forbidden(ctx);
        }
    };

    // Missing files are common (404), no need to log them
    let Ok(metadata) = fs::metadata(&target).await else {
        return not_found(ctx);
    };

    match path::is_within_root(&target, &state.document_root).await {
        Some(true) => {}
        Some(false) => {
            logger::log_warning(&format!(
                "Symlink escaping the document root blocked: {} -> {}",
                ctx.path,
                target.display()
            ));
            return forbidden(ctx);
        }
        None => return not_found(ctx),
    }

    if metadata.is_dir() {
        return serve_directory(ctx, &target, state).await;
    }

    // `/file.txt/` names a directory that does not exist
    if ctx.path.ends_with('/') {
        return not_found(ctx);
    }

    serve_file(ctx, &target, &metadata).await
}

/// Redirect to the slash form, then try index files, then list
async fn serve_directory(
    ctx: &RequestContext<'_>,
    dir: &Path,
    state: &AppState,
) -> Response<Full<Bytes>> {
    if !ctx.path.ends_with('/') {
        let location = match ctx.query {
            Some(query) => format!("{}/?{query}", ctx.path),
            None => format!("{}/", ctx.path),
        };
        return proto::build_redirect_response(&location);
    }

    for index_file in &state.config.http.index_files {
        let index_path = dir.join(index_file);
        let Ok(metadata) = fs::metadata(&index_path).await else {
            continue;
        };
        if metadata.is_file()
            && path::is_within_root(&index_path, &state.document_root).await == Some(true)
        {
            return serve_file(ctx, &index_path, &metadata).await;
        }
    }

    if !state.config.http.directory_listing {
        return proto::build_error_response(
            StatusCode::FORBIDDEN,
            Some("Directory listing is disabled"),
            ctx.is_head,
        );
    }

    match listing::render(dir, ctx.path).await {
        Ok(html) => proto::build_html_response(html, ctx.is_head),
        Err(e) => {
            logger::log_warning(&format!("Cannot list '{}': {e}", dir.display()));
            proto::build_error_response(
                StatusCode::NOT_FOUND,
                Some("No permission to list directory"),
                ctx.is_head,
            )
        }
    }
}

/// Serve a regular file, honouring conditional headers
async fn serve_file(
    ctx: &RequestContext<'_>,
    file_path: &Path,
    metadata: &Metadata,
) -> Response<Full<Bytes>> {
    let validators = Validators::from_metadata(metadata);

    if cache::is_not_modified(ctx.if_none_match, ctx.if_modified_since, &validators) {
        return proto::build_304_response(&validators);
    }

    let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));

    if ctx.is_head {
        return proto::build_file_response(Bytes::new(), metadata.len(), content_type, &validators);
    }

    match fs::read(file_path).await {
        Ok(content) => {
            let length = content.len() as u64;
            proto::build_file_response(Bytes::from(content), length, content_type, &validators)
        }
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
            not_found(ctx)
        }
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            proto::build_error_response(StatusCode::INTERNAL_SERVER_ERROR, None, ctx.is_head)
        }
    }
}

fn not_found(ctx: &RequestContext<'_>) -> Response<Full<Bytes>> {
    proto::build_error_response(StatusCode::NOT_FOUND, Some("File not found"), ctx.is_head)
}

fn forbidden(ctx: &RequestContext<'_>) -> Response<Full<Bytes>> {
    proto::build_error_response(StatusCode::FORBIDDEN, None, ctx.is_head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use hyper::header::{CONTENT_TYPE, ETAG, LAST_MODIFIED};
    use hyper::Request;

    fn state_for(root: &Path, listing: bool) -> AppState {
        let mut config = Config::default();
        config.server.document_root = root.display().to_string();
        config.http.directory_listing = listing;
        AppState::new(config).unwrap()
    }

    async fn serve_uri(state: &AppState, req: &Request<()>) -> Response<Full<Bytes>> {
        let ctx = RequestContext::from_request(req);
        serve(&ctx, state).await
    }

    async fn get(state: &AppState, uri: &str) -> Response<Full<Bytes>> {
        serve_uri(state, &Request::get(uri).body(()).unwrap()).await
    }

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn test_file_body_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/demo_bg.wasm"), &payload).unwrap();
        let state = state_for(dir.path(), true);

        let response = get(&state, "/pkg/demo_bg.wasm").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(ETAG));
        assert!(response.headers().contains_key(LAST_MODIFIED));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn test_index_htm_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/index.htm"), "legacy").unwrap();
        let state = state_for(dir.path(), true);

        let response = get(&state, "/docs/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "legacy");
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b file.js"), "").unwrap();
        std::fs::create_dir(dir.path().join("Assets")).unwrap();
        let state = state_for(dir.path(), true);

        let response = get(&state, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        let html = body_text(response).await;
        assert!(html.contains("<title>Directory listing for /</title>"));
        assert!(html.contains("<li><a href=\"Assets/\">Assets/</a></li>"));
        assert!(html.contains("<li><a href=\"b%20file.js\">b file.js</a></li>"));
    }

    #[tokio::test]
    async fn test_listing_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_for(dir.path(), false);

        let response = get(&state, "/").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_file_with_trailing_slash_is_404() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        let state = state_for(dir.path(), true);

        let response = get(&state, "/notes.txt/").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_conditional_requests() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.js"), "export {}").unwrap();
        let state = state_for(dir.path(), true);

        let first = get(&state, "/main.js").await;
        let etag = first.headers()[ETAG].to_str().unwrap().to_string();
        let last_modified = first.headers()[LAST_MODIFIED].to_str().unwrap().to_string();

        let by_etag = Request::get("/main.js")
            .header("if-none-match", etag.as_str())
            .body(())
            .unwrap();
        let response = serve_uri(&state, &by_etag).await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(body_text(response).await.is_empty());

        let by_date = Request::get("/main.js")
            .header("if-modified-since", last_modified.as_str())
            .body(())
            .unwrap();
        assert_eq!(
            serve_uri(&state, &by_date).await.status(),
            StatusCode::NOT_MODIFIED
        );

        let stale = Request::get("/main.js")
            .header("if-modified-since", "Thu, 01 Jan 1970 00:00:00 GMT")
            .body(())
            .unwrap();
        assert_eq!(serve_uri(&state, &stale).await.status(), StatusCode::OK);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_root_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("link.txt"),
        )
        .unwrap();
        let state = state_for(dir.path(), true);

        let response = get(&state, "/link.txt").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
