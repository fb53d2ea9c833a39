//! Local static file server for viewing the book in a browser.
//!
//! Browsers refuse to load page images from `file://` pages, so the viewer
//! is served over HTTP from the book directory. Every response carries
//! permissive CORS headers.

use crate::config::ServeConfig;
use crate::error::BookError;
use axum::http::{header, Method};
use axum::Router;
use std::path::Path;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Static files under `root`, with `index.html` for directories.
pub fn router(root: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .fallback_service(ServeDir::new(root))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind the configured address.
///
/// # Errors
/// [`BookError::PortInUse`] when another process holds the port.
pub async fn bind(config: &ServeConfig) -> Result<TcpListener, BookError> {
    let addr = config.socket_addr();
    TcpListener::bind(addr).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            BookError::PortInUse { port: config.port }
        } else {
            BookError::Server(format!("cannot bind {addr}: {e}"))
        }
    })
}

/// Serve `config.root` until Ctrl+C.
pub async fn serve(config: &ServeConfig) -> Result<(), BookError> {
    if !config.root.is_dir() {
        return Err(BookError::DirectoryNotFound {
            path: config.root.clone(),
        });
    }
    let listener = bind(config).await?;
    let url = config.local_url();
    let root = config.root.canonicalize().unwrap_or_else(|_| config.root.clone());
    info!("Starting server at {}", url);
    info!("Serving files from: {}", root.display());
    info!("Press Ctrl+C to stop the server");

    if config.open_browser {
        match open::that(&url) {
            Ok(()) => info!("Browser opened at {}", url),
            Err(e) => warn!("Could not open browser automatically: {}", e),
        }
    }

    axum::serve(listener, router(&root))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BookError::Server(e.to_string()))?;
    info!("Server stopped by user");
    Ok(())
}

/// Synchronous wrapper around [`serve`].
///
/// Creates a tokio runtime internally.
pub fn serve_sync(config: &ServeConfig) -> Result<(), BookError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BookError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(serve(config))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::net::{IpAddr, Ipv4Addr};
    use tower::ServiceExt;

    fn book_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>book</html>").unwrap();
        std::fs::create_dir(dir.path().join("individual_pages")).unwrap();
        std::fs::write(dir.path().join("individual_pages/page_001.png"), b"png").unwrap();
        dir
    }

    #[tokio::test]
    async fn root_serves_index_with_cors() {
        let dir = book_dir();
        let response = router(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<html>book</html>");
    }

    #[tokio::test]
    async fn page_images_are_served() {
        let dir = book_dir();
        let response = router(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/individual_pages/page_001.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn missing_files_are_404() {
        let dir = book_dir();
        let response = router(dir.path())
            .oneshot(Request::builder().uri("/nope.png").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn preflight_allows_content_type() {
        let dir = book_dir();
        let response = router(dir.path())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/index.html")
                    .header(header::ORIGIN, "http://example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .to_string();
        assert!(methods.contains("POST"), "got: {methods}");
        assert!(methods.contains("OPTIONS"), "got: {methods}");
    }

    #[tokio::test]
    async fn busy_port_is_reported() {
        let holder = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = holder.local_addr().unwrap().port();
        let config = ServeConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            ..ServeConfig::default()
        };
        match bind(&config).await.unwrap_err() {
            BookError::PortInUse { port: p } => assert_eq!(p, port),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServeConfig {
            root: dir.path().join("nope"),
            open_browser: false,
            ..ServeConfig::default()
        };
        assert!(matches!(
            serve(&config).await.unwrap_err(),
            BookError::DirectoryNotFound { .. }
        ));
    }
}
