//! Liveness HTTP endpoint for the hosting platform's uptime checks.
//!
//! Answers `GET`/`HEAD` on `/` and `/health` with a plain `OK`; every other
//! path is a 404. Pings are logged with the forwarded scheme and caller
//! address so uptime monitors show up in the logs.

use crate::error::Result;
use axum::extract::ConnectInfo;
use axum::http::header::{HOST, USER_AGENT};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Binds the listener, spawns the serve loop and returns the bound address.
/// Pass port 0 to let the OS pick one.
pub async fn spawn(port: u16, external_url: Option<String>) -> Result<SocketAddr> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    let addr = listener.local_addr()?;

    match &external_url {
        Some(base) => tracing::info!(
            %addr,
            external = %format!("{}/health", base.trim_end_matches('/')),
            "Health server listening"
        ),
        None => tracing::info!(%addr, "Health server listening"),
    }

    tokio::spawn(async move {
        let service = router().into_make_service_with_connect_info::<SocketAddr>();
        if let Err(error) = axum::serve(listener, service).await {
            tracing::error!(%error, "Health server stopped");
        }
    });

    Ok(addr)
}

fn router() -> Router {
    Router::new()
        .route("/", get(ok_handler))
        .route("/health", get(ok_handler))
        .fallback(not_found)
}

async fn ok_handler(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    uri: Uri,
    headers: HeaderMap,
) -> &'static str {
    let proto = header_str(&headers, "x-forwarded-proto").unwrap_or("http");
    let scheme = if proto.eq_ignore_ascii_case("https") {
        "https"
    } else {
        "http"
    };
    let host = header_str(&headers, HOST.as_str()).unwrap_or("-");
    let user_agent = header_str(&headers, USER_AGENT.as_str()).unwrap_or("-");

    tracing::info!(
        url = %format!("{scheme}://{host}{uri}"),
        peer = %peer.ip(),
        user_agent,
        "Health ping"
    );
    "OK"
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn_test_server() -> String {
        let addr = spawn(0, None).await.unwrap();
        format!("http://127.0.0.1:{}", addr.port())
    }

    #[tokio::test]
    async fn test_root_and_health_respond_ok() {
        let base = spawn_test_server().await;

        for path in ["/", "/health"] {
            let response = reqwest::get(format!("{base}{path}")).await.unwrap();
            assert_eq!(response.status(), 200);
            assert_eq!(response.text().await.unwrap(), "OK");
        }
    }

    #[tokio::test]
    async fn test_head_requests_are_answered() {
        let base = spawn_test_server().await;

        let client = reqwest::Client::new();
        let response = client
            .head(format!("{base}/health"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_other_paths_are_not_found() {
        let base = spawn_test_server().await;

        let response = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(response.status(), 404);
    }
}
