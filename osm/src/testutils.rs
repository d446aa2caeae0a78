//! Test-only helper for spinning up upstream mocks on an ephemeral port.

use std::net::SocketAddr;

/// Serves an axum router on 127.0.0.1:0 and returns the bound address.
pub(crate) async fn serve(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });
    addr
}
