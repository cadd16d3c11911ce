//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a `tokio-tungstenite` client to check
//! that frames flow in both directions and that closes are observed.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use flagquiz_transport::{
        Connection, PendingConnection, Transport, WebSocketConnection, WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on a random port, connects one client, and returns both ends.
    async fn connected_pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.upgrade().await.expect("should upgrade")
        });

        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("accept task");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (server_conn, mut client) = connected_pair().await;
        assert!(server_conn.id().into_inner() > 0);

        server_conn
            .send(br#"{"event":"gameStarted"}"#)
            .await
            .expect("send should succeed");

        // UTF-8 payloads go out as text frames.
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"event":"gameStarted"}"#);

        client
            .send(Message::Text(r#"{"username":"alice"}"#.into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"username":"alice"}"#);

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (server_conn, mut client) = connected_pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_send_is_not_blocked_by_pending_recv() {
        let (server_conn, mut client) = connected_pair().await;
        let server_conn = Arc::new(server_conn);

        // Park a reader on the connection; nothing will arrive for it.
        let reader = {
            let conn = Arc::clone(&server_conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::task::yield_now().await;

        tokio::time::timeout(Duration::from_secs(2), server_conn.send(b"ping"))
            .await
            .expect("send must not wait for the reader")
            .expect("send should succeed");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"ping");

        reader.abort();
    }

    #[tokio::test]
    async fn test_accept_does_not_wait_for_handshake() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        // A client that opens TCP and never sends the upgrade request.
        let _idle = tokio::net::TcpStream::connect(addr).await.unwrap();
        let stalled = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("accept must return before the handshake")
            .expect("should accept");
        assert_eq!(stalled.peer_addr().ip(), addr.ip());

        let client = tokio::spawn(async move {
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect")
        });
        let pending = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("second accept should not be blocked")
            .expect("should accept");
        let conn = pending.upgrade().await.expect("should upgrade");
        let (mut ws, _) = client.await.unwrap();

        conn.send(b"hello").await.unwrap();
        let msg = ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello");
    }
}
