//! End-to-end tests: a real server, HTTP requests through `reqwest` and
//! players on `tokio-tungstenite` WebSockets.

use std::time::Duration;

use flagquiz::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    ws: String,
    http: String,
}

/// Starts a server on random ports with a zero-length countdown.
async fn start_server() -> TestServer {
    let server = QuizServer::builder()
        .bind("127.0.0.1:0")
        .http("127.0.0.1:0")
        .game_settings(GameSettings {
            countdown_step: Duration::from_millis(1),
            ..GameSettings::default()
        })
        .build()
        .await
        .expect("server should build");

    let ws = server.local_addr().expect("ws addr").to_string();
    let http = server
        .http_addr()
        .expect("http enabled")
        .expect("http addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    TestServer {
        ws: format!("ws://{ws}"),
        http: format!("http://{http}"),
    }
}

async fn create_room(server: &TestServer, host: &str) -> String {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/createroom", server.http))
        .json(&json!({
            "timeLimit": 5,
            "numQuestions": 12,
            "gameType": "multiple-choice",
            "hostUsername": host,
        }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["code"].as_str().expect("room code").to_string()
}

/// Connects and sends the admission message the browser client sends.
async fn join(server: &TestServer, room: &str, username: &str) -> ClientWs {
    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws.as_str())
        .await
        .expect("should connect");
    let admission = json!({"event": "joinRoom", "username": username, "roomID": room});
    ws.send(Message::Text(admission.to_string().into()))
        .await
        .unwrap();
    ws
}

async fn send_event(ws: &mut ClientWs, event: &str, data: Value) {
    let frame = json!({"event": event, "data": data});
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Reads the next JSON frame, failing after two seconds.
async fn recv_json(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Binary(data) => return serde_json::from_slice(&data).unwrap(),
            _ => continue,
        }
    }
}

async fn recv_event(ws: &mut ClientWs, event: &str) -> Value {
    loop {
        let value = recv_json(ws).await;
        if value["event"] == event {
            return value;
        }
    }
}

// =========================================================================
// HTTP API
// =========================================================================

#[tokio::test]
async fn test_health() {
    let server = start_server().await;
    let body: Value = reqwest::get(format!("{}/api/health", server.http))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_create_room_returns_summary() {
    let server = start_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/createroom", server.http))
        .json(&json!({"timeLimit": 5, "numQuestions": 12, "hostUsername": "alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"].as_str().unwrap().len(), 4);
    assert_eq!(body["host"], "alice");
    assert_eq!(body["timeLimit"], 5);
    assert_eq!(body["numQuestions"], 12);
    assert_eq!(body["players"], json!([]));
    assert_eq!(body["start"], false);
}

#[tokio::test]
async fn test_create_room_validation() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/createroom", server.http);

    for body in [
        json!({"timeLimit": 2, "numQuestions": 12, "hostUsername": "alice"}),
        json!({"timeLimit": 5, "numQuestions": 26, "hostUsername": "alice"}),
        json!({"timeLimit": 5, "numQuestions": 12, "hostUsername": "al"}),
        json!({"timeLimit": "five"}),
    ] {
        let resp = client.post(&url).json(&body).send().await.unwrap();
        assert_eq!(resp.status(), 400, "body {body} should be rejected");
        let err: Value = resp.json().await.unwrap();
        assert!(err["error"].is_string());
    }
}

#[tokio::test]
async fn test_room_limit_is_forbidden() {
    let server = start_server().await;
    for _ in 0..10 {
        create_room(&server, "alice").await;
    }
    let resp = reqwest::Client::new()
        .post(format!("{}/api/createroom", server.http))
        .json(&json!({"timeLimit": 5, "numQuestions": 12, "hostUsername": "alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_join_room_checks() {
    let server = start_server().await;
    let room = create_room(&server, "alice").await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/joinroom", server.http);

    let resp = client
        .post(&url)
        .json(&json!({"username": "bob1", "roomID": room}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let summary: Value = resp.json().await.unwrap();
    assert_eq!(summary["code"], room);

    let resp = client
        .post(&url)
        .json(&json!({"username": "bob1", "roomID": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(&url)
        .json(&json!({"username": "bo", "roomID": room}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Once alice is connected, her name is taken.
    let mut alice = join(&server, &room, "alice").await;
    recv_event(&mut alice, "playerJoined").await;
    let resp = client
        .post(&url)
        .json(&json!({"username": "ALICE", "roomID": room}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_get_room_and_admin_listing() {
    let server = start_server().await;

    let resp = reqwest::get(format!("{}/api/admin/rooms", server.http))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let room = create_room(&server, "alice").await;
    let mut alice = join(&server, &room, "alice").await;
    recv_event(&mut alice, "playerJoined").await;

    let summary: Value = reqwest::get(format!("{}/api/room/{room}", server.http))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["players"], json!([{"username": "alice", "score": 0}]));

    let listing: Value = reqwest::get(format!("{}/api/admin/rooms", server.http))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["rooms"][0]["code"], room);
    assert_eq!(listing["rooms"][0]["gameStarted"], false);

    let resp = reqwest::get(format!("{}/api/room/0000x", server.http))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// =========================================================================
// WebSocket game flow
// =========================================================================

#[tokio::test]
async fn test_full_game_flow() {
    let server = start_server().await;
    let room = create_room(&server, "alice").await;

    let mut alice = join(&server, &room, "alice").await;
    assert_eq!(recv_json(&mut alice).await["data"]["username"], "alice");
    let mut bob = join(&server, &room, "bob1").await;
    assert_eq!(recv_json(&mut bob).await["data"]["username"], "bob1");
    let mut carol = join(&server, &room, "carol").await;
    assert_eq!(recv_json(&mut carol).await["data"]["username"], "carol");

    // A case-insensitive duplicate is turned away.
    let mut imposter = join(&server, &room, "Alice").await;
    let rejection = recv_json(&mut imposter).await;
    assert_eq!(rejection["kind"], "UsernameTaken");

    send_event(&mut alice, "loadgame", Value::Null).await;
    for ws in [&mut alice, &mut bob, &mut carol] {
        for n in [3, 2, 1, 0] {
            let countdown = recv_event(ws, "countdown").await;
            assert_eq!(countdown["data"], n);
        }
        recv_event(ws, "gameStarted").await;
    }

    send_event(&mut bob, "getNewQuestion", json!({"index": 0})).await;
    let question = recv_event(&mut bob, "newQuestion").await;
    let answer = question["data"]["answer"].as_str().unwrap().to_string();
    assert_eq!(question["data"]["options"].as_array().unwrap().len(), 4);

    send_event(&mut bob, "validateAnswer", json!({"question": 0, "answer": answer})).await;
    let result = recv_event(&mut bob, "answerResult").await;
    assert_eq!(result["data"]["correct_answer"], result["data"]["chosen_answer"]);

    for ws in [&mut alice, &mut bob, &mut carol] {
        let update = recv_event(ws, "scoreUpdated").await;
        assert_eq!(update["data"]["username"], "bob1");
        assert_eq!(update["data"]["score"], 1);
    }
}

#[tokio::test]
async fn test_idle_socket_does_not_block_other_players() {
    let server = start_server().await;
    let room = create_room(&server, "alice").await;

    // Opens TCP but never sends the upgrade request.
    let addr = server.ws.trim_start_matches("ws://");
    let _idle = tokio::net::TcpStream::connect(addr).await.unwrap();

    let mut alice = join(&server, &room, "alice").await;
    let joined = recv_json(&mut alice).await;
    assert_eq!(joined["event"], "playerJoined");
    assert_eq!(joined["data"]["username"], "alice");
}

#[tokio::test]
async fn test_admission_to_missing_room() {
    let server = start_server().await;
    let mut ws = join(&server, "4242", "alice").await;
    let error = recv_json(&mut ws).await;
    assert_eq!(error["kind"], "RoomNotFound");
    assert!(error["error"].as_str().unwrap().contains("4242"));
}

#[tokio::test]
async fn test_last_player_leaving_deletes_room() {
    let server = start_server().await;
    let room = create_room(&server, "alice").await;

    let mut alice = join(&server, &room, "alice").await;
    recv_event(&mut alice, "playerJoined").await;
    let mut bob = join(&server, &room, "bob1").await;
    recv_event(&mut bob, "playerJoined").await;

    send_event(&mut bob, "leave", Value::Null).await;
    let left = recv_event(&mut alice, "playerLeft").await;
    assert_eq!(left["data"]["username"], "bob1");

    alice.close(None).await.unwrap();

    // The handler removes the room once it sees the close.
    let url = format!("{}/api/room/{room}", server.http);
    let mut gone = false;
    for _ in 0..50 {
        if reqwest::get(&url).await.unwrap().status() == 404 {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(gone, "room should be removed after the last player left");
}
