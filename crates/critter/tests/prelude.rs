//! End-to-end smoke test through the facade.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;

use critter::prelude::*;

#[test]
fn test_configured_server_serves_http_and_websocket() {
    let config = ConfigLoader::new()
        .with_string(
            r#"
                [server]
                http_addr = "127.0.0.1:0"
                worker_threads = 2
                server_name = "facade-test"
            "#,
            "toml",
        )
        .unwrap()
        .load()
        .unwrap();

    let server = WebServer::new(config.server_config()).unwrap();
    server
        .register_http_route(Method::GET, "/greet/(?P<name>[a-z]+)", |req: Request| async move {
            let name = req.captures().and_then(|c| c.name("name")).unwrap_or("-").to_string();
            Ok::<_, HandlerError>(format!("hi {name}"))
        })
        .unwrap();
    server
        .register_ws_route("/ws", |mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.recv().await {
                let _ = ws.send_text(text.to_uppercase()).await;
            }
        })
        .unwrap();
    server.start(0).unwrap();
    let addr = server.local_addr();

    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .write_all(b"GET /greet/ada HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .unwrap();
    let mut reader = BufReader::new(stream);
    let mut status = String::new();
    reader.read_line(&mut status).unwrap();
    assert!(status.starts_with("HTTP/1.1 200"));
    let mut rest = String::new();
    reader.read_to_string(&mut rest).unwrap();
    assert!(rest.to_ascii_lowercase().contains("server: facade-test"));
    assert!(rest.ends_with("hi ada"));

    let (mut socket, _) = tungstenite::connect(format!("ws://{addr}/ws")).unwrap();
    socket.send(tungstenite::Message::text("quiet")).unwrap();
    assert_eq!(socket.read().unwrap().to_text().unwrap(), "QUIET");

    server.stop();
    assert!(!server.is_running());
}
