use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use assetdag::server::{
    inject_script, BroadcastReloader, DevServer, ReloadEvent, ReloadSink, CSS_EVENT,
    RELOAD_EVENT, RELOAD_PATH, RELOAD_SCRIPT,
};
use assetdag_test_utils::{init_tracing, with_timeout};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn start(root: &Path, reloader: BroadcastReloader) -> SocketAddr {
    let server = DevServer::bind("127.0.0.1", 0, root, reloader).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    addr
}

async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn html_pages_carry_the_reload_client() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("index.html"),
        "<html><body><h1>Hi</h1></body></html>",
    )
    .unwrap();

    let addr = start(dir.path(), BroadcastReloader::default()).await;
    let response = with_timeout(get(addr, "/index.html")).await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(RELOAD_PATH));
    let body_start = response.find("<html>").unwrap();
    let body = &response[body_start..];
    assert!(body.ends_with("</body></html>"), "{body}");
    assert!(body.contains("<h1>Hi</h1><script>"));
}

#[tokio::test]
async fn other_files_are_served_untouched() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("css")).unwrap();
    std::fs::write(dir.path().join("css/style.css"), "body{color:red}").unwrap();

    let addr = start(dir.path(), BroadcastReloader::default()).await;

    let response = with_timeout(get(addr, "/css/style.css")).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("body{color:red}"));
    assert!(!response.contains(RELOAD_PATH));

    let missing = with_timeout(get(addr, "/nope.html")).await;
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");
}

/// Keep notifying `event` until `needle` shows up on the SSE stream.
async fn notify_until_seen(
    stream: &mut TcpStream,
    reloader: &BroadcastReloader,
    event: ReloadEvent,
    needle: &str,
) -> String {
    let reloader = reloader.clone();
    let notifier = tokio::spawn(async move {
        loop {
            reloader.notify_reload(event.clone());
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    let received = with_timeout(async {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "stream closed early");
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).into_owned();
            if text.contains(needle) {
                return text;
            }
        }
    })
    .await;
    notifier.abort();
    received
}

#[tokio::test]
async fn reload_events_reach_connected_clients() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let reloader = BroadcastReloader::default();
    let addr = start(dir.path(), reloader.clone()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {RELOAD_PATH} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let root = dir.path().to_path_buf();
    let styles = ReloadEvent {
        stage: "styles".into(),
        paths: vec![root.join("css/style.css"), root.join("css/style.min.css")],
    };
    let received = notify_until_seen(
        &mut stream,
        &reloader,
        styles,
        "data: /css/style.min.css",
    )
    .await;
    assert!(received.contains("text/event-stream"), "{received}");
    assert!(received.contains("event: css"), "{received}");
    assert!(!received.contains("event: reload"), "{received}");

    let markup = ReloadEvent {
        stage: "markup".into(),
        paths: vec![root.join("index.html")],
    };
    let received = notify_until_seen(&mut stream, &reloader, markup, "data: /index.html").await;
    assert!(received.contains("event: reload"), "{received}");
}

#[test]
fn script_goes_before_the_last_body_close() {
    let html = "<body><pre></body></pre></BODY>";
    let out = inject_script(html);
    assert_eq!(out, format!("<body><pre></body></pre>{RELOAD_SCRIPT}</BODY>"));

    let fragment = "<p>partial</p>";
    assert_eq!(inject_script(fragment), format!("{fragment}{RELOAD_SCRIPT}"));
}

#[test]
fn reload_messages_are_url_paths() {
    let root = PathBuf::from("/site/dist");
    let event = ReloadEvent {
        stage: "styles".into(),
        paths: vec![root.join("css/style.css"), root.join("css/style.min.css")],
    };
    assert_eq!(event.to_message(&root), "/css/style.css\n/css/style.min.css");
    assert_eq!(event.event_name(), CSS_EVENT);

    let fonts = ReloadEvent {
        stage: "otf2ttf".into(),
        paths: vec![PathBuf::from("/site/src/fonts/a.ttf")],
    };
    assert_eq!(fonts.to_message(&root), "*");
    assert_eq!(fonts.event_name(), RELOAD_EVENT);

    let empty = ReloadEvent {
        stage: "images".into(),
        paths: vec![],
    };
    assert_eq!(empty.event_name(), RELOAD_EVENT);
}
