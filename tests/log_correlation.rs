//! Connection and request identifiers as seen in log output.

use std::collections::HashSet;
use std::sync::OnceLock;

mod common;

use common::Capture;

fn captured_logs() -> &'static Capture {
    static CAPTURE: OnceLock<Capture> = OnceLock::new();
    CAPTURE.get_or_init(|| {
        let capture = Capture::default();
        tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .init();
        capture
    })
}

/// `(conn_id, request_id)` of every "handling" line for `path`.
fn handled(path: &str) -> Vec<(u64, u64)> {
    let text = captured_logs().contents();
    let marker = format!("path={path}");

    text.lines()
        .filter(|line| line.contains("handling") && line.split_whitespace().any(|w| w == marker))
        .map(|line| (field(line, "conn_id="), field(line, "request_id=")))
        .collect()
}

fn field(line: &str, key: &str) -> u64 {
    let start = line.find(key).expect("field present") + key.len();
    line[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap()
}

#[tokio::test]
async fn test_concurrent_connections_get_distinct_ids() {
    captured_logs();
    let server = common::start_server(|_| {}).await;

    let clients: Vec<_> = (0..10)
        .map(|_| {
            let addr = server.addr;
            tokio::spawn(async move {
                let mut stream = common::send_get(addr, "/ids-concurrent").await;
                common::read_response(&mut stream).await.status()
            })
        })
        .collect();
    for client in clients {
        assert_eq!(client.await.unwrap(), 200);
    }

    let lines = handled("/ids-concurrent");
    assert_eq!(lines.len(), 10);
    let conn_ids: HashSet<u64> = lines.iter().map(|(conn, _)| *conn).collect();
    let request_ids: HashSet<u64> = lines.iter().map(|(_, req)| *req).collect();
    assert_eq!(conn_ids.len(), 10);
    assert_eq!(request_ids.len(), 10);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_request_ids_increase_on_one_connection() {
    captured_logs();
    let server = common::start_server(|_| {}).await;

    let mut stream = tokio::net::TcpStream::connect(server.addr).await.unwrap();
    for _ in 0..3 {
        common::write_get(&mut stream, server.addr, "/ids-sequential").await;
        assert_eq!(common::read_response(&mut stream).await.status(), 200);
    }

    let lines = handled("/ids-sequential");
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|(conn, _)| *conn == lines[0].0));
    assert!(lines.windows(2).all(|pair| pair[0].1 < pair[1].1));

    server.shutdown.trigger();
}
