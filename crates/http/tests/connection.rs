//! Engine-level tests driving `HttpConnection` through a mock transport.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};

use aqueduct_http::app::{Application, RequestReceiver, ResponseSender, app_fn, factory_fn};
use aqueduct_http::connection::{ConnectionConfig, HttpConnection};
use aqueduct_http::protocol::{AppError, RequestMessage, Scope};
use aqueduct_http::transport::Transport;

const SIMPLE_GET: &[u8] = b"GET / HTTP/1.1\r\nHost: example.org\r\n\r\n";

const SIMPLE_POST: &[u8] = b"POST / HTTP/1.1\r\nHost: example.org\r\nContent-Type: application/json\r\nContent-Length: 18\r\n\r\n{\"hello\": \"world\"}";

const START_POST: &[u8] =
    b"POST / HTTP/1.1\r\nHost: example.org\r\nContent-Type: application/json\r\nContent-Length: 18\r\n\r\n";

const FINISH_POST: &[u8] = b"{\"hello\": \"world\"}";

const HTTP10_GET: &[u8] = b"GET / HTTP/1.0\r\nHost: example.org\r\n\r\n";

#[derive(Debug, Clone, Default)]
struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    buffer: Vec<u8>,
    closed: bool,
    read_paused: bool,
    tls: bool,
}

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }

    fn tls() -> Self {
        let transport = Self::default();
        transport.state.lock().unwrap().tls = true;
        transport
    }

    fn output(&self) -> String {
        String::from_utf8_lossy(&self.state.lock().unwrap().buffer).into_owned()
    }

    fn raw_output(&self) -> Vec<u8> {
        self.state.lock().unwrap().buffer.clone()
    }

    fn clear_output(&self) {
        self.state.lock().unwrap().buffer.clear();
    }

    fn closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn read_paused(&self) -> bool {
        self.state.lock().unwrap().read_paused
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        assert!(!state.closed, "write after close");
        state.buffer.extend_from_slice(data);
    }

    fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        assert!(!state.closed, "double close");
        state.closed = true;
    }

    fn is_closing(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn pause_reading(&mut self) {
        self.state.lock().unwrap().read_paused = true;
    }

    fn resume_reading(&mut self) {
        self.state.lock().unwrap().read_paused = false;
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some("127.0.0.1:8001".parse().unwrap())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some("127.0.0.1:8000".parse().unwrap())
    }

    fn is_tls(&self) -> bool {
        self.state.lock().unwrap().tls
    }
}

fn connect<A>(app: A) -> (HttpConnection<A>, MockTransport)
where
    A: Application + Send + Sync + 'static,
{
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let transport = MockTransport::new();
    let connection = HttpConnection::new(app, transport.clone(), ConnectionConfig::new());
    (connection, transport)
}

/// Lets spawned application tasks run to quiescence on the current-thread
/// runtime.
async fn run_tasks() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

async fn respond_hello(sender: &mut ResponseSender) -> Result<(), AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("12"));
    sender.send_start(StatusCode::OK, headers).await?;
    sender.send_body(Bytes::from_static(b"Hello, world"), false).await?;
    Ok(())
}

fn hello_app() -> impl Application + Send + Sync + 'static {
    app_fn(|_scope, _receiver, mut sender: ResponseSender| async move {
        respond_hello(&mut sender).await
    })
}

fn echo_app() -> impl Application + Send + Sync + 'static {
    app_fn(|_scope, mut receiver: RequestReceiver, mut sender: ResponseSender| async move {
        let mut body = Vec::new();
        loop {
            match receiver.recv().await {
                RequestMessage::Body { data, more } => {
                    body.extend_from_slice(&data);
                    if !more {
                        break;
                    }
                }
                RequestMessage::Disconnect => return Ok(()),
            }
        }
        let mut payload = b"Body: ".to_vec();
        payload.extend_from_slice(&body);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_str(&payload.len().to_string()).unwrap());
        sender.send_start(StatusCode::OK, headers).await?;
        sender.send_body(Bytes::from(payload), false).await?;
        Ok(())
    })
}

#[tokio::test]
async fn simple_get() {
    let (connection, transport) = connect(hello_app());

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    let output = transport.output();
    assert!(output.starts_with("HTTP/1.1 200 OK\r\n"), "unexpected output: {output}");
    assert!(output.contains("content-length: 12\r\n"));
    assert!(output.contains("server: aqueduct\r\n"));
    assert!(output.contains("date: "));
    assert!(output.ends_with("Hello, world"));
    assert!(!transport.closed());
}

#[tokio::test]
async fn post_echo() {
    let (connection, transport) = connect(echo_app());

    connection.data_received(SIMPLE_POST);
    run_tasks().await;

    let output = transport.output();
    assert!(output.contains("HTTP/1.1 200 OK"));
    assert!(output.contains("Body: {\"hello\": \"world\"}"));
    assert!(!transport.closed());
}

#[tokio::test]
async fn chunked_request_body() {
    let (connection, transport) = connect(echo_app());

    connection.data_received(b"POST / HTTP/1.1\r\nHost: example.org\r\nTransfer-Encoding: chunked\r\n\r\n");
    connection.data_received(b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n");
    run_tasks().await;

    assert!(transport.output().contains("Body: Wikipedia"));
    assert!(!transport.closed());
}

#[tokio::test]
async fn keepalive_retained_on_204() {
    let app = app_fn(|_scope, _receiver, mut sender: ResponseSender| async move {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        sender.send_start(StatusCode::NO_CONTENT, headers).await?;
        sender.send_body(Bytes::new(), false).await?;
        Ok(())
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    assert!(transport.output().contains("HTTP/1.1 204 No Content"));
    assert!(!transport.closed());
}

#[tokio::test]
async fn connection_close_header_closes() {
    let app = app_fn(|_scope, _receiver, mut sender: ResponseSender| async move {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        sender.send_start(StatusCode::NO_CONTENT, headers).await?;
        sender.send_body(Bytes::new(), false).await?;
        Ok(())
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    assert!(transport.output().contains("HTTP/1.1 204 No Content"));
    assert!(transport.closed());
}

#[tokio::test]
async fn chunked_response() {
    let app = app_fn(|_scope, _receiver, mut sender: ResponseSender| async move {
        let mut headers = HeaderMap::new();
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        sender.send_start(StatusCode::OK, headers).await?;
        sender.send_body(Bytes::from_static(b"Hello, world!"), false).await?;
        Ok(())
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    let raw = transport.raw_output();
    assert!(transport.output().contains("HTTP/1.1 200 OK"));
    assert!(raw.ends_with(b"0\r\n\r\n"));
    assert!(!transport.closed());
}

#[tokio::test]
async fn response_without_length_is_chunked_for_http11() {
    let app = app_fn(|_scope, _receiver, mut sender: ResponseSender| async move {
        sender.send_start(StatusCode::OK, HeaderMap::new()).await?;
        sender.send_body(Bytes::from_static(b"streamed"), true).await?;
        sender.send_body(Bytes::new(), false).await?;
        Ok(())
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    let output = transport.output();
    assert!(output.contains("transfer-encoding: chunked\r\n"));
    assert!(output.ends_with("8\r\nstreamed\r\n0\r\n\r\n"));
    assert!(!transport.closed());
}

#[tokio::test]
async fn pipelined_requests_answered_in_order() {
    let (connection, transport) = connect(hello_app());

    connection.data_received(SIMPLE_GET);
    connection.data_received(SIMPLE_GET);
    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    let output = transport.output();
    assert_eq!(output.matches("HTTP/1.1 200 OK").count(), 3);
    assert_eq!(output.matches("Hello, world").count(), 3);
    assert!(!transport.closed());
}

#[tokio::test]
async fn pipelined_output_waits_for_the_head_cycle() {
    let gate = Arc::new(tokio::sync::Notify::new());
    let app_gate = Arc::clone(&gate);
    let app = app_fn(move |scope: Scope, _receiver, mut sender: ResponseSender| {
        let gate = Arc::clone(&app_gate);
        async move {
            if scope.path() == "/slow" {
                gate.notified().await;
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_LENGTH, HeaderValue::from_static("4"));
                sender.send_start(StatusCode::OK, headers).await?;
                sender.send_body(Bytes::from_static(b"slow"), false).await?;
            } else {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_LENGTH, HeaderValue::from_static("4"));
                sender.send_start(StatusCode::OK, headers).await?;
                sender.send_body(Bytes::from_static(b"fast"), false).await?;
            }
            Ok(())
        }
    });
    let (connection, transport) = connect(app);

    connection.data_received(b"GET /slow HTTP/1.1\r\nHost: example.org\r\n\r\n");
    connection.data_received(b"GET /fast HTTP/1.1\r\nHost: example.org\r\n\r\n");
    run_tasks().await;

    // the fast response is ready but buffered behind the slow head cycle
    assert_eq!(transport.output(), "");

    gate.notify_one();
    run_tasks().await;

    let output = transport.output();
    let slow_at = output.find("slow").expect("slow response missing");
    let fast_at = output.find("fast").expect("fast response missing");
    assert!(slow_at < fast_at);
    assert!(!transport.closed());
}

#[tokio::test]
async fn undersized_response_closes_connection() {
    let app = app_fn(|_scope, _receiver, mut sender: ResponseSender| async move {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("10"));
        sender.send_start(StatusCode::OK, headers).await?;
        let _ = sender.send_body(Bytes::from_static(b"xxx"), false).await;
        Ok(())
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    assert!(transport.closed());
}

#[tokio::test]
async fn oversized_response_closes_connection() {
    let app = app_fn(|_scope, _receiver, mut sender: ResponseSender| async move {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("10"));
        sender.send_start(StatusCode::OK, headers).await?;
        let _ = sender.send_body(Bytes::from(vec![b'x'; 60]), false).await;
        Ok(())
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    assert!(transport.closed());
}

#[tokio::test]
async fn large_body_engages_read_backpressure() {
    let (connection, transport) = connect(hello_app());

    let mut request = Vec::new();
    request.extend_from_slice(b"POST / HTTP/1.1\r\nHost: example.org\r\nContent-Length: 100000\r\n\r\n");
    request.extend_from_slice(&vec![b'x'; 100_000]);
    connection.data_received(&request);

    // pause is observable before the application task ever runs
    assert!(transport.read_paused());

    run_tasks().await;
    assert!(!transport.read_paused());
}

#[tokio::test]
async fn invalid_http_rejected_without_application() {
    let invoked = Arc::new(AtomicBool::new(false));
    let app_invoked = Arc::clone(&invoked);
    let app = app_fn(move |_scope, _receiver, _sender| {
        let invoked = Arc::clone(&app_invoked);
        async move {
            invoked.store(true, Ordering::SeqCst);
            Ok(())
        }
    });
    let (connection, transport) = connect(app);

    connection.data_received(&vec![b'x'; 100_000]);
    run_tasks().await;

    assert!(transport.closed());
    assert!(transport.output().contains("HTTP/1.1 400 Bad Request"));
    assert!(!invoked.load(Ordering::SeqCst));
}

#[tokio::test]
async fn app_error_before_start_yields_500() {
    let app = app_fn(|_scope, _receiver, _sender| async move { Err(AppError::from("handler failed")) });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    assert!(transport.output().contains("HTTP/1.1 500 Internal Server Error"));
    assert!(transport.closed());
}

#[tokio::test]
async fn app_error_after_start_closes_without_500() {
    let app = app_fn(|_scope, _receiver, mut sender: ResponseSender| async move {
        sender.send_start(StatusCode::OK, HeaderMap::new()).await?;
        sender.send_body(Bytes::from_static(b"1"), true).await?;
        Err(AppError::from("handler failed late"))
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    let output = transport.output();
    assert!(output.contains("HTTP/1.1 200 OK"));
    assert!(!output.contains("500 Internal Server Error"));
    assert!(transport.closed());
}

#[tokio::test]
async fn factory_error_yields_500() {
    let app = factory_fn(|scope: Scope| {
        if scope.path() == "/boom" {
            return Err(AppError::from("constructor failed"));
        }
        Ok(|_receiver: RequestReceiver, mut sender: ResponseSender| async move {
            respond_hello(&mut sender).await
        })
    });
    let (connection, transport) = connect(app);

    connection.data_received(b"GET /boom HTTP/1.1\r\nHost: example.org\r\n\r\n");
    run_tasks().await;

    assert!(transport.output().contains("HTTP/1.1 500 Internal Server Error"));
    assert!(transport.closed());
}

#[tokio::test]
async fn no_response_yields_500() {
    let app = app_fn(|_scope, _receiver, _sender| async move { Ok(()) });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    assert!(transport.output().contains("HTTP/1.1 500 Internal Server Error"));
    assert!(transport.closed());
}

#[tokio::test]
async fn partial_response_closes_without_500() {
    let app = app_fn(|_scope, _receiver, mut sender: ResponseSender| async move {
        sender.send_start(StatusCode::OK, HeaderMap::new()).await?;
        Ok(())
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    let output = transport.output();
    assert!(!output.contains("500 Internal Server Error"));
    assert!(transport.closed());
}

#[tokio::test]
async fn duplicate_start_closes_without_500() {
    let app = app_fn(|_scope, _receiver, mut sender: ResponseSender| async move {
        sender.send_start(StatusCode::OK, HeaderMap::new()).await?;
        let _ = sender.send_start(StatusCode::OK, HeaderMap::new()).await;
        Ok(())
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    let output = transport.output();
    assert!(output.contains("HTTP/1.1 200 OK"));
    assert!(!output.contains("500 Internal Server Error"));
    assert!(transport.closed());
}

#[tokio::test]
async fn body_before_start_yields_500() {
    let app = app_fn(|_scope, _receiver, mut sender: ResponseSender| async move {
        let _ = sender.send_body(Bytes::new(), false).await;
        Ok(())
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    assert!(transport.output().contains("HTTP/1.1 500 Internal Server Error"));
    assert!(transport.closed());
}

#[tokio::test]
async fn message_after_completion_closes() {
    let app = app_fn(|_scope, _receiver, mut sender: ResponseSender| async move {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        sender.send_start(StatusCode::OK, headers).await?;
        sender.send_body(Bytes::new(), false).await?;
        let _ = sender.send_body(Bytes::new(), false).await;
        Ok(())
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_GET);
    run_tasks().await;

    assert!(transport.output().contains("HTTP/1.1 200 OK"));
    assert!(transport.closed());
}

#[tokio::test]
async fn early_disconnect_delivers_sentinel() {
    let got_disconnect = Arc::new(AtomicBool::new(false));
    let app_flag = Arc::clone(&got_disconnect);
    let app = app_fn(move |_scope, mut receiver: RequestReceiver, _sender| {
        let flag = Arc::clone(&app_flag);
        async move {
            loop {
                if receiver.recv().await.is_disconnect() {
                    flag.store(true, Ordering::SeqCst);
                    return Ok(());
                }
            }
        }
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_POST);
    connection.eof_received();
    connection.connection_lost(None);
    run_tasks().await;

    assert!(got_disconnect.load(Ordering::SeqCst));
    let _ = transport;
}

#[tokio::test]
async fn half_close_mid_body_interrupts_receive() {
    let got_disconnect = Arc::new(AtomicBool::new(false));
    let app_flag = Arc::clone(&got_disconnect);
    let app = app_fn(move |_scope, mut receiver: RequestReceiver, _sender| {
        let flag = Arc::clone(&app_flag);
        async move {
            loop {
                if receiver.recv().await.is_disconnect() {
                    flag.store(true, Ordering::SeqCst);
                    return Ok(());
                }
            }
        }
    });
    let (connection, _transport) = connect(app);

    // head promises 18 body bytes; only the head arrives before eof
    connection.data_received(START_POST);
    connection.eof_received();
    run_tasks().await;

    assert!(got_disconnect.load(Ordering::SeqCst));
}

#[tokio::test]
async fn early_response_keeps_connection_usable() {
    let (connection, transport) = connect(hello_app());

    connection.data_received(START_POST);
    run_tasks().await;
    assert!(transport.output().contains("HTTP/1.1 200 OK"));

    // the rest of the request body arrives after the response finished
    connection.data_received(FINISH_POST);
    run_tasks().await;
    assert!(!transport.closed());

    // and the connection still serves the next pipelined request
    transport.clear_output();
    connection.data_received(SIMPLE_GET);
    run_tasks().await;
    assert!(transport.output().contains("Hello, world"));
}

#[tokio::test]
async fn receive_after_response_yields_disconnect() {
    let got_disconnect = Arc::new(AtomicBool::new(false));
    let app_flag = Arc::clone(&got_disconnect);
    let app = app_fn(move |_scope, mut receiver: RequestReceiver, mut sender: ResponseSender| {
        let flag = Arc::clone(&app_flag);
        async move {
            respond_hello(&mut sender).await?;
            if receiver.recv().await.is_disconnect() {
                flag.store(true, Ordering::SeqCst);
            }
            Ok(())
        }
    });
    let (connection, transport) = connect(app);

    connection.data_received(SIMPLE_POST);
    run_tasks().await;

    assert!(transport.output().contains("HTTP/1.1 200 OK"));
    assert!(got_disconnect.load(Ordering::SeqCst));
    assert!(!transport.closed());
}

#[tokio::test]
async fn http10_version_reaches_scope_and_closes() {
    let app = app_fn(|scope: Scope, _receiver, mut sender: ResponseSender| async move {
        let payload = format!("Version: {}", scope.http_version());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_str(&payload.len().to_string()).unwrap());
        sender.send_start(StatusCode::OK, headers).await?;
        sender.send_body(Bytes::from(payload), false).await?;
        Ok(())
    });
    let (connection, transport) = connect(app);

    connection.data_received(HTTP10_GET);
    run_tasks().await;

    let output = transport.output();
    assert!(output.contains("HTTP/1.1 200 OK"));
    assert!(output.contains("Version: 1.0"));
    assert!(output.contains("connection: close\r\n"));
    assert!(transport.closed());
}

#[tokio::test]
async fn http10_keepalive_is_honored_with_content_length() {
    let (connection, transport) = connect(hello_app());

    connection.data_received(b"GET / HTTP/1.0\r\nHost: example.org\r\nConnection: keep-alive\r\n\r\n");
    run_tasks().await;

    let output = transport.output();
    assert!(output.contains("HTTP/1.1 200 OK"));
    assert!(output.contains("connection: keep-alive\r\n"));
    assert!(!transport.closed());
}

#[tokio::test]
async fn head_request_suppresses_body_bytes() {
    let (connection, transport) = connect(hello_app());

    connection.data_received(b"HEAD / HTTP/1.1\r\nHost: example.org\r\n\r\n");
    run_tasks().await;

    let output = transport.output();
    assert!(output.contains("HTTP/1.1 200 OK"));
    assert!(output.contains("content-length: 12\r\n"));
    assert!(!output.contains("Hello, world"));
    assert!(!transport.closed());
}

#[tokio::test]
async fn expect_continue_gets_interim_response() {
    let (connection, transport) = connect(echo_app());

    connection.data_received(
        b"POST / HTTP/1.1\r\nHost: example.org\r\nExpect: 100-continue\r\nContent-Length: 18\r\n\r\n",
    );
    assert!(transport.output().starts_with("HTTP/1.1 100 Continue\r\n\r\n"));

    connection.data_received(FINISH_POST);
    run_tasks().await;

    assert!(transport.output().contains("Body: {\"hello\": \"world\"}"));
    assert!(!transport.closed());
}

#[tokio::test]
async fn write_pause_suspends_the_head_sender() {
    let (connection, transport) = connect(hello_app());

    connection.pause_writing();
    connection.data_received(SIMPLE_GET);
    run_tasks().await;
    assert_eq!(transport.output(), "");

    connection.resume_writing();
    run_tasks().await;
    assert!(transport.output().contains("Hello, world"));
    assert!(!transport.closed());
}

#[tokio::test]
async fn scope_describes_the_request() {
    let captured: Arc<Mutex<Option<(String, String, String, Option<SocketAddr>)>>> =
        Arc::new(Mutex::new(None));
    let app_captured = Arc::clone(&captured);
    let app = app_fn(move |scope: Scope, _receiver, mut sender: ResponseSender| {
        let captured = Arc::clone(&app_captured);
        async move {
            *captured.lock().unwrap() = Some((
                scope.method().to_string(),
                scope.scheme().as_str().to_string(),
                String::from_utf8_lossy(scope.query_string()).into_owned(),
                scope.client(),
            ));
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
            sender.send_start(StatusCode::OK, headers).await?;
            sender.send_body(Bytes::new(), false).await?;
            Ok(())
        }
    });

    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let transport = MockTransport::tls();
    let connection = HttpConnection::new(app, transport.clone(), ConnectionConfig::new());

    connection.data_received(b"GET /where?q=now HTTP/1.1\r\nHost: example.org\r\n\r\n");
    run_tasks().await;

    let captured = captured.lock().unwrap().take().expect("scope not captured");
    assert_eq!(captured.0, "GET");
    assert_eq!(captured.1, "https");
    assert_eq!(captured.2, "q=now");
    assert_eq!(captured.3, Some("127.0.0.1:8001".parse().unwrap()));
    assert!(transport.output().contains("HTTP/1.1 200 OK"));
}

#[tokio::test]
async fn bytes_after_parse_failure_are_discarded() {
    let (connection, transport) = connect(hello_app());

    connection.data_received(&vec![b'x'; 100_000]);
    run_tasks().await;
    assert!(transport.closed());
    let output_after_failure = transport.output();

    connection.data_received(SIMPLE_GET);
    run_tasks().await;
    assert_eq!(transport.output(), output_after_failure);
}
