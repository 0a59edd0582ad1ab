//! End-to-end dispatch against a local HTTP endpoint.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncReadExt;
use tokio::sync::oneshot;

use common::{serve_once, write_head, write_status, write_stream};
use switchyard_models::auth::{CredentialBundle, ProviderSettings};
use switchyard_models::providers::{FinishReason, Message, Usage, builtin};
use switchyard_models::{
    DispatchRequest, Dispatcher, Error, ErrorKind, ModelRegistry, StreamEvent,
};

fn dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(ModelRegistry::with_builtin_providers()))
        .with_system_prompt("Be brief.")
}

fn bundle_for(provider: &str, addr: std::net::SocketAddr, prefix: &str) -> CredentialBundle {
    CredentialBundle::new()
        .with_api_key(provider, "sk-test")
        .with_settings(provider, ProviderSettings::base_url(format!("http://{addr}{prefix}")))
}

async fn collect(stream: switchyard_models::EventStream) -> Vec<StreamEvent> {
    tokio::time::timeout(Duration::from_secs(5), stream.collect())
        .await
        .expect("stream should finish")
}

fn text(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::TextDelta(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn openai_stream_end_to_end() {
    let (addr, server) = serve_once(|stream| async move {
        write_stream(
            stream,
            "text/event-stream",
            &[
                "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hel",
                "lo\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\" World\"}}]}\r\n\r\n",
                "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
                "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":10,\"completion_tokens\":5}}\n\n",
                "data: [DONE]\n\n",
            ],
        )
        .await;
    })
    .await;

    let request = DispatchRequest::new("OpenAI", "gpt-4o", vec![Message::user("Hello")])
        .max_tokens(1_000_000)
        .header("x-request-id", "abc-123");
    let stream = dispatcher()
        .dispatch(request, &bundle_for("OpenAI", addr, "/v1/"))
        .await
        .unwrap();
    let events = collect(stream).await;

    assert_eq!(text(&events), "Hello World");
    assert_eq!(events.len(), 3);
    assert!(matches!(
        events.last(),
        Some(StreamEvent::Finish { reason: FinishReason::Stop, usage })
            if *usage == Usage::new(10, 5)
    ));

    let captured = server.await.unwrap();
    assert_eq!(captured.request_line, "POST /v1/chat/completions HTTP/1.1");
    assert_eq!(captured.header("authorization"), Some("Bearer sk-test"));
    assert_eq!(captured.header("x-request-id"), Some("abc-123"));

    let body = captured.json();
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["stream"], true);
    assert_eq!(body["stream_options"]["include_usage"], true);
    assert_eq!(body["max_tokens"], 16_384);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "Be brief.");
    assert_eq!(body["messages"][1]["content"], "Hello");
}

#[tokio::test]
async fn claude_code_stream_end_to_end() {
    let (addr, server) = serve_once(|stream| async move {
        write_stream(
            stream,
            "text/event-stream",
            &[
                "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"usage\":{\"input_tokens\":7}}}\n\n",
                "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
                "event: message_delta\ndata: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":2}}\n\n",
                "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
            ],
        )
        .await;
    })
    .await;

    let request = DispatchRequest::new(
        "Claude Code",
        "claude-sonnet-4-20250514",
        vec![Message::user("Hello")],
    );
    let stream = dispatcher()
        .dispatch(request, &bundle_for("Claude Code", addr, "/v1"))
        .await
        .unwrap();
    let events = collect(stream).await;

    assert_eq!(text(&events), "Hi");
    assert!(matches!(
        events.last(),
        Some(StreamEvent::Finish { usage, .. }) if *usage == Usage::new(7, 2)
    ));

    let captured = server.await.unwrap();
    assert_eq!(captured.request_line, "POST /v1/messages HTTP/1.1");
    assert_eq!(captured.header("x-api-key"), Some("sk-test"));
    assert_eq!(captured.header("anthropic-version"), Some("2023-06-01"));
    assert_eq!(captured.header("anthropic-beta"), Some("output-128k-2025-02-19"));
    assert!(captured.header("authorization").is_none());

    let body = captured.json();
    assert_eq!(body["system"], "Be brief.");
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn ollama_stream_without_key() {
    let (addr, server) = serve_once(|stream| async move {
        write_stream(
            stream,
            "application/x-ndjson",
            &[
                "{\"message\":{\"role\":\"assistant\",\"content\":\"Hey\"},\"done\":false}\n",
                "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"done_reason\":\"stop\",\"prompt_eval_count\":3,\"eval_count\":1}",
            ],
        )
        .await;
    })
    .await;

    let bundle =
        CredentialBundle::new().with_env([("OLLAMA_API_BASE_URL", format!("http://{addr}"))]);
    let stream = dispatcher()
        .dispatch(DispatchRequest::new("Ollama", "llama3", vec![Message::user("Hi")]), &bundle)
        .await
        .unwrap();
    let events = collect(stream).await;

    assert_eq!(text(&events), "Hey");
    assert!(matches!(events.last(), Some(StreamEvent::Finish { .. })));

    let captured = server.await.unwrap();
    assert_eq!(captured.request_line, "POST /api/chat HTTP/1.1");
    assert!(captured.header("authorization").is_none());
    assert_eq!(captured.json()["model"], "llama3");
}

#[tokio::test]
async fn error_status_rejects_dispatch() {
    let (addr, _server) = serve_once(|stream| async move {
        write_status(
            stream,
            "429 Too Many Requests",
            r#"{"error":{"message":"rate limited"}}"#,
        )
        .await;
    })
    .await;

    let result = dispatcher()
        .dispatch(
            DispatchRequest::new("Groq", "llama-3.1-8b-instant", vec![Message::user("Hi")]),
            &bundle_for("Groq", addr, ""),
        )
        .await;

    match result {
        Err(Error::UpstreamStatus { status, body }) => {
            assert_eq!(status, 429);
            assert!(body.contains("rate limited"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("dispatch should fail"),
    }
}

#[tokio::test]
async fn truncated_body_ends_with_protocol_error() {
    let (addr, _server) = serve_once(|stream| async move {
        write_stream(
            stream,
            "text/event-stream",
            &["data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n"],
        )
        .await;
    })
    .await;

    let stream = dispatcher()
        .dispatch(
            DispatchRequest::new("Mistral", "mistral-small-latest", vec![Message::user("Hi")]),
            &bundle_for("Mistral", addr, ""),
        )
        .await
        .unwrap();
    let events = collect(stream).await;

    assert_eq!(events.len(), 2);
    assert_eq!(text(&events), "par");
    match &events[1] {
        StreamEvent::Error(error) => assert_eq!(error.kind(), ErrorKind::UpstreamProtocol),
        other => panic!("expected terminal error, got {other:?}"),
    }
}

#[tokio::test]
async fn dropping_stream_releases_connection() {
    let (closed_tx, closed_rx) = oneshot::channel();
    let (addr, _server) = serve_once(|mut stream| async move {
        write_head(&mut stream, "text/event-stream").await;
        tokio::io::AsyncWriteExt::write_all(
            &mut stream,
            b"data: {\"choices\":[{\"delta\":{\"content\":\"first\"}}]}\n\n",
        )
        .await
        .unwrap();

        // Keep the response open until the client goes away.
        let mut buf = [0_u8; 64];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
        let _ = closed_tx.send(());
    })
    .await;

    let mut stream = dispatcher()
        .dispatch(
            DispatchRequest::new("Deepseek", "deepseek-chat", vec![Message::user("Hi")]),
            &bundle_for("Deepseek", addr, ""),
        )
        .await
        .unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap();
    assert!(matches!(first, Some(StreamEvent::TextDelta(t)) if t == "first"));

    drop(stream);
    tokio::time::timeout(Duration::from_secs(5), closed_rx)
        .await
        .expect("connection should close after the stream is dropped")
        .unwrap();
}

#[tokio::test]
async fn unregistered_provider_never_connects() {
    let result = dispatcher()
        .dispatch(
            DispatchRequest::new("Nobody", "x", vec![Message::user("Hi")]),
            &CredentialBundle::new(),
        )
        .await;
    assert!(matches!(result, Err(Error::ProviderNotFound(_))));
}
