//! Context propagation and parent/child linkage around requests.

use std::sync::Arc;

use tracewire::{Context, InMemoryExporter, RequestHandler, Tracer, TracerOptions};

fn tracer_with_exporter() -> (Tracer, Arc<InMemoryExporter>) {
    let exporter = Arc::new(InMemoryExporter::new());
    let tracer = Tracer::new(TracerOptions::default(), exporter.clone())
        .expect("default options are valid");
    (tracer, exporter)
}

fn get(uri: &str) -> http::Request<()> {
    http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(())
        .expect("valid request")
}

#[test]
fn test_nested_request_parents_on_ambient_span() {
    let (tracer, exporter) = tracer_with_exporter();

    let mut outer = RequestHandler::start(&tracer, get("/outer"));
    let outer_context = outer.span().context();
    let scope = outer.activate();

    let inner = RequestHandler::start(&tracer, get("/inner"));
    assert_eq!(
        inner.span().parent().map(|p| p.span_id),
        Some(outer_context.span_id)
    );
    assert_eq!(inner.span().context().trace_id, outer_context.trace_id);
    drop(inner);

    scope.close();
    outer.finish();

    let finished = exporter.finished();
    assert_eq!(finished.len(), 2);
    let inner_record = finished
        .iter()
        .find(|span| span.name == "/inner")
        .expect("inner span exported");
    assert_eq!(inner_record.parent_span_id, Some(outer_context.span_id));
    let outer_record = finished
        .iter()
        .find(|span| span.name == "/outer")
        .expect("outer span exported");
    assert_eq!(outer_record.parent_span_id, None);
}

#[test]
fn test_request_without_ambient_span_is_a_trace_root() {
    let (tracer, _exporter) = tracer_with_exporter();

    let handler = RequestHandler::start(&tracer, get("/root"));
    assert!(handler.span().parent().is_none());
}

#[test]
fn test_scope_restores_prior_context() {
    let (tracer, _exporter) = tracer_with_exporter();

    let prior = Context::new().with_value(41_u64).attach();
    {
        let mut handler = RequestHandler::start(&tracer, get("/scoped"));
        let scope = handler.activate();
        assert!(Context::current().span().is_some());
        // Entries of the prior context stay visible under the handler scope.
        assert_eq!(Context::current().get::<u64>(), Some(&41));
        handler.finish();
        scope.close();
    }
    assert!(Context::current().span().is_none());
    assert_eq!(Context::current().get::<u64>(), Some(&41));
    prior.close();
}

#[test]
fn test_scope_restores_prior_context_across_panic() {
    let (tracer, exporter) = tracer_with_exporter();

    let prior = Context::new().with_value(7_u64).attach();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut handler = RequestHandler::start(&tracer, get("/panicky"));
        let _scope = handler.activate();
        panic!("transport blew up");
    }));
    assert!(result.is_err());

    assert!(Context::current().span().is_none());
    assert_eq!(Context::current().get::<u64>(), Some(&7));
    // The unwound handler still finished its span.
    assert_eq!(exporter.finished().len(), 1);
    prior.close();
}

#[test]
fn test_extracted_remote_context_parents_local_span() {
    let (tracer, _exporter) = tracer_with_exporter();

    let mut headers = http::HeaderMap::new();
    headers.insert(
        tracewire::client::TRACEPARENT,
        http::HeaderValue::from_static("00-0af7651916cd43dd8448eb211c80319c-00f067aa0ba902b7-01"),
    );
    let remote = tracewire::client::extract(&headers).expect("valid traceparent");

    let span = tracer
        .span_builder("inbound")
        .child_of_remote(remote)
        .start();
    assert_eq!(span.context().trace_id, remote.trace_id);
    assert_eq!(span.parent().map(|p| p.span_id), Some(remote.span_id));
}
