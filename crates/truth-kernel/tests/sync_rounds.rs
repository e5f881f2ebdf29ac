//! End-to-end sync rounds through the engine handle.

use std::sync::Arc;
use std::time::Duration;

use truth_kernel::store::Store;
use truth_kernel::sync::{MemoryTransport, PeerState, Response, TransportError};
use truth_kernel::{Engine, EngineConfig, EngineError, EngineHandle, ErrorKind, Origin};
use truth_kernel_testkit::{multi_party_fixtures, response_body, TestFixture};

fn handle_with(config: EngineConfig) -> (EngineHandle, Arc<MemoryTransport>) {
    let transport = Arc::new(MemoryTransport::new());
    let engine = Engine::with_transport(config, transport.clone());
    (EngineHandle::with_engine(engine), transport)
}

fn handle() -> (EngineHandle, Arc<MemoryTransport>) {
    handle_with(EngineConfig::default())
}

#[tokio::test]
async fn test_peer_with_one_invalid_record() {
    let (handle, transport) = handle();
    let peer = TestFixture::with_seed([1; 32]);
    let body = response_body(&[
        peer.document("water is wet"),
        peer.tampered_document("fire is cold"),
        peer.document("grass is green"),
    ]);
    transport.respond("http://peer-a", Response::body(body)).await;

    let summary = handle.sync_with_peer("http://peer-a").await.unwrap();
    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.skipped_invalid, 1);
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.duplicate, 0);
    assert_eq!(handle.peer_count().unwrap(), 1);

    let engine = handle.engine().unwrap();
    assert_eq!(engine.record_count().await.unwrap(), 2);
    let stored = engine
        .record(&peer.record("water is wet").id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.origin, Origin::Peer("http://peer-a".into()));
}

#[tokio::test]
async fn test_second_round_reports_duplicates() {
    let (handle, transport) = handle();
    let peer = TestFixture::with_seed([2; 32]);
    let body = response_body(&[peer.document("a"), peer.document("b")]);
    transport.respond("http://peer-a", Response::body(body)).await;

    handle.sync_with_peer("http://peer-a").await.unwrap();
    let again = handle.sync_with_peer("http://peer-a").await.unwrap();

    assert_eq!(again.inserted, 0);
    assert_eq!(again.duplicate, 2);
    assert_eq!(handle.peer_count().unwrap(), 1);
}

#[tokio::test]
async fn test_peer_count_tracks_distinct_peers() {
    let (handle, transport) = handle();
    let fixtures = multi_party_fixtures(4);
    for (i, fixture) in fixtures.iter().enumerate() {
        let url = format!("http://peer-{i}");
        let body = response_body(&[fixture.document(&format!("claim {i}"))]);
        transport.respond(&url, Response::body(body)).await;
        handle.sync_with_peer(&url).await.unwrap();
    }
    // Surrounding whitespace names the same peer.
    handle.sync_with_peer(" http://peer-0 ").await.unwrap();

    assert_eq!(handle.peer_count().unwrap(), 4);
    let engine = handle.engine().unwrap();
    assert_eq!(engine.record_count().await.unwrap(), 4);
}

#[tokio::test]
async fn test_unreachable_peer_is_counted() {
    let (handle, transport) = handle();
    transport
        .respond(
            "http://down",
            Response::Fail(TransportError::Unreachable("connection refused".into())),
        )
        .await;

    let err = handle.sync_with_peer("http://down").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PeerUnreachable);
    assert_eq!(handle.peer_count().unwrap(), 1);

    let info = handle.engine().unwrap().peer("http://down").unwrap();
    assert_eq!(info.state, PeerState::Unreachable);
    assert_eq!(info.consecutive_failures, 1);
    assert!(info.last_sync_at.is_none());
}

#[tokio::test]
async fn test_truncated_response_changes_nothing() {
    let (handle, transport) = handle();
    let peer = TestFixture::with_seed([3; 32]);
    let full = response_body(&[peer.document("a"), peer.document("b")]);
    let truncated = full[..full.len() - 10].to_string();
    transport.respond("http://flaky", Response::body(truncated)).await;

    let err = handle.sync_with_peer("http://flaky").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkError);
    assert_eq!(err.status_code(), -1);
    assert_eq!(handle.engine().unwrap().record_count().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_peer_times_out() {
    let mut config = EngineConfig::default();
    config.sync.fetch_timeout_ms = 500;
    let (handle, transport) = handle_with(config);
    let peer = TestFixture::with_seed([4; 32]);
    transport
        .respond(
            "http://slow",
            Response::delayed(
                Duration::from_secs(5),
                Response::body(response_body(&[peer.document("late")])),
            ),
        )
        .await;

    let err = handle.sync_with_peer("http://slow").await.unwrap_err();
    assert_eq!(err.status_code(), -2);
    assert_eq!(handle.engine().unwrap().record_count().await.unwrap(), 0);
    assert_eq!(handle.peer_count().unwrap(), 1);
}

#[tokio::test]
async fn test_freed_handle_rejects_calls() {
    let (handle, transport) = handle();
    let peer = TestFixture::with_seed([5; 32]);
    transport
        .respond("http://peer-a", Response::body(response_body(&[peer.document("a")])))
        .await;
    handle.sync_with_peer("http://peer-a").await.unwrap();

    handle.free();

    let err = handle.sync_with_peer("http://peer-a").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidHandle));
    assert_eq!(err.status_code(), -3);
    assert!(handle.peer_count().is_err());
    assert_eq!(transport.fetch_count("http://peer-a").await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rounds_observe_whole_rounds() {
    let (handle, transport) = handle();
    let handle = Arc::new(handle);
    let fixtures = multi_party_fixtures(3);
    let documents: Vec<String> = (0..20)
        .map(|i| fixtures[i % 3].document(&format!("claim {i}")))
        .collect();
    transport
        .respond("http://peer-a", Response::body(response_body(&documents[..10])))
        .await;
    transport
        .respond("http://peer-b", Response::body(response_body(&documents[5..])))
        .await;

    let engine = handle.engine().unwrap();
    let observer = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..50 {
                seen.push(engine.store().count().await.unwrap());
                tokio::task::yield_now().await;
            }
            seen
        })
    };

    let a = tokio::spawn({
        let handle = Arc::clone(&handle);
        async move { handle.sync_with_peer("http://peer-a").await }
    });
    let b = tokio::spawn({
        let handle = Arc::clone(&handle);
        async move { handle.sync_with_peer("http://peer-b").await }
    });
    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    assert_eq!(a.inserted + b.inserted, 20);
    assert_eq!(a.duplicate + b.duplicate, 5);
    assert_eq!(engine.record_count().await.unwrap(), 20);

    // Each round merges in one step, so only whole-round totals are observable.
    for count in observer.await.unwrap() {
        assert!([0, 10, 15, 20].contains(&count), "observed partial round: {count}");
    }
}

#[tokio::test]
async fn test_two_engines_converge() {
    let (left, left_net) = handle();
    let (right, right_net) = handle();
    let alice = TestFixture::with_seed([6; 32]);
    let bob = TestFixture::with_seed([7; 32]);

    let left_engine = left.engine().unwrap();
    let right_engine = right.engine().unwrap();
    left_engine.ingest_json(alice.document("a").as_bytes()).await.unwrap();
    left_engine.ingest_json(alice.document("b").as_bytes()).await.unwrap();
    right_engine.ingest_json(bob.document("c").as_bytes()).await.unwrap();

    right_net
        .respond("http://left", Response::body(left_engine.export_records().await.unwrap()))
        .await;
    left_net
        .respond("http://right", Response::body(right_engine.export_records().await.unwrap()))
        .await;

    right.sync_with_peer("http://left").await.unwrap();
    left.sync_with_peer("http://right").await.unwrap();

    assert_eq!(left_engine.record_count().await.unwrap(), 3);
    assert_eq!(
        left_engine.digest().await.unwrap(),
        right_engine.digest().await.unwrap()
    );
}
