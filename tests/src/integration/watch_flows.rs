//! # Watch Stream Flows
//!
//! Full listen sessions against the in-memory backend: targets registered,
//! driven through their lifecycle by server frames, resumed after an abort.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dw_02_watch_stream::{
        Document, DocumentChange, DocumentDelete, InMemoryDocumentCache, InMemoryServer,
        LifecycleError, ListenRequest, ListenResponse, NoopFilterListener, ProtocolError,
        ResumePoint, ResumeToken, StreamPhase, TargetChange, TargetChangeType, TargetId,
        TargetSelector, TargetStateError, TransportError, WatchError, WatchStream,
        WatchStreamApi, WatchStreamConfig,
    };

    use crate::fixtures::DOCUMENTS_PREFIX;

    fn new_stream(server: &InMemoryServer, cache: Arc<InMemoryDocumentCache>) -> WatchStream {
        WatchStream::new(
            WatchStreamConfig::for_testing(),
            Arc::new(server.clone()),
            cache,
            Arc::new(NoopFilterListener),
        )
    }

    fn target_change(kind: TargetChangeType, ids: &[TargetId]) -> ListenResponse {
        ListenResponse::TargetChange(TargetChange::new(kind, ids.to_vec()))
    }

    fn resume_marker(token: &[u8]) -> ListenResponse {
        ListenResponse::TargetChange(TargetChange {
            resume_token: Some(ResumeToken::new(token.to_vec())),
            ..TargetChange::default()
        })
    }

    fn city_change(city: &str, target_ids: Vec<TargetId>) -> ListenResponse {
        ListenResponse::DocumentChange(DocumentChange {
            document: Document {
                name: format!("{DOCUMENTS_PREFIX}/cities/{city}"),
                ..Document::default()
            },
            target_ids,
            removed_target_ids: Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_full_session_reaches_current_and_records_position() {
        dw_telemetry::init_test_logging();
        let server = InMemoryServer::new();
        let cache = Arc::new(InMemoryDocumentCache::new());
        let mut stream = new_stream(&server, Arc::clone(&cache));

        stream.open().await.unwrap();
        stream
            .add_target(1, TargetSelector::field_equals("cities", "state", "CA"))
            .unwrap();
        stream
            .add_target(2, TargetSelector::documents(["cities/NYC"]))
            .unwrap();

        server.deliver(0, target_change(TargetChangeType::Add, &[1, 2])).unwrap();
        server.deliver(0, city_change("SF", vec![1])).unwrap();
        server.deliver(0, city_change("LA", vec![1])).unwrap();
        server.deliver(0, city_change("NYC", vec![2])).unwrap();
        server.deliver(0, target_change(TargetChangeType::Current, &[1, 2])).unwrap();
        server.deliver(0, resume_marker(b"snapshot-1")).unwrap();
        server.close_stream(0, None);

        assert_eq!(stream.run().await.unwrap(), 6);

        for target_id in [1, 2] {
            let state = stream.target(target_id).unwrap();
            assert!(state.is_added() && state.is_current());
        }
        assert_eq!(
            stream.resume_points(),
            vec![
                ResumePoint {
                    target_id: 1,
                    resume_token: Some(ResumeToken::new(b"snapshot-1".to_vec())),
                },
                ResumePoint {
                    target_id: 2,
                    resume_token: Some(ResumeToken::new(b"snapshot-1".to_vec())),
                },
            ]
        );
        assert_eq!(cache.len(), 3);

        let metrics = stream.metrics();
        assert_eq!(metrics.requests_sent, 2);
        assert_eq!(metrics.messages_received, 6);
        assert_eq!(metrics.documents_changed, 3);
        assert_eq!(metrics.inbound_pending, 0);

        // Server ended the stream; further dispatch reports the end again.
        assert_eq!(stream.process_next().await.unwrap(), None);
        stream.close().await.unwrap();
        assert_eq!(stream.phase(), StreamPhase::Closed);
    }

    #[tokio::test]
    async fn test_reset_then_current_cycle() {
        dw_telemetry::init_test_logging();
        let server = InMemoryServer::new();
        let mut stream = new_stream(&server, Arc::new(InMemoryDocumentCache::new()));
        stream.open().await.unwrap();
        stream.add_target(3, TargetSelector::collection("rooms")).unwrap();

        for kind in [
            TargetChangeType::Add,
            TargetChangeType::Current,
            TargetChangeType::Reset,
        ] {
            server.deliver(0, target_change(kind, &[3])).unwrap();
        }
        for _ in 0..3 {
            stream.process_next().await.unwrap();
        }
        assert!(!stream.target(3).unwrap().is_current());

        // A position may not be recorded while the target is rebuilding.
        server.deliver(0, resume_marker(b"too-early")).unwrap();
        let err = stream.process_next().await.unwrap_err();
        assert_eq!(
            err,
            WatchError::Protocol(ProtocolError::InvalidTransition(
                TargetStateError::NotCurrent { target_id: 3 }
            ))
        );
        assert_eq!(stream.target(3).unwrap().resume_token(), None);
    }

    #[tokio::test]
    async fn test_remove_target_round_trip() {
        dw_telemetry::init_test_logging();
        let server = InMemoryServer::new();
        let cache = Arc::new(InMemoryDocumentCache::new());
        let mut stream = new_stream(&server, Arc::clone(&cache));
        stream.open().await.unwrap();
        stream.add_target(1, TargetSelector::collection("cities")).unwrap();

        server.deliver(0, target_change(TargetChangeType::Add, &[1])).unwrap();
        server.deliver(0, city_change("SF", vec![1])).unwrap();
        stream.process_next().await.unwrap();
        stream.process_next().await.unwrap();

        stream.remove_target(1).unwrap();
        assert_eq!(stream.target_count(), 0);
        assert_eq!(
            server.sent_requests(0).last(),
            Some(&ListenRequest::remove_target(1))
        );
        assert_eq!(
            stream.remove_target(1),
            Err(WatchError::Lifecycle(LifecycleError::UnknownTarget {
                target_id: 1
            }))
        );

        // A late delete still reaches the cache.
        server
            .deliver(
                0,
                ListenResponse::DocumentDelete(DocumentDelete {
                    document: format!("{DOCUMENTS_PREFIX}/cities/SF"),
                    removed_target_ids: vec![1],
                    read_time: None,
                }),
            )
            .unwrap();
        stream.process_next().await.unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_after_abort_resumes_targets() {
        dw_telemetry::init_test_logging();
        let server = InMemoryServer::new();
        let mut stream = new_stream(&server, Arc::new(InMemoryDocumentCache::new()));
        stream.open().await.unwrap();
        stream.add_target(1, TargetSelector::collection("cities")).unwrap();
        stream.add_target(2, TargetSelector::collection("rooms")).unwrap();

        server.deliver(0, target_change(TargetChangeType::Add, &[1, 2])).unwrap();
        server.deliver(0, target_change(TargetChangeType::Current, &[1, 2])).unwrap();
        server.deliver(0, resume_marker(b"pos-9")).unwrap();
        // Second ADD for an already added target aborts the stream.
        server.deliver(0, target_change(TargetChangeType::Add, &[2])).unwrap();

        for _ in 0..3 {
            stream.process_next().await.unwrap();
        }
        assert!(stream.process_next().await.unwrap_err().is_fatal());
        assert!(stream.failure().is_some());
        assert!(matches!(
            stream.add_target(5, TargetSelector::collection("towns")),
            Err(WatchError::Lifecycle(LifecycleError::Aborted(_)))
        ));

        let saved = stream.resume_points();
        assert_eq!(saved.len(), 2);
        stream.close().await.unwrap();
        assert!(stream.resume_points().is_empty());

        let mut rebuilt = new_stream(&server, Arc::new(InMemoryDocumentCache::new()));
        rebuilt.open().await.unwrap();
        for point in &saved {
            let selector = TargetSelector::collection(format!("c{}", point.target_id));
            match &point.resume_token {
                Some(token) => rebuilt
                    .add_target_with_resume(point.target_id, selector, token.clone())
                    .unwrap(),
                None => rebuilt.add_target(point.target_id, selector).unwrap(),
            }
        }

        let resent = server.sent_requests(1);
        assert_eq!(resent.len(), 2);
        for request in resent {
            let ListenRequest::AddTarget(target) = request else {
                panic!("expected addTarget");
            };
            assert_eq!(
                target.resume_token,
                Some(ResumeToken::new(b"pos-9".to_vec()))
            );
        }
        assert_eq!(
            rebuilt.target(1).unwrap().resume_token(),
            Some(&ResumeToken::new(b"pos-9".to_vec()))
        );
    }

    #[tokio::test]
    async fn test_server_error_surfaces_once() {
        dw_telemetry::init_test_logging();
        let server = InMemoryServer::new();
        let mut stream = new_stream(&server, Arc::new(InMemoryDocumentCache::new()));
        stream.open().await.unwrap();
        stream.add_target(1, TargetSelector::collection("cities")).unwrap();

        server.deliver(0, target_change(TargetChangeType::Add, &[1])).unwrap();
        let unavailable = TransportError::Status {
            code: 14,
            message: "backend restarting".to_string(),
        };
        server.close_stream(0, Some(unavailable.clone()));

        assert_eq!(
            stream.run().await,
            Err(WatchError::Transport(unavailable))
        );
        assert_eq!(stream.process_next().await.unwrap(), None);
        assert!(stream.target(1).unwrap().is_added());

        stream.close().await.unwrap();
        assert!(server.is_closed(0));
    }

    #[tokio::test]
    async fn test_raw_frames_drive_targets() {
        dw_telemetry::init_test_logging();
        let server = InMemoryServer::new();
        let mut stream = new_stream(&server, Arc::new(InMemoryDocumentCache::new()));
        stream.open().await.unwrap();
        stream.add_target(4, TargetSelector::collection("cities")).unwrap();

        server
            .deliver_frame(0, r#"{"targetChange":{"targetIds":[4],"targetChangeType":"ADD"}}"#)
            .unwrap();
        server
            .deliver_frame(0, r#"{"targetChange":{"targetChangeType":"CURRENT"}}"#)
            .unwrap();
        server
            .deliver_frame(0, r#"{"targetChange":{"resumeToken":"cmVzdW1lLTQy"}}"#)
            .unwrap();
        assert!(matches!(
            server.deliver_frame(0, r#"{"targetChange":"#),
            Err(TransportError::Framing(_))
        ));

        for _ in 0..3 {
            stream.process_next().await.unwrap();
        }
        assert_eq!(
            stream.target(4).unwrap().resume_token(),
            Some(&ResumeToken::new(b"resume-42".to_vec()))
        );
    }
}
