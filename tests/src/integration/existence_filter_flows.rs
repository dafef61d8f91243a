//! # Existence Filter Flows
//!
//! Documents reach the cache through the stream, then the server's digest of
//! a target is checked against them and the verdict is signalled upward.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dw_01_bloom_filter::{BloomFilterBuilder, BloomFilterDescriptor};
    use dw_02_watch_stream::{
        ChannelFilterListener, DispatchOutcome, Document, DocumentChange, DocumentRemove,
        ExistenceFilter, ExistenceFilterSignal, FilterVerdict, InMemoryDocumentCache,
        InMemoryServer, ListenResponse, TargetChange, TargetChangeType, TargetId,
        TargetSelector, WatchStream, WatchStreamApi, WatchStreamConfig,
    };
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::fixtures::document_names;

    const TARGET: TargetId = 1;

    struct Session {
        stream: WatchStream,
        server: InMemoryServer,
        cache: Arc<InMemoryDocumentCache>,
        signals: UnboundedReceiver<ExistenceFilterSignal>,
        names: Vec<String>,
    }

    impl Session {
        /// Open a stream with one added target holding six documents.
        async fn start() -> Self {
            dw_telemetry::init_test_logging();
            let server = InMemoryServer::new();
            let cache = Arc::new(InMemoryDocumentCache::new());
            let (listener, signals) = ChannelFilterListener::new();
            let mut stream = WatchStream::new(
                WatchStreamConfig::for_testing(),
                Arc::new(server.clone()),
                cache.clone(),
                Arc::new(listener),
            );
            stream.open().await.unwrap();
            stream.add_target(TARGET, TargetSelector::collection("cities")).unwrap();

            let names = document_names("cities", 6);
            let mut session = Self {
                stream,
                server,
                cache,
                signals,
                names,
            };
            session
                .dispatch(ListenResponse::TargetChange(TargetChange::new(
                    TargetChangeType::Add,
                    vec![TARGET],
                )))
                .await;
            for name in session.names.clone() {
                session
                    .dispatch(ListenResponse::DocumentChange(DocumentChange {
                        document: Document {
                            name,
                            ..Document::default()
                        },
                        target_ids: vec![TARGET],
                        removed_target_ids: Vec::new(),
                    }))
                    .await;
            }
            session
        }

        async fn dispatch(&mut self, response: ListenResponse) -> DispatchOutcome {
            self.server.deliver(0, response).unwrap();
            self.stream.process_next().await.unwrap().unwrap()
        }

        async fn filter(
            &mut self,
            target_id: TargetId,
            count: i32,
            unchanged_names: Option<BloomFilterDescriptor>,
        ) -> DispatchOutcome {
            self.dispatch(ListenResponse::ExistenceFilter(ExistenceFilter {
                target_id,
                count,
                unchanged_names,
            }))
            .await
        }

        /// Filter over the first `kept` documents, as the server would build it.
        fn server_filter(&self, kept: usize) -> BloomFilterDescriptor {
            let mut builder = BloomFilterBuilder::with_false_positive_rate(kept, 0.0001).unwrap();
            for name in &self.names[..kept] {
                builder.insert(name);
            }
            BloomFilterDescriptor::from(&builder.build().unwrap())
        }
    }

    #[tokio::test]
    async fn test_filter_accounts_for_removed_documents() {
        let mut session = Session::start().await;
        let descriptor = session.server_filter(3);

        let outcome = session.filter(TARGET, 3, Some(descriptor)).await;
        let DispatchOutcome::ExistenceFilterEvaluated(outcome) = outcome else {
            panic!("expected an evaluated filter");
        };
        assert_eq!(outcome.verdict, FilterVerdict::Consistent);
        assert_eq!(outcome.local_count, 6);
        assert!(outcome.bloom_applied);

        let signal = session.signals.try_recv().unwrap();
        assert!(!signal.mismatch);
        assert_eq!(signal.removed_keys, session.names[3..].to_vec());
    }

    #[tokio::test]
    async fn test_count_disagreement_is_mismatch() {
        let mut session = Session::start().await;
        let descriptor = session.server_filter(3);

        let outcome = session.filter(TARGET, 2, Some(descriptor)).await;
        assert!(outcome.is_mismatch());

        let signal = session.signals.try_recv().unwrap();
        assert!(signal.mismatch);
        assert!(signal.bloom_applied);
        assert_eq!(signal.removed_keys.len(), 3);
        assert_eq!(session.stream.metrics().filter_mismatches, 1);
    }

    #[tokio::test]
    async fn test_raw_frame_with_base64_bitmap() {
        let mut session = Session::start().await;

        // Same filter the builder makes over the first three names.
        let frame = r#"{"existenceFilter":{"targetId":1,"unchangedNames":{"bits":{"bitmap":"nAyKa6somgI=","padding":6},"hashCount":13}}}"#;
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(frame).unwrap()["existenceFilter"]
                ["unchangedNames"],
            serde_json::to_value(session.server_filter(3)).unwrap()
        );
        session.server.deliver_frame(0, frame).unwrap();
        let outcome = session.stream.process_next().await.unwrap().unwrap();

        // Omitted count reads as zero, yet three documents survive the filter.
        assert!(outcome.is_mismatch());
        let signal = session.signals.try_recv().unwrap();
        assert_eq!(signal.target_id, TARGET);
        assert_eq!(signal.removed_keys, session.names[3..].to_vec());
    }

    #[tokio::test]
    async fn test_omitted_count_with_empty_bitmap_is_consistent() {
        let mut session = Session::start().await;

        // Server matches nothing: count is left out and the bitmap is empty.
        let frame = r#"{"existenceFilter":{"targetId":1,"unchangedNames":{"bits":{"bitmap":"","padding":0},"hashCount":0}}}"#;
        session.server.deliver_frame(0, frame).unwrap();
        let outcome = session.stream.process_next().await.unwrap().unwrap();

        let DispatchOutcome::ExistenceFilterEvaluated(outcome) = outcome else {
            panic!("expected an evaluated filter");
        };
        assert_eq!(outcome.expected_count, 0);
        assert_eq!(outcome.verdict, FilterVerdict::Consistent);
        assert_eq!(outcome.removed_keys.len(), 6);

        let signal = session.signals.try_recv().unwrap();
        assert!(!signal.mismatch);
        assert_eq!(signal.removed_keys, session.names);
        assert_eq!(session.stream.metrics().filter_mismatches, 0);
    }

    #[tokio::test]
    async fn test_matching_count_short_circuits() {
        let mut session = Session::start().await;
        let descriptor = session.server_filter(3);

        let outcome = session.filter(TARGET, 6, Some(descriptor)).await;
        let DispatchOutcome::ExistenceFilterEvaluated(outcome) = outcome else {
            panic!("expected an evaluated filter");
        };
        assert_eq!(outcome.verdict, FilterVerdict::Consistent);
        assert!(!outcome.bloom_applied);
        assert!(outcome.removed_keys.is_empty());
        assert!(!session.signals.try_recv().unwrap().mismatch);
    }

    #[tokio::test]
    async fn test_invalid_descriptor_reports_mismatch_without_bloom() {
        let mut session = Session::start().await;

        let outcome = session
            .filter(TARGET, 4, Some(BloomFilterDescriptor::new(vec![0xff], 9, 1)))
            .await;
        let DispatchOutcome::ExistenceFilterEvaluated(outcome) = outcome else {
            panic!("expected an evaluated filter");
        };
        assert!(outcome.is_mismatch());
        assert!(outcome.bloom_error.is_some());

        let signal = session.signals.try_recv().unwrap();
        assert!(signal.mismatch);
        assert!(!signal.bloom_applied);
        assert!(signal.removed_keys.is_empty());
    }

    #[tokio::test]
    async fn test_missing_descriptor_and_unknown_target_send_nothing() {
        let mut session = Session::start().await;

        let skipped = session.filter(TARGET, 2, None).await;
        assert!(matches!(
            skipped,
            DispatchOutcome::ExistenceFilterEvaluated(ref outcome)
                if outcome.verdict == FilterVerdict::Skipped
        ));

        let descriptor = session.server_filter(3);
        let ignored = session.filter(99, 3, Some(descriptor)).await;
        assert_eq!(ignored, DispatchOutcome::ExistenceFilterIgnored { target_id: 99 });

        assert!(session.signals.try_recv().is_err());
        assert_eq!(session.stream.metrics().filter_skips, 2);
    }

    #[tokio::test]
    async fn test_filter_after_documents_leave_target() {
        let mut session = Session::start().await;
        for name in session.names[3..].to_vec() {
            session
                .dispatch(ListenResponse::DocumentRemove(DocumentRemove {
                    document: name,
                    removed_target_ids: vec![TARGET],
                    read_time: None,
                }))
                .await;
        }
        // Bodies stay cached; only target membership changed.
        assert_eq!(session.cache.len(), 6);

        let descriptor = session.server_filter(3);
        let outcome = session.filter(TARGET, 3, Some(descriptor)).await;
        let DispatchOutcome::ExistenceFilterEvaluated(outcome) = outcome else {
            panic!("expected an evaluated filter");
        };
        assert_eq!(outcome.local_count, 3);
        assert_eq!(outcome.verdict, FilterVerdict::Consistent);
        assert!(!outcome.bloom_applied);
    }
}
