//! End-to-end tests driving the runner against test doubles.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use mockall::mock;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::{AmbiguousAssessmentPolicy, EngineLimits, RunnerConfig};
    use crate::core::{
        Artifact, AssessmentOutcome, FeedbackRequest, FeedbackShape, FeedbackValue, GenerationParams,
        HumanFeedback, Properties, WorkflowInput, WorkflowResult,
    };
    use crate::engine::{replay, StageKind};
    use crate::errors::{FeedbackError, GenerationError, WorkflowError};
    use crate::events::{GENERATION_RETRY, WORKFLOW_CANCELLED, WORKFLOW_FAILED};
    use crate::ports::{GenerationPort, HumanFeedbackPort, InMemoryFeedbackPort};
    use crate::runner::{InstanceStatus, RunOutcome, WorkflowRunner};
    use crate::store::WorkflowStore;
    use crate::testing::{
        fast_config, FailingGenerationPort, ScriptedFeedbackPort, ScriptedGenerationPort,
        SlowGenerationPort, TestHarness,
    };
    use crate::utils::{InstanceId, RequestId};

    mock! {
        pub Generation {}

        #[async_trait]
        impl GenerationPort for Generation {
            async fn create_artifact(
                &self,
                input: &WorkflowInput,
                params: &GenerationParams,
            ) -> Result<Artifact, GenerationError>;

            async fn revise_artifact(
                &self,
                input: &WorkflowInput,
                previous: &Artifact,
                feedback: &str,
                params: &GenerationParams,
            ) -> Result<Artifact, GenerationError>;

            async fn review_artifact(
                &self,
                artifact: &Artifact,
                input: &WorkflowInput,
                params: &GenerationParams,
            ) -> Result<String, GenerationError>;
        }
    }

    mock! {
        pub Feedback {}

        #[async_trait]
        impl HumanFeedbackPort for Feedback {
            async fn request_feedback(
                &self,
                instance_id: InstanceId,
                prompt: &str,
                expected_shape: FeedbackShape,
            ) -> Result<FeedbackRequest, FeedbackError>;

            async fn cancel(&self, request_id: RequestId) -> bool;
        }
    }

    /// Feedback port that takes a while to emit each request.
    struct DelayedFeedbackPort {
        inner: InMemoryFeedbackPort,
        delay: Duration,
    }

    #[async_trait]
    impl HumanFeedbackPort for DelayedFeedbackPort {
        async fn request_feedback(
            &self,
            instance_id: InstanceId,
            prompt: &str,
            expected_shape: FeedbackShape,
        ) -> Result<FeedbackRequest, FeedbackError> {
            tokio::time::sleep(self.delay).await;
            self.inner.request_feedback(instance_id, prompt, expected_shape).await
        }

        async fn resume(
            &self,
            request: &FeedbackRequest,
            value: FeedbackValue,
        ) -> Result<HumanFeedback, FeedbackError> {
            self.inner.resume(request, value).await
        }

        async fn cancel(&self, request_id: RequestId) -> bool {
            self.inner.cancel(request_id).await
        }
    }

    const SHORT_DRAFT: &str = "The keeper lit the lamp.";
    const LONG_DRAFT: &str = "Every night for forty years the keeper climbed the stairs, \
        lit the lamp and watched the sea for ships that never came.";

    fn suspended(outcome: RunOutcome) -> FeedbackRequest {
        match outcome {
            RunOutcome::Suspended { request, .. } => request,
            RunOutcome::Completed(result) => panic!("expected suspension, got {result:?}"),
        }
    }

    fn completed(outcome: RunOutcome) -> WorkflowResult {
        match outcome {
            RunOutcome::Completed(result) => *result,
            RunOutcome::Suspended { request, .. } => panic!("expected completion, got {request:?}"),
        }
    }

    #[tokio::test]
    async fn test_story_revised_once_then_accepted() {
        let h = TestHarness::new(
            ScriptedGenerationPort::new()
                .with_drafts([SHORT_DRAFT, LONG_DRAFT])
                .with_assessments([AssessmentOutcome::revise(), AssessmentOutcome::accept()])
                .with_review("A quiet, moody piece."),
        );

        let outcome = h
            .runner
            .start(
                "a story about a lighthouse",
                Properties::new().with_story_word_count(50),
            )
            .await
            .unwrap();
        let instance_id = outcome.instance_id();
        let first = suspended(outcome);
        assert!(first.prompt.contains(SHORT_DRAFT));

        let instance = h.runner.instance(instance_id).await.unwrap();
        assert_eq!(instance.status, InstanceStatus::Suspended { request_id: first.id });
        assert_eq!(instance.stage.kind(), StageKind::AwaitingFeedback);

        let second = suspended(h.runner.resume(first.id, "too short").await.unwrap());
        assert_ne!(second.id, first.id);
        assert!(second.prompt.contains(LONG_DRAFT));

        let result = completed(h.runner.resume(second.id, "lovely, ship it").await.unwrap());

        assert_eq!(result.artifact.content, LONG_DRAFT);
        assert_eq!(result.original_artifact.content, SHORT_DRAFT);
        assert_eq!(result.artifact.revision, 2);
        assert_eq!(result.cycles, 2);
        assert_eq!(result.review, "A quiet, moody piece.");
        assert_eq!(result.feedback.len(), 2);
        assert!(!result.accepted_first_draft());

        let revise_calls: Vec<_> = h
            .generation
            .calls()
            .into_iter()
            .filter(|c| c.operation == "revise_artifact")
            .collect();
        assert_eq!(revise_calls.len(), 1);
        assert_eq!(revise_calls[0].feedback.as_deref(), Some("too short"));
        assert_eq!(h.generation.call_count("create_artifact"), 1);
        assert_eq!(h.generation.call_count("review_artifact"), 1);

        assert_eq!(h.runner.result(instance_id).await.unwrap(), result);
    }

    #[tokio::test]
    async fn test_generation_failure_exhausts_retries() {
        let mut generation = MockGeneration::new();
        generation
            .expect_create_artifact()
            .times(3)
            .returning(|_, _| Err(GenerationError::backend("model unavailable")));

        let h = TestHarness::new(generation);
        let err = h
            .runner
            .start("a story about a lighthouse", Properties::default())
            .await
            .unwrap_err();

        let WorkflowError::GenerationExhausted {
            instance_id,
            attempts,
            last,
        } = err
        else {
            panic!("expected exhausted generation");
        };
        assert_eq!(attempts, 3);
        assert_eq!(last, GenerationError::backend("model unavailable"));

        let instance = h.runner.instance(instance_id).await.unwrap();
        assert_eq!(instance.status, InstanceStatus::Failed);
        assert_eq!(instance.stage.kind(), StageKind::Drafting);
        assert!(instance
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("model unavailable")));
        assert_eq!(h.events.events_of_type(GENERATION_RETRY).len(), 2);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let h = TestHarness::new(FailingGenerationPort::times(
            2,
            GenerationError::backend("rate limited"),
        ));

        let outcome = h
            .runner
            .start("a story about a lighthouse", Properties::default())
            .await;

        let outcome = tokio_test::assert_ok!(outcome);
        assert!(outcome.request().is_some());
        assert_eq!(h.generation.attempts(), 3);
        assert_eq!(h.events.events_of_type(GENERATION_RETRY).len(), 2);
    }

    #[tokio::test]
    async fn test_generation_timeout_counts_as_failure() {
        let config = fast_config()
            .with_generation_timeout_ms(20)
            .with_retry(fast_config().retry.with_max_attempts(2));
        let h = TestHarness::with_config(SlowGenerationPort::with_delay_ms(500), config);

        let err = h
            .runner
            .start("a story about a lighthouse", Properties::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::GenerationExhausted {
                attempts: 2,
                last: GenerationError::Timeout { after_ms: 20 },
                ..
            }
        ));
        assert_eq!(h.generation.inner().total_calls(), 0);
    }

    #[tokio::test]
    async fn test_each_rejection_adds_a_cycle() {
        let rejections = 3;
        let h = TestHarness::new(ScriptedGenerationPort::new().with_assessments(
            std::iter::repeat(AssessmentOutcome::revise())
                .take(rejections)
                .chain([AssessmentOutcome::accept()]),
        ));

        let mut outcome = h
            .runner
            .start("a story about a lighthouse", Properties::default())
            .await
            .unwrap();
        for round in 0..rejections {
            let request = suspended(outcome);
            outcome = h
                .runner
                .resume(request.id, format!("revise, round {round}").as_str())
                .await
                .unwrap();
        }
        let request = suspended(outcome);
        let result = completed(h.runner.resume(request.id, "accepted").await.unwrap());

        assert_eq!(result.cycles, 4);
        assert_eq!(result.artifact.revision, 4);
        assert_eq!(h.generation.call_count("revise_artifact"), rejections);
        assert_eq!(result.feedback.len(), rejections + 1);
    }

    #[tokio::test]
    async fn test_revision_limit_fails_instance() {
        let config = fast_config().with_limits(EngineLimits::default().with_max_drafting_cycles(2));
        let h = TestHarness::with_config(
            ScriptedGenerationPort::new()
                .with_assessments(std::iter::repeat(AssessmentOutcome::revise()).take(5)),
            config,
        );

        let first = suspended(h.runner.start("a story", Properties::default()).await.unwrap());
        let second = suspended(h.runner.resume(first.id, "again").await.unwrap());
        let err = h.runner.resume(second.id, "again").await.unwrap_err();

        let WorkflowError::RevisionLimitExceeded { instance_id, cycles } = err else {
            panic!("expected revision limit");
        };
        assert_eq!(cycles, 2);

        let instance = h.runner.instance(instance_id).await.unwrap();
        assert_eq!(instance.status, InstanceStatus::Failed);
        assert_eq!(instance.stage.kind(), StageKind::Assessing);
        assert_eq!(h.generation.call_count("revise_artifact"), 1);
    }

    #[tokio::test]
    async fn test_ambiguous_assessment_can_fail() {
        let config = fast_config().with_limits(
            EngineLimits::default().with_ambiguous_assessment(AmbiguousAssessmentPolicy::Fail),
        );
        let h = TestHarness::with_config(
            ScriptedGenerationPort::new().with_assessments([AssessmentOutcome::Unparsable {
                raw: "hmm, maybe".to_string(),
            }]),
            config,
        );

        let request = suspended(h.runner.start("a story", Properties::default()).await.unwrap());
        let err = h.runner.resume(request.id, "not sure").await.unwrap_err();

        assert!(matches!(err, WorkflowError::AmbiguousAssessment { ref raw, .. } if raw == "hmm, maybe"));
    }

    #[tokio::test]
    async fn test_ambiguous_assessment_revises_by_default() {
        let h = TestHarness::new(ScriptedGenerationPort::new().with_assessments([
            AssessmentOutcome::Unparsable {
                raw: "hmm".to_string(),
            },
            AssessmentOutcome::accept(),
        ]));

        let request = suspended(h.runner.start("a story", Properties::default()).await.unwrap());
        let request = suspended(h.runner.resume(request.id, "hmm").await.unwrap());
        let result = completed(h.runner.resume(request.id, "fine").await.unwrap());

        assert_eq!(result.cycles, 2);
    }

    #[tokio::test]
    async fn test_second_resume_of_same_request_is_rejected() {
        let h = TestHarness::new(
            ScriptedGenerationPort::new().with_assessments([AssessmentOutcome::revise()]),
        );
        let request = suspended(h.runner.start("a story", Properties::default()).await.unwrap());
        let instance_id = request.instance_id;

        h.runner.resume(request.id, "too short").await.unwrap();
        let before = h.runner.instance(instance_id).await.unwrap();

        let err = h.runner.resume(request.id, "too short").await.unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownRequest { request_id } if request_id == request.id));

        let after = h.runner.instance(instance_id).await.unwrap();
        assert_eq!(after.version, before.version);
        assert_eq!(after.history.len(), before.history.len());
        assert_eq!(h.generation.call_count("revise_artifact"), 1);
    }

    #[tokio::test]
    async fn test_unknown_request_is_rejected() {
        let h = TestHarness::new(ScriptedGenerationPort::new());
        let request_id = RequestId::new();

        let err = tokio_test::assert_err!(h.runner.resume(request_id, "hello").await);
        assert_eq!(err.code(), "UNKNOWN_REQUEST");
    }

    #[tokio::test]
    async fn test_malformed_feedback_leaves_instance_suspended() {
        let h = TestHarness::new(ScriptedGenerationPort::new());
        let properties = Properties::default().with_feedback_shape(FeedbackShape::Decision);

        let request = suspended(h.runner.start("a story", properties).await.unwrap());
        let err = h.runner.resume(request.id, "looks fine").await.unwrap_err();

        assert!(matches!(err, WorkflowError::FeedbackMalformed { request_id, .. } if request_id == request.id));
        assert!(err.leaves_instance_suspended());

        let instance = h.runner.instance(request.instance_id).await.unwrap();
        assert_eq!(instance.status, InstanceStatus::Suspended { request_id: request.id });

        let result = completed(
            h.runner
                .resume(
                    request.id,
                    FeedbackValue::Decision {
                        accept: true,
                        comments: None,
                    },
                )
                .await
                .unwrap(),
        );

        assert_eq!(result.cycles, 1);
        assert!(result.accepted_first_draft());
        // A decision needs no interpretation.
        assert_eq!(h.generation.call_count("assess_feedback"), 0);
    }

    #[tokio::test]
    async fn test_expired_request_abandons_instance() {
        let h = TestHarness::with_parts(
            ScriptedGenerationPort::new(),
            InMemoryFeedbackPort::new().with_timeout(Duration::from_millis(5)),
            fast_config(),
        );

        let request = suspended(h.runner.start("a story", Properties::default()).await.unwrap());
        assert!(request.deadline.is_some());
        tokio::time::sleep(Duration::from_millis(30)).await;

        let err = h.runner.resume(request.id, "too late").await.unwrap_err();
        assert!(matches!(err, WorkflowError::FeedbackTimeout { request_id, .. } if request_id == request.id));

        let instance = h.runner.instance(request.instance_id).await.unwrap();
        assert_eq!(instance.status, InstanceStatus::Abandoned);
        assert_eq!(h.feedback.pending_count(), 0);
        assert!(h.runner.resume(request.id, "again").await.is_err());
    }

    #[tokio::test]
    async fn test_expire_overdue_sweeps_suspended_instances() {
        let h = TestHarness::with_parts(
            ScriptedGenerationPort::new(),
            InMemoryFeedbackPort::new().with_timeout(Duration::from_millis(5)),
            fast_config(),
        );

        let first = suspended(h.runner.start("first", Properties::default()).await.unwrap());
        let second = suspended(h.runner.start("second", Properties::default()).await.unwrap());
        tokio::time::sleep(Duration::from_millis(30)).await;

        let mut expired = h.runner.expire_overdue().await.unwrap();
        expired.sort();
        let mut expected = vec![first.instance_id, second.instance_id];
        expected.sort();
        assert_eq!(expired, expected);

        assert!(h.runner.expire_overdue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_feedback_timeout_from_config_applies() {
        let h = TestHarness::with_config(
            ScriptedGenerationPort::new(),
            fast_config().with_feedback_timeout_secs(3600),
        );

        let request = suspended(h.runner.start("a story", Properties::default()).await.unwrap());

        assert!(request.deadline.is_some());
        assert!(h.runner.expire_overdue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_suspended_instance_skips_generation() {
        let h = TestHarness::new(ScriptedGenerationPort::new());
        let request = suspended(h.runner.start("a story", Properties::default()).await.unwrap());
        let calls_before = h.generation.total_calls();

        h.runner.cancel(request.instance_id, "user gave up").await.unwrap();

        let instance = h.runner.instance(request.instance_id).await.unwrap();
        assert_eq!(instance.status, InstanceStatus::Cancelled);
        assert_eq!(h.generation.total_calls(), calls_before);
        assert_eq!(h.feedback.pending_count(), 0);
        assert_eq!(h.events.events_of_type(WORKFLOW_CANCELLED).len(), 1);

        // Cancelling twice is a no-op; resuming is rejected.
        h.runner.cancel(request.instance_id, "again").await.unwrap();
        assert!(matches!(
            h.runner.resume(request.id, "too late").await,
            Err(WorkflowError::UnknownRequest { .. })
        ));
        assert!(matches!(
            h.runner.result(request.instance_id).await,
            Err(WorkflowError::NotFinished { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_generation() {
        let h = TestHarness::new(SlowGenerationPort::with_delay_ms(1_000));
        let runner = Arc::new(h.runner);
        let store = Arc::clone(&h.store);

        let driving = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move { runner.start("a story", Properties::default()).await })
        };

        let instance_id = loop {
            if let Some(instance) = store.list().await.unwrap().into_iter().next() {
                break instance.id;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };

        runner.cancel(instance_id, "shutdown").await.unwrap();
        let outcome = driving.await.unwrap();

        assert!(matches!(
            outcome,
            Err(WorkflowError::Cancelled { ref reason, .. }) if reason == "shutdown"
        ));
        let instance = runner.instance(instance_id).await.unwrap();
        assert_eq!(instance.status, InstanceStatus::Cancelled);
        assert_eq!(instance.stage.kind(), StageKind::Drafting);
    }

    #[tokio::test]
    async fn test_cancel_during_feedback_request_releases_it() {
        let h = TestHarness::with_parts(
            ScriptedGenerationPort::new(),
            DelayedFeedbackPort {
                inner: InMemoryFeedbackPort::new(),
                delay: Duration::from_millis(200),
            },
            fast_config(),
        );
        let runner = Arc::new(h.runner);
        let store = Arc::clone(&h.store);

        let driving = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move { runner.start("a story", Properties::default()).await })
        };

        let instance_id = loop {
            let awaiting = store
                .list()
                .await
                .unwrap()
                .into_iter()
                .find(|i| i.stage.kind() == StageKind::AwaitingFeedback);
            if let Some(instance) = awaiting {
                break instance.id;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };

        runner.cancel(instance_id, "shutdown").await.unwrap();
        let outcome = driving.await.unwrap();

        assert!(matches!(outcome, Err(WorkflowError::Cancelled { .. })));
        let instance = runner.instance(instance_id).await.unwrap();
        assert_eq!(instance.status, InstanceStatus::Cancelled);
        assert_eq!(h.feedback.inner.pending_count(), 0);
        assert_eq!(runner.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_failed_feedback_request_fails_instance() {
        let mut feedback = MockFeedback::new();
        feedback
            .expect_request_feedback()
            .times(1)
            .returning(|_, _, _| Err(FeedbackError::malformed("review channel closed")));
        feedback.expect_cancel().never();

        let h = TestHarness::with_parts(ScriptedGenerationPort::new(), feedback, fast_config());
        let err = h.runner.start("a story", Properties::default()).await.unwrap_err();

        assert!(matches!(err, WorkflowError::Feedback(FeedbackError::Malformed { .. })));
        assert_eq!(err.code(), "FEEDBACK_ERROR");

        let instance = h.store.list().await.unwrap().remove(0);
        assert_eq!(instance.status, InstanceStatus::Failed);
        assert_eq!(instance.stage.kind(), StageKind::AwaitingFeedback);
        assert!(instance.stage.pending_request().is_none());
        assert!(instance
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("review channel closed")));
        assert_eq!(h.events.events_of_type(WORKFLOW_FAILED).len(), 1);
        assert_eq!(h.generation.call_count("create_artifact"), 1);
    }

    #[tokio::test]
    async fn test_lock_table_empties_once_instances_settle() {
        let h = TestHarness::new(
            ScriptedGenerationPort::new().with_assessments([AssessmentOutcome::accept()]),
        );

        let request = suspended(h.runner.start("a story", Properties::default()).await.unwrap());
        assert_eq!(h.runner.tracked_locks(), 0);

        completed(h.runner.resume(request.id, "perfect").await.unwrap());
        assert_eq!(h.runner.tracked_locks(), 0);

        let other = suspended(h.runner.start("another story", Properties::default()).await.unwrap());
        h.runner.cancel(other.instance_id, "done").await.unwrap();
        assert_eq!(h.runner.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_cancel_finished_instance_is_rejected() {
        let h = TestHarness::with_parts(
            ScriptedGenerationPort::new().with_assessments([AssessmentOutcome::accept()]),
            ScriptedFeedbackPort::new(["great"]),
            fast_config(),
        );
        let result = completed(h.runner.start("a story", Properties::default()).await.unwrap());

        let err = h.runner.cancel(result.instance_id, "late").await.unwrap_err();
        assert!(matches!(err, WorkflowError::InstanceClosed { .. }));
    }

    #[tokio::test]
    async fn test_synchronous_feedback_completes_without_suspending() {
        let h = TestHarness::with_parts(
            ScriptedGenerationPort::new().with_assessments([AssessmentOutcome::accept()]),
            ScriptedFeedbackPort::new(["perfect"]),
            fast_config(),
        );

        let result = completed(h.runner.start("a story", Properties::default()).await.unwrap());

        assert_eq!(result.cycles, 1);
        assert_eq!(h.feedback.requests().len(), 1);
        assert_eq!(
            h.events.event_types(),
            vec![
                "workflow.started",
                "workflow.stage_entered",
                "workflow.suspended",
                "workflow.resumed",
                "workflow.stage_entered",
                "workflow.stage_entered",
                "workflow.completed",
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_instances_are_independent() {
        let h = TestHarness::new(
            ScriptedGenerationPort::new()
                .with_assessments(std::iter::repeat(AssessmentOutcome::accept()).take(5)),
        );
        let runner = &h.runner;
        let inputs: Vec<String> = (0..5).map(|i| format!("story number {i}")).collect();

        let started = futures::future::join_all(
            inputs
                .iter()
                .map(|input| runner.start(input.as_str(), Properties::default())),
        )
        .await;
        let requests: Vec<_> = started.into_iter().map(|o| suspended(o.unwrap())).collect();

        let finished = futures::future::join_all(
            requests.iter().map(|request| runner.resume(request.id, "good")),
        )
        .await;

        for (input, outcome) in inputs.iter().zip(finished) {
            let result = completed(outcome.unwrap());
            assert_eq!(&result.input.content, input);
            assert_eq!(result.cycles, 1);
        }
        assert_eq!(h.store.len(), 5);
    }

    #[tokio::test]
    async fn test_replayed_history_matches_persisted_stage() {
        let h = TestHarness::new(
            ScriptedGenerationPort::new()
                .with_assessments([AssessmentOutcome::revise(), AssessmentOutcome::accept()]),
        );

        let request = suspended(h.runner.start("a story", Properties::default()).await.unwrap());
        let request = suspended(h.runner.resume(request.id, "more wind").await.unwrap());

        let instance = h.runner.instance(request.instance_id).await.unwrap();
        let replayed = replay(h.runner.engine(), &instance.history).unwrap();
        assert_eq!(replayed.as_ref(), Some(&instance.stage));

        h.runner.resume(request.id, "yes").await.unwrap();
        let instance = h.runner.instance(request.instance_id).await.unwrap();
        let replayed = replay(h.runner.engine(), &instance.history).unwrap();
        assert_eq!(replayed.as_ref(), Some(&instance.stage));
    }

    #[tokio::test]
    async fn test_archive_removes_finished_instances_only() {
        let h = TestHarness::new(ScriptedGenerationPort::new());
        let request = suspended(h.runner.start("a story", Properties::default()).await.unwrap());

        assert!(matches!(
            h.runner.archive(request.instance_id).await,
            Err(WorkflowError::NotFinished { .. })
        ));

        h.runner.cancel(request.instance_id, "done").await.unwrap();
        let archived = h.runner.archive(request.instance_id).await.unwrap();

        assert_eq!(archived.status, InstanceStatus::Cancelled);
        assert!(h.store.is_empty());
        assert!(matches!(
            h.runner.instance(request.instance_id).await,
            Err(WorkflowError::UnknownInstance { .. })
        ));
    }

    #[cfg(feature = "file-store")]
    #[tokio::test]
    async fn test_resume_after_restart_with_file_store() {
        use crate::store::FileWorkflowStore;

        let dir = tempfile::tempdir().unwrap();
        let generation = Arc::new(
            ScriptedGenerationPort::new()
                .with_drafts([SHORT_DRAFT])
                .with_assessments([AssessmentOutcome::accept()]),
        );

        let build = |store: FileWorkflowStore| {
            WorkflowRunner::new(
                Arc::clone(&generation) as Arc<dyn GenerationPort>,
                Arc::new(InMemoryFeedbackPort::new()),
                Arc::new(store),
                RunnerConfig::default(),
            )
        };

        let request = {
            let runner = build(FileWorkflowStore::open(dir.path()).await.unwrap());
            suspended(runner.start("a story", Properties::default()).await.unwrap())
        };

        let runner = build(FileWorkflowStore::open(dir.path()).await.unwrap());
        let result = completed(runner.resume(request.id, "good as is").await.unwrap());

        assert_eq!(result.artifact.content, SHORT_DRAFT);
        assert_eq!(generation.call_count("create_artifact"), 1);
        assert_eq!(generation.call_count("review_artifact"), 1);
    }
}
