//! Batch pipeline.
//!
//! Reads work items, prepares a backend session once, runs the backend on
//! each item strictly in index order and records exactly one outcome per
//! item. Per-item failures are recorded and the run continues; only input,
//! backend preparation and output directory problems abort a run.

mod item;
mod outcome;
mod runner;
mod session;

pub use item::{OutputNaming, SEQUENCE_WIDTH, WorkItem, parse_items};
pub use outcome::{ItemOutcome, Outcome, RunReport, RunSummary};
pub use runner::{ItemError, Pipeline, PipelineError, RunOptions, ensure_output_dir, load_items};
pub use session::Session;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend};
    use crate::cli::ExistingPolicy;
    use std::collections::HashSet;
    use std::path::Path;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn item(index: usize, payload: &str) -> WorkItem {
        WorkItem {
            index,
            payload: payload.to_string(),
        }
    }

    fn echo_backend() -> MockBackend {
        let mut mock = MockBackend::new();
        mock.expect_prepare().times(1).returning(|| Ok(()));
        mock.expect_process()
            .returning(|_, item| Ok(format!("audio:{}", item.payload).into_bytes()));
        mock
    }

    fn pipeline(dir: &Path, on_existing: ExistingPolicy) -> Pipeline {
        Pipeline::new(
            OutputNaming::new(dir, "wav"),
            RunOptions {
                on_existing,
                ..RunOptions::default()
            },
        )
    }

    // ===========================================
    // Input parsing
    // ===========================================

    #[test]
    fn test_parse_items_skips_blank_lines() {
        let items = parse_items("Hello\n\nWorld\n");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], item(1, "Hello"));
        assert_eq!(items[1], item(2, "World"));
    }

    #[test]
    fn test_parse_items_counts_only_non_blank_lines() {
        let inputs = [
            "",
            "\n\n\n",
            "   \t\n",
            "one",
            "one\r\ntwo\r\n",
            "  a  \n \n\tb\n\n c",
        ];

        for input in inputs {
            let expected = input.lines().filter(|l| !l.trim().is_empty()).count();
            let items = parse_items(input);

            assert_eq!(items.len(), expected, "input {input:?}");
            let indices: Vec<usize> = items.iter().map(|i| i.index).collect();
            assert_eq!(indices, (1..=expected).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_parse_items_trims_payloads() {
        let items = parse_items("  https://example.com  \r\n");
        assert_eq!(items[0].payload, "https://example.com");
    }

    #[test]
    fn test_load_items_missing_file() {
        let result = load_items(Path::new("/nonexistent/lines.txt"));
        assert!(matches!(result.unwrap_err(), PipelineError::InputNotFound(_)));
    }

    #[test]
    fn test_load_items_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("lines.txt");
        std::fs::write(&input, "first\n\nsecond\n").unwrap();

        let items = load_items(&input).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].payload, "second");
    }

    // ===========================================
    // Output naming
    // ===========================================

    #[test]
    fn test_output_naming_zero_pads() {
        let naming = OutputNaming::new("/tmp/out", ".mp3");

        assert_eq!(naming.file_name(1), "0001.mp3");
        assert_eq!(naming.file_name(42), "0042.mp3");
        assert_eq!(naming.file_name(12345), "12345.mp3");
        assert_eq!(naming.path_for(7), Path::new("/tmp/out/0007.mp3"));
    }

    #[test]
    fn test_output_naming_is_injective() {
        let naming = OutputNaming::new("out", "wav");
        let paths: HashSet<_> = (1..=10_050).map(|i| naming.path_for(i)).collect();
        assert_eq!(paths.len(), 10_050);
    }

    // ===========================================
    // Session
    // ===========================================

    #[test]
    fn test_session_prepare_is_idempotent() {
        let mut mock = MockBackend::new();
        mock.expect_prepare().times(1).returning(|| Ok(()));

        let mut session = Session::new(mock);
        session.prepare().unwrap();
        session.prepare().unwrap();

        assert!(session.is_prepared());
    }

    #[test]
    fn test_session_process_before_prepare() {
        let mock = MockBackend::new();
        let session = Session::new(mock);

        let result = session.process(&WorkItem::single("Hello"));
        assert!(matches!(result.unwrap_err(), BackendError::NotPrepared));
    }

    #[test]
    fn test_session_failed_prepare_can_be_retried_by_caller() {
        let mut mock = MockBackend::new();
        let mut calls = 0;
        mock.expect_prepare().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Err(BackendError::Unavailable("starting".to_string()))
            } else {
                Ok(())
            }
        });

        let mut session = Session::new(mock);
        assert!(session.prepare().is_err());
        assert!(!session.is_prepared());
        session.prepare().unwrap();
        assert!(session.is_prepared());
    }

    // ===========================================
    // Pipeline runs
    // ===========================================

    #[test]
    fn test_run_skips_blank_lines_and_numbers_outputs() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");
        let items = parse_items("Hello\n\nWorld\n");

        let mut session = Session::new(echo_backend());
        let report = pipeline(&out, ExistingPolicy::Overwrite)
            .run(&mut session, &items, |_, _, _| {})
            .unwrap();

        assert_eq!(
            report.summary,
            RunSummary {
                attempted: 2,
                succeeded: 2,
                failed: 0,
            }
        );
        assert_eq!(std::fs::read(out.join("0001.wav")).unwrap(), b"audio:Hello");
        assert_eq!(std::fs::read(out.join("0002.wav")).unwrap(), b"audio:World");
        assert!(!out.join("0003.wav").exists());
    }

    #[test]
    fn test_run_continues_after_item_failure() {
        let temp_dir = TempDir::new().unwrap();
        let items = parse_items("one\ntwo\nthree");

        let mut mock = MockBackend::new();
        mock.expect_prepare().times(1).returning(|| Ok(()));
        mock.expect_process().times(3).returning(|_, item| {
            if item.index == 2 {
                Err(BackendError::RequestFailed("Status: 500".to_string()))
            } else {
                Ok(item.payload.clone().into_bytes())
            }
        });

        let mut session = Session::new(mock);
        let report = pipeline(temp_dir.path(), ExistingPolicy::Overwrite)
            .run(&mut session, &items, |_, _, _| {})
            .unwrap();

        assert_eq!(
            report.summary,
            RunSummary {
                attempted: 3,
                succeeded: 2,
                failed: 1,
            }
        );
        assert!(temp_dir.path().join("0001.wav").exists());
        assert!(!temp_dir.path().join("0002.wav").exists());
        assert!(temp_dir.path().join("0003.wav").exists());

        let indices: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        match &report.outcomes[1].outcome {
            Outcome::Failure { reason } => assert!(reason.contains("500")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_run_output_dir_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let not_a_dir = temp_dir.path().join("taken");
        std::fs::write(&not_a_dir, b"occupied").unwrap();

        let mut mock = MockBackend::new();
        mock.expect_prepare().times(1).returning(|| Ok(()));
        mock.expect_process().never();

        let mut attempted = 0;
        let mut session = Session::new(mock);
        let result = pipeline(&not_a_dir, ExistingPolicy::Overwrite).run(
            &mut session,
            &parse_items("Hello"),
            |_, _, _| attempted += 1,
        );

        assert!(matches!(result.unwrap_err(), PipelineError::OutputDir { .. }));
        assert_eq!(attempted, 0);
    }

    #[test]
    fn test_run_backend_unavailable_leaves_output_dir_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("never-created");

        let mut mock = MockBackend::new();
        mock.expect_prepare()
            .times(1)
            .returning(|| Err(BackendError::Unavailable("Connection refused".to_string())));
        mock.expect_process().never();

        let mut session = Session::new(mock);
        let result = pipeline(&out, ExistingPolicy::Overwrite).run(
            &mut session,
            &parse_items("Hello\nWorld"),
            |_, _, _| {},
        );

        assert!(matches!(
            result.unwrap_err(),
            PipelineError::BackendUnavailable(BackendError::Unavailable(_))
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_run_empty_input_yields_zero_summary() {
        let temp_dir = TempDir::new().unwrap();

        let mut session = Session::new(echo_backend());
        let report = pipeline(temp_dir.path(), ExistingPolicy::Overwrite)
            .run(&mut session, &[], |_, _, _| {})
            .unwrap();

        assert_eq!(report.summary, RunSummary::default());
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn test_run_reports_progress_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let items = parse_items("a\nb\nc\nd");

        let mut seen = Vec::new();
        let mut session = Session::new(echo_backend());
        pipeline(temp_dir.path(), ExistingPolicy::Overwrite)
            .run(&mut session, &items, |total, item, outcome| {
                seen.push((total, item.index, outcome.is_success()));
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![(4, 1, true), (4, 2, true), (4, 3, true), (4, 4, true)]
        );
    }

    #[test]
    fn test_run_processes_in_index_order_regardless_of_slice_order() {
        let temp_dir = TempDir::new().unwrap();
        let items = vec![item(2, "second"), item(1, "first")];

        let mut session = Session::new(echo_backend());
        let report = pipeline(temp_dir.path(), ExistingPolicy::Overwrite)
            .run(&mut session, &items, |_, _, _| {})
            .unwrap();

        assert_eq!(report.outcomes[0].payload, "first");
        assert_eq!(report.outcomes[1].payload, "second");
    }

    #[test]
    fn test_run_rejects_duplicate_indices() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");
        let items = vec![item(1, "first"), item(1, "second")];

        let mut mock = MockBackend::new();
        mock.expect_prepare().never();
        mock.expect_process().never();

        let mut session = Session::new(mock);
        let result =
            pipeline(&out, ExistingPolicy::Overwrite).run(&mut session, &items, |_, _, _| {});

        match result.unwrap_err() {
            PipelineError::InvalidItems(reason) => assert!(reason.contains("index 1")),
            other => panic!("expected invalid items, got {other:?}"),
        }
        assert!(!out.exists());
    }

    #[test]
    fn test_run_rejects_index_zero() {
        let temp_dir = TempDir::new().unwrap();
        let items = vec![item(0, "zero"), item(1, "one")];

        let mut mock = MockBackend::new();
        mock.expect_prepare().never();
        mock.expect_process().never();

        let mut session = Session::new(mock);
        let result = pipeline(temp_dir.path(), ExistingPolicy::Overwrite).run(
            &mut session,
            &items,
            |_, _, _| {},
        );

        assert!(matches!(result.unwrap_err(), PipelineError::InvalidItems(_)));
        assert!(!temp_dir.path().join("0000.wav").exists());
    }

    #[test]
    fn test_run_delays_between_items_only() {
        let temp_dir = TempDir::new().unwrap();
        let delay = Duration::from_millis(200);
        let pipeline = Pipeline::new(
            OutputNaming::new(temp_dir.path(), "wav"),
            RunOptions {
                delay,
                ..RunOptions::default()
            },
        );

        let mut session = Session::new(echo_backend());
        let start = Instant::now();
        let report = pipeline
            .run(&mut session, &parse_items("a\nb"), |_, _, _| {})
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(report.summary.succeeded, 2);
        assert!(elapsed >= delay, "elapsed {elapsed:?}");
        assert!(elapsed < delay * 2, "elapsed {elapsed:?}");
    }

    #[test]
    fn test_run_existing_file_error_policy() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("0001.wav"), b"keep me").unwrap();

        let mut mock = MockBackend::new();
        mock.expect_prepare().times(1).returning(|| Ok(()));
        mock.expect_process()
            .withf(|_, item| item.index == 2)
            .times(1)
            .returning(|_, _| Ok(b"fresh".to_vec()));

        let mut session = Session::new(mock);
        let report = pipeline(temp_dir.path(), ExistingPolicy::Error)
            .run(&mut session, &parse_items("one\ntwo"), |_, _, _| {})
            .unwrap();

        assert_eq!(
            report.summary,
            RunSummary {
                attempted: 2,
                succeeded: 1,
                failed: 1,
            }
        );
        assert_eq!(
            std::fs::read(temp_dir.path().join("0001.wav")).unwrap(),
            b"keep me"
        );
        assert_eq!(std::fs::read(temp_dir.path().join("0002.wav")).unwrap(), b"fresh");
    }

    #[test]
    fn test_run_existing_file_overwrite_policy() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("0001.wav"), b"old").unwrap();

        let mut session = Session::new(echo_backend());
        let report = pipeline(temp_dir.path(), ExistingPolicy::Overwrite)
            .run(&mut session, &parse_items("new"), |_, _, _| {})
            .unwrap();

        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(
            std::fs::read(temp_dir.path().join("0001.wav")).unwrap(),
            b"audio:new"
        );
    }

    #[test]
    fn test_run_empty_result_is_item_failure() {
        let temp_dir = TempDir::new().unwrap();

        let mut mock = MockBackend::new();
        mock.expect_prepare().times(1).returning(|| Ok(()));
        mock.expect_process().returning(|_, _| Ok(Vec::new()));

        let mut session = Session::new(mock);
        let report = pipeline(temp_dir.path(), ExistingPolicy::Overwrite)
            .run(&mut session, &parse_items("silent"), |_, _, _| {})
            .unwrap();

        assert_eq!(report.summary.failed, 1);
        assert!(!temp_dir.path().join("0001.wav").exists());
    }

    #[test]
    fn test_run_leaves_no_temporary_files() {
        let temp_dir = TempDir::new().unwrap();

        let mut session = Session::new(echo_backend());
        pipeline(temp_dir.path(), ExistingPolicy::Overwrite)
            .run(&mut session, &parse_items("a\nb"), |_, _, _| {})
            .unwrap();

        let mut names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["0001.wav", "0002.wav"]);
    }

    // ===========================================
    // Manifest
    // ===========================================

    #[test]
    fn test_write_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let items = parse_items("ok\nbad");

        let mut mock = MockBackend::new();
        mock.expect_prepare().times(1).returning(|| Ok(()));
        mock.expect_process().returning(|_, item| {
            if item.payload == "bad" {
                Err(BackendError::Unsupported("'bad' is not a URL".to_string()))
            } else {
                Ok(b"content".to_vec())
            }
        });

        let mut session = Session::new(mock);
        let report = pipeline(temp_dir.path(), ExistingPolicy::Overwrite)
            .run(&mut session, &items, |_, _, _| {})
            .unwrap();

        let path = report.write_manifest().unwrap();
        assert_eq!(path, temp_dir.path().join("_summary.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["summary"]["attempted"], 2);
        assert_eq!(json["summary"]["failed"], 1);
        assert_eq!(json["outcomes"][0]["status"], "success");
        assert_eq!(json["outcomes"][1]["status"], "failure");
        assert_eq!(json["outcomes"][1]["index"], 2);
    }
}
