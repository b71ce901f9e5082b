mod common;

use std::sync::Arc;

use common::{complete_record, read_records, record, write_fixture, FakeClient};
use question_enricher::error::{AppError, ConfigError};
use question_enricher::{App, RecordId};
use tempfile::TempDir;
use tokio_test::assert_ok;

#[tokio::test]
async fn resumes_and_checkpoints_a_partial_collection() {
    let dir = TempDir::new().unwrap();
    // 7 道题，其中 2 道已完成
    let records: Vec<_> = (1..=7)
        .map(|id| {
            if id == 2 || id == 5 {
                complete_record(id)
            } else {
                record(id, None)
            }
        })
        .collect();
    let config = write_fixture(dir.path(), &records);
    let questions_path = config.questions_path.clone();

    let client = Arc::new(FakeClient::new());
    let mut app = assert_ok!(App::initialize(config, client.clone()).await);
    let report = assert_ok!(app.run().await);

    assert_eq!(report.total_records, 7);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.pending, 5);
    assert_eq!(report.succeeded, 5);
    assert_eq!(report.failed, 0);
    assert_eq!(report.checkpoints, 1);
    assert_eq!(report.snapshots_written, 2);
    assert_eq!(client.calls(), 5);

    let saved = read_records(&questions_path);
    assert_eq!(saved.len(), 7);
    assert!(saved.iter().all(|r| r.analysis_len() > 500));
    // 已完成的题目保持原样
    assert_eq!(saved[1], records[1]);
    assert_eq!(saved[4], records[4]);
    assert_eq!(saved[0].legal_reference.as_deref(), Some("GDPR Article 6 - Q1"));
    // 顺序不变
    let ids: Vec<RecordId> = saved.iter().map(|r| r.id.clone()).collect();
    let expected: Vec<RecordId> = (1..=7).map(RecordId::Number).collect();
    assert_eq!(ids, expected);
    assert!(!dir.path().join("questions.json.tmp").exists());

    // 内存中的题库已全部完成
    assert_eq!(app.collection().len(), 7);
    assert!(app
        .collection()
        .pending(app.config().skip_threshold)
        .is_empty());
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let records: Vec<_> = (1..=3).map(|id| record(id, None)).collect();
    let config = write_fixture(dir.path(), &records);
    let questions_path = config.questions_path.clone();

    let mut first = assert_ok!(App::initialize(config.clone(), Arc::new(FakeClient::new())).await);
    assert_ok!(first.run().await);
    let before = std::fs::read(&questions_path).unwrap();

    let client = Arc::new(FakeClient::new());
    let mut second = assert_ok!(App::initialize(config, client.clone()).await);
    let report = assert_ok!(second.run().await);

    assert_eq!(report.pending, 0);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.snapshots_written, 0);
    assert_eq!(client.calls(), 0);
    assert_eq!(std::fs::read(&questions_path).unwrap(), before);
}

#[tokio::test]
async fn exhausted_items_keep_their_previous_values() {
    let dir = TempDir::new().unwrap();
    let mut stale = record(3, Some("旧解析".into()));
    stale.legal_reference = Some("旧法条".into());
    let records = vec![record(1, None), record(2, None), stale.clone()];
    let config = write_fixture(dir.path(), &records);
    let questions_path = config.questions_path.clone();

    let client = Arc::new(FakeClient::new().always_failing("Q3"));
    let mut app = assert_ok!(App::initialize(config.clone(), client.clone()).await);
    let report = assert_ok!(app.run().await);

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(client.attempts_for("Q3"), 3);

    let saved = read_records(&questions_path);
    assert_eq!(saved[2], stale);
    assert!(saved[0].analysis_len() > 500);

    // 下一次运行只会重试失败的那道题
    let retry_client = Arc::new(FakeClient::new());
    let mut rerun = assert_ok!(App::initialize(config, retry_client.clone()).await);
    let report = assert_ok!(rerun.run().await);
    assert_eq!(report.pending, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(retry_client.calls(), 1);
}

#[tokio::test]
async fn unknown_fields_survive_a_run() {
    let dir = TempDir::new().unwrap();
    let mut tagged = record(1, None);
    tagged
        .extra
        .insert("difficulty".into(), serde_json::json!("hard"));
    let config = write_fixture(dir.path(), &[tagged]);
    let questions_path = config.questions_path.clone();

    let mut app = assert_ok!(App::initialize(config, Arc::new(FakeClient::new())).await);
    assert_ok!(app.run().await);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&questions_path).unwrap()).unwrap();
    assert_eq!(raw[0]["difficulty"], "hard");
    assert_eq!(raw[0]["legalReference"], "GDPR Article 6 - Q1");
}

#[tokio::test]
async fn missing_questions_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = write_fixture(dir.path(), &[record(1, None)]);
    config.questions_path = dir.path().join("nope.json");

    let client = Arc::new(FakeClient::new());
    let err = App::initialize(config, client.clone())
        .await
        .err()
        .expect("missing questions file should fail");

    assert!(matches!(
        err,
        AppError::Config(ConfigError::InputNotFound { .. })
    ));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn missing_context_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = write_fixture(dir.path(), &[record(1, None)]);
    config.context_path = dir.path().join("missing.md");

    let err = App::initialize(config, Arc::new(FakeClient::new()))
        .await
        .err()
        .expect("missing context file should fail");

    assert!(matches!(
        err,
        AppError::Config(ConfigError::InputNotFound { .. })
    ));
}
