use redeploy_core::{LogLevel, RecordingLogger};
use redeploy_deployer::{CommandRequest, CommandRunner, ProcessSupervisor, SupervisorError};
use std::sync::Arc;

fn supervisor() -> (ProcessSupervisor, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::new());
    (ProcessSupervisor::new(logger.clone()), logger)
}

#[tokio::test]
async fn test_captures_both_streams_in_order() {
    let (supervisor, _) = supervisor();
    let result = supervisor
        .execute(CommandRequest::new(
            "echo one; echo two; echo err1 >&2; echo three; echo err2 >&2",
            "Print lines",
        ))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    assert!(result.success);
    assert_eq!(result.stdout, vec!["one", "two", "three"]);
    assert_eq!(result.stderr, vec!["err1", "err2"]);
}

#[tokio::test]
async fn test_nonzero_exit_with_stderr_fails() {
    let (supervisor, _) = supervisor();
    let result = supervisor
        .execute(CommandRequest::new("echo broken >&2; exit 3", "Fail loudly"))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 3);
    assert!(!result.success);
}

#[tokio::test]
async fn test_nonzero_exit_without_stderr_is_accepted() {
    let (supervisor, _) = supervisor();
    let result = supervisor
        .execute(CommandRequest::new("echo fine; exit 1", "Fail quietly"))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 1);
    assert!(result.success);
}

#[tokio::test]
async fn test_build_heuristic_on_real_process() {
    let (supervisor, _) = supervisor();
    let built = supervisor
        .execute(
            CommandRequest::new(
                "echo 'Service web  Built'; echo 'some warning' >&2; exit 1",
                "Build images",
            )
            .build(),
        )
        .await
        .unwrap();
    assert!(built.success);

    let failed = supervisor
        .execute(
            CommandRequest::new("echo 'Service web  Failed'; exit 1", "Build images").build(),
        )
        .await
        .unwrap();
    assert!(!failed.success);
}

#[tokio::test]
async fn test_missing_working_dir_is_launch_error() {
    let (supervisor, _) = supervisor();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let err = supervisor
        .execute(CommandRequest::new("true", "Nothing").in_dir(&missing))
        .await
        .unwrap_err();
    assert!(matches!(err, SupervisorError::Launch { .. }));
}

#[tokio::test]
async fn test_runs_in_working_dir() {
    let (supervisor, _) = supervisor();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "here").unwrap();

    let result = supervisor
        .run(CommandRequest::new("cat marker.txt", "Read marker").in_dir(dir.path()))
        .await
        .unwrap();
    assert_eq!(result.stdout, vec!["here"]);
}

#[tokio::test]
async fn test_progress_lines_are_displayed() {
    let (supervisor, logger) = supervisor();
    supervisor
        .execute(CommandRequest::new(
            "echo 'Step 1/2 : FROM alpine'; echo; echo 'Step 2/2 : RUN true'",
            "Build",
        ))
        .await
        .unwrap();

    assert!(logger.contains(LogLevel::Progress, "Build..."));
    assert!(logger.contains(LogLevel::Progress, "[ 50%] Step 1/2 : FROM alpine"));
    assert!(logger.contains(LogLevel::Progress, "[100%] Step 2/2 : RUN true"));
    // the blank line is suppressed
    assert_eq!(logger.count(LogLevel::Info), 0);
}

#[tokio::test]
async fn test_quiet_requests_display_nothing() {
    let (supervisor, logger) = supervisor();
    let result = supervisor
        .execute(CommandRequest::new("echo hidden; echo also >&2", "Query").quiet())
        .await
        .unwrap();

    assert_eq!(result.stdout, vec!["hidden"]);
    assert!(logger.entries().is_empty());
}

#[tokio::test]
async fn test_stderr_lines_are_shown_as_info() {
    let (supervisor, logger) = supervisor();
    supervisor
        .execute(CommandRequest::new("echo ' Container web Started' >&2; echo '' >&2", "Up"))
        .await
        .unwrap();

    assert!(logger.contains(LogLevel::Info, "Container web Started"));
    assert_eq!(logger.count(LogLevel::Info), 1);
    assert_eq!(logger.count(LogLevel::Warning), 0);
}

fn step_lines(logger: &RecordingLogger) -> Vec<String> {
    logger
        .entries()
        .into_iter()
        .filter(|e| e.level == LogLevel::Progress && e.message.starts_with('['))
        .map(|e| e.message)
        .collect()
}

#[tokio::test]
async fn test_concurrent_invocations_track_their_own_progress() {
    let (first, first_logger) = supervisor();
    let (second, second_logger) = supervisor();
    let (a, b) = tokio::join!(
        first.execute(CommandRequest::new(
            "echo 'Step 1/4 : a'; sleep 0.05; echo 'Step 4/4 : a'",
            "Build A",
        )),
        second.execute(CommandRequest::new(
            "echo 'Step 1/2 : b'; sleep 0.05; echo 'Step 2/2 : b'",
            "Build B",
        )),
    );

    assert_eq!(a.unwrap().stdout, vec!["Step 1/4 : a", "Step 4/4 : a"]);
    assert_eq!(b.unwrap().stdout, vec!["Step 1/2 : b", "Step 2/2 : b"]);
    assert_eq!(
        step_lines(&first_logger),
        vec!["[ 25%] Step 1/4 : a", "[100%] Step 4/4 : a"]
    );
    assert_eq!(
        step_lines(&second_logger),
        vec!["[ 50%] Step 1/2 : b", "[100%] Step 2/2 : b"]
    );
}
