// Windowed parallel validation against the file-backed artifact store

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use mailferry_core::application::{
    shutdown_channel, CheckRunner, RetryOptions, SessionManager, ShutdownToken,
    ValidationExecutor,
};
use mailferry_core::domain::{OverallStatus, ValidationDepth};
use mailferry_core::port::directory_gateway::mocks::MockDirectoryGateway;
use mailferry_core::port::identity_source::mocks::VecIdentitySource;
use mailferry_core::port::time_provider::SystemTimeProvider;
use mailferry_core::port::ArtifactStore;
use mailferry_core::AppError;
use mailferry_infra_file::FileArtifactStore;

fn executor_for(
    gateway: Arc<MockDirectoryGateway>,
    artifacts: Arc<FileArtifactStore>,
    window_size: usize,
    concurrency: usize,
    shutdown: ShutdownToken,
) -> ValidationExecutor {
    let time = Arc::new(SystemTimeProvider);
    let session = Arc::new(SessionManager::new(gateway.clone(), time.clone()));
    let runner = Arc::new(CheckRunner::new(
        gateway,
        session,
        time.clone(),
        ValidationDepth::Basic,
        RetryOptions::transient_only(1, Duration::from_millis(1)),
    ));
    ValidationExecutor::new(runner, artifacts, time, window_size, concurrency, shutdown)
        .expect("valid executor config")
}

#[tokio::test]
async fn test_five_identities_two_windows_bounded_concurrency() {
    let dir = tempdir().unwrap();
    let identities = [
        "a@contoso.com",
        "b@contoso.com",
        "c@contoso.com",
        "d@contoso.com",
        "e@contoso.com",
    ];

    let gateway = Arc::new(
        MockDirectoryGateway::new().with_call_delay(Duration::from_millis(10)),
    );
    gateway.add_healthy_mailboxes(&identities);
    let artifacts = Arc::new(FileArtifactStore::new(dir.path()));

    let executor = executor_for(
        gateway.clone(),
        artifacts.clone(),
        2,
        2,
        ShutdownToken::inert(),
    );
    let mut source = VecIdentitySource::from_strs(&identities);
    let location = executor.validate_all(&mut source).await.unwrap();

    let results = artifacts.load_combined(&location).await.unwrap();
    assert_eq!(results.len(), 5);
    // Input order is preserved across windows
    let order: Vec<_> = results.iter().map(|r| r.identity.as_str()).collect();
    assert_eq!(order, identities);
    assert!(results
        .iter()
        .all(|r| r.overall_status == OverallStatus::Ready));

    // At most `concurrency` remote calls were ever in flight
    assert!(
        gateway.max_in_flight() <= 2,
        "max in flight was {}",
        gateway.max_in_flight()
    );
}

#[tokio::test]
async fn test_persisted_window_is_not_rerun() {
    let dir = tempdir().unwrap();
    let identities = ["a@contoso.com", "b@contoso.com", "c@contoso.com", "d@contoso.com"];

    let gateway = Arc::new(MockDirectoryGateway::new());
    gateway.add_healthy_mailboxes(&identities);
    let artifacts = Arc::new(FileArtifactStore::new(dir.path()));

    // Model a previous run that persisted window 0 and was then interrupted
    let seeded = {
        let mut results = Vec::new();
        for identity in &identities[..2] {
            let mut r = mailferry_core::domain::ValidationResult::new(*identity);
            r.finalize(1000);
            results.push(r);
        }
        results
    };
    artifacts.write_window(0, &seeded).await.unwrap();

    let executor = executor_for(
        gateway.clone(),
        artifacts.clone(),
        2,
        2,
        ShutdownToken::inert(),
    );
    let mut source = VecIdentitySource::from_strs(&identities);
    let location = executor.validate_all(&mut source).await.unwrap();

    let results = artifacts.load_combined(&location).await.unwrap();
    assert_eq!(results.len(), 4);
    // Only the second window's identities were validated remotely
    assert_eq!(gateway.calls_for("get_license_details"), 2);
}

#[tokio::test]
async fn test_shutdown_before_first_window_performs_no_calls() {
    let dir = tempdir().unwrap();
    let gateway = Arc::new(MockDirectoryGateway::new());
    gateway.add_healthy_mailboxes(&["a@contoso.com"]);
    let artifacts = Arc::new(FileArtifactStore::new(dir.path()));

    let (sender, token) = shutdown_channel();
    sender.shutdown();

    let executor = executor_for(gateway.clone(), artifacts, 2, 2, token);
    let mut source = VecIdentitySource::from_strs(&["a@contoso.com"]);
    let error = executor.validate_all(&mut source).await.unwrap_err();

    assert!(matches!(error, AppError::Interrupted(_)));
    assert_eq!(gateway.total_calls(), 0);
}
