//! Scenario tests for reconciliation across several handlers
//!
//! Each test drives the engine only through the repository directories, the
//! way a host application would, and checks the observable results: tracked
//! units, handler calls and lifecycle events.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use deploy_core::{
    DeploymentEngine, LifecycleEventType, LifecycleState, Operation, RepositoryScanner,
    ScanScheduler, UnitType,
};
use deploy_test_utils::{CallLog, RecordingHandler, RecordingListener, TestRepository};
use pretty_assertions::assert_eq;

struct Host {
    repo: TestRepository,
    engine: Arc<DeploymentEngine>,
    log: CallLog,
    text: Arc<RecordingHandler>,
    web: Arc<RecordingHandler>,
    listener: Arc<RecordingListener>,
}

impl Host {
    fn start() -> Self {
        let repo = TestRepository::new();
        let engine = DeploymentEngine::shared();
        let log = CallLog::new();
        let text = RecordingHandler::new("text-deployer", "txt", "text-files")
            .with_log(log.clone())
            .shared();
        let web = RecordingHandler::new("web-deployer", "webapp", "webapps")
            .with_log(log.clone())
            .shared();
        engine.register_handler(text.clone()).unwrap();
        engine.register_handler(web.clone()).unwrap();
        let listener = Arc::new(RecordingListener::new());
        engine.add_listener(listener.clone());
        engine.start(repo.root()).unwrap();

        Self {
            repo,
            engine,
            log,
            text,
            web,
            listener,
        }
    }

    fn scanner(&self) -> RepositoryScanner {
        RepositoryScanner::new(Arc::clone(&self.engine))
    }
}

#[test]
fn test_repository_lifecycle_across_handlers() {
    let host = Host::start();
    let scanner = host.scanner();
    let txt = UnitType::from("txt");
    let webapp = UnitType::from("webapp");

    host.repo.write("text-files/sample1.txt", "one");
    host.repo.write("webapps/shop/index.html", "<html/>");
    scanner.scan().unwrap();

    assert!(host.engine.deployed_unit(&txt, "sample1.txt").is_some());
    assert!(host.engine.deployed_unit(&webapp, "shop").is_some());
    assert_eq!(host.engine.tracker().counts(), (2, 0));

    host.repo.remove("webapps/shop");
    host.repo.touch("text-files/sample1.txt");
    scanner.scan().unwrap();

    assert!(host.engine.deployed_unit(&webapp, "shop").is_none());
    assert_eq!(host.text.count(Operation::Update, "sample1.txt"), 1);
    assert_eq!(host.web.count(Operation::Undeploy, "shop"), 1);

    let shop_events: Vec<_> = host
        .listener
        .events_for("shop")
        .into_iter()
        .map(|e| (e.event_type, e.state))
        .collect();
    assert_eq!(
        shop_events,
        vec![
            (LifecycleEventType::BeforeStart, LifecycleState::Pending),
            (LifecycleEventType::AfterStart, LifecycleState::Successful),
            (LifecycleEventType::BeforeStop, LifecycleState::Pending),
            (LifecycleEventType::AfterStop, LifecycleState::Successful),
        ]
    );
}

#[test]
fn test_broken_handler_does_not_block_others() {
    let host = Host::start();
    let scanner = host.scanner();
    host.web.fail_all(Operation::Deploy);

    host.repo.write("webapps/shop.war", "war");
    host.repo.write("text-files/a.txt", "a");
    host.repo.write("text-files/b.txt", "b");
    let report = scanner.scan().unwrap();

    assert_eq!(report.swept.deployed.succeeded(), 2);
    assert_eq!(report.swept.deployed.failed(), 1);
    assert_eq!(host.engine.tracker().counts(), (2, 1));

    let failed = host
        .listener
        .events_for("shop.war")
        .into_iter()
        .find(|e| e.state == LifecycleState::Failed)
        .unwrap();
    assert_eq!(
        failed.message.as_deref(),
        Some("web-deployer failed to deploy shop.war")
    );
}

#[test]
fn test_concurrent_scans_deploy_each_unit_once() {
    let host = Host::start();
    let scanner = Arc::new(host.scanner());
    for i in 0..10 {
        host.repo.write(&format!("text-files/unit-{i}.txt"), "x");
    }

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let scanner = Arc::clone(&scanner);
            thread::spawn(move || scanner.scan().unwrap())
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    for i in 0..10 {
        assert_eq!(host.text.count(Operation::Deploy, &format!("unit-{i}.txt")), 1);
    }
    assert_eq!(host.log.len(), 10);
}

#[test]
fn test_independent_engines_do_not_share_state() {
    let first = Host::start();
    let second = Host::start();
    first.repo.write("text-files/a.txt", "a");

    first.scanner().scan().unwrap();
    second.scanner().scan().unwrap();

    assert_eq!(first.engine.tracker().counts(), (1, 0));
    assert_eq!(second.engine.tracker().counts(), (0, 0));
    assert!(second.log.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduler_reconciles_in_background() {
    let host = Host::start();
    let scanner = Arc::new(host.scanner());
    let scheduler = ScanScheduler::spawn(scanner, Duration::from_millis(25));
    let mut completed = scheduler.subscribe();
    completed.wait_for(|count| *count >= 1).await.unwrap();

    host.repo.write("text-files/late.txt", "late");
    let seen = *completed.borrow();
    completed.wait_for(|count| *count >= seen + 2).await.unwrap();

    assert!(
        host.engine
            .deployed_unit(&UnitType::from("txt"), "late.txt")
            .is_some()
    );
    scheduler.shutdown().await;
}
