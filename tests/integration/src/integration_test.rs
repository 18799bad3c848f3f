//! End-to-end integration test for the deployment pipeline
//!
//! This test exercises the complete flow: config loading -> engine start ->
//! facade copy -> repository scan -> handler side effects.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use deploy_core::{
    DeploymentConfig, DeploymentEngine, DeploymentFacade, Handler, HandlerContext,
    OperationError, RepositoryScanner, Unit, UnitType,
};
use deploy_fs::{NormalizedPath, io};
use deploy_test_utils::touch;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Publishes text units into a runtime directory, the way a real deployer
/// would install artifacts into a server.
struct PublishingHandler {
    runtime: PathBuf,
    directory: Mutex<Option<NormalizedPath>>,
    unit_type: UnitType,
}

impl PublishingHandler {
    fn new(runtime: &Path) -> Self {
        Self {
            runtime: runtime.to_path_buf(),
            directory: Mutex::new(None),
            unit_type: UnitType::from("txt"),
        }
    }

    fn publish(&self, unit: &Unit) -> Result<(), OperationError> {
        let content = io::read_text(&unit.path)
            .map_err(|e| OperationError::with_source("cannot read unit", e))?;
        if content.contains("BROKEN") {
            return Err(OperationError::new(format!("{} is broken", unit.key)));
        }
        let target = NormalizedPath::new(self.runtime.join(&unit.key));
        io::write_text(&target, &content.to_uppercase())
            .map_err(|e| OperationError::with_source("cannot publish unit", e))
    }
}

impl Handler for PublishingHandler {
    fn name(&self) -> &str {
        "publisher"
    }

    fn unit_type(&self) -> &UnitType {
        &self.unit_type
    }

    fn location(&self) -> &str {
        "file:text-files"
    }

    fn init(&self, context: &HandlerContext) -> Result<(), OperationError> {
        fs::create_dir_all(&self.runtime)?;
        *self.directory.lock() = Some(context.directory.clone());
        Ok(())
    }

    fn deploy(&self, unit: &Unit) -> Result<(), OperationError> {
        self.publish(unit)
    }

    fn update(&self, unit: &Unit) -> Result<(), OperationError> {
        self.publish(unit)
    }

    fn undeploy(&self, key: &str) -> Result<(), OperationError> {
        let target = self.runtime.join(key);
        if target.exists() {
            fs::remove_file(target)?;
        }
        Ok(())
    }
}

/// Set up a config file pointing at a `repo` directory next to it.
fn setup_config(temp: &TempDir) -> PathBuf {
    let config_path = temp.path().join("deployment.toml");
    fs::write(
        &config_path,
        "repository = \"repo\"\nupdate_interval_secs = 1\n",
    )
    .unwrap();
    fs::create_dir_all(temp.path().join("repo")).unwrap();
    config_path
}

#[test]
fn test_full_pipeline() {
    let temp = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    let config = DeploymentConfig::load(setup_config(&temp)).unwrap();
    let runtime = temp.path().join("runtime");

    let engine = DeploymentEngine::shared();
    let handler = Arc::new(PublishingHandler::new(&runtime));
    engine.register_handler(handler.clone()).unwrap();
    engine.start(&config.repository).unwrap();
    assert!(handler.directory.lock().is_some());

    let scanner = RepositoryScanner::new(Arc::clone(&engine)).with_retry_faulty(config.retry_faulty);
    let facade = DeploymentFacade::new(Arc::clone(&engine));
    let txt = UnitType::from("txt");

    // Deploy through the facade, picked up by the scan
    let artifact = staging.path().join("greeting.txt");
    fs::write(&artifact, "hello").unwrap();
    let copied = facade.deploy(&artifact, &txt).unwrap();
    scanner.scan().unwrap();

    assert_eq!(fs::read_to_string(runtime.join("greeting.txt")).unwrap(), "HELLO");
    assert!(engine.deployed_unit(&txt, "greeting.txt").is_some());

    // Modify in place
    fs::write(copied.to_native(), "hello again").unwrap();
    touch(&copied.to_native());
    let report = scanner.scan().unwrap();
    assert_eq!(report.swept.updated.succeeded(), 1);
    assert_eq!(
        fs::read_to_string(runtime.join("greeting.txt")).unwrap(),
        "HELLO AGAIN"
    );

    // Undeploy through the facade
    facade.undeploy("greeting.txt", &txt).unwrap();
    scanner.scan().unwrap();
    assert!(!runtime.join("greeting.txt").exists());
    assert!(engine.deployed_units().is_empty());
}

#[test]
fn test_broken_artifact_recovers_after_fix() {
    let temp = TempDir::new().unwrap();
    let config = DeploymentConfig::load(setup_config(&temp)).unwrap();
    let runtime = temp.path().join("runtime");

    let engine = DeploymentEngine::shared();
    engine
        .register_handler(Arc::new(PublishingHandler::new(&runtime)))
        .unwrap();
    engine.start(&config.repository).unwrap();
    let scanner = RepositoryScanner::new(Arc::clone(&engine));
    let txt = UnitType::from("txt");

    let unit_path = config.repository.join("text-files").join("notes.txt");
    fs::write(&unit_path, "BROKEN").unwrap();
    fs::write(config.repository.join("text-files").join("ok.txt"), "fine").unwrap();

    let report = scanner.scan().unwrap();
    assert_eq!(report.swept.deployed.failed(), 1);
    assert_eq!(report.swept.deployed.succeeded(), 1);
    assert!(engine.faulty_units()[&txt].contains_key("notes.txt"));

    fs::write(&unit_path, "repaired").unwrap();
    touch(&unit_path);
    scanner.scan().unwrap();

    assert!(engine.faulty_units().is_empty());
    assert_eq!(fs::read_to_string(runtime.join("notes.txt")).unwrap(), "REPAIRED");
}
