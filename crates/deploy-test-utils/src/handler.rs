//! [`RecordingHandler`]: a [`Handler`] that logs every call.

use std::collections::HashSet;
use std::sync::Arc;

use deploy_core::{Handler, HandlerContext, Operation, OperationError, Unit, UnitType};
use parking_lot::Mutex;

/// One handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub handler: String,
    pub operation: Operation,
    pub key: String,
}

/// Call log that can be shared between handlers to observe ordering.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all calls in invocation order.
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    /// Number of `operation` calls for `key`.
    pub fn count(&self, operation: Operation, key: &str) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|c| c.operation == operation && c.key == key)
            .count()
    }

    /// Position of the first `operation` call for `key`.
    pub fn position(&self, operation: Operation, key: &str) -> Option<usize> {
        self.0
            .lock()
            .iter()
            .position(|c| c.operation == operation && c.key == key)
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    fn push(&self, call: Call) {
        self.0.lock().push(call);
    }
}

/// Handler that records calls and fails for configured operations and keys.
pub struct RecordingHandler {
    name: String,
    unit_type: UnitType,
    location: String,
    log: CallLog,
    failures: Mutex<HashSet<(Operation, Option<String>)>>,
    init_error: Mutex<Option<String>>,
    inits: Mutex<Vec<HandlerContext>>,
}

impl RecordingHandler {
    pub fn new(name: &str, unit_type: &str, location: &str) -> Self {
        Self {
            name: name.to_string(),
            unit_type: UnitType::from(unit_type),
            location: location.to_string(),
            log: CallLog::new(),
            failures: Mutex::new(HashSet::new()),
            init_error: Mutex::new(None),
            inits: Mutex::new(Vec::new()),
        }
    }

    /// Record calls into a shared log instead of a private one.
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Make `init` fail with `message`.
    pub fn with_init_error(self, message: &str) -> Self {
        *self.init_error.lock() = Some(message.to_string());
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Fail `operation` for `key`.
    pub fn fail_on(&self, operation: Operation, key: &str) {
        self.failures.lock().insert((operation, Some(key.to_string())));
    }

    /// Fail `operation` for every key.
    pub fn fail_all(&self, operation: Operation) {
        self.failures.lock().insert((operation, None));
    }

    /// Stop failing anything.
    pub fn heal(&self) {
        self.failures.lock().clear();
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Calls made to this handler only.
    pub fn calls(&self) -> Vec<Call> {
        self.log
            .calls()
            .into_iter()
            .filter(|c| c.handler == self.name)
            .collect()
    }

    pub fn count(&self, operation: Operation, key: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.operation == operation && c.key == key)
            .count()
    }

    /// Contexts passed to `init`, in order.
    pub fn inits(&self) -> Vec<HandlerContext> {
        self.inits.lock().clone()
    }

    fn call(&self, operation: Operation, key: &str) -> Result<(), OperationError> {
        self.log.push(Call {
            handler: self.name.clone(),
            operation,
            key: key.to_string(),
        });

        let failures = self.failures.lock();
        if failures.contains(&(operation, None))
            || failures.contains(&(operation, Some(key.to_string())))
        {
            return Err(OperationError::new(format!(
                "{} failed to {operation} {key}",
                self.name
            )));
        }
        Ok(())
    }
}

impl Handler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn unit_type(&self) -> &UnitType {
        &self.unit_type
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn init(&self, context: &HandlerContext) -> Result<(), OperationError> {
        self.inits.lock().push(context.clone());
        match self.init_error.lock().as_ref() {
            Some(message) => Err(OperationError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn deploy(&self, unit: &Unit) -> Result<(), OperationError> {
        self.call(Operation::Deploy, &unit.key)
    }

    fn update(&self, unit: &Unit) -> Result<(), OperationError> {
        self.call(Operation::Update, &unit.key)
    }

    fn undeploy(&self, key: &str) -> Result<(), OperationError> {
        self.call(Operation::Undeploy, key)
    }
}
