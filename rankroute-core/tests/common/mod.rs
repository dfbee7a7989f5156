//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use rankroute_core::protocol::{Message, QueryOptions, QueryResult};
use rankroute_core::providers::{
    Provider, ProviderError, ProviderResult, QuotaLimits, QuotaTracker,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One recorded `send`
#[derive(Debug, Clone)]
pub struct Call {
    pub provider: String,
    pub messages: Vec<Message>,
    pub options: QueryOptions,
}

/// Call log shared between providers so ordering across them is visible
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.provider).collect()
    }

    pub fn count(&self, provider: &str) -> usize {
        self.calls().iter().filter(|c| c.provider == provider).count()
    }
}

/// In-memory provider answering from a script
pub struct ScriptedProvider {
    name: String,
    rank: i32,
    quota: QuotaTracker,
    script: Mutex<VecDeque<ProviderResult<QueryResult>>>,
    otherwise: ProviderResult<QueryResult>,
    delay: Option<Duration>,
    close_error: Option<ProviderError>,
    closed: Arc<Mutex<bool>>,
    log: CallLog,
}

impl ScriptedProvider {
    /// A provider that answers "from {name}" forever
    pub fn new(name: &str, rank: i32, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            rank,
            quota: QuotaTracker::unlimited(),
            script: Mutex::new(VecDeque::new()),
            otherwise: Ok(QueryResult::new(format!("from {}", name), format!("{}-model", name))),
            delay: None,
            close_error: None,
            closed: Arc::new(Mutex::new(false)),
            log: log.clone(),
        }
    }

    /// Fail every call with `error`
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.otherwise = Err(error);
        self
    }

    /// Answer every call with `result`
    pub fn answering(mut self, result: QueryResult) -> Self {
        self.otherwise = Ok(result);
        self
    }

    /// Queue a one-off outcome ahead of the default one
    pub fn then(self, outcome: ProviderResult<QueryResult>) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    pub fn with_quota(mut self, limits: QuotaLimits) -> Self {
        self.quota = QuotaTracker::new(limits);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_close_error(mut self, error: ProviderError) -> Self {
        self.close_error = Some(error);
        self
    }

    /// Flag set once `close` has run
    pub fn closed_flag(&self) -> Arc<Mutex<bool>> {
        Arc::clone(&self.closed)
    }

    pub fn boxed(self) -> Box<dyn Provider> {
        Box::new(self)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn rank(&self) -> i32 {
        self.rank
    }

    fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    async fn send(
        &self,
        messages: &[Message],
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> ProviderResult<QueryResult> {
        self.log.push(Call {
            provider: self.name.clone(),
            messages: messages.to_vec(),
            options: options.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.otherwise.clone())
    }

    async fn close(&self) -> ProviderResult<()> {
        *self.closed.lock().unwrap() = true;
        match &self.close_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Route test logs through tracing; repeated calls are harmless
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
