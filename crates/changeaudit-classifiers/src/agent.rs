//! Language-model classifier agent
//!
//! Sends one aligned pair plus the learned rules to a [`ModelBackend`] and
//! turns the reply into a [`Verdict`]. Transient transport failures are
//! retried within a small budget; timeouts and unparseable replies are not.
//! Whatever goes wrong, the caller receives a sentinel verdict.

use crate::backend::{BackendError, ModelBackend};
use crate::classifier::ChangeClassifier;
use crate::config::BackendConfig;
use crate::prompt;
use crate::response::ResponseParser;
use async_trait::async_trait;
use changeaudit_core::{AlignedPair, Error, Result, RuleSet, Verdict};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Classifier backed by a language model
pub struct ClassifierAgent {
    backend: Arc<dyn ModelBackend>,
    parser: ResponseParser,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl ClassifierAgent {
    /// Create an agent using the timeout and retry settings from `config`
    pub fn new(backend: Arc<dyn ModelBackend>, config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            backend,
            parser: ResponseParser::new()?,
            timeout: config.timeout(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        })
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the retry budget
    pub fn with_retries(mut self, max_retries: u32, delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = delay;
        self
    }

    /// Classify, surfacing the failure instead of substituting a sentinel
    pub async fn try_classify(&self, pair: &AlignedPair, rules: &RuleSet) -> Result<Verdict> {
        let request = prompt::build_request(pair, rules);
        let mut attempt = 0;

        let text = loop {
            let outcome = tokio::time::timeout(self.timeout, self.backend.generate(&request)).await;
            match outcome {
                Err(_) | Ok(Err(BackendError::Timeout)) => return Err(Error::Timeout),
                Ok(Ok(text)) => break text,
                Ok(Err(err)) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        backend = self.backend.name(),
                        attempt,
                        error = %err,
                        "Transient backend failure, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Ok(Err(err)) => return Err(Error::classification(err.to_string())),
            }
        };

        debug!(q_no = pair.id(), reply_len = text.len(), "Received model reply");
        if self.backend.expects_json() {
            self.parser.parse_json(&text, pair)
        } else {
            self.parser.parse(&text, pair)
        }
    }
}

#[async_trait]
impl ChangeClassifier for ClassifierAgent {
    async fn classify(&self, pair: &AlignedPair, rules: &RuleSet) -> Verdict {
        let start = Instant::now();
        let result = self.try_classify(pair, rules).await;
        metrics::histogram!("changeaudit_classification_latency_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(verdict) => {
                metrics::counter!("changeaudit_classifications_total", "outcome" => "ok")
                    .increment(1);
                verdict
            }
            Err(err) => {
                let outcome = if matches!(err, Error::Timeout) {
                    "timeout"
                } else {
                    "error"
                };
                metrics::counter!("changeaudit_classifications_total", "outcome" => outcome)
                    .increment(1);
                warn!(
                    q_no = pair.id(),
                    kind = %pair.kind,
                    error = %err,
                    "Classification failed, substituting sentinel verdict"
                );
                Verdict::sentinel(err.to_string())
            }
        }
    }

    fn name(&self) -> &str {
        self.backend.name()
    }
}
