//! Shared plumbing every provider client in `remote/` and `local/` uses:
//! audit-log recording and cost lookup at the one point all providers
//! converge — after a successful HTTP round trip, before returning
//! [`intent_graph_core::RawLlmResponse`] to the caller.

use crate::audit::{AuditEntry, AuditLog};
use crate::pricing::CostCalculator;
use chrono::Utc;
use intent_graph_core::RawLlmResponse;
use std::sync::Arc;
use std::time::Duration;

/// Held by every concrete [`intent_graph_core::LLMClient`] alongside its
/// provider-specific HTTP plumbing. Cloning a client clones this cheaply
/// (an `Arc` to the log, an `Arc` to the calculator), matching the
/// `#[derive(Clone)]` every provider client in the teacher's `llm` crate
/// carries.
#[derive(Clone, Default)]
pub struct ProviderBase {
    audit_log: Arc<AuditLog>,
    cost_calculator: Option<Arc<dyn CostCalculator>>,
}

impl ProviderBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audit_log(mut self, log: Arc<AuditLog>) -> Self {
        self.audit_log = log;
        self
    }

    pub fn with_cost_calculator(mut self, calculator: Arc<dyn CostCalculator>) -> Self {
        self.cost_calculator = Some(calculator);
        self
    }

    pub fn audit_log(&self) -> &Arc<AuditLog> {
        &self.audit_log
    }

    /// Price the call (if a calculator is registered — §4.8: "missing
    /// pricing yields zero cost and a warning"), append the audit entry,
    /// and return the finished [`RawLlmResponse`].
    pub fn record(
        &self,
        prompt: &str,
        provider: &str,
        model: &str,
        content: String,
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
        duration: Duration,
    ) -> RawLlmResponse {
        let cost = match (self.cost_calculator.as_ref(), input_tokens, output_tokens) {
            (Some(calc), Some(input), Some(output)) => {
                let cost = calc.cost(provider, model, input, output);
                if cost.is_none() {
                    tracing::warn!(provider, model, "no pricing registered; recording zero cost");
                }
                cost
            }
            _ => None,
        };

        self.audit_log.record(AuditEntry {
            timestamp: Utc::now(),
            prompt: prompt.to_string(),
            response: content.clone(),
            model: model.to_string(),
            provider: provider.to_string(),
            input_tokens,
            output_tokens,
            cost,
            duration: Some(duration),
        });

        RawLlmResponse {
            content,
            model: model.to_string(),
            provider: provider.to_string(),
            input_tokens,
            output_tokens,
            cost,
            duration: Some(duration),
            metadata: std::collections::HashMap::new(),
        }
    }
}

/// Map an HTTP status + body into the right [`crate::error::LlmError`]
/// variant, shared by every provider's non-2xx branch.
pub fn status_to_error(status: reqwest::StatusCode, body: String) -> crate::error::LlmError {
    match status.as_u16() {
        401 | 403 => crate::error::LlmError::AuthenticationError(body),
        429 => crate::error::LlmError::RateLimitExceeded(body),
        503 => crate::error::LlmError::ServiceUnavailable(body),
        _ => crate::error::LlmError::ProviderError(format!("{status}: {body}")),
    }
}
