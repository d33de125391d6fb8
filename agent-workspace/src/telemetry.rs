use metrics::counter;

/// Counters for remote calls made through the execution wrapper.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteCallTelemetry;

impl RemoteCallTelemetry {
    pub fn record_attempt(&self, operation: &'static str) {
        counter!("agent_workspace_remote_calls_total", "operation" => operation).increment(1);
    }

    pub fn record_retry(&self, operation: &'static str) {
        counter!("agent_workspace_retries_total", "operation" => operation).increment(1);
    }

    pub fn record_failure(&self, operation: &'static str, kind: &'static str) {
        counter!(
            "agent_workspace_failures_total",
            "operation" => operation,
            "kind" => kind
        )
        .increment(1);
    }
}
