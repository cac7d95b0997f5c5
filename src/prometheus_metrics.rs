use prometheus_client::{
    encoding::text::encode,
    metrics::{counter::Counter, gauge::Gauge},
    registry::Registry,
};

use crate::metrics::Metrics;

/// Prometheus text exposition of the [`Metrics`] counters.
pub struct PrometheusMetrics {
    registry: Registry,

    // Counters
    signing_attempts: Counter,
    requests_signed: Counter,
    signing_failures: Counter,
    verifications_passed: Counter,
    verifications_failed: Counter,
    invalid_signature_format: Counter,
    invalid_verification_key: Counter,

    // Gauges
    uptime_seconds: Gauge<i64>,
}

impl Default for PrometheusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PrometheusMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let signing_attempts = Counter::default();
        let requests_signed = Counter::default();
        let signing_failures = Counter::default();
        let verifications_passed = Counter::default();
        let verifications_failed = Counter::default();
        let invalid_signature_format = Counter::default();
        let invalid_verification_key = Counter::default();
        let uptime_seconds = Gauge::default();

        registry.register(
            "tcf_signature_signing_attempts",
            "Work order requests submitted for signing",
            signing_attempts.clone(),
        );
        registry.register(
            "tcf_signature_requests_signed",
            "Work order requests signed successfully",
            requests_signed.clone(),
        );
        registry.register(
            "tcf_signature_signing_failures",
            "Work order requests rejected during signing",
            signing_failures.clone(),
        );
        registry.register(
            "tcf_signature_verifications_passed",
            "Signature checks that passed",
            verifications_passed.clone(),
        );
        registry.register(
            "tcf_signature_verifications_failed",
            "Signature checks that failed",
            verifications_failed.clone(),
        );
        registry.register(
            "tcf_signature_invalid_signature_format",
            "Signature checks rejected for a malformed signature",
            invalid_signature_format.clone(),
        );
        registry.register(
            "tcf_signature_invalid_verification_key",
            "Signature checks rejected for an unparsable verification key",
            invalid_verification_key.clone(),
        );
        registry.register(
            "tcf_signature_uptime_seconds",
            "Seconds since the metrics collector started",
            uptime_seconds.clone(),
        );

        Self {
            registry,
            signing_attempts,
            requests_signed,
            signing_failures,
            verifications_passed,
            verifications_failed,
            invalid_signature_format,
            invalid_verification_key,
            uptime_seconds,
        }
    }

    /// Bring the exported series up to a collector snapshot. Counters only
    /// move forward.
    pub fn update_from_metrics(&self, metrics: &Metrics) {
        advance(&self.signing_attempts, metrics.signing_attempts);
        advance(&self.requests_signed, metrics.requests_signed);
        advance(&self.signing_failures, metrics.signing_failures);
        advance(&self.verifications_passed, metrics.verifications_passed);
        advance(&self.verifications_failed, metrics.verifications_failed);
        advance(&self.invalid_signature_format, metrics.invalid_signature_format);
        advance(&self.invalid_verification_key, metrics.invalid_verification_key);
        self.uptime_seconds.set(metrics.uptime_seconds as i64);
    }

    pub fn export_metrics(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

fn advance(counter: &Counter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_snapshot_values() {
        let prom = PrometheusMetrics::new();
        let snapshot = Metrics {
            signing_attempts: 3,
            requests_signed: 2,
            signing_failures: 1,
            verifications_passed: 5,
            ..Metrics::default()
        };
        prom.update_from_metrics(&snapshot);
        prom.update_from_metrics(&snapshot);

        let text = prom.export_metrics().unwrap();
        assert!(text.contains("tcf_signature_signing_attempts_total 3"));
        assert!(text.contains("tcf_signature_requests_signed_total 2"));
        assert!(text.contains("tcf_signature_verifications_passed_total 5"));
        assert!(text.contains("tcf_signature_invalid_verification_key_total 0"));
    }
}
