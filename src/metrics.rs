use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::types::SignatureStatus;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    // Signing
    pub signing_attempts: u64,
    pub requests_signed: u64,
    pub signing_failures: u64,

    // Verification outcomes
    pub verifications_passed: u64,
    pub verifications_failed: u64,
    pub invalid_signature_format: u64,
    pub invalid_verification_key: u64,

    pub uptime_seconds: u64,
}

/// Outcome counters shared by every caller of a `ClientSignature`.
#[derive(Debug)]
pub struct MetricsCollector {
    signing_attempts: AtomicU64,
    requests_signed: AtomicU64,
    signing_failures: AtomicU64,
    verifications_passed: AtomicU64,
    verifications_failed: AtomicU64,
    invalid_signature_format: AtomicU64,
    invalid_verification_key: AtomicU64,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            signing_attempts: AtomicU64::new(0),
            requests_signed: AtomicU64::new(0),
            signing_failures: AtomicU64::new(0),
            verifications_passed: AtomicU64::new(0),
            verifications_failed: AtomicU64::new(0),
            invalid_signature_format: AtomicU64::new(0),
            invalid_verification_key: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_signing(&self, status: SignatureStatus) {
        self.signing_attempts.fetch_add(1, Ordering::Relaxed);
        if status.is_passed() {
            self.requests_signed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.signing_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_verification(&self, status: SignatureStatus) {
        let counter = match status {
            SignatureStatus::Passed => &self.verifications_passed,
            SignatureStatus::Failed => &self.verifications_failed,
            SignatureStatus::InvalidSignatureFormat => &self.invalid_signature_format,
            SignatureStatus::InvalidVerificationKey => &self.invalid_verification_key,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self) -> Metrics {
        Metrics {
            signing_attempts: self.signing_attempts.load(Ordering::Relaxed),
            requests_signed: self.requests_signed.load(Ordering::Relaxed),
            signing_failures: self.signing_failures.load(Ordering::Relaxed),
            verifications_passed: self.verifications_passed.load(Ordering::Relaxed),
            verifications_failed: self.verifications_failed.load(Ordering::Relaxed),
            invalid_signature_format: self.invalid_signature_format.load(Ordering::Relaxed),
            invalid_verification_key: self.invalid_verification_key.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counts_each_outcome() {
        let m = MetricsCollector::new();
        m.record_signing(SignatureStatus::Passed);
        m.record_signing(SignatureStatus::Failed);
        m.record_verification(SignatureStatus::Passed);
        m.record_verification(SignatureStatus::InvalidSignatureFormat);
        m.record_verification(SignatureStatus::InvalidVerificationKey);
        m.record_verification(SignatureStatus::Failed);

        let snap = m.get_metrics();
        assert_eq!(snap.signing_attempts, 2);
        assert_eq!(snap.requests_signed, 1);
        assert_eq!(snap.signing_failures, 1);
        assert_eq!(snap.verifications_passed, 1);
        assert_eq!(snap.verifications_failed, 1);
        assert_eq!(snap.invalid_signature_format, 1);
        assert_eq!(snap.invalid_verification_key, 1);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let m = Arc::new(MetricsCollector::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&m);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        m.record_signing(SignatureStatus::Passed);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(m.get_metrics().requests_signed, 1000);
    }
}
