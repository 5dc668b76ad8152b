//! Ordered credential patterns
//!
//! All patterns are case-insensitive. Order matters only for reporting;
//! detection stops at the first match.

use regex::Regex;
use std::sync::LazyLock;

pub(crate) struct SecretPattern {
    pub label: &'static str,
    pub regex: Regex,
}

const RAW_PATTERNS: &[(&str, &str)] = &[
    ("stripe-live-secret", r"sk_live_[a-zA-Z0-9]{24,}"),
    ("stripe-test-secret", r"sk_test_[a-zA-Z0-9]{24,}"),
    ("stripe-live-public", r"pk_live_[a-zA-Z0-9]{24,}"),
    ("aws-access-key", r"AKIA[0-9A-Z]{16}"),
    ("api-key-assignment", r#"api[_-]?key["']?\s*[:=]\s*["'][a-zA-Z0-9]{20,}"#),
    ("bearer-token", r"Bearer\s+[a-zA-Z0-9\-._~+/]+=*"),
    ("token-assignment", r#"token["']?\s*[:=]\s*["'][a-zA-Z0-9]{20,}"#),
    ("jwt", r"eyJ[a-zA-Z0-9_-]*\.eyJ[a-zA-Z0-9_-]*\."),
    ("password-assignment", r#"password["']?\s*[:=]\s*["'][^"'\s]{8,}"#),
    ("private-key-header", r"BEGIN [A-Z ]*PRIVATE KEY"),
    ("oauth-client-secret", r#"client_secret["']?\s*[:=]\s*["'][^"']+"#),
    ("service-account", r"service_account"),
];

pub(crate) static SECRET_PATTERNS: LazyLock<Vec<SecretPattern>> = LazyLock::new(|| {
    RAW_PATTERNS
        .iter()
        .map(|(label, pattern)| SecretPattern {
            label,
            regex: Regex::new(&format!("(?i){pattern}")).expect("Invalid credential pattern"),
        })
        .collect()
});
