//! Secret and PII redaction for outbound prompts.
//!
//! Redaction is a fixed, ordered sequence of regex substitutions. Narrow
//! patterns run before broad ones: a JWT would otherwise be eaten piecemeal
//! by the key/value rule, and an email's domain by nothing at all.
//!
//! Every placeholder is bracketed. Brackets are outside every pattern's
//! character classes, so a second pass never finds anything new.

use std::sync::LazyLock;

use regex::Regex;

pub const REDACTED_JWT: &str = "[REDACTED_JWT]";
pub const REDACTED_SECRET: &str = "[REDACTED_SECRET]";
pub const REDACTED_KEY: &str = "[REDACTED_KEY]";
pub const REDACTED_EMAIL: &str = "[REDACTED_EMAIL]";
pub const REDACTED_IP: &str = "[REDACTED_IP]";

/// One entry of the redaction table
#[derive(Debug, Clone, Copy)]
pub struct RedactionRule {
    /// Stable identifier, used in logs
    pub name: &'static str,
    /// Regex source
    pub pattern: &'static str,
    /// Replacement (may reference capture groups)
    pub replacement: &'static str,
}

/// The redaction table, in application order.
pub static REDACTION_RULES: &[RedactionRule] = &[
    RedactionRule {
        name: "jwt",
        pattern: r"eyJ[A-Za-z0-9_-]{5,}\.[A-Za-z0-9_-]{5,}\.[A-Za-z0-9_-]{5,}",
        replacement: REDACTED_JWT,
    },
    RedactionRule {
        name: "vendor_secret",
        pattern: r"\b(?:sk-|sk_live_|sk_test_|rk_live_|pk_live_|ghp_|gho_|ghu_|ghs_|ghr_|github_pat_|glpat-|xox[abposr]-|AKIA|hf_)[A-Za-z0-9_-]{10,}",
        replacement: REDACTED_SECRET,
    },
    RedactionRule {
        name: "key_value",
        pattern: r#"(?i)\b([A-Za-z0-9_]*?(?:api[_\- ]?key|access[_\-]?token|token|secret|password|passwd|bearer|authorization)[A-Za-z0-9_]*)(\s*[:=]\s*|\s+)["']?[A-Za-z0-9_\-./+=~]{16,}["']?"#,
        replacement: "${1}${2}[REDACTED_KEY]",
    },
    RedactionRule {
        name: "email",
        pattern: r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
        replacement: REDACTED_EMAIL,
    },
    RedactionRule {
        name: "ipv4",
        pattern: r"\b(?:(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\b",
        replacement: REDACTED_IP,
    },
];

static COMPILED_RULES: LazyLock<Vec<(RedactionRule, Regex)>> = LazyLock::new(|| {
    REDACTION_RULES
        .iter()
        .filter_map(|rule| match Regex::new(rule.pattern) {
            Ok(re) => Some((*rule, re)),
            Err(e) => {
                // A broken table entry is a build defect; the unit tests catch it.
                tracing::error!(rule = rule.name, error = %e, "Invalid redaction pattern");
                None
            }
        })
        .collect()
});

/// Remove secrets and personal data from text.
///
/// Total and idempotent. Empty input yields an empty string.
pub fn redact(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = text.to_string();
    for (rule, re) in COMPILED_RULES.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, rule.replacement).into_owned();
        }
    }
    out
}

/// Count substitutions per rule, applying the rules in order.
///
/// Only counts are returned so callers can log them without leaking text.
pub fn redaction_counts(text: &str) -> Vec<(&'static str, usize)> {
    let mut counts = Vec::with_capacity(COMPILED_RULES.len());
    let mut out = text.to_string();

    for (rule, re) in COMPILED_RULES.iter() {
        let n = re.find_iter(&out).count();
        if n > 0 {
            out = re.replace_all(&out, rule.replacement).into_owned();
        }
        counts.push((rule.name, n));
    }

    counts
}
