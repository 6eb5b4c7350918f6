// src/matcher.rs
//! Certificate predicates applied by the classify stage

use regex::Regex;

use crate::cert_parser::ParsedCertificate;

/// Predicate deciding whether a decoded certificate is reported.
///
/// Implementations are shared across classify workers and must be pure.
pub trait Matcher: Send + Sync {
    fn certificate_matches(&self, cert: &ParsedCertificate<'_>) -> bool;
}

/// Matches every certificate
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl Matcher for MatchAll {
    fn certificate_matches(&self, _cert: &ParsedCertificate<'_>) -> bool {
        true
    }
}

/// Matches nothing; useful for counting or precert-only runs
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchNone;

impl Matcher for MatchNone {
    fn certificate_matches(&self, _cert: &ParsedCertificate<'_>) -> bool {
        false
    }
}

/// Matches when the regex is found in any subject CN or alt name
#[derive(Debug, Clone)]
pub struct MatchSubjectRegex {
    subject_regex: Regex,
}

impl MatchSubjectRegex {
    pub fn new(subject_regex: Regex) -> Self {
        Self { subject_regex }
    }

    /// Compile `pattern` into a matcher
    pub fn from_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::new(Regex::new(pattern)?))
    }

    pub fn pattern(&self) -> &str {
        self.subject_regex.as_str()
    }
}

impl Matcher for MatchSubjectRegex {
    fn certificate_matches(&self, cert: &ParsedCertificate<'_>) -> bool {
        if cert
            .common_names()
            .iter()
            .any(|cn| self.subject_regex.is_match(cn))
        {
            return true;
        }

        cert.alt_names()
            .iter()
            .any(|name| self.subject_regex.is_match(name))
    }
}
