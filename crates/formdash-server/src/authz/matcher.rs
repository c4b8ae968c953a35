use crate::config::AuthzSection;

use super::detector::DataAccessError;

/// Decides whether a data-access error is an authorization-policy rejection.
pub trait ViolationMatcher: Send + Sync {
    fn matches(&self, err: &DataAccessError) -> bool;
}

impl<F> ViolationMatcher for F
where
    F: Fn(&DataAccessError) -> bool + Send + Sync,
{
    fn matches(&self, err: &DataAccessError) -> bool {
        self(err)
    }
}

/// Code/substring heuristic.
///
/// False negatives (unknown backend codes) and false positives (an unrelated
/// message that happens to mention "policy") are both possible.
#[derive(Debug, Clone)]
pub struct HeuristicMatcher {
    codes: Vec<String>,
    substrings: Vec<String>, // lowercased
}

impl HeuristicMatcher {
    pub fn new<C, S>(codes: C, substrings: S) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            substrings: substrings.into_iter().map(|s| s.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn from_config(cfg: &AuthzSection) -> Self {
        Self::new(cfg.codes.iter().cloned(), &cfg.substrings)
    }
}

impl Default for HeuristicMatcher {
    fn default() -> Self {
        Self::from_config(&AuthzSection::default())
    }
}

impl ViolationMatcher for HeuristicMatcher {
    fn matches(&self, err: &DataAccessError) -> bool {
        if let Some(code) = &err.code {
            if self.codes.iter().any(|c| c == code) {
                return true;
            }
        }
        [Some(&err.message), err.details.as_ref(), err.hint.as_ref()]
            .into_iter()
            .flatten()
            .map(|text| text.to_lowercase())
            .any(|text| self.substrings.iter().any(|s| text.contains(s.as_str())))
    }
}
