//! Post-conversation analysis, cleaned up for display.

use std::sync::LazyLock;

use regex::Regex;

use crate::backend::{AnalyzeResponse, ChatBackend};
use crate::session::SessionStore;

static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*\s*").unwrap());

/// Drop the leading `*` bullet the backend puts on list entries.
pub fn strip_marker(entry: &str) -> String {
    BULLET_RE.replace(entry, "").into_owned()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    pub mistakes: Vec<String>,
    pub suggestions: Vec<String>,
    pub vocab_tips: Vec<String>,
}

impl From<AnalyzeResponse> for AnalysisReport {
    fn from(response: AnalyzeResponse) -> Self {
        let clean = |entries: Vec<String>| -> Vec<String> {
            entries.iter().map(|e| strip_marker(e)).collect()
        };
        Self {
            mistakes: clean(response.mistakes),
            suggestions: clean(response.suggestions),
            vocab_tips: clean(response.vocab_tips),
        }
    }
}

/// What the analysis screen shows. Failure is terminal; there is no retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Loaded(AnalysisReport),
    Failed,
}

impl AnalysisOutcome {
    pub const FAILURE_NOTICE: &'static str = "Failed to load analysis.";
}

/// Fetch and clean the analysis for this profile's session.
pub async fn fetch_analysis(backend: &dyn ChatBackend, sessions: &SessionStore) -> AnalysisOutcome {
    let session_id = match sessions.get_or_create_session_id() {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Error fetching analysis: {}", e);
            return AnalysisOutcome::Failed;
        }
    };

    match backend.analyze(&session_id).await {
        Ok(response) => AnalysisOutcome::Loaded(response.into()),
        Err(e) => {
            tracing::error!("Error fetching analysis: {}", e);
            AnalysisOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("* He go to school"), "He go to school");
        assert_eq!(strip_marker("*He go to school"), "He go to school");
        assert_eq!(strip_marker("*   spaced"), "spaced");
        assert_eq!(strip_marker("no marker"), "no marker");
    }

    #[test]
    fn test_strip_marker_only_leading() {
        assert_eq!(strip_marker("use * carefully"), "use * carefully");
        assert_eq!(strip_marker("** double"), "* double");
        assert_eq!(strip_marker(" * indented"), " * indented");
    }

    #[test]
    fn test_report_from_response() {
        let report = AnalysisReport::from(AnalyzeResponse {
            mistakes: vec!["* He go to school".to_string()],
            suggestions: vec![],
            vocab_tips: vec!["*  Try \"commute\"".to_string(), "plain".to_string()],
        });
        assert_eq!(report.mistakes, vec!["He go to school"]);
        assert!(report.suggestions.is_empty());
        assert_eq!(report.vocab_tips, vec!["Try \"commute\"", "plain"]);
    }
}
