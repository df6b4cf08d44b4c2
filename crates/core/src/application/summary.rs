// Status keyword summary

use crate::domain::StatusKeywords;
use crate::error::Result;
use crate::port::LogSource;

/// Last `limit` lines mentioning a keyword, oldest first
pub fn recent_activity(
    source: &dyn LogSource,
    keywords: &StatusKeywords,
    limit: usize,
) -> Result<Vec<String>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let lines = source.read_recent(limit, &|text: &str| keywords.matches(text))?;
    Ok(lines
        .into_iter()
        .map(|l| l.text.trim_end().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::log_source::mocks::{BrokenLogSource, ScriptedLogSource};

    fn source(texts: &[&str]) -> ScriptedLogSource {
        ScriptedLogSource::from_text("logs/pipeline_output.log", &[texts])
    }

    #[test]
    fn test_keeps_only_keyword_lines() {
        let log = source(&[
            "Pipeline started successfully",
            "Processing 2 queued jobs",
            "Watching directory: folders/input",
            "Job benzene completed successfully",
        ]);

        let summary = recent_activity(&log, &StatusKeywords::default(), 5).unwrap();
        assert_eq!(
            summary,
            vec![
                "Processing 2 queued jobs".to_string(),
                "Job benzene completed successfully".to_string()
            ]
        );
    }

    #[test]
    fn test_limits_to_newest() {
        let log = source(&[
            "Job a completed successfully",
            "Job b failed: scf (type: convergence)",
            "Job c completed successfully",
        ]);

        let summary = recent_activity(&log, &StatusKeywords::default(), 2).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0], "Job b failed: scf (type: convergence)");
        assert_eq!(summary[1], "Job c completed successfully");
    }

    #[test]
    fn test_no_matches_is_empty() {
        let log = source(&["nothing to see"]);
        assert!(recent_activity(&log, &StatusKeywords::default(), 5)
            .unwrap()
            .is_empty());
        assert!(recent_activity(&source(&[]), &StatusKeywords::default(), 5)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_read_error_is_returned() {
        assert!(recent_activity(&BrokenLogSource, &StatusKeywords::default(), 5).is_err());
    }
}
