//! Exit code logic for the floodtiles process.
//!
//! Single responsibility: map a batch report to the process exit outcome.

use floodtiles_core::download::BatchReport;

use crate::ProcessExit;

/// Determines the process exit outcome from a finished batch.
pub(crate) fn determine_exit_outcome(report: &BatchReport) -> ProcessExit {
    if report.interrupted {
        ProcessExit::Interrupted
    } else if report.failed_total() > 0 {
        ProcessExit::Failures
    } else {
        ProcessExit::Success
    }
}

#[cfg(test)]
mod tests {
    use super::determine_exit_outcome;
    use crate::ProcessExit;
    use floodtiles_core::download::BatchReport;

    #[test]
    fn test_exit_outcome_success_when_no_failures() {
        let report = BatchReport {
            succeeded: 3,
            skipped_existing: 2,
            ..BatchReport::default()
        };
        assert_eq!(determine_exit_outcome(&report), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_success_when_nothing_to_do() {
        assert_eq!(determine_exit_outcome(&BatchReport::default()), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_failures_when_any_job_failed() {
        let report = BatchReport {
            succeeded: 2,
            exhausted: 1,
            ..BatchReport::default()
        };
        assert_eq!(determine_exit_outcome(&report), ProcessExit::Failures);
    }

    #[test]
    fn test_exit_outcome_interrupted_wins() {
        let report = BatchReport {
            failed: 1,
            not_started: 4,
            interrupted: true,
            ..BatchReport::default()
        };
        assert_eq!(determine_exit_outcome(&report), ProcessExit::Interrupted);
    }
}
