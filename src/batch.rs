//! Sequential multi-form execution with rate-limit pacing.
//!
//! Forms are independent: one failed run never blocks the rest of the
//! batch. The sleep between groups of pipelines only exists to stay under
//! the LLM service's request quota.

use std::thread::sleep;

use log::{info, warn};

use crate::config::BatchPacing;
use crate::pipeline::RunReport;

/// A deferred pipeline run, boxed so heterogeneous forms can share a batch.
pub type BatchJob<'a> = Box<dyn FnOnce() -> RunReport + 'a>;

/// Runs every job in order, sleeping after each `pacing.interval` jobs
/// (except after the last). Returns every report, failed runs included.
pub fn run_with_pacing(jobs: Vec<BatchJob<'_>>, pacing: BatchPacing) -> Vec<RunReport> {
    let total = jobs.len();
    let mut reports = Vec::with_capacity(total);

    for (index, job) in jobs.into_iter().enumerate() {
        let report = job();
        if report.success {
            info!("[{}] batch job {}/{} succeeded", report.form, index + 1, total);
        } else {
            warn!(
                "[{}] batch job {}/{} failed: {}",
                report.form,
                index + 1,
                total,
                report.errors.join("; ")
            );
        }
        reports.push(report);

        let done = index + 1;
        if pacing.interval > 0 && done % pacing.interval == 0 && done != total {
            info!("Pacing: sleeping {:?} before next pipeline", pacing.delay);
            sleep(pacing.delay);
        }
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineState;
    use std::time::Duration;

    fn stub_report(form: &str, success: bool) -> RunReport {
        let mut report = RunReport {
            form: form.to_string(),
            success,
            final_state: if success {
                PipelineState::Saved
            } else {
                PipelineState::Failed
            },
            steps_completed: Vec::new(),
            errors: Vec::new(),
            advisories: Vec::new(),
            totals: None,
            line_items: 0,
            cells_written: 0,
        };
        if !success {
            report.errors.push("stubbed failure".to_string());
        }
        report
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let pacing = BatchPacing {
            delay: Duration::from_millis(0),
            interval: 2,
        };
        let jobs: Vec<BatchJob> = vec![
            Box::new(|| stub_report("patenting", true)),
            Box::new(|| stub_report("commercialization", false)),
            Box::new(|| stub_report("staff", true)),
        ];

        let reports = run_with_pacing(jobs, pacing);
        assert_eq!(reports.len(), 3);
        assert!(reports[0].success);
        assert!(!reports[1].success);
        assert!(reports[2].success);
    }

    #[test]
    fn test_zero_interval_never_sleeps() {
        let pacing = BatchPacing {
            delay: Duration::from_secs(3600),
            interval: 0,
        };
        let jobs: Vec<BatchJob> = vec![Box::new(|| stub_report("summary", true))];
        let reports = run_with_pacing(jobs, pacing);
        assert_eq!(reports.len(), 1);
    }
}
