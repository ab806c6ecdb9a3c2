use batch_core::{BindingOutcome, InvocationReport};
use batch_model::ProjectName;
use tracing::{Level, error, info};

/// Level of one invoker outcome in the daemon log.
pub fn level(outcome: &BindingOutcome) -> Level {
    if outcome.is_failure() {
        Level::ERROR
    } else {
        Level::INFO
    }
}

/// Write each outcome of `report` as one event on behalf of `project`.
pub fn log_report(project: &ProjectName, report: &InvocationReport) {
    for outcome in report.outcomes() {
        let line = outcome.log_line();
        if level(outcome) == Level::ERROR {
            error!(%project, "{line}");
        } else {
            info!(%project, "{line}");
        }
    }
}
