//! `refresh` and `discover`: one manual run across every hub.

use std::fmt::Write;

use meraki_core::HubRunReport;
use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Refresh,
    Discover,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Discover => "discover",
        }
    }
}

#[derive(Debug, Serialize)]
struct HubFailure {
    hub: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct RunOutput {
    action: Action,
    hubs: usize,
    skipped: usize,
    failed: Vec<HubFailure>,
}

impl RunOutput {
    fn new(action: Action, report: &HubRunReport) -> Self {
        Self {
            action,
            hubs: report.hubs,
            skipped: report.skipped,
            failed: report
                .failures
                .iter()
                .map(|(hub, e)| HubFailure {
                    hub: hub.clone(),
                    error: e.to_string(),
                })
                .collect(),
        }
    }
}

fn summary(out: &RunOutput, color: bool) -> String {
    let verb = match out.action {
        Action::Refresh => "Refreshed",
        Action::Discover => "Ran discovery on",
    };
    let ran = out.hubs.saturating_sub(out.skipped + out.failed.len());
    let mut text = format!("{verb} {ran} of {} hubs", out.hubs);
    if out.skipped > 0 {
        let _ = write!(text, ", {} skipped (ran recently)", out.skipped);
    }
    for failure in &out.failed {
        let _ = write!(
            text,
            "\n  {} {}: {}",
            output::paint_state("failing", color),
            failure.hub,
            failure.error
        );
    }
    text
}

pub async fn handle(
    profile: ResolvedProfile,
    action: Action,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = util::start_controller(profile).await?;
    let result = match action {
        Action::Refresh => controller.refresh_all().await,
        Action::Discover => controller.discover_all().await,
    };
    controller.unload().await;
    let mut report = result?;

    let out = RunOutput::new(action, &report);
    let color = output::should_color(global.color);
    let text = output::render_single(
        global.output,
        &out,
        |o| summary(o, color),
        |o| o.action.as_str().to_owned(),
    );
    output::print_output(&text, global.quiet);

    // Exit with the first hub failure so scripts notice.
    match report.failures.drain(..).next() {
        Some((_, e)) => Err(e.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use meraki_core::CoreError;

    #[test]
    fn summary_lists_failed_hubs() {
        let report = HubRunReport {
            hubs: 3,
            skipped: 1,
            failures: vec![(
                "Warehouse_MT".into(),
                CoreError::UpdateFailed {
                    message: "Error communicating with API: 400".into(),
                },
            )],
        };
        let text = summary(&RunOutput::new(Action::Refresh, &report), false);
        assert_eq!(
            text,
            "Refreshed 1 of 3 hubs, 1 skipped (ran recently)\n  \
             failing Warehouse_MT: Error communicating with API: 400"
        );
    }

    #[test]
    fn json_output_names_the_action() {
        let report = HubRunReport {
            hubs: 2,
            ..HubRunReport::default()
        };
        let value = serde_json::to_value(RunOutput::new(Action::Discover, &report)).unwrap();
        assert_eq!(value["action"], "discover");
        assert_eq!(value["failed"], serde_json::json!([]));
    }
}
