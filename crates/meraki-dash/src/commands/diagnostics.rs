//! Diagnostics snapshot of one full poll.

use std::fmt::Write;

use meraki_core::Diagnostics;

use crate::cli::GlobalOpts;
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

use super::util;

fn summary(diag: &Diagnostics, color: bool) -> String {
    let mut out = String::new();
    let label = |s: &str| output::paint_label(s, color);

    let _ = writeln!(out, "{}", label("Entry"));
    let _ = writeln!(out, "  ID:     {}", diag.entry.entry_id);
    let _ = writeln!(out, "  Title:  {}", diag.entry.title);
    let _ = writeln!(out, "  State:  {}", diag.entry.state);

    if let Some(ref org) = diag.organization {
        let _ = writeln!(out, "{}", label("Organization"));
        let _ = writeln!(
            out,
            "  {} ({}), {} networks",
            org.name.as_deref().unwrap_or("-"),
            org.id,
            org.network_count
        );
        let _ = writeln!(
            out,
            "  API calls: {} total, {} failed, {:.0} ms average",
            org.api.total_api_calls, org.api.failed_api_calls, org.api.average_call_duration_ms
        );
        if let Some(ref err) = org.api.last_api_call_error {
            let _ = writeln!(out, "  Last error: {err}");
        }
        let _ = writeln!(out, "  Cache entries: {}", org.cache_entries);
    }

    let _ = writeln!(out, "{}", label("Hubs"));
    for (hub, coordinator) in diag.network_hubs.iter().zip(&diag.coordinators) {
        let _ = writeln!(
            out,
            "  {:<24} {:>3} devices  every {:>4}s  {}",
            hub.hub_id,
            hub.device_count,
            coordinator.update_interval_secs,
            if coordinator.last_update_success {
                output::paint_state("ok", color)
            } else {
                output::paint_state("failing", color)
            }
        );
    }

    let _ = writeln!(out, "{}", label("Entities"));
    let _ = write!(
        out,
        "  {} total, {} available",
        diag.entities.total, diag.entities.available
    );
    for (platform, count) in &diag.entities.by_platform {
        let _ = write!(out, "\n  {platform}: {count}");
    }
    out
}

pub async fn handle(profile: ResolvedProfile, global: &GlobalOpts) -> Result<(), CliError> {
    let controller = util::start_controller(profile).await?;
    let diag = meraki_core::diagnostics::collect(&controller).await;
    controller.unload().await;

    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &diag,
        |d| summary(d, color),
        |d| d.entry.entry_id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
