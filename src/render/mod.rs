//! Renderer: human (sectioned text + ASCII graph tree + tables) and machine
//! (versioned JSON envelope) output modes (spec §4.7, §6).

mod machine;

pub use machine::{diag_result, graph_result, machine_envelope, top_result, Envelope};

use colored::Colorize;

use crate::forecast::ForecastResult;
use crate::model::{Graph, Issue, Severity};
use crate::scoring::select_root_cause;
use uuid::Uuid;

const LINE_WIDTH: usize = 100;

pub struct RenderOptions {
    pub colors_enabled: bool,
    pub max_display_issues: usize,
}

/// Renders the `diag` human-readable report: identity header, root cause,
/// contributing factors, suggested actions, elapsed time.
pub fn render_diag_human(subject_name: &str, issues: &[Issue], notes: &[String], elapsed: std::time::Duration, opts: &RenderOptions) -> String {
    let (root, contributing) = select_root_cause(issues);
    let mut out = String::new();

    out.push_str(&wrap_line(&format!("=== {subject_name} ===")));
    out.push('\n');

    match &root {
        Some(issue) => {
            out.push_str(&format!("ROOT CAUSE [{}]: {}\n", severity_label(issue.severity(), opts.colors_enabled), issue.title));
            out.push_str(&format!("  reason: {}\n", issue.reason));
            for e in &issue.evidence {
                out.push_str(&wrap_line(&format!("  evidence: {e}")));
                out.push('\n');
            }
            if !issue.suggested_actions.is_empty() {
                out.push_str("  suggested actions:\n");
                for a in &issue.suggested_actions {
                    out.push_str(&wrap_line(&format!("    - {a}")));
                    out.push('\n');
                }
            }
        }
        None => out.push_str("ROOT CAUSE: none (no issue scored >= 50)\n"),
    }

    if !contributing.is_empty() {
        out.push_str("\nCONTRIBUTING FACTORS:\n");
        for issue in contributing.iter().take(3) {
            out.push_str(&format!("  - [{}] {} ({})\n", severity_label(issue.severity(), opts.colors_enabled), issue.title, issue.resource_full_name));
        }
    }

    let displayed = issues.iter().take(opts.max_display_issues).count();
    if issues.len() > opts.max_display_issues {
        out.push_str(&format!("\n({} more issue(s) not shown)\n", issues.len() - displayed));
    }

    if !notes.is_empty() {
        out.push_str("\nNOTES:\n");
        for n in notes {
            out.push_str(&format!("  - {n}\n"));
        }
    }

    out.push_str(&format!("\nelapsed: {:.2}s\n", elapsed.as_secs_f64()));
    out
}

fn severity_label(sev: Severity, colors_enabled: bool) -> String {
    let label = match sev {
        Severity::Critical => "CRITICAL",
        Severity::Warning => "WARNING",
        Severity::Info => "INFO",
    };
    if !colors_enabled {
        return label.to_string();
    }
    match sev {
        Severity::Critical => label.red().bold().to_string(),
        Severity::Warning => label.yellow().to_string(),
        Severity::Info => label.green().to_string(),
    }
}

/// Renders `top`'s capacity/certificate tables; explicit "no predictions"
/// text when a section is empty.
pub fn render_top_human(result: &ForecastResult, opts: &RenderOptions) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== capacity forecast (horizon {}h) ===\n", result.horizon_hours));
    if result.capacity_warnings.is_empty() {
        out.push_str("no predictions\n");
    } else {
        for w in &result.capacity_warnings {
            let projected = w.projected_pct.map(|p| format!("{p:.1}%")).unwrap_or_else(|| "n/a".to_string());
            out.push_str(&format!(
                "  [{}] {}: current {:.1}%, projected {} (hours_to_threshold={})\n",
                severity_label(w.severity, opts.colors_enabled),
                w.resource,
                w.current_pct,
                projected,
                w.hours_to_threshold.map(|h| format!("{h:.1}")).unwrap_or_else(|| "n/a".to_string()),
            ));
            out.push_str(&format!("    action: {}\n", w.recommended_action));
        }
    }

    out.push_str("\n=== certificate expirations ===\n");
    if result.certificate_warnings.is_empty() {
        out.push_str("no predictions\n");
    } else {
        for c in &result.certificate_warnings {
            out.push_str(&format!(
                "  [{}] {}: expires {} ({} day(s) left)\n",
                severity_label(c.severity, opts.colors_enabled),
                c.secret,
                c.expires.to_rfc3339(),
                c.days_left
            ));
            if !c.referenced_by.is_empty() {
                out.push_str(&format!("    referenced by: {}\n", c.referenced_by.join(", ")));
            }
            out.push_str(&format!("    action: {}\n", c.action));
        }
    }

    if !result.notes.is_empty() {
        out.push_str("\nNOTES:\n");
        for n in &result.notes {
            out.push_str(&format!("  - {n}\n"));
        }
    }
    out
}

/// Resolves the CLI's `--upstream`/`--downstream` flags to a concrete pair of
/// directions to render: neither flag given means both directions.
pub(crate) fn resolve_graph_directions(upstream: bool, downstream: bool) -> (bool, bool) {
    if !upstream && !downstream {
        (true, true)
    } else {
        (upstream, downstream)
    }
}

pub fn render_graph_human(graph: &Graph, subject: Uuid, severities: &[(Uuid, Severity)], upstream: bool, downstream: bool, opts: &RenderOptions) -> String {
    let (upstream, downstream) = resolve_graph_directions(upstream, downstream);
    let mut out = String::new();

    if downstream {
        if upstream {
            out.push_str("downstream:\n");
        }
        let tree_opts = crate::graph::TreeOptions {
            downstream: true,
            max_children: 50,
            colors_enabled: opts.colors_enabled,
        };
        out.push_str(&crate::graph::render_tree(graph, subject, severities, &tree_opts));
    }

    if upstream {
        if downstream {
            out.push_str("\nupstream:\n");
        }
        let tree_opts = crate::graph::TreeOptions {
            downstream: false,
            max_children: 50,
            colors_enabled: opts.colors_enabled,
        };
        out.push_str(&crate::graph::render_tree(graph, subject, severities, &tree_opts));
    }

    out.push_str("\nlegend: ");
    out.push_str(&format!("{} ok  ", glyph_for(Severity::Info, opts.colors_enabled)));
    out.push_str(&format!("{} warning  ", glyph_for(Severity::Warning, opts.colors_enabled)));
    out.push_str(&format!("{} critical\n", glyph_for(Severity::Critical, opts.colors_enabled)));
    out
}

fn glyph_for(sev: Severity, colors_enabled: bool) -> String {
    let (symbol, color) = match sev {
        Severity::Critical => ("✗", "red"),
        Severity::Warning => ("!", "yellow"),
        Severity::Info => ("✓", "green"),
    };
    if !colors_enabled {
        return symbol.to_string();
    }
    match color {
        "red" => symbol.red().to_string(),
        "yellow" => symbol.yellow().to_string(),
        _ => symbol.green().to_string(),
    }
}

fn wrap_line(line: &str) -> String {
    if line.len() <= LINE_WIDTH {
        return line.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for word in line.split(' ') {
        if width + word.len() + 1 > LINE_WIDTH {
            out.push('\n');
            width = 0;
        } else if width > 0 {
            out.push(' ');
            width += 1;
        }
        out.push_str(word);
        width += word.len();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IssueSource;

    fn issue(reason: &str, score: u8) -> Issue {
        Issue {
            title: reason.to_string(),
            reason: reason.to_string(),
            score,
            recurrence: 1,
            source: IssueSource::Status,
            resource: Uuid::new_v4(),
            resource_full_name: "Pod/ns/app".to_string(),
            evidence: vec!["evidence line".to_string()],
            suggested_actions: vec!["do the thing".to_string()],
        }
    }

    #[test]
    fn renders_root_cause_section() {
        let opts = RenderOptions { colors_enabled: false, max_display_issues: 10 };
        let out = render_diag_human("Pod/production/failing-app-xyz", &[issue("CrashLoopBackOff", 95)], &[], std::time::Duration::from_millis(250), &opts);
        assert!(out.contains("ROOT CAUSE"));
        assert!(out.contains("CrashLoopBackOff"));
        assert!(out.contains("do the thing"));
    }

    #[test]
    fn no_predictions_message_when_empty() {
        let opts = RenderOptions { colors_enabled: false, max_display_issues: 10 };
        let result = ForecastResult { horizon_hours: 48, ..Default::default() };
        let out = render_top_human(&result, &opts);
        assert!(out.contains("no predictions"));
    }
}
