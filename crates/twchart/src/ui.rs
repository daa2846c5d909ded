use colored::Colorize;

use twchart_sessions::types::format_duration;
use twchart_sessions::{Session, SessionEvent, SessionSummary};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn print_session_detail(session: &Session) {
    let name = if session.name.is_empty() {
        "(unnamed)"
    } else {
        session.name.as_str()
    };
    println!("{}", format!("=== {} ===", name).bright_blue().bold());

    if let Some(date) = session.date {
        println!("{}  {}", "Date:".dimmed(), date);
    }
    if let Some(start) = session.start_time {
        println!("{}  {}", "Started:".dimmed(), start.format(TIME_FORMAT));
    }
    if let Some((first, last)) = session.time_bounds() {
        println!("{}  {}", "Span:".dimmed(), format_duration(last - first));
    }

    if !session.probes.is_empty() {
        let probes: Vec<String> = session
            .probes
            .iter()
            .map(|p| format!("{} ({})", p.name, p.position))
            .collect();
        println!("{}  {}", "Probes:".dimmed(), probes.join(", "));
    }

    if !session.stages.is_empty() {
        println!();
        println!(
            "{}",
            format!("--- Stages ({}) ---", session.stages.len()).dimmed()
        );
        for stage in &session.stages {
            let end = stage
                .end
                .map(|t| t.format(TIME_FORMAT).to_string())
                .unwrap_or_else(|| "...".to_string());
            let duration = stage
                .duration
                .map(format_duration)
                .unwrap_or_else(|| "open".to_string());
            println!(
                "  {:<20} {} -> {}  {}",
                stage.name.bright_cyan(),
                stage.start.format(TIME_FORMAT),
                end,
                duration.bright_green()
            );
        }
    }

    if !session.events.is_empty() {
        println!();
        println!(
            "{}",
            format!("--- Events ({}) ---", session.events.len()).dimmed()
        );
        for event in &session.events {
            println!("  {}  {}", event.time.format(TIME_FORMAT), event.note);
        }
    }

    if !session.data.is_empty() {
        println!();
        println!("{}  {}", "Sensor rows:".dimmed(), session.data.len());
    }
}

pub fn print_sessions_table(summaries: &[SessionSummary]) {
    println!(
        "{:<14} {:<18} {:<12} {:<7} {:<10} {}",
        "ID".dimmed(),
        "STARTED".dimmed(),
        "SPAN".dimmed(),
        "STAGES".dimmed(),
        "DATA".dimmed(),
        "NAME".dimmed(),
    );

    for s in summaries {
        let started = s
            .start_time
            .map(|t| t.format(TIME_FORMAT).to_string())
            .unwrap_or_else(|| "-".to_string());
        let span = s
            .duration
            .map(format_duration)
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<14} {:<18} {:<12} {:<7} {} {}",
            s.id,
            started,
            span,
            s.stages,
            data_column(s.has_data),
            s.name
        );
    }
}

/// Padded before colorizing; escape codes would otherwise count toward the width.
fn data_column(has_data: bool) -> String {
    if has_data {
        format!("{:<10}", "yes").bright_green().to_string()
    } else {
        format!("{:<10}", "no").dimmed().to_string()
    }
}

/// One line for the interactive picker.
pub fn picker_item(s: &SessionSummary) -> String {
    let started = s
        .start_time
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "no start".to_string());
    format!("{} | {} | {} stages | {}", s.id, started, s.stages, s.name)
}

pub fn print_session_event(event: &SessionEvent) {
    match event {
        SessionEvent::SessionLoaded { id, name, stages } => {
            println!(
                "{} {} \"{}\" ({} stages)",
                "loaded".bright_green(),
                id,
                name,
                stages
            );
        }
        SessionEvent::SessionFailed { id, error } => {
            println!("{} {} {}", "failed".bright_red(), id, error.dimmed());
        }
    }
}
