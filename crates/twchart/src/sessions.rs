use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use colored::Colorize;

use twchart_sessions::{SessionFilter, SessionStore};

use crate::ui::{picker_item, print_session_detail, print_sessions_table};

#[derive(Subcommand, Debug)]
pub enum SessionsAction {
    /// List stored sessions, newest first
    List {
        /// Show sessions on or after this date (YYYY-MM-DD)
        #[arg(long)]
        after: Option<String>,

        /// Show sessions on or before this date (YYYY-MM-DD)
        #[arg(long)]
        before: Option<String>,

        /// Search session names
        #[arg(long)]
        search: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a stored session
    Show {
        /// Session ID (launches interactive picker if omitted)
        id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy a log (and its sibling .csv) into the store
    Import {
        /// Path to the log file
        path: PathBuf,
    },
}

pub fn handle_sessions_command(store: &SessionStore, action: SessionsAction) -> Result<()> {
    match action {
        SessionsAction::List {
            after,
            before,
            search,
            json,
        } => {
            let filter = build_filter(after, before, search)?;
            let summaries = store.list(&filter)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("{}", "No sessions found.".dimmed());
            } else {
                print_sessions_table(&summaries);
            }
        }
        SessionsAction::Show { id, json } => {
            let id = resolve_session_id(store, id)?;
            let session = store.load(&id)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
            } else {
                print_session_detail(&session);
            }
        }
        SessionsAction::Import { path } => {
            let id = store.import(&path)?;
            println!("{} {}", "Imported".bright_green(), id);
        }
    }

    Ok(())
}

fn build_filter(
    after: Option<String>,
    before: Option<String>,
    search: Option<String>,
) -> Result<SessionFilter> {
    Ok(SessionFilter {
        search,
        after: parse_date_flag("--after", after)?,
        before: parse_date_flag("--before", before)?,
    })
}

fn parse_date_flag(flag: &str, value: Option<String>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| anyhow::anyhow!("Invalid {} date: {}", flag, e))
        })
        .transpose()
}

fn resolve_session_id(store: &SessionStore, id: Option<String>) -> Result<String> {
    if let Some(id) = id {
        return Ok(id);
    }

    // Interactive picker
    let summaries = store.list(&SessionFilter::default())?;
    if summaries.is_empty() {
        anyhow::bail!("No sessions found.");
    }

    let items: Vec<String> = summaries.iter().map(picker_item).collect();

    let selection = dialoguer::FuzzySelect::new()
        .with_prompt("Select a session")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(summaries[selection].id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_dates_are_validated() {
        let filter = build_filter(Some("2025-05-01".into()), None, Some("rye".into())).unwrap();
        assert_eq!(filter.after, NaiveDate::from_ymd_opt(2025, 5, 1));
        assert_eq!(filter.before, None);
        assert_eq!(filter.search.as_deref(), Some("rye"));

        let err = build_filter(None, Some("May 1".into()), None).unwrap_err();
        assert!(err.to_string().contains("--before"));
    }
}
