use anyhow::Result;

use crate::db::{self, MeetingRepository};

pub mod args;

pub use args::{Cli, CliCommand, MeetingsCliArgs};

pub fn handle_meetings_command(args: MeetingsCliArgs) -> Result<()> {
    let conn = db::init_db()?;

    let meetings = match &args.query {
        Some(query) => MeetingRepository::search(&conn, query)?,
        None => MeetingRepository::list(&conn, args.limit, 0)?,
    };

    if meetings.is_empty() {
        println!("No meetings recorded yet.");
        return Ok(());
    }

    for meeting in meetings.iter().take(args.limit) {
        let duration = meeting
            .duration_minutes
            .map(|m| format!("{m} min"))
            .unwrap_or_else(|| "in progress".to_string());
        let summarized = if meeting.summary.is_some() {
            "summarized"
        } else {
            "no summary"
        };
        println!(
            "#{:<5} {}  [{}] [{}]  {}",
            meeting.id, meeting.started_at, duration, summarized, meeting.title
        );
    }

    Ok(())
}
