use std::io::Read;

use anyhow::{bail, ensure, Context, Result};
use crossterm::tty::IsTty;

use crate::cache::DraftSlot;
use crate::config;
use crate::ipc;
use crate::model::task::{Draft, Priority};
use crate::sync::Lifecycle;

/// What `main` should do after the capture subcommand ran.
pub enum CaptureOutcome {
    Done,
    /// The fallback path stashed the draft; open the dashboard so its
    /// confirmation form can pick it up.
    OpenDashboard,
}

/// The two-path capture flow: probe for a running dashboard and hand the
/// draft over; otherwise stash it and open the standalone confirmation
/// surface. `--yes` (or a non-interactive stdout) submits without
/// confirmation.
pub async fn handle_capture(args: &[String]) -> Result<CaptureOutcome> {
    let parsed = parse_capture_args(args)?;

    let text = match parsed.text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read capture text from stdin")?;
            buf
        }
    };
    ensure!(!text.trim().is_empty(), "Nothing to capture");

    let mut draft = Draft::new(&text, parsed.url, parsed.page_title);
    draft.title = parsed.title;
    if let Some(priority) = parsed.priority {
        draft.priority = priority;
    }
    draft.deadline = parsed.deadline;

    if parsed.yes || !std::io::stdout().is_tty() {
        let config = config::load_config()?;
        let lifecycle = Lifecycle::new(&config);
        let task = lifecycle.submit_draft(&draft, "cli").await?;
        if task.is_local() {
            println!("Captured locally (task store unreachable): {}", task.title);
        } else {
            println!("Captured: {} [{}]", task.title, task.id);
        }
        return Ok(CaptureOutcome::Done);
    }

    let socket = ipc::socket_path();
    if ipc::probe(&socket).await {
        ipc::send_draft(&socket, &draft).await?;
        println!("Capture handed to the running snag dashboard");
        return Ok(CaptureOutcome::Done);
    }

    DraftSlot::new().put(&draft)?;
    Ok(CaptureOutcome::OpenDashboard)
}

#[derive(Debug, Default)]
pub struct CaptureArgs {
    pub text: Option<String>,
    pub url: Option<String>,
    pub page_title: Option<String>,
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub deadline: Option<chrono::NaiveDate>,
    pub yes: bool,
}

/// Parse `snag capture` arguments. Bare words become the snippet text;
/// omitting them entirely means "read stdin".
pub fn parse_capture_args(args: &[String]) -> Result<CaptureArgs> {
    let mut parsed = CaptureArgs::default();
    let mut text_parts: Vec<String> = Vec::new();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--url" | "-u" => {
                i += 1;
                parsed.url = Some(flag_value(args, i, "--url")?);
            }
            "--page-title" => {
                i += 1;
                parsed.page_title = Some(flag_value(args, i, "--page-title")?);
            }
            "--title" | "-t" => {
                i += 1;
                parsed.title = Some(flag_value(args, i, "--title")?);
            }
            "--priority" | "-p" => {
                i += 1;
                let value = flag_value(args, i, "--priority")?;
                parsed.priority = Some(Priority::parse(&value).with_context(|| {
                    format!("Unknown priority '{value}' (use highest/high/medium/low)")
                })?);
            }
            "--deadline" => {
                i += 1;
                let value = flag_value(args, i, "--deadline")?;
                let date = chrono::NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                    .with_context(|| format!("Invalid deadline '{value}' (use YYYY-MM-DD)"))?;
                parsed.deadline = Some(date);
            }
            "--yes" | "-y" => {
                parsed.yes = true;
            }
            other if other.starts_with('-') => {
                bail!("Unknown flag '{other}'\n\n{}", usage());
            }
            _ => {
                text_parts.push(args[i].clone());
            }
        }
        i += 1;
    }

    if !text_parts.is_empty() {
        parsed.text = Some(text_parts.join(" "));
    }
    Ok(parsed)
}

fn flag_value(args: &[String], i: usize, flag: &str) -> Result<String> {
    args.get(i)
        .cloned()
        .with_context(|| format!("Missing value for {flag} flag"))
}

fn usage() -> &'static str {
    "Usage: snag capture <text> [--url <url>] [--title <title>] [--priority <p>] [--deadline YYYY-MM-DD] [--yes]"
}

pub fn print_help() {
    println!("snag — capture snippets as tasks and send them to Jira\n");
    println!("USAGE:");
    println!("  snag                    Launch the review dashboard");
    println!("  snag capture <text>     Capture a snippet as a pending task");
    println!("  snag capture            Capture stdin (pipe-friendly)");
    println!();
    println!("CAPTURE OPTIONS:");
    println!("  -u, --url <url>         Page URL the snippet came from (classifies the source)");
    println!("      --page-title <t>    Title of the originating page");
    println!("  -t, --title <title>     Explicit task title (default: derived from the text)");
    println!("  -p, --priority <p>      highest | high | medium | low (default: medium)");
    println!("      --deadline <date>   Due date, YYYY-MM-DD");
    println!("  -y, --yes               Skip confirmation and submit immediately");
    println!();
    println!("EXAMPLES:");
    println!("  snag capture \"Book flight by Friday\" --url https://app.slack.com/client/T1/C2");
    println!("  git log -1 --format=%s | snag capture --priority high");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Source;

    fn args(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_bare_words_become_text() {
        let parsed = parse_capture_args(&args(&["Book", "flight", "by", "Friday"])).unwrap();
        assert_eq!(parsed.text.as_deref(), Some("Book flight by Friday"));
        assert!(parsed.url.is_none());
        assert!(!parsed.yes);
    }

    #[test]
    fn parse_no_text_means_stdin() {
        let parsed = parse_capture_args(&args(&["--yes"])).unwrap();
        assert!(parsed.text.is_none());
        assert!(parsed.yes);
    }

    #[test]
    fn parse_url_classifies_source() {
        let parsed =
            parse_capture_args(&args(&["note", "--url", "https://mail.google.com/mail"])).unwrap();
        let draft = Draft::new(parsed.text.as_deref().unwrap(), parsed.url, None);
        assert_eq!(draft.source(), Source::Email);
    }

    #[test]
    fn parse_priority_and_deadline() {
        let parsed = parse_capture_args(&args(&[
            "ship it",
            "--priority",
            "high",
            "--deadline",
            "2026-09-01",
        ]))
        .unwrap();
        assert_eq!(parsed.priority, Some(Priority::High));
        assert_eq!(
            parsed.deadline,
            chrono::NaiveDate::from_ymd_opt(2026, 9, 1)
        );
    }

    #[test]
    fn parse_unknown_priority_fails() {
        let result = parse_capture_args(&args(&["x", "--priority", "urgent"]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("urgent"));
    }

    #[test]
    fn parse_bad_deadline_fails() {
        let result = parse_capture_args(&args(&["x", "--deadline", "next week"]));
        assert!(result.is_err());
    }

    #[test]
    fn parse_missing_flag_value_fails() {
        let result = parse_capture_args(&args(&["x", "--url"]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Missing value"));
    }

    #[test]
    fn parse_unknown_flag_fails() {
        let result = parse_capture_args(&args(&["x", "--frobnicate"]));
        assert!(result.is_err());
    }

    #[test]
    fn parse_unicode_text() {
        let parsed = parse_capture_args(&args(&["订机票 🛫"])).unwrap();
        assert_eq!(parsed.text.as_deref(), Some("订机票 🛫"));
    }
}
