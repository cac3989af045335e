use anyhow::Result;
use chrono::{Local, NaiveDate};
use dialoguer::Confirm;
use owo_colors::OwoColorize;
use untethered_core::calendar::Booking;

use crate::context::Context;
use crate::render::Render;

pub async fn list(ctx: &Context, all: bool) -> Result<()> {
    let today = Local::now().date_naive();
    let events: Vec<_> = ctx
        .calendar()
        .list_events()
        .await?
        .into_iter()
        .filter(|event| all || event.end >= today)
        .collect();

    if events.is_empty() {
        println!("{}", "No bookings found".dimmed());
        return Ok(());
    }

    // Group events by day and print
    let mut current_date: Option<NaiveDate> = None;

    for event in &events {
        if current_date != Some(event.start) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", format_date_label(event.start, today).bold());
            current_date = Some(event.start);
        }
        println!("  {}", event.render());
    }

    Ok(())
}

pub async fn book(ctx: &Context, date: &str, topic: Option<String>) -> Result<()> {
    let viewer = ctx.viewer().await?;
    let today = Local::now().date_naive();
    let date = parse_date(date, today)?;

    let booking = match topic {
        Some(topic) => Booking::Topic(topic),
        None => Booking::Breathwork,
    };

    let event = ctx.calendar().book(&viewer, date, booking).await?;
    println!(
        "Booked {} on {} {}",
        event.title.bold(),
        format_date_label(date, today),
        event.id.dimmed()
    );

    Ok(())
}

pub async fn cancel(ctx: &Context, id: &str, force: bool) -> Result<()> {
    let viewer = ctx.viewer().await?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Cancel booking {}?", id))
            .default(false)
            .interact()?;

        if !confirmed {
            return Ok(());
        }
    }

    let event = ctx.calendar().cancel(&viewer, id).await?;
    println!("Cancelled {} on {}", event.title, event.start.format("%a %b %-d"));

    Ok(())
}

/// Parse `YYYY-MM-DD`, "today" or "tomorrow".
fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    match input.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => today
            .succ_opt()
            .ok_or_else(|| anyhow::anyhow!("Date out of range")),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").map_err(|_| {
            anyhow::anyhow!(
                "Invalid date '{}'. Use YYYY-MM-DD, \"today\" or \"tomorrow\".",
                input
            )
        }),
    }
}

/// Format a date as a human-readable label (e.g. "Today", "Tomorrow", "Wed Feb 25")
fn format_date_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date() {
        let today = day(2025, 2, 28);
        assert_eq!(parse_date("today", today).unwrap(), today);
        assert_eq!(parse_date("Tomorrow", today).unwrap(), day(2025, 3, 1));
        assert_eq!(parse_date("2025-03-14", today).unwrap(), day(2025, 3, 14));
        assert!(parse_date("14/03/2025", today).is_err());
        assert!(parse_date("2025-02-30", today).is_err());
    }

    #[test]
    fn test_format_date_label() {
        let today = day(2025, 2, 25);
        assert_eq!(format_date_label(today, today), "Today");
        assert_eq!(format_date_label(day(2025, 2, 26), today), "Tomorrow");
        assert_eq!(format_date_label(day(2025, 2, 24), today), "Mon Feb 24");
    }
}
