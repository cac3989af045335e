use anyhow::Result;
use owo_colors::OwoColorize;
use untethered_core::backend::{DocumentStore, LocalBackend};
use untethered_core::period::{Period, WeekIndex};
use untethered_core::tracker::{GoalTracker, NotificationLevel, rollover_interval};

use crate::commands::members;
use crate::context::Context;
use crate::render::Render;
use crate::utils::tui;

pub async fn show(
    ctx: &Context,
    member: Option<String>,
    period: Option<String>,
    page: Option<usize>,
    watch: bool,
) -> Result<()> {
    let viewer = ctx.viewer().await?;
    let period = period.map(|p| p.parse::<Period>()).transpose()?;
    let mut tracker = ctx.tracker(&viewer);

    let spinner = tui::create_spinner("Loading goals".into());
    if let Some(query) = &member {
        let uid = members::resolve(ctx, query).await?;
        tracker.select_member(uid).await;
    }
    match period {
        Some(period) => tracker.select_period(period).await,
        None if member.is_none() => tracker.load().await,
        None => {}
    }
    if let Some(page) = page {
        tracker.go_to_page(page);
    }
    let owner = owner_label(ctx, &tracker).await;
    spinner.finish_and_clear();

    println!("{}", render_goals(&tracker, &owner));
    print_notifications(&mut tracker);

    if watch {
        watch_rollover(ctx, &mut tracker, &owner).await?;
    }

    Ok(())
}

async fn watch_rollover(
    ctx: &Context,
    tracker: &mut GoalTracker<LocalBackend>,
    owner: &str,
) -> Result<()> {
    if !tracker.is_pinned_to_current() {
        println!(
            "\n{}",
            "Not showing the current month, nothing to follow".dimmed()
        );
        return Ok(());
    }

    println!("\n{}", "Following the current month (Ctrl-C to stop)".dimmed());
    let mut ticker = rollover_interval(ctx.config.rollover_every()?);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if tracker.check_rollover().await {
                    println!("\n{}", render_goals(tracker, owner));
                    print_notifications(tracker);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

pub async fn set_monthly(ctx: &Context, text: String) -> Result<()> {
    let viewer = ctx.viewer().await?;
    let mut tracker = ctx.tracker(&viewer);
    tracker.load().await;

    tracker.edit_monthly_input(text);
    let saved = tracker.set_monthly_goal().await;

    finish(&mut tracker, saved)
}

pub async fn set_week(ctx: &Context, goal: Option<String>, note: Option<String>) -> Result<()> {
    let viewer = ctx.viewer().await?;
    let mut tracker = ctx.tracker(&viewer);
    tracker.load().await;

    let week = tracker.current_week();
    if !tracker.record().has_monthly_goal() {
        anyhow::bail!(
            "Set this month's goal first:\n  \
            untethered goal monthly <text>"
        );
    }

    let interactive = goal.is_none() && note.is_none();
    let goal_open = tracker.can_edit_week_goal(week);

    let goal = match goal {
        Some(goal) if !goal_open => {
            println!(
                "{}",
                format!("{week} goal is already set, keeping it").dimmed()
            );
            None
        }
        Some(goal) => Some(goal),
        None if interactive && goal_open => Some(tui::prompt_text(&format!("  {week} goal"), "")?),
        None => None,
    };
    let note = match note {
        Some(note) => Some(note),
        None if interactive => Some(tui::prompt_text(
            &format!("  {week} note"),
            tracker.note_input(week),
        )?),
        None => None,
    };

    if let Some(goal) = goal {
        tracker.edit_goal_input(week, goal);
    }
    if let Some(note) = note {
        tracker.edit_note_input(week, note);
    }

    let spinner = tui::create_spinner(format!("Saving {week}"));
    let saved = tracker.save_week(week).await;
    spinner.finish_and_clear();

    finish(&mut tracker, saved)
}

async fn owner_label<B: DocumentStore>(ctx: &Context, tracker: &GoalTracker<B>) -> String {
    let Some(uid) = tracker.selected_member() else {
        return "Nobody".to_string();
    };
    match ctx.store.member(uid).await {
        Ok(Some(member)) => member.label().to_string(),
        _ => uid.to_string(),
    }
}

/// Print success notifications; fail with the error ones if nothing was saved.
fn finish<B: DocumentStore>(tracker: &mut GoalTracker<B>, saved: bool) -> Result<()> {
    let mut errors = Vec::new();
    for notification in tracker.take_notifications() {
        match notification.level {
            NotificationLevel::Success => println!("{}", notification.render()),
            NotificationLevel::Error => errors.push(notification.message),
        }
    }

    if !saved {
        if errors.is_empty() {
            anyhow::bail!("Nothing was saved");
        }
        anyhow::bail!(errors.join("\n"));
    }

    Ok(())
}

fn print_notifications<B: DocumentStore>(tracker: &mut GoalTracker<B>) {
    for notification in tracker.take_notifications() {
        println!("{}", notification.render());
    }
}

fn render_goals<B: DocumentStore>(tracker: &GoalTracker<B>, owner: &str) -> String {
    let mut lines = Vec::new();
    let record = tracker.record();
    let is_current = tracker.period() == tracker.current_period();

    let mut heading = format!("{} · {}", owner.bold(), tracker.period().label().bold());
    if is_current {
        heading.push_str(&format!(" {}", "(this month)".dimmed()));
    }
    lines.push(heading);

    let monthly = match &record.monthly_goal {
        Some(goal) if record.has_monthly_goal() => goal.clone(),
        _ if tracker.can_edit_monthly() => "not set yet, use `untethered goal monthly <text>`"
            .dimmed()
            .to_string(),
        _ => "not set".dimmed().to_string(),
    };
    lines.push(format!("   Monthly goal: {}", monthly));
    lines.push(String::new());

    for week in WeekIndex::all() {
        let entry = record.week(week);
        let marker = if is_current && week == tracker.current_week() {
            "›".green().to_string()
        } else {
            " ".to_string()
        };
        let goal = if entry.has_goal() {
            entry.goal.clone()
        } else {
            "-".dimmed().to_string()
        };
        let mut line = format!(" {} {}  {}", marker, week.bold(), goal);
        if tracker.can_edit_week(week) {
            line.push_str(&format!(" {}", "(editable)".green()));
        }
        lines.push(line);

        if !entry.note.trim().is_empty() {
            lines.push(format!("            {}", entry.note.italic().dimmed()));
        }
    }

    lines.push(String::new());
    lines.push(render_history(tracker));
    lines.join("\n")
}

fn render_history<B: DocumentStore>(tracker: &GoalTracker<B>) -> String {
    if tracker.history().is_empty() {
        return format!("   {}", "No goal history".dimmed());
    }

    let mut lines = vec![format!("   {}", "History".bold())];
    for period in tracker.history_page() {
        let marker = if *period == tracker.period() { "•" } else { " " };
        lines.push(format!("   {} {} {}", marker, period.label(), period.dimmed()));
    }
    if tracker.page_count() > 1 {
        let footer = format!("Page {} of {}", tracker.page(), tracker.page_count());
        lines.push(format!("   {}", footer.dimmed()));
    }
    lines.join("\n")
}
