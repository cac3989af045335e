mod commands;
mod context;
mod render;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::context::Context;

#[derive(Parser)]
#[command(name = "untethered")]
#[command(about = "Set monthly and weekly goals, book community days and share resources")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup,
    /// Sign in with email and password
    Login {
        /// Email address (prompted if omitted)
        #[arg(short, long)]
        email: Option<String>,

        /// Forget the session when this command exits
        #[arg(long)]
        session_only: bool,
    },
    /// Sign out
    Logout,
    /// Show the signed-in member
    Whoami,
    /// Show config and data paths
    Config,
    /// List community members
    Members,
    /// Show a member's goals for a month, plus their goal history
    Goals {
        /// Member uid, email or display name (defaults to you)
        #[arg(short, long)]
        member: Option<String>,

        /// Month to show (MM/YYYY, defaults to the current month)
        #[arg(short, long)]
        period: Option<String>,

        /// History page to show (1-based)
        #[arg(long)]
        page: Option<usize>,

        /// Keep running and follow the current month as it rolls over
        #[arg(short, long)]
        watch: bool,
    },
    /// Set your goals for the current month
    Goal {
        #[command(subcommand)]
        command: GoalCommand,
    },
    /// Community calendar
    Calendar {
        #[command(subcommand)]
        command: CalendarCommand,
    },
    /// Shared resource library
    Resources {
        #[command(subcommand)]
        command: ResourceCommand,
    },
}

#[derive(Subcommand)]
enum GoalCommand {
    /// Set this month's goal (once per month)
    Monthly { text: String },
    /// Set this week's goal and/or note (prompted if neither is given)
    Week {
        #[arg(short, long)]
        goal: Option<String>,

        #[arg(short, long)]
        note: Option<String>,
    },
}

#[derive(Subcommand)]
enum CalendarCommand {
    /// List bookings from today onwards
    List {
        /// Include past bookings
        #[arg(short, long)]
        all: bool,
    },
    /// Book a breathwork session, or a topic with --topic
    Book {
        /// Day to book (YYYY-MM-DD, "today" or "tomorrow")
        date: String,

        #[arg(short, long)]
        topic: Option<String>,
    },
    /// Cancel one of your bookings
    Cancel {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum ResourceCommand {
    /// List shared resources, newest first
    List,
    /// Share a link and/or a file
    Share {
        #[arg(short, long)]
        topic: String,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(short, long, default_value = "")]
        link: String,

        /// Image, video or PDF to upload (max 5MB)
        #[arg(short, long)]
        file: Option<std::path::PathBuf>,
    },
    /// Remove one of your resources
    Remove {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("untethered=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::load()?;

    match cli.command {
        Commands::Signup => commands::auth::signup(&ctx).await,
        Commands::Login {
            email,
            session_only,
        } => commands::auth::login(&ctx, email, session_only).await,
        Commands::Logout => commands::auth::logout(&ctx).await,
        Commands::Whoami => commands::auth::whoami(&ctx).await,
        Commands::Config => commands::config::run(&ctx),
        Commands::Members => commands::members::run(&ctx).await,
        Commands::Goals {
            member,
            period,
            page,
            watch,
        } => commands::goals::show(&ctx, member, period, page, watch).await,
        Commands::Goal { command } => match command {
            GoalCommand::Monthly { text } => commands::goals::set_monthly(&ctx, text).await,
            GoalCommand::Week { goal, note } => commands::goals::set_week(&ctx, goal, note).await,
        },
        Commands::Calendar { command } => match command {
            CalendarCommand::List { all } => commands::calendar::list(&ctx, all).await,
            CalendarCommand::Book { date, topic } => {
                commands::calendar::book(&ctx, &date, topic).await
            }
            CalendarCommand::Cancel { id, force } => {
                commands::calendar::cancel(&ctx, &id, force).await
            }
        },
        Commands::Resources { command } => match command {
            ResourceCommand::List => commands::resources::list(&ctx).await,
            ResourceCommand::Share {
                topic,
                description,
                link,
                file,
            } => commands::resources::share(&ctx, topic, description, link, file).await,
            ResourceCommand::Remove { id, force } => {
                commands::resources::remove(&ctx, &id, force).await
            }
        },
    }
}
