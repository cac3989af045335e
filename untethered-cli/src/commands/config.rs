use anyhow::Result;
use owo_colors::OwoColorize;
use untethered_core::backend::Persistence;
use untethered_core::config::UntetheredConfig;

use crate::context::Context;

pub fn run(ctx: &Context) -> Result<()> {
    let config_path = UntetheredConfig::config_path()?;
    let persistence = match ctx.config.persistence {
        Persistence::Durable => "durable",
        Persistence::Session => "session",
    };

    println!("{}", "Paths".bold());
    println!("  Config:  {}", config_path.display());
    println!("  Data:    {}", ctx.backend.root().display());
    println!();
    println!("{}", "Settings".bold());
    println!("  Sign-in persistence:  {}", persistence);
    println!("  Rollover check:       every {}", ctx.config.rollover_check);
    println!("  History page size:    {}", ctx.config.history_page_size);

    Ok(())
}
