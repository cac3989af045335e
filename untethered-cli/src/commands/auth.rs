use anyhow::Result;
use owo_colors::OwoColorize;
use untethered_core::auth::{SignInForm, SignUpForm};
use untethered_core::backend::{IdentityProvider, Persistence};

use crate::context::Context;
use crate::utils::tui;

pub async fn signup(ctx: &Context) -> Result<()> {
    let email = tui::prompt_text("  Email", "")?;
    let display_name = tui::prompt_optional("  Display name")?;
    let phone_number = tui::prompt_optional("  Phone number")?;
    let password = tui::prompt_password("  Password")?;
    let confirm_password = tui::prompt_password("  Confirm password")?;

    let form = SignUpForm {
        email,
        password,
        confirm_password,
        display_name,
        phone_number,
    };
    // Fail on bad input before touching the backend.
    form.validate()?;

    let session = form.submit(ctx.backend.as_ref()).await?;
    println!("\nSigned up as {}", session.email.bold());
    println!("Set this month's goal with `untethered goal monthly <text>`.");

    Ok(())
}

pub async fn login(ctx: &Context, email: Option<String>, session_only: bool) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => tui::prompt_text("  Email", "")?,
    };
    let password = tui::prompt_password("  Password")?;

    if session_only {
        ctx.backend.set_persistence(Persistence::Session)?;
    }

    let session = SignInForm { email, password }
        .submit(ctx.backend.as_ref())
        .await?;

    println!("Signed in as {}", session.email.bold());
    if session_only {
        println!("{}", "Session ends when this command exits".dimmed());
    }

    Ok(())
}

pub async fn logout(ctx: &Context) -> Result<()> {
    let Some(session) = ctx.backend.current_session() else {
        println!("{}", "Not signed in".dimmed());
        return Ok(());
    };

    ctx.backend.sign_out().await?;
    println!("Signed out {}", session.email);

    Ok(())
}

pub async fn whoami(ctx: &Context) -> Result<()> {
    let viewer = ctx.viewer().await?;

    println!("{}", viewer.display_name().bold());
    println!("  Email:  {}", viewer.email());
    println!("  Handle: {}", viewer.handle());
    if let Some(phone) = viewer.member.as_ref().and_then(|m| m.phone_number.as_deref()) {
        println!("  Phone:  {}", phone);
    }
    println!("  Uid:    {}", viewer.uid().dimmed());

    Ok(())
}
