use anyhow::Result;
use owo_colors::OwoColorize;
use untethered_core::member::Member;

use crate::context::Context;
use crate::render::Render;

pub async fn run(ctx: &Context) -> Result<()> {
    let mut members = ctx.store.list_members().await?;

    if members.is_empty() {
        println!("{}", "No members yet".dimmed());
        return Ok(());
    }

    members.sort_by_key(|m| m.label().to_lowercase());
    for member in &members {
        println!("  {}", member.render());
    }

    Ok(())
}

/// Resolve a `--member` argument (uid, email or display name) to a uid.
pub async fn resolve(ctx: &Context, query: &str) -> Result<String> {
    let members = ctx.store.list_members().await?;

    match find_member(&members, query) {
        Some(member) => Ok(member.uid.clone()),
        None => anyhow::bail!(
            "Member '{}' not found. Run `untethered members` to list them.",
            query
        ),
    }
}

fn find_member<'a>(members: &'a [Member], query: &str) -> Option<&'a Member> {
    let query = query.trim();
    let matches = |value: &Option<String>| {
        value
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(query))
    };

    members
        .iter()
        .find(|m| m.uid == query)
        .or_else(|| members.iter().find(|m| matches(&m.email)))
        .or_else(|| members.iter().find(|m| matches(&m.display_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(uid: &str, name: &str, email: &str) -> Member {
        Member {
            uid: uid.into(),
            display_name: Some(name.into()),
            email: Some(email.into()),
            phone_number: None,
        }
    }

    #[test]
    fn test_find_member_by_uid_email_or_name() {
        let members = vec![
            member("u1", "Ada", "ada@example.com"),
            member("u2", "Grace", "grace@example.com"),
        ];

        assert_eq!(find_member(&members, "u2").map(|m| m.uid.as_str()), Some("u2"));
        assert_eq!(
            find_member(&members, "ADA@example.com").map(|m| m.uid.as_str()),
            Some("u1")
        );
        assert_eq!(find_member(&members, " grace ").map(|m| m.uid.as_str()), Some("u2"));
        assert!(find_member(&members, "linus").is_none());
    }

    #[test]
    fn test_uid_match_wins_over_name() {
        let members = vec![
            member("u1", "u2", "a@example.com"),
            member("u2", "Grace", "g@example.com"),
        ];
        assert_eq!(find_member(&members, "u2").map(|m| m.uid.as_str()), Some("u2"));
    }
}
