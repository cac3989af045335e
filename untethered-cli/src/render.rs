//! Colored terminal rendering for untethered-core types.

use owo_colors::OwoColorize;
use untethered_core::calendar::{CalendarEvent, EventType};
use untethered_core::member::Member;
use untethered_core::resource::Resource;
use untethered_core::tracker::{Notification, NotificationLevel};

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Notification {
    fn render(&self) -> String {
        match self.level {
            NotificationLevel::Success => format!("{} {}", "✓".green(), self.message),
            NotificationLevel::Error => format!("{} {}", "✗".red(), self.message.red()),
        }
    }
}

impl Render for Member {
    fn render(&self) -> String {
        let email = self.email.as_deref().unwrap_or_default();
        let contact = match &self.phone_number {
            Some(phone) if !email.is_empty() => format!("{email}, {phone}"),
            Some(phone) => phone.clone(),
            None => email.to_string(),
        };
        format!("{} {}", self.label().bold(), contact.dimmed())
    }
}

impl Render for EventType {
    fn render(&self) -> String {
        match self {
            EventType::Breathwork => "breathwork".cyan().to_string(),
            EventType::Topic => "topic".magenta().to_string(),
        }
    }
}

impl Render for CalendarEvent {
    fn render(&self) -> String {
        let tag = format!("[{}]", self.kind.render());
        let by = format!("with {}", self.facilitator);
        format!("{} {} {} {}", tag, self.title, by.dimmed(), self.id.dimmed())
    }
}

impl Render for Resource {
    fn render(&self) -> String {
        let mut lines = vec![format!("{} {}", self.topic.bold(), self.id.dimmed())];
        if !self.description.is_empty() {
            lines.push(format!("   {}", self.description));
        }
        if !self.link.is_empty() {
            lines.push(format!("   {}", self.link.blue().underline()));
        }
        if let (Some(name), Some(url)) = (&self.file_name, &self.file_url) {
            lines.push(format!("   {} {}", name, url.dimmed()));
        }
        let shared = format!(
            "   shared by {} on {}",
            self.uploaded_by,
            self.created_at.format("%b %-d, %Y")
        );
        lines.push(shared.dimmed().to_string());
        lines.join("\n")
    }
}
