use askama::Template;

use crate::email::Email;
use crate::models::event::Event;
use crate::util::format_date;

#[derive(Template)]
#[template(path = "event_created.html")]
pub struct EventCreatedEmail {
    pub title: String,
    pub date: String,
    pub location: String,
    pub app_url: String,
}

impl EventCreatedEmail {
    pub fn for_event(event: &Event, app_url: &str) -> Self {
        Self {
            title: event.title.clone(),
            date: format_date(&event.date),
            location: event
                .location
                .clone()
                .unwrap_or_else(|| "To be announced".to_owned()),
            app_url: app_url.to_owned(),
        }
    }
}

impl Email for EventCreatedEmail {
    fn subject(&self) -> String {
        format!("New event: {}", self.title)
    }
}

#[derive(Template)]
#[template(path = "event_closed.html")]
pub struct RegistrationClosedEmail {
    pub title: String,
    pub date: String,
    pub app_url: String,
}

impl RegistrationClosedEmail {
    pub fn for_event(event: &Event, app_url: &str) -> Self {
        Self {
            title: event.title.clone(),
            date: format_date(&event.date),
            app_url: app_url.to_owned(),
        }
    }
}

impl Email for RegistrationClosedEmail {
    fn subject(&self) -> String {
        format!("Registration closed: {}", self.title)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;

    fn concert() -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "Spring Concert".to_owned(),
            date: datetime!(2026-09-12 19:30 UTC),
            location: None,
            description: None,
            is_closed: false,
            created_at: datetime!(2026-08-01 12:00 UTC),
        }
    }

    #[test]
    fn created_email_renders_with_fallback_location() {
        let email = EventCreatedEmail::for_event(&concert(), "https://fanfare.band");
        assert_eq!(email.subject(), "New event: Spring Concert");

        let body = email.render().unwrap();
        assert!(body.contains("Spring Concert"));
        assert!(body.contains("2026-09-12"));
        assert!(body.contains("To be announced"));
        assert!(body.contains("https://fanfare.band"));
    }

    #[test]
    fn closed_email_renders() {
        let email = RegistrationClosedEmail::for_event(&concert(), "https://fanfare.band");
        assert_eq!(email.subject(), "Registration closed: Spring Concert");

        let body = email.render().unwrap();
        assert!(body.contains("Spring Concert"));
        assert!(body.contains("considered absent"));
    }
}
