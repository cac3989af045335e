//! Community calendar: breathwork sessions and topic bookings.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Viewer;
use crate::backend::{Document, DocumentStore, from_document, to_document};
use crate::constants::CALENDAR_COLLECTION;
use crate::error::{UntetheredError, UntetheredResult, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Breathwork,
    Topic,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventType::Breathwork => write!(f, "breathwork session"),
            EventType::Topic => write!(f, "topic"),
        }
    }
}

/// What a member wants to book on a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Booking {
    Breathwork,
    Topic(String),
}

impl Booking {
    pub fn event_type(&self) -> EventType {
        match self {
            Booking::Breathwork => EventType::Breathwork,
            Booking::Topic(_) => EventType::Topic,
        }
    }

    fn title(&self) -> String {
        match self {
            Booking::Breathwork => "Breathwork Session".to_string(),
            Booking::Topic(topic) => format!("Topic: {topic}"),
        }
    }
}

/// A booked day on the shared calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub facilitator: String,
    #[serde(default)]
    pub facilitator_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facilitator_uid: Option<String>,
}

impl CalendarEvent {
    fn from_entry(id: String, document: Document) -> UntetheredResult<Self> {
        let mut event: CalendarEvent = from_document(document)?;
        event.id = id;
        Ok(event)
    }

    pub fn is_on(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Bookings without a stored uid predate uid tracking; fall back to the
    /// facilitator name.
    pub fn is_facilitated_by(&self, viewer: &Viewer) -> bool {
        match &self.facilitator_uid {
            Some(uid) => uid == viewer.uid(),
            None => self.facilitator == viewer.display_name(),
        }
    }
}

pub struct CommunityCalendar<B> {
    backend: Arc<B>,
}

impl<B: DocumentStore> CommunityCalendar<B> {
    pub fn new(backend: Arc<B>) -> Self {
        CommunityCalendar { backend }
    }

    /// All bookings ordered by day, then booking time.
    pub async fn list_events(&self) -> UntetheredResult<Vec<CalendarEvent>> {
        let mut events = self
            .backend
            .scan(CALENDAR_COLLECTION)
            .await?
            .into_iter()
            .map(|(id, document)| CalendarEvent::from_entry(id, document))
            .collect::<UntetheredResult<Vec<_>>>()?;

        events.sort_by(|a, b| (a.start, a.created_at).cmp(&(b.start, b.created_at)));
        Ok(events)
    }

    /// Book `date`. Only one event of each type may exist per day.
    pub async fn book(
        &self,
        viewer: &Viewer,
        date: NaiveDate,
        booking: Booking,
    ) -> UntetheredResult<CalendarEvent> {
        let booking = match booking {
            Booking::Topic(topic) if topic.trim().is_empty() => {
                return Err(ValidationError::Required("Topic").into());
            }
            Booking::Topic(topic) => Booking::Topic(topic.trim().to_string()),
            Booking::Breathwork => Booking::Breathwork,
        };
        let topic = match &booking {
            Booking::Topic(topic) => Some(topic.clone()),
            Booking::Breathwork => None,
        };
        let kind = booking.event_type();

        let taken = self
            .list_events()
            .await?
            .into_iter()
            .any(|event| event.kind == kind && event.is_on(date));
        if taken {
            return Err(ValidationError::DuplicateBooking {
                kind: kind.to_string(),
                date: date.format("%Y-%m-%d").to_string(),
            }
            .into());
        }

        let mut event = CalendarEvent {
            id: String::new(),
            title: booking.title(),
            kind,
            topic,
            start: date,
            end: date,
            created_at: Utc::now(),
            facilitator: viewer.display_name(),
            facilitator_email: viewer.email().to_string(),
            facilitator_uid: Some(viewer.uid().to_string()),
        };

        let id = uuid::Uuid::new_v4().to_string();
        self.backend
            .set(CALENDAR_COLLECTION, &id, to_document(&event)?)
            .await?;
        event.id = id;

        tracing::info!(id = %event.id, %date, kind = %kind, "event booked");
        Ok(event)
    }

    /// Delete a booking. Only its facilitator may do so.
    pub async fn cancel(&self, viewer: &Viewer, id: &str) -> UntetheredResult<CalendarEvent> {
        let document = self
            .backend
            .get(CALENDAR_COLLECTION, id)
            .await?
            .ok_or_else(|| UntetheredError::NotFound(format!("calendar event {id}")))?;
        let event = CalendarEvent::from_entry(id.to_string(), document)?;

        if !event.is_facilitated_by(viewer) {
            return Err(UntetheredError::PermissionDenied(
                "you can only delete your own events".into(),
            ));
        }

        self.backend.delete(CALENDAR_COLLECTION, id).await?;
        tracing::info!(id, "event cancelled");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, Session};
    use crate::member::Member;

    fn viewer(uid: &str, name: &str) -> Viewer {
        Viewer {
            session: Session {
                uid: uid.into(),
                email: format!("{uid}@example.com"),
            },
            member: Some(Member {
                uid: uid.into(),
                display_name: Some(name.into()),
                email: None,
                phone_number: None,
            }),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn calendar() -> (Arc<MemoryBackend>, CommunityCalendar<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (backend.clone(), CommunityCalendar::new(backend))
    }

    #[tokio::test]
    async fn test_book_breathwork_and_topic_same_day() {
        let (_, calendar) = calendar();
        let ada = viewer("u1", "Ada");

        let breath = calendar.book(&ada, day(5), Booking::Breathwork).await.unwrap();
        assert_eq!(breath.title, "Breathwork Session");
        assert_eq!(breath.facilitator, "Ada");
        assert_eq!(breath.facilitator_email, "u1@example.com");

        let topic = calendar
            .book(&ada, day(5), Booking::Topic(" Boundaries ".into()))
            .await
            .unwrap();
        assert_eq!(topic.title, "Topic: Boundaries");
        assert_eq!(topic.topic.as_deref(), Some("Boundaries"));

        assert_eq!(calendar.list_events().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_type_same_day_rejected() {
        let (_, calendar) = calendar();
        calendar
            .book(&viewer("u1", "Ada"), day(5), Booking::Breathwork)
            .await
            .unwrap();

        let result = calendar
            .book(&viewer("u2", "Grace"), day(5), Booking::Breathwork)
            .await;
        match result {
            Err(UntetheredError::Validation(ValidationError::DuplicateBooking { kind, date })) => {
                assert_eq!(kind, "breathwork session");
                assert_eq!(date, "2025-03-05");
            }
            other => panic!("expected duplicate booking, got {:?}", other),
        }

        calendar
            .book(&viewer("u2", "Grace"), day(6), Booking::Breathwork)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_topic_requires_text() {
        let (_, calendar) = calendar();
        let result = calendar
            .book(&viewer("u1", "Ada"), day(5), Booking::Topic("  ".into()))
            .await;
        assert!(matches!(
            result,
            Err(UntetheredError::Validation(ValidationError::Required("Topic")))
        ));
    }

    #[tokio::test]
    async fn test_list_sorted_by_day() {
        let (_, calendar) = calendar();
        let ada = viewer("u1", "Ada");
        calendar.book(&ada, day(20), Booking::Breathwork).await.unwrap();
        calendar.book(&ada, day(2), Booking::Breathwork).await.unwrap();
        calendar.book(&ada, day(11), Booking::Breathwork).await.unwrap();

        let days: Vec<NaiveDate> = calendar
            .list_events()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.start)
            .collect();
        assert_eq!(days, vec![day(2), day(11), day(20)]);
    }

    #[tokio::test]
    async fn test_only_facilitator_can_cancel() {
        let (_, calendar) = calendar();
        let event = calendar
            .book(&viewer("u1", "Ada"), day(5), Booking::Breathwork)
            .await
            .unwrap();

        let denied = calendar.cancel(&viewer("u2", "Grace"), &event.id).await;
        assert!(matches!(denied, Err(UntetheredError::PermissionDenied(_))));

        calendar.cancel(&viewer("u1", "Ada"), &event.id).await.unwrap();
        assert!(calendar.list_events().await.unwrap().is_empty());

        let missing = calendar.cancel(&viewer("u1", "Ada"), &event.id).await;
        assert!(matches!(missing, Err(UntetheredError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_legacy_event_matches_facilitator_name() {
        let (backend, calendar) = calendar();
        let legacy = crate::backend::to_document(&serde_json::json!({
            "title": "Breathwork Session",
            "type": "breathwork",
            "start": "2025-03-05",
            "end": "2025-03-05",
            "createdAt": "2025-03-01T10:00:00Z",
            "facilitator": "Ada"
        }))
        .unwrap();
        backend.set(CALENDAR_COLLECTION, "old", legacy).await.unwrap();

        let denied = calendar.cancel(&viewer("u2", "Grace"), "old").await;
        assert!(matches!(denied, Err(UntetheredError::PermissionDenied(_))));
        calendar.cancel(&viewer("u9", "Ada"), "old").await.unwrap();
    }
}
