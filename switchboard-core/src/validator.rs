// ABOUTME: Message validation - the only path from an InboundMessage to a Message.
// ABOUTME: Checks required fields, known type and priority, and a parseable timestamp.

use crate::message::{InboundMessage, Message, RawTimestamp};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use switchboard_delivery::{MessageType, Priority};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("unknown priority: {0}")]
    UnknownPriority(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Accept or reject a possibly absent message. No side effects.
pub fn validate(message: Option<&InboundMessage>) -> bool {
    message.is_some_and(|m| Message::try_from(m).is_ok())
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ValidationError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ValidationError::MissingField(field))
}

/// Interpret a producer timestamp.
pub fn parse_timestamp(raw: &RawTimestamp) -> Result<DateTime<Utc>, ValidationError> {
    match raw {
        RawTimestamp::Epoch(secs) => {
            if !secs.is_finite() {
                return Err(ValidationError::InvalidTimestamp(secs.to_string()));
            }
            // Nanoseconds are always added forward from the floor, so -1.5 is -2s + 0.5s
            let floor = secs.floor();
            let mut whole = floor as i64;
            let mut nanos = ((secs - floor) * 1e9).round() as u32;
            if nanos >= 1_000_000_000 {
                whole += 1;
                nanos = 0;
            }
            DateTime::from_timestamp(whole, nanos)
                .ok_or_else(|| ValidationError::InvalidTimestamp(secs.to_string()))
        }
        RawTimestamp::Text(text) => {
            let text = text.trim();
            if let Ok(at) = DateTime::parse_from_rfc3339(text) {
                return Ok(at.with_timezone(&Utc));
            }
            // Naive ISO forms are taken as UTC
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                    return Ok(Utc.from_utc_datetime(&naive));
                }
            }
            Err(ValidationError::InvalidTimestamp(text.to_string()))
        }
    }
}

impl TryFrom<&InboundMessage> for Message {
    type Error = ValidationError;

    fn try_from(inbound: &InboundMessage) -> Result<Self, Self::Error> {
        let id = required(&inbound.id, "id")?;
        let raw_type = required(&inbound.message_type, "type")?;
        let sender = required(&inbound.sender, "sender")?;
        let recipient = required(&inbound.recipient, "recipient")?;
        let content = inbound
            .content
            .as_deref()
            .ok_or(ValidationError::MissingField("content"))?;
        let raw_timestamp = inbound
            .timestamp
            .as_ref()
            .ok_or(ValidationError::MissingField("timestamp"))?;

        let message_type = raw_type
            .parse::<MessageType>()
            .map_err(|e| ValidationError::UnknownType(e.value))?;
        let priority = match inbound.priority.as_deref() {
            None => Priority::Normal,
            Some(raw) => raw
                .parse::<Priority>()
                .map_err(|e| ValidationError::UnknownPriority(e.value))?,
        };
        let timestamp = parse_timestamp(raw_timestamp)?;

        Ok(Message::from_parts(
            id.to_string(),
            message_type,
            priority,
            sender.to_string(),
            recipient.to_string(),
            content.to_string(),
            timestamp,
            inbound.retry_count.unwrap_or(0),
        ))
    }
}

impl TryFrom<InboundMessage> for Message {
    type Error = ValidationError;

    fn try_from(inbound: InboundMessage) -> Result<Self, Self::Error> {
        Message::try_from(&inbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> InboundMessage {
        InboundMessage {
            id: Some("m1".to_string()),
            message_type: Some("agent_to_agent".to_string()),
            priority: Some("normal".to_string()),
            sender: Some("Agent-1".to_string()),
            recipient: Some("Agent-5".to_string()),
            content: Some("hello".to_string()),
            timestamp: Some(RawTimestamp::Epoch(1_700_000_000.0)),
            retry_count: None,
        }
    }

    #[test]
    fn test_complete_message_is_valid() {
        assert!(validate(Some(&complete())));
        let msg = Message::try_from(complete()).unwrap();
        assert_eq!(msg.recipient(), "Agent-5");
        assert_eq!(msg.timestamp().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_fractional_epoch_keeps_sign_of_fraction() {
        let at = |secs: f64| parse_timestamp(&RawTimestamp::Epoch(secs)).unwrap();
        assert_eq!(at(1.25).timestamp_millis(), 1_250);
        assert_eq!(at(-1.5).timestamp_millis(), -1_500);
        assert_eq!(at(-0.25).timestamp_millis(), -250);
        assert_eq!(at(-3.0).timestamp_millis(), -3_000);
    }

    #[test]
    fn test_none_is_invalid() {
        assert!(!validate(None));
    }

    #[test]
    fn test_each_missing_required_field_is_rejected() {
        let strip: [(&str, fn(&mut InboundMessage)); 6] = [
            ("id", |m| m.id = None),
            ("type", |m| m.message_type = None),
            ("sender", |m| m.sender = None),
            ("recipient", |m| m.recipient = None),
            ("content", |m| m.content = None),
            ("timestamp", |m| m.timestamp = None),
        ];
        for (field, clear) in strip {
            let mut msg = complete();
            clear(&mut msg);
            assert!(!validate(Some(&msg)), "{} should be required", field);
            assert_eq!(
                Message::try_from(&msg).unwrap_err(),
                ValidationError::MissingField(field)
            );
        }
    }

    #[test]
    fn test_blank_identity_fields_count_as_missing() {
        let mut msg = complete();
        msg.sender = Some("   ".to_string());
        assert_eq!(
            Message::try_from(&msg).unwrap_err(),
            ValidationError::MissingField("sender")
        );
    }

    #[test]
    fn test_empty_content_is_allowed() {
        let mut msg = complete();
        msg.content = Some(String::new());
        assert!(validate(Some(&msg)));
    }

    #[test]
    fn test_every_known_type_is_accepted() {
        for t in MessageType::ALL {
            let mut msg = complete();
            msg.message_type = Some(t.as_str().to_string());
            assert!(validate(Some(&msg)), "{} should be accepted", t);
        }
    }

    #[test]
    fn test_unknown_type_and_priority_are_rejected() {
        let mut msg = complete();
        msg.message_type = Some("telepathy".to_string());
        assert_eq!(
            Message::try_from(&msg).unwrap_err(),
            ValidationError::UnknownType("telepathy".to_string())
        );

        let mut msg = complete();
        msg.priority = Some("critical".to_string());
        assert_eq!(
            Message::try_from(&msg).unwrap_err(),
            ValidationError::UnknownPriority("critical".to_string())
        );
    }

    #[test]
    fn test_missing_priority_defaults_to_normal() {
        let mut msg = complete();
        msg.priority = None;
        assert_eq!(Message::try_from(&msg).unwrap().priority(), Priority::Normal);
    }

    #[test]
    fn test_timestamp_forms() {
        let rfc = parse_timestamp(&RawTimestamp::Text("2026-05-01T12:00:00+02:00".into())).unwrap();
        assert_eq!(rfc.to_rfc3339(), "2026-05-01T10:00:00+00:00");
        let naive = parse_timestamp(&RawTimestamp::Text("2026-05-01 12:00:00".into())).unwrap();
        assert_eq!(naive.to_rfc3339(), "2026-05-01T12:00:00+00:00");
        let fractional = parse_timestamp(&RawTimestamp::Epoch(1.5)).unwrap();
        assert_eq!(fractional.timestamp_subsec_millis(), 500);
        assert!(parse_timestamp(&RawTimestamp::Text("yesterday".into())).is_err());
    }
}
