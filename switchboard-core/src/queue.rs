// ABOUTME: Unbounded multi-producer message queue with an async pop for the routing worker.
// ABOUTME: FIFO by default; the priority discipline lets urgent messages jump ahead.

use crate::message::Message;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Order in which queued messages are handed to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueDiscipline {
    /// Strict arrival order; priority is informational
    #[default]
    Fifo,
    /// Highest priority first, arrival order among equals
    Priority,
}

impl fmt::Display for QueueDiscipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => f.write_str("fifo"),
            Self::Priority => f.write_str("priority"),
        }
    }
}

impl FromStr for QueueDiscipline {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "priority" => Ok(Self::Priority),
            other => anyhow::bail!("Unknown queue discipline '{}' (expected fifo or priority)", other),
        }
    }
}

pub struct MessageQueue {
    discipline: QueueDiscipline,
    items: Mutex<VecDeque<Message>>,
    ready: Notify,
}

impl MessageQueue {
    pub fn new(discipline: QueueDiscipline) -> Self {
        Self {
            discipline,
            items: Mutex::new(VecDeque::new()),
            ready: Notify::new(),
        }
    }

    pub fn discipline(&self) -> QueueDiscipline {
        self.discipline
    }

    /// Append a message. Returns the queue length afterwards.
    pub fn push(&self, message: Message) -> usize {
        let len = {
            let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
            match self.discipline {
                QueueDiscipline::Fifo => items.push_back(message),
                QueueDiscipline::Priority => {
                    let at = items
                        .iter()
                        .position(|queued| queued.priority() < message.priority())
                        .unwrap_or(items.len());
                    items.insert(at, message);
                }
            }
            items.len()
        };
        self.ready.notify_one();
        len
    }

    pub fn try_pop(&self) -> Option<Message> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    /// Wait until a message is available and take it.
    ///
    /// Meant for a single consumer: one stored wakeup covers a push that
    /// lands between the emptiness check and the wait.
    pub async fn pop(&self) -> Message {
        loop {
            if let Some(message) = self.try_pop() {
                return message;
            }
            self.ready.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new(QueueDiscipline::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use switchboard_delivery::{MessageType, Priority};

    fn msg(id: &str, priority: Priority) -> Message {
        Message::new(MessageType::AgentToAgent, "Agent-1", "Agent-2", id)
            .with_id(id)
            .with_priority(priority)
    }

    fn drain(queue: &MessageQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.try_pop())
            .map(|m| m.id().to_string())
            .collect()
    }

    #[test]
    fn test_fifo_ignores_priority() {
        let queue = MessageQueue::new(QueueDiscipline::Fifo);
        queue.push(msg("a", Priority::Low));
        queue.push(msg("b", Priority::Urgent));
        queue.push(msg("c", Priority::Normal));
        assert_eq!(drain(&queue), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_priority_discipline_is_stable_within_a_level() {
        let queue = MessageQueue::new(QueueDiscipline::Priority);
        queue.push(msg("n1", Priority::Normal));
        queue.push(msg("l1", Priority::Low));
        queue.push(msg("u1", Priority::Urgent));
        queue.push(msg("n2", Priority::Normal));
        queue.push(msg("u2", Priority::Urgent));
        assert_eq!(drain(&queue), vec!["u1", "u2", "n1", "n2", "l1"]);
    }

    #[test]
    fn test_discipline_parse() {
        assert_eq!("FIFO".parse::<QueueDiscipline>().unwrap(), QueueDiscipline::Fifo);
        assert_eq!(
            "priority".parse::<QueueDiscipline>().unwrap(),
            QueueDiscipline::Priority
        );
        assert!("lifo".parse::<QueueDiscipline>().is_err());
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(MessageQueue::default());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());
        queue.push(msg("late", Priority::Normal));
        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.id(), "late");
        assert!(queue.is_empty());
    }
}
