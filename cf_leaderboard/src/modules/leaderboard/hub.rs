use crate::modules::leaderboard::{model::RankingEntry, publisher::Channel};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Messages sent from the server to a leaderboard socket.
#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent<'a> {
    LeaderboardUpdate(&'a [RankingEntry]),
    Joined,
}

/// Messages a leaderboard socket may send.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinLeaderboard,
}

/// Per-user broadcast channels for live leaderboard subscribers.
pub struct SubscriberHub {
    channels: DashMap<Uuid, broadcast::Sender<String>>,
    capacity: usize,
}

impl SubscriberHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    pub fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<String> {
        self.channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drop the channel of `user_id` once its last subscriber is gone.
    pub fn release(&self, user_id: Uuid) {
        self.channels
            .remove_if(&user_id, |_, sender| sender.receiver_count() == 0);
    }

    pub fn subscriber_count(&self, user_id: Uuid) -> usize {
        self.channels
            .get(&user_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    fn send(&self, user_id: Uuid, message: String) -> usize {
        let delivered = match self.channels.get(&user_id) {
            Some(sender) => sender.send(message).unwrap_or(0),
            None => return 0,
        };
        if delivered == 0 {
            self.release(user_id);
        }
        delivered
    }
}

#[async_trait]
impl Channel for SubscriberHub {
    async fn publish(&self, user_id: Uuid, ranking: &[RankingEntry]) -> Result<usize> {
        let message = serde_json::to_string(&ServerEvent::LeaderboardUpdate(ranking))?;
        Ok(self.send(user_id, message))
    }
}
