//! Chat rooms and messages

use bson::{doc, oid::ObjectId, DateTime};
use serde::Serialize;
use tracing::info;

use crate::db::mongo::with_retry;
use crate::db::schemas::{ChatMessageDoc, ChatRoomDoc};
use crate::types::{Result, WaypointError};

use super::Store;

/// A direct-message thread between two users
#[derive(Serialize, Clone, Debug)]
pub struct DirectConversation {
    pub peer: String,
    pub messages: Vec<ChatMessageDoc>,
    pub unread: usize,
}

impl Store {
    /// Create a room if the name is new, otherwise return the existing
    /// one.
    pub async fn ensure_room(
        &self,
        name: &str,
        description: Option<String>,
        created_by: &str,
    ) -> Result<ChatRoomDoc> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WaypointError::InvalidInput("room name is required".into()));
        }
        if let Some(existing) = with_retry(self.retry, || {
            self.chat_rooms.find_one(doc! { "name": name })
        })
        .await?
        {
            return Ok(existing);
        }

        let mut room = ChatRoomDoc::new(name.to_string(), description, created_by.to_string());
        let id = with_retry(self.retry, || self.chat_rooms.insert_one(room.clone())).await?;
        room._id = Some(id);
        info!(room = %name, by = %created_by, "chat room created");
        Ok(room)
    }

    /// All rooms, name order
    pub async fn list_rooms(&self) -> Result<Vec<ChatRoomDoc>> {
        with_retry(self.retry, || {
            self.chat_rooms
                .find_sorted(doc! {}, Some(doc! { "name": 1 }), None)
        })
        .await
    }

    /// Post a message to a room. The room must exist.
    pub async fn post_room_message(
        &self,
        room_id: &str,
        sender: &str,
        body: &str,
    ) -> Result<ChatMessageDoc> {
        let body = non_empty_body(body)?;
        let oid = ObjectId::parse_str(room_id)
            .map_err(|_| WaypointError::InvalidInput(format!("invalid room id: {:?}", room_id)))?;
        let room = with_retry(self.retry, || self.chat_rooms.find_one(doc! { "_id": oid }))
            .await?
            .ok_or_else(|| WaypointError::NotFound(format!("room {}", room_id)))?;

        let sender_name = self.display_name(sender).await;
        let mut message = ChatMessageDoc::room_message(
            sender.to_string(),
            sender_name,
            oid.to_hex(),
            body,
            DateTime::now(),
        );
        let id = with_retry(self.retry, || {
            self.chat_messages.insert_one(message.clone())
        })
        .await?;
        message._id = Some(id);
        info!(room = %room.name, sender = %sender, "room message posted");
        Ok(message)
    }

    /// Latest messages in a room, oldest first, capped by the history
    /// limit
    pub async fn room_messages(&self, room_id: &str) -> Result<Vec<ChatMessageDoc>> {
        let oid = ObjectId::parse_str(room_id)
            .map_err(|_| WaypointError::InvalidInput(format!("invalid room id: {:?}", room_id)))?;
        let mut messages = with_retry(self.retry, || {
            self.chat_messages.find_sorted(
                doc! { "room_id": oid.to_hex() },
                Some(doc! { "timestamp": -1 }),
                Some(self.settings.chat_history_limit),
            )
        })
        .await?;
        messages.reverse();
        Ok(messages)
    }

    /// Send a direct message to another user
    pub async fn post_direct_message(
        &self,
        sender: &str,
        recipient: &str,
        body: &str,
    ) -> Result<ChatMessageDoc> {
        let body = non_empty_body(body)?;
        if sender == recipient {
            return Err(WaypointError::InvalidInput(
                "cannot message yourself".into(),
            ));
        }
        if self.user_by_email(recipient).await?.is_none() {
            return Err(WaypointError::NotFound(format!("user {}", recipient)));
        }

        let sender_name = self.display_name(sender).await;
        let mut message = ChatMessageDoc::direct_message(
            sender.to_string(),
            sender_name,
            recipient.to_string(),
            body,
            DateTime::now(),
        );
        let id = with_retry(self.retry, || {
            self.chat_messages.insert_one(message.clone())
        })
        .await?;
        message._id = Some(id);
        Ok(message)
    }

    /// Direct thread between two users, oldest first. Reading the
    /// thread marks messages addressed to the caller as read.
    pub async fn direct_thread(&self, me: &str, peer: &str) -> Result<DirectConversation> {
        let filter = doc! { "$or": [
            { "sender": me, "recipient": peer },
            { "sender": peer, "recipient": me },
        ] };
        let mut messages = with_retry(self.retry, || {
            self.chat_messages.find_sorted(
                filter.clone(),
                Some(doc! { "timestamp": -1 }),
                Some(self.settings.chat_history_limit),
            )
        })
        .await?;
        messages.reverse();

        let unread = messages
            .iter()
            .filter(|m| m.recipient.as_deref() == Some(me) && !m.read)
            .count();
        if unread > 0 {
            with_retry(self.retry, || {
                self.chat_messages.update_many(
                    doc! { "sender": peer, "recipient": me, "read": false },
                    doc! { "$set": { "read": true } },
                )
            })
            .await?;
        }

        Ok(DirectConversation {
            peer: peer.to_string(),
            messages,
            unread,
        })
    }

    /// Unread direct messages addressed to a user
    pub async fn unread_count(&self, me: &str) -> Result<u64> {
        with_retry(self.retry, || {
            self.chat_messages
                .count(doc! { "recipient": me, "read": false })
        })
        .await
    }
}

fn non_empty_body(body: &str) -> Result<String> {
    let body = body.trim();
    if body.is_empty() {
        return Err(WaypointError::InvalidInput(
            "message body cannot be empty".into(),
        ));
    }
    Ok(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bodies_are_rejected() {
        assert!(non_empty_body("   ").is_err());
        assert_eq!(non_empty_body(" hi ").unwrap(), "hi");
    }
}
