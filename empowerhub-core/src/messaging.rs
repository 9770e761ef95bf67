use thiserror::Error;

use crate::{
    access::{can_perform, Action},
    DatabaseError, HubContext, MessageData, MessageStatus, NewMessage, PrimaryKey, UserData,
};

/// Direct messages between users. Conversations are derived by filtering, not
/// stored as their own entity.
pub struct MessageManager {
    context: HubContext,
}

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Cannot send a message to yourself")]
    SelfMessage,
    #[error("user:{0} doesn't exist")]
    UnknownReceiver(String),
    #[error("Not allowed to {0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// A derived per-partner summary of a user's messages
#[derive(Debug, Clone)]
pub struct ConversationData {
    pub partner: UserData,
    pub last_message: MessageData,
    /// Messages addressed to the user that they haven't read yet
    pub unread: u32,
}

impl MessageManager {
    pub fn new(context: &HubContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn send(
        &self,
        caller: &UserData,
        receiver_id: &str,
        content: String,
    ) -> Result<MessageData, MessagingError> {
        if receiver_id == caller.id {
            return Err(MessagingError::SelfMessage);
        }

        let db = &self.context.database;

        let receiver = db.user_by_id(receiver_id).await.map_err(|e| match e {
            DatabaseError::NotFound {
                resource: _,
                identifier: _,
            } => MessagingError::UnknownReceiver(receiver_id.to_string()),
            e => e.into(),
        })?;

        Ok(db
            .create_message(NewMessage {
                sender_id: caller.id.clone(),
                receiver_id: receiver.id,
                content,
            })
            .await?)
    }

    /// All messages between the caller and the other user, oldest first
    pub async fn conversation(
        &self,
        caller: &UserData,
        other_id: &str,
    ) -> Result<Vec<MessageData>, MessagingError> {
        let db = &self.context.database;

        // Resolve the partner so a typo'd id reads as missing rather than as
        // an empty conversation
        let other = db.user_by_id(other_id).await?;

        Ok(db.conversation(&caller.id, &other.id).await?)
    }

    /// Per-partner summaries of the caller's messages, most recent first
    pub async fn conversations(
        &self,
        caller: &UserData,
    ) -> Result<Vec<ConversationData>, MessagingError> {
        let db = &self.context.database;

        // Newest first, so the first message seen per partner is the latest
        let messages = db.messages_for_user(&caller.id).await?;

        let mut summaries: Vec<ConversationData> = Vec::new();

        for message in messages {
            let partner_id = if message.sender_id == caller.id {
                message.receiver_id.clone()
            } else {
                message.sender_id.clone()
            };

            let unread = message.receiver_id == caller.id && message.status == MessageStatus::Sent;

            match summaries.iter_mut().find(|s| s.partner.id == partner_id) {
                Some(summary) => {
                    if unread {
                        summary.unread += 1;
                    }
                }
                None => {
                    let partner = db.user_by_id(&partner_id).await?;

                    summaries.push(ConversationData {
                        partner,
                        last_message: message,
                        unread: unread as u32,
                    });
                }
            }
        }

        Ok(summaries)
    }

    /// Marks a message as read. Only its receiver may do so.
    pub async fn mark_read(
        &self,
        caller: &UserData,
        message_id: PrimaryKey,
    ) -> Result<MessageData, MessagingError> {
        let db = &self.context.database;
        let message = db.message_by_id(message_id).await?;

        if !can_perform(
            caller.role,
            Action::MarkMessageRead,
            Some(&message.receiver_id),
            Some(&caller.id),
        ) {
            return Err(MessagingError::Forbidden("mark this message as read"));
        }

        if message.status == MessageStatus::Read {
            return Ok(message);
        }

        Ok(db.mark_message_read(message_id).await?)
    }
}

#[cfg(test)]
mod test {
    use super::MessagingError;
    use crate::{testing, MessageStatus, Role};

    #[tokio::test]
    async fn conversations_are_ordered_and_scoped() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;
        let carol = testing::user(&hub, "carol@example.com", Role::Student).await;

        hub.messaging
            .send(&alice, &drbob.id, "hi, about tomorrow".to_string())
            .await
            .expect("sends");
        hub.messaging
            .send(&drbob, &alice.id, "yes, see you at ten".to_string())
            .await
            .expect("sends");
        hub.messaging
            .send(&carol, &drbob.id, "unrelated".to_string())
            .await
            .expect("sends");

        let conversation = hub
            .messaging
            .conversation(&alice, &drbob.id)
            .await
            .expect("lists");

        let contents: Vec<_> = conversation.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi, about tomorrow", "yes, see you at ten"]);
    }

    #[tokio::test]
    async fn summaries_carry_last_message_and_unread_count() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;

        hub.messaging
            .send(&drbob, &alice.id, "first".to_string())
            .await
            .expect("sends");
        let last = hub
            .messaging
            .send(&drbob, &alice.id, "second".to_string())
            .await
            .expect("sends");

        let summaries = hub.messaging.conversations(&alice).await.expect("lists");

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].partner.id, drbob.id);
        assert_eq!(summaries[0].last_message.id, last.id);
        assert_eq!(summaries[0].unread, 2);

        hub.messaging
            .mark_read(&alice, last.id)
            .await
            .expect("marks read");

        let summaries = hub.messaging.conversations(&alice).await.expect("lists");
        assert_eq!(summaries[0].unread, 1);
    }

    #[tokio::test]
    async fn only_the_receiver_marks_read() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;
        let drbob = testing::user(&hub, "drbob@example.com", Role::Counsellor).await;

        let message = hub
            .messaging
            .send(&alice, &drbob.id, "hello".to_string())
            .await
            .expect("sends");

        // The sender can't mark their own message read on the receiver's behalf
        let result = hub.messaging.mark_read(&alice, message.id).await;
        assert!(matches!(result, Err(MessagingError::Forbidden(_))));

        let read = hub
            .messaging
            .mark_read(&drbob, message.id)
            .await
            .expect("receiver marks read");

        assert_eq!(read.status, MessageStatus::Read);

        // Marking twice is fine
        let again = hub
            .messaging
            .mark_read(&drbob, message.id)
            .await
            .expect("idempotent");

        assert_eq!(again.status, MessageStatus::Read);
    }

    #[tokio::test]
    async fn receiver_must_exist() {
        let hub = testing::hub();
        let alice = testing::user(&hub, "alice@example.com", Role::Student).await;

        let result = hub
            .messaging
            .send(&alice, "no-such-user", "hello?".to_string())
            .await;

        assert!(matches!(result, Err(MessagingError::UnknownReceiver(_))));

        let result = hub
            .messaging
            .send(&alice, &alice.id, "note to self".to_string())
            .await;

        assert!(matches!(result, Err(MessagingError::SelfMessage)));
    }
}
