//! Messaging and notification endpoints.

use klararety_core::Result;
use klararety_core::types::{Conversation, InboxNotification, Message, NewConversation, NewMessage};

use crate::ApiClient;

impl ApiClient {
    pub async fn conversations(&self) -> Result<Vec<Conversation>> {
        self.list("communication/conversations/", &[]).await
    }

    pub async fn create_conversation(&self, conversation: &NewConversation) -> Result<Conversation> {
        self.post("communication/conversations/", conversation).await
    }

    pub async fn messages(&self, conversation: u64) -> Result<Vec<Message>> {
        self.list(
            &format!("communication/conversations/{conversation}/messages/"),
            &[],
        )
        .await
    }

    pub async fn send_message(&self, message: &NewMessage) -> Result<Message> {
        self.post("communication/messages/", message).await
    }

    /// Lists in-app notifications, read and unread.
    pub async fn notifications(&self) -> Result<Vec<InboxNotification>> {
        self.list("communication/notifications/", &[]).await
    }

    pub async fn mark_notification_read(&self, id: u64) -> Result<()> {
        let _: serde_json::Value = self
            .post_with(&format!("communication/notifications/{id}/mark_read/"), &[])
            .await?;
        Ok(())
    }
}
