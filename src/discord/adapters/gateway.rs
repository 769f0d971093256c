use crate::core::context::{ChatGateway, GatewayError};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Sends chain output through the Discord REST API.
pub struct DiscordGateway {
    http: Arc<serenity::Http>,
}

impl DiscordGateway {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<(), GatewayError> {
        // ChannelId::new panics on zero.
        if channel_id == 0 {
            return Err(GatewayError::Send {
                channel_id,
                reason: "channel id 0 is not valid".to_string(),
            });
        }

        serenity::ChannelId::new(channel_id)
            .say(&self.http, content)
            .await
            .map(|_| ())
            .map_err(|e| GatewayError::Send {
                channel_id,
                reason: e.to_string(),
            })
    }
}
