mod client;
mod token;
mod webhook;

pub use client::{ProviderParticipant, ProviderRoom, RoomServiceClient};
pub use token::ProviderConfig;
pub use webhook::{parse_webhook_event, WebhookEvent, WebhookParticipant, WebhookRoom};
