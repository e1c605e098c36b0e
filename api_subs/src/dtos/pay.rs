use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}
