// Messages from the host process that supervises the bot.
//
// The host writes one JSON object per line to the bot's stdin, e.g.
// `{"action":"STOP"}`.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControlMessage {
    pub action: String,
}

impl ControlMessage {
    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }

    pub fn is_stop(&self) -> bool {
        self.action == "STOP"
    }
}
