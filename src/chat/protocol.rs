//! JSON frames exchanged over the socket.
//!
//! Both directions use `{"event": "<name>", "data": <payload>}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ConnId, Message, MessageId, Presence, PrivateMessage};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

fn first_page() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Join {
        username: String,
    },
    SendMessage {
        #[serde(alias = "body")]
        message: String,
        /// Present when the client wants a delivery receipt.
        ack: Option<u64>,
    },
    Typing(bool),
    PrivateMessage {
        #[serde(alias = "recipient_id")]
        to: ConnId,
        #[serde(alias = "body")]
        message: String,
    },
    ReactMessage {
        message_id: MessageId,
        reaction: String,
    },
    MarkRead(Vec<MessageId>),
    GetMessages {
        #[serde(default = "first_page")]
        page: usize,
        ack: Option<u64>,
    },
}

impl ClientEvent {
    pub fn from_frame(frame: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(frame)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// First frame on every socket: the connection's own id.
    Connected {
        id: ConnId,
    },
    UserList(Vec<Presence>),
    UserJoined {
        username: String,
        id: ConnId,
    },
    UserLeft(Presence),
    ReceiveMessage(Message),
    PrivateMessage(PrivateMessage),
    TypingUsers(Vec<String>),
    MessageReaction {
        message_id: MessageId,
        reactions: BTreeMap<ConnId, String>,
    },
    MessagesRead(Vec<MessageId>),
    MessageAck {
        ack: u64,
        status: DeliveryStatus,
        id: MessageId,
    },
    Messages {
        ack: Option<u64>,
        page: usize,
        messages: Vec<Message>,
    },
}

impl ServerEvent {
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_client_events() {
        let to = ConnId::new();
        let cases = [
            (json!({"event": "join", "data": {"username": "alice"}}), ClientEvent::Join { username: "alice".to_owned() }),
            (
                json!({"event": "send_message", "data": {"message": "hi", "ack": 3}}),
                ClientEvent::SendMessage { message: "hi".to_owned(), ack: Some(3) },
            ),
            (
                json!({"event": "send_message", "data": {"body": "hi"}}),
                ClientEvent::SendMessage { message: "hi".to_owned(), ack: None },
            ),
            (json!({"event": "typing", "data": true}), ClientEvent::Typing(true)),
            (
                json!({"event": "private_message", "data": {"to": to, "message": "psst"}}),
                ClientEvent::PrivateMessage { to, message: "psst".to_owned() },
            ),
            (
                json!({"event": "react_message", "data": {"message_id": 42, "reaction": "👍"}}),
                ClientEvent::ReactMessage { message_id: MessageId(42), reaction: "👍".to_owned() },
            ),
            (json!({"event": "mark_read", "data": [1, 2, 2]}), ClientEvent::MarkRead(vec![MessageId(1), MessageId(2), MessageId(2)])),
            (json!({"event": "get_messages", "data": {}}), ClientEvent::GetMessages { page: 1, ack: None }),
        ];

        for (frame, expected) in cases {
            assert_eq!(ClientEvent::from_frame(&frame.to_string()).unwrap(), expected);
        }
    }

    #[test]
    fn rejects_unknown_events() {
        assert!(ClientEvent::from_frame(r#"{"event": "shout", "data": "hi"}"#).is_err());
        assert!(ClientEvent::from_frame("not json").is_err());
    }

    #[test]
    fn encodes_server_events_with_event_and_data() {
        let frame = ServerEvent::MessagesRead(vec![MessageId(5)]).to_frame().unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value, json!({"event": "messages_read", "data": [5]}));

        let ack = ServerEvent::MessageAck { ack: 1, status: DeliveryStatus::Delivered, id: MessageId(9) };
        let value: serde_json::Value = serde_json::from_str(&ack.to_frame().unwrap()).unwrap();
        assert_eq!(value["data"], json!({"ack": 1, "status": "delivered", "id": 9}));
    }
}
