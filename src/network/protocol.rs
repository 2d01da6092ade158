//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is a JSON text frame of the form
//! `{ "event": <name>, "data": <payload> }`.

use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::room::directory::RoomData;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Join a room.
    Join(JoinRequest),

    /// Full game-state snapshot for the room. Opaque to the server.
    InitGameState(Value),

    /// Game-state delta for the room. Opaque to the server.
    UpdateGameState(Value),

    /// Chat line for the room.
    SendMessage(ChatRequest),

    /// Leave the current room without closing the connection.
    Leave,
}

/// Join request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Room key to join.
    pub room: String,
}

/// Chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Message text.
    pub message: String,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Room membership changed.
    RoomData(RoomData),

    /// The receiving connection's own identity (sent once, after join).
    CurrentUserData(CurrentUserData),

    /// Relayed game-state snapshot.
    InitGameState(Value),

    /// Relayed game-state delta.
    UpdateGameState(Value),

    /// Relayed chat line.
    Message(ChatMessage),

    /// Completion of a `join` or `sendMessage` request.
    Ack(Ack),

    /// Frame could not be processed.
    Error(ProtocolError),

    /// Server is shutting down.
    Shutdown {
        /// Why the server is going away.
        reason: String,
    },
}

/// Identity assigned to the joining connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUserData {
    /// Assigned display name.
    pub name: String,
}

/// Chat line as delivered to room members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender's display name, attached by the server.
    pub user: String,
    /// Message text.
    pub text: String,
}

/// Request that an [`Ack`] completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AckedEvent {
    /// A `join` request.
    Join,
    /// A `sendMessage` request.
    SendMessage,
}

/// Completion callback for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Request being completed.
    pub event: AckedEvent,
    /// Error description, `None` on success.
    pub error: Option<String>,
}

impl Ack {
    /// Successful completion.
    pub fn ok(event: AckedEvent) -> Self {
        Self { event, error: None }
    }

    /// Failed completion.
    pub fn failed(event: AckedEvent, error: impl ToString) -> Self {
        Self {
            event,
            error: Some(error.to_string()),
        }
    }
}

/// Protocol-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Frame was not a valid client message.
    InvalidInput,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Event name, for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::InitGameState(_) => "initGameState",
            Self::UpdateGameState(_) => "updateGameState",
            Self::SendMessage(_) => "sendMessage",
            Self::Leave => "leave",
        }
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Build an `invalid_input` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::Error(ProtocolError {
            code: ErrorCode::InvalidInput,
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::room::user::{ConnectionId, User};

    #[test]
    fn test_parse_join() {
        let msg = ClientMessage::from_json(r#"{"event":"join","data":{"room":"R1"}}"#).unwrap();
        assert_eq!(msg, ClientMessage::Join(JoinRequest { room: "R1".into() }));
        assert_eq!(msg.event_name(), "join");
    }

    #[test]
    fn test_parse_send_message() {
        let msg = ClientMessage::from_json(
            r#"{"event":"sendMessage","data":{"message":"uno!"}}"#,
        ).unwrap();
        assert_eq!(msg, ClientMessage::SendMessage(ChatRequest { message: "uno!".into() }));
    }

    #[test]
    fn test_game_state_payload_is_opaque() {
        let raw = r#"{"event":"updateGameState","data":{"turn":"Player 2","deck":[1,2,3],"nested":{"x":null}}}"#;
        let msg = ClientMessage::from_json(raw).unwrap();

        if let ClientMessage::UpdateGameState(state) = msg {
            assert_eq!(state["turn"], "Player 2");
            assert_eq!(state["deck"], json!([1, 2, 3]));
        } else {
            panic!("Wrong message type");
        }

        // Non-object payloads pass too
        let scalar = ClientMessage::from_json(r#"{"event":"initGameState","data":42}"#).unwrap();
        assert_eq!(scalar, ClientMessage::InitGameState(json!(42)));
    }

    #[test]
    fn test_parse_leave_without_data() {
        let msg = ClientMessage::from_json(r#"{"event":"leave"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Leave);
    }

    #[test]
    fn test_unknown_event_rejected() {
        assert!(ClientMessage::from_json(r#"{"event":"dance","data":{}}"#).is_err());
        assert!(ClientMessage::from_json("not json").is_err());
        assert!(ClientMessage::from_json(r#"{"event":"join","data":{}}"#).is_err());
    }

    #[test]
    fn test_room_data_shape() {
        let msg = ServerMessage::RoomData(RoomData {
            room: "R1".into(),
            users: vec![User {
                id: ConnectionId::from_bytes([1; 16]),
                name: "Player 1".into(),
                room: "R1".into(),
            }],
        });

        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["event"], "roomData");
        assert_eq!(value["data"]["room"], "R1");
        assert_eq!(value["data"]["users"][0]["name"], "Player 1");
        assert_eq!(value["data"]["users"][0]["room"], "R1");
    }

    #[test]
    fn test_chat_and_identity_shape() {
        let chat = ServerMessage::Message(ChatMessage { user: "Player 1".into(), text: "hi".into() });
        let value: Value = serde_json::from_str(&chat.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"event": "message", "data": {"user": "Player 1", "text": "hi"}}));

        let me = ServerMessage::CurrentUserData(CurrentUserData { name: "Player 2".into() });
        let value: Value = serde_json::from_str(&me.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"event": "currentUserData", "data": {"name": "Player 2"}}));
    }

    #[test]
    fn test_ack_shape() {
        let ok = ServerMessage::Ack(Ack::ok(AckedEvent::SendMessage));
        let value: Value = serde_json::from_str(&ok.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"event": "ack", "data": {"event": "sendMessage", "error": null}}));

        let failed = ServerMessage::Ack(Ack::failed(AckedEvent::Join, "already joined"));
        let value: Value = serde_json::from_str(&failed.to_json().unwrap()).unwrap();
        assert_eq!(value["data"]["error"], "already joined");
    }

    #[test]
    fn test_error_codes() {
        let msg = ServerMessage::invalid_input("Invalid message format");
        let json = msg.to_json().unwrap();
        assert!(json.contains("invalid_input"));
    }

    #[test]
    fn test_game_state_passes_through_unchanged() {
        let state = json!({"players": ["Player 1", "Player 2"], "pile": [{"card": "R5"}]});
        let msg = ServerMessage::UpdateGameState(state.clone());
        let parsed = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed, ServerMessage::UpdateGameState(state));
    }
}
