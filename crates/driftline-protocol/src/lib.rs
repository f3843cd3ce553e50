// driftline-protocol: wire types shared by the matchmaking/session core and
// its WebSocket/SSE/HTTP clients.
//
// All WebSocket messages use a top-level `kind` field for discriminated
// deserialization, the same convention the remote-forwarding protocol uses.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Shared sub-types
// ---------------------------------------------------------------------------

/// One of the two independent search pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    Chat,
    Call,
}

impl Pool {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Pool::Chat => "chat",
            Pool::Call => "call",
        }
    }
}

impl std::fmt::Display for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Chat,
    Call,
    VideoCall,
}

/// A user waiting in a search pool. Mirrors the per-pool hash + interest
/// memberships; never persisted relationally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchUser {
    pub id: String,
    pub username: String,
    pub interests: Vec<String>,
    pub joined_at: i64,
    pub last_heartbeat: i64,
}

/// One-shot handoff record written by the matcher and consumed by the
/// owning user's first poll of `GET /api/v1/search/{pool}/:userId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTuple {
    pub peer_user_id: String,
    pub token: String,
    pub room_id: String,
    pub is_friend: bool,
}

/// Presence state of a single room occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupantState {
    Online,
    Offline,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOccupant {
    pub user_id: String,
    pub last_heartbeat: i64,
    pub count: u32,
    pub state: OccupantState,
}

/// Ephemeral per-room two-party presence record (spec.md §4.C).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomState {
    pub room_id: String,
    pub room_type: RoomType,
    pub user1: RoomOccupant,
    pub user2: RoomOccupant,
}

/// Outcome of a heartbeat ingestion against a `RoomState` (spec.md §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatOutcome {
    Ok,
    RoomNotFound,
    UserNotInRoom,
}

/// Chat message type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    Gif,
    Audio,
    Video,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub sender_username: Option<String>,
    pub receiver_username: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub timestamp: i64,
}

/// Room-scoped presence/typing event published on `chat:rooms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomEventType {
    Join,
    Leave,
    Typing,
    StoppedTyping,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEvent {
    #[serde(rename = "type")]
    pub kind: RoomEventType,
    pub room_id: String,
    pub client_id: String,
    pub username: Option<String>,
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// /ws/chat socket messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSentAck {
    pub id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequestPayload {
    pub target_username: String,
}

/// Messages a `/ws/chat` socket may *send* (client -> server). `Message`
/// only carries the client-supplied `{content, type}` -- `roomId` and
/// `senderId` are server-controlled and never trusted from the wire
/// (spec.md §4.F, "assemble a Message with server-controlled roomId and
/// senderId").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
#[serde(rename_all = "snake_case")]
pub enum ChatClientEvent {
    Message(MessagePayload),
    UserTyping,
    UserStoppedTyping,
    UserConnected,
    UserDisconnected,
    Leave,
    FriendRequest(FriendRequestPayload),
}

/// Messages a `/ws/chat` socket may *receive* (server -> client). Serializes
/// using the `kind` field as a tag, same convention as the remote-forwarding
/// protocol's `WsMessage`. `Message` carries the full persisted `ChatMessage`
/// -- recipients other than the sender need `senderId`/`roomId` to render it
/// (spec.md §8 scenario S5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
#[serde(rename_all = "snake_case")]
pub enum ChatEvent {
    Message(ChatMessage),
    MessageSent(MessageSentAck),
    UserTyping,
    UserStoppedTyping,
    UserConnected,
    UserDisconnected,
    FriendRequest(FriendRequestPayload),
    UserJoined { user_id: String },
    UserLeft { user_id: String },
    RoomHistory { messages: Vec<ChatMessage> },
    Error(ErrorMessage),
}

// ---------------------------------------------------------------------------
// /ws/call socket messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdpPayload {
    pub sdp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceCandidatePayload {
    pub candidate: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyStatus {
    pub waiting: bool,
}

/// All messages a `/ws/call` socket may send or receive (spec.md §4.F,
/// "Call namespace (random pairing variant)").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
#[serde(rename_all = "snake_case")]
pub enum CallEvent {
    SendOffer { room_id: String },
    Offer(SdpPayload),
    Answer(SdpPayload),
    AddIceCandidate(IceCandidatePayload),
    Signal(serde_json::Value),
    Lobby(LobbyStatus),
    CallEnded { duration_sec: i64 },
    UserJoined { room_id: String },
    UserLeft { room_id: String },
    Heartbeat,
    EndCall,
    FriendRequest(FriendRequestPayload),
    Error(ErrorMessage),
}

/// Status of a call-namespace room (spec.md §4.F "State machine (call
/// room)"). `None` (no room yet) is represented by the record's absence,
/// not a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallRoomStatus {
    Active,
    Ended,
}

/// Durable-within-Redis record of one active call pairing (spec.md §4.F,
/// "create a CallRoom record `{id, [a,b], status=active, startTime}`").
/// `participant_a`/`participant_b` are socket ids, not user ids -- the
/// call namespace pairs anonymous sockets, not identified users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRoomRecord {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub status: CallRoomStatus,
    pub start_time_ms: i64,
}

impl CallRoomRecord {
    #[must_use]
    pub fn other(&self, socket_id: &str) -> Option<&str> {
        if self.participant_a == socket_id {
            Some(&self.participant_b)
        } else if self.participant_b == socket_id {
            Some(&self.participant_a)
        } else {
            None
        }
    }
}

/// Cross-worker envelope for one relayed call-signaling event (spec.md
/// §4.F "forward the event to the OTHER participant only"; §9 "pub/sub +
/// local emit composition"). Published on the shared `call:signal`
/// channel; every worker re-dispatches to its local room broadcast and
/// each attached socket drops the envelope unless it is the addressee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSignalEnvelope {
    pub room_id: String,
    pub target_socket_id: String,
    pub event: CallEvent,
}

/// Frozen error codes, reused by both namespaces and the HTTP layer.
pub mod error_codes {
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    pub const PROTOCOL_ERROR: &str = "PROTOCOL_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Token Issuer claim (spec.md §4.E)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaim {
    pub sender_id: String,
    pub receiver_id: String,
    pub room_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_username: Option<String>,
    /// Unix seconds. Zero for the zero-value claim `verify` returns on
    /// any failure (spec.md §9, "Fail-soft token verification").
    #[serde(default)]
    pub expires_at: i64,
}

impl SessionClaim {
    /// A claim is "empty" exactly when it is the zero value `verify`
    /// returns on failure -- downstream code rejects via this check
    /// rather than via exception handling.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sender_id.is_empty() && self.receiver_id.is_empty() && self.room_id.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SSE notifications (spec.md §4.H)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    #[serde(default)]
    pub data: serde_json::Value,
    pub is_sent: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsePingFrame {
    pub total_users: u64,
    pub user_id: String,
}

// ---------------------------------------------------------------------------
// HTTP API response types
// ---------------------------------------------------------------------------

/// Wraps a successful search-endpoint body in the `{"data": ...}` envelope
/// spec.md §6 specifies for `start-search` and the match poll (contrast
/// `HeartbeatResponse`/`HealthResponse`, which spec.md §6 lists unwrapped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Frozen HTTP error envelope used by all non-2xx JSON responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub success: bool,
    pub message: String,
    pub count: u32,
    pub state: OccupantState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSearchResponse {
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub uptime_secs: u64,
    pub memory_bytes: u64,
    pub cpu_percent: f32,
    pub total_users: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_round_trips_through_display_and_serde() {
        assert_eq!(Pool::Chat.as_str(), "chat");
        assert_eq!(Pool::Call.to_string(), "call");
        let json = serde_json::to_string(&Pool::Chat).unwrap();
        assert_eq!(json, "\"chat\"");
    }

    #[test]
    fn chat_client_event_tags_on_kind_field() {
        let event = ChatClientEvent::Message(MessagePayload {
            content: "hi".to_owned(),
            kind: MessageType::Text,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "message");
        assert_eq!(json["content"], "hi");

        let parsed: ChatClientEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn chat_event_message_carries_sender_and_room() {
        let event = ChatEvent::Message(ChatMessage {
            id: "m1".to_owned(),
            room_id: "r1".to_owned(),
            sender_id: "a".to_owned(),
            receiver_id: "b".to_owned(),
            sender_username: None,
            receiver_username: None,
            content: "hi".to_owned(),
            kind: MessageType::Text,
            timestamp: 1,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "message");
        assert_eq!(json["sender_id"], "a");
        assert_eq!(json["room_id"], "r1");

        let parsed: ChatEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn call_event_round_trips() {
        let event = CallEvent::Lobby(LobbyStatus { waiting: true });
        let json = serde_json::to_string(&event).unwrap();
        let parsed: CallEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn call_room_record_resolves_the_other_participant() {
        let room = CallRoomRecord {
            id: "r1".to_owned(),
            participant_a: "s1".to_owned(),
            participant_b: "s2".to_owned(),
            status: CallRoomStatus::Active,
            start_time_ms: 0,
        };
        assert_eq!(room.other("s1"), Some("s2"));
        assert_eq!(room.other("s2"), Some("s1"));
        assert_eq!(room.other("s3"), None);
    }

    #[test]
    fn session_claim_default_is_empty() {
        let claim = SessionClaim::default();
        assert!(claim.is_empty());

        let claim = SessionClaim {
            sender_id: "a".to_owned(),
            receiver_id: "b".to_owned(),
            room_id: "r".to_owned(),
            ..Default::default()
        };
        assert!(!claim.is_empty());
    }

    #[test]
    fn data_envelope_wraps_under_a_data_key() {
        let envelope = DataEnvelope::new(StartSearchResponse { user: "u1".to_owned() });
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["data"]["user"], "u1");
    }
}
