//! Shared test utilities for the matchmaking/chat/call suite: a generic
//! mock WebSocket client used to drive `/ws/chat` and `/ws/call` against
//! a real axum server in integration tests.

pub mod mock_ws_client;

pub use mock_ws_client::MockWsClient;
