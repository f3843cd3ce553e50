// driftline-match: pure, I/O-free matchmaking, room-presence, and rate
// limiting logic. Every function here takes its clock and randomness as
// explicit arguments so it can be driven deterministically from tests,
// the same shape as the remote-forwarding protocol's `announcer::AnnouncerRuntime`.

pub mod pairing;
pub mod rate_limit;
pub mod room_state;

pub use pairing::{greedy_match, random_match, score, Candidate, MatchedPair};
pub use rate_limit::TokenBucket;
pub use room_state::{heartbeat_points, heartbeat_room, is_point_tick, room_should_delete, sweep_occupant};
