//! Room-state transitions and heartbeat points (spec.md §4.C).

use driftline_protocol::{HeartbeatOutcome, OccupantState, RoomOccupant, RoomState, RoomType};

/// Ingests a heartbeat from `user_id` against `state`. Mutates the matching
/// slot's `last_heartbeat`/`count` in place. Returns `UserNotInRoom` (and
/// leaves `state` untouched) if `user_id` is neither occupant -- `RoomNotFound`
/// is a store-layer concern, not representable here since this function
/// only runs once a `RoomState` has already been loaded.
pub fn heartbeat_room(state: &mut RoomState, user_id: &str, now_ms: i64) -> HeartbeatOutcome {
    let occupant = if state.user1.user_id == user_id {
        &mut state.user1
    } else if state.user2.user_id == user_id {
        &mut state.user2
    } else {
        return HeartbeatOutcome::UserNotInRoom;
    };
    occupant.last_heartbeat = now_ms;
    occupant.count += 1;
    HeartbeatOutcome::Ok
}

/// Applies one sweep tick to a single occupant (spec.md §4.C, "Sweep").
/// `online` demotes to `offline` after `timeout_ms` of silence; `offline`
/// demotes to `disconnected` after another `timeout_ms` of silence. Returns
/// whether the occupant was demoted this tick.
pub fn sweep_occupant(occupant: &mut RoomOccupant, now_ms: i64, timeout_ms: i64) -> bool {
    let stale = now_ms.saturating_sub(occupant.last_heartbeat) > timeout_ms;
    if !stale {
        return false;
    }
    match occupant.state {
        OccupantState::Online => {
            occupant.state = OccupantState::Offline;
            true
        }
        OccupantState::Offline => {
            occupant.state = OccupantState::Disconnected;
            true
        }
        OccupantState::Disconnected => false,
    }
}

/// A room terminates for both occupants once either reaches `disconnected`
/// (spec.md §3, RoomState lifecycle).
#[must_use]
pub fn room_should_delete(state: &RoomState) -> bool {
    state.user1.state == OccupantState::Disconnected
        || state.user2.state == OccupantState::Disconnected
}

/// Number of heartbeats between point awards (spec.md §4.C, "a multiple of
/// K (default 10)").
pub const HEARTBEAT_POINT_INTERVAL: u32 = 10;

/// Seconds of engagement represented by one heartbeat (spec.md §4.C,
/// "Each heartbeat is worth ~5 real seconds of engagement").
pub const HEARTBEAT_SECONDS: u32 = 5;

/// True on every `count` that should trigger a points award.
#[must_use]
pub fn is_point_tick(count: u32) -> bool {
    count > 0 && count % HEARTBEAT_POINT_INTERVAL == 0
}

/// Points awarded for heartbeat number `count` in a room of type
/// `room_type` (spec.md §4.C). Pure function of `(count, room_type)`; the
/// caller is responsible for only crediting the result when
/// `is_point_tick(count)` is true.
#[must_use]
pub fn heartbeat_points(count: u32, room_type: RoomType) -> u32 {
    let elapsed_secs = count * HEARTBEAT_SECONDS;
    let elapsed_mins = f64::from(elapsed_secs) / 60.0;
    match room_type {
        RoomType::Call | RoomType::VideoCall => {
            if elapsed_mins < 2.0 {
                50
            } else if elapsed_mins <= 5.0 {
                100
            } else if elapsed_mins <= 10.0 {
                200
            } else {
                250
            }
        }
        RoomType::Chat => {
            if elapsed_mins < 3.0 {
                0
            } else if elapsed_mins <= 5.0 {
                25
            } else if elapsed_mins <= 9.0 {
                50
            } else {
                75
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupant(user_id: &str, last_heartbeat: i64, state: OccupantState) -> RoomOccupant {
        RoomOccupant {
            user_id: user_id.to_owned(),
            last_heartbeat,
            count: 0,
            state,
        }
    }

    fn room(user1: RoomOccupant, user2: RoomOccupant) -> RoomState {
        RoomState {
            room_id: "r".to_owned(),
            room_type: RoomType::Chat,
            user1,
            user2,
        }
    }

    #[test]
    fn heartbeat_room_updates_matching_slot_only() {
        let mut state = room(
            occupant("u1", 0, OccupantState::Online),
            occupant("u2", 0, OccupantState::Online),
        );
        let outcome = heartbeat_room(&mut state, "u2", 5_000);
        assert_eq!(outcome, HeartbeatOutcome::Ok);
        assert_eq!(state.user2.last_heartbeat, 5_000);
        assert_eq!(state.user2.count, 1);
        assert_eq!(state.user1.last_heartbeat, 0);
    }

    /// Invariant 7: a heartbeat with a mismatched user id fails and does
    /// not mutate the room.
    #[test]
    fn heartbeat_room_rejects_unknown_user_without_mutating() {
        let mut state = room(
            occupant("u1", 0, OccupantState::Online),
            occupant("u2", 0, OccupantState::Online),
        );
        let before = state.clone();
        let outcome = heartbeat_room(&mut state, "stranger", 5_000);
        assert_eq!(outcome, HeartbeatOutcome::UserNotInRoom);
        assert_eq!(state, before);
    }

    /// S4. Heartbeat decay: no heartbeats for 20s across two sweep cycles
    /// demotes online -> offline -> disconnected.
    #[test]
    fn sweep_occupant_demotes_across_two_stale_cycles() {
        let mut occ = occupant("u2", 0, OccupantState::Online);
        assert!(!sweep_occupant(&mut occ, 5_000, 10_000));
        assert_eq!(occ.state, OccupantState::Online);

        assert!(sweep_occupant(&mut occ, 15_000, 10_000));
        assert_eq!(occ.state, OccupantState::Offline);

        assert!(sweep_occupant(&mut occ, 25_000, 10_000));
        assert_eq!(occ.state, OccupantState::Disconnected);

        assert!(!sweep_occupant(&mut occ, 35_000, 10_000));
        assert_eq!(occ.state, OccupantState::Disconnected);
    }

    #[test]
    fn room_should_delete_once_either_occupant_disconnects() {
        let mut state = room(
            occupant("u1", 0, OccupantState::Online),
            occupant("u2", 0, OccupantState::Offline),
        );
        assert!(!room_should_delete(&state));
        state.user2.state = OccupantState::Disconnected;
        assert!(room_should_delete(&state));
    }

    #[test]
    fn is_point_tick_fires_every_tenth_heartbeat_only() {
        assert!(!is_point_tick(0));
        for n in 1..10 {
            assert!(!is_point_tick(n), "count {n} should not be a point tick");
        }
        assert!(is_point_tick(10));
        assert!(is_point_tick(20));
        assert!(!is_point_tick(15));
    }

    /// Invariant 9: points follow the table in spec.md §4.C exactly.
    #[test]
    fn heartbeat_points_matches_call_table() {
        // count=10 -> 50s elapsed -> < 2 min
        assert_eq!(heartbeat_points(10, RoomType::Call), 50);
        // count=20 -> 100s elapsed (~1.67 min) -> < 2 min
        assert_eq!(heartbeat_points(20, RoomType::Call), 50);
        // count=30 -> 150s elapsed (2.5 min) -> <= 5 min
        assert_eq!(heartbeat_points(30, RoomType::Call), 100);
        // count=60 -> 300s elapsed (5 min) -> <= 5 min
        assert_eq!(heartbeat_points(60, RoomType::Call), 100);
        // count=72 -> 360s elapsed (6 min) -> <= 10 min
        assert_eq!(heartbeat_points(72, RoomType::Call), 200);
        // count=132 -> 660s elapsed (11 min) -> else
        assert_eq!(heartbeat_points(132, RoomType::Call), 250);
    }

    #[test]
    fn heartbeat_points_matches_chat_table() {
        // count=20 -> 100s elapsed (~1.67 min) -> < 3 min
        assert_eq!(heartbeat_points(20, RoomType::Chat), 0);
        // count=60 -> 300s elapsed (5 min) -> <= 5 min
        assert_eq!(heartbeat_points(60, RoomType::Chat), 25);
        // count=108 -> 540s elapsed (9 min) -> <= 9 min
        assert_eq!(heartbeat_points(108, RoomType::Chat), 50);
        // count=120 -> 600s elapsed (10 min) -> else
        assert_eq!(heartbeat_points(120, RoomType::Chat), 75);
    }
}
