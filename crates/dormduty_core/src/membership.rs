//! Room membership checks shared by every room-scoped operation.

use crate::domain::{RoomId, User};
use crate::ports::{PortError, PortResult};

/// The caller's room, or `Forbidden` if they have not joined one.
pub fn room_of(caller: &User) -> PortResult<RoomId> {
    caller
        .room_id
        .ok_or_else(|| PortError::Forbidden("you are not a member of any room".to_string()))
}

/// Rejects callers whose room differs from `room_id`.
pub fn ensure_member(caller: &User, room_id: RoomId) -> PortResult<()> {
    if room_of(caller)? == room_id {
        Ok(())
    } else {
        Err(PortError::Forbidden(
            "you are not a member of this room".to_string(),
        ))
    }
}

/// The room a request targets: the explicitly requested one if the caller
/// belongs to it, otherwise the caller's own room.
pub fn resolve_room(caller: &User, requested: Option<RoomId>) -> PortResult<RoomId> {
    match requested {
        Some(room_id) => ensure_member(caller, room_id).map(|_| room_id),
        None => room_of(caller),
    }
}
