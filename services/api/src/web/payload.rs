//! services/api/src/web/payload.rs
//!
//! Small request-shape helpers shared by several resources.

use serde::{Deserialize, Deserializer};
use utoipa::IntoParams;
use uuid::Uuid;

/// Lets `Option<Option<T>>` tell "field absent" (`None`) apart from "field set
/// to null" (`Some(None)`). Use together with `#[serde(default)]`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// `?roomId=` on room-scoped reads. Defaults to the caller's room.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RoomQuery {
    pub room_id: Option<Uuid>,
}
