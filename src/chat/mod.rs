//! Wire contract between the browser chat client and the bot backend
//!
//! Messages are JSON objects tagged by `type`. Bot replies may carry `points`
//! that the client renders on a map; [`FeatureCollection`] performs the same
//! shaping server-side so the payload can be validated or pre-rendered.

mod messages;
mod points;

pub use messages::{ClientMessage, ServerMessage};
pub use points::{Bounds, Feature, FeatureCollection, Geometry, DEFAULT_BOUNDS_BUFFER};
