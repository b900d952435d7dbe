//! Read-only decoder for Teeworlds/DDNet map datafiles.
//!
//! A map is a generic "datafile" container — a fixed header, item and
//! raw-data directories, and zlib-compressed payload blocks — whose items
//! describe groups and layers. [`load`] walks that structure and
//! materializes the gameplay-relevant tile layers (collision, front,
//! teleporter, speedup, switch, tune), the map settings and a few derived
//! coordinate indices into a caller-owned [`MapData`].
//!
//! The container layer is exposed on its own as [`Datafile`] for callers
//! that want to read other item types through the same directory
//! machinery.

pub mod codec;
pub mod datafile;
pub mod error;
pub mod map;

pub use datafile::Datafile;
pub use error::{Error, Result};
pub use map::entities::{
    TILE_SPAWN, TILE_SPAWN_BLUE, TILE_SPAWN_RED, TILE_TELE_CHECK_OUT, TILE_TELE_OUT,
};
pub use map::items::TileLayerFlags;
pub use map::layers::{SpeedupLayer, SwitchLayer, TeleLayer, TileLayer, TuneLayer};
pub use map::{load, MapData, MapInfo};
