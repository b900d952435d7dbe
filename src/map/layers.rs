//! Fixed-size tile records and their columnar projections.
//!
//! A tilemap layer's data block is `width * height` consecutive records in
//! row-major order. Each gameplay kind has its own record layout; all of
//! them decode through one generic routine and fan out into equal-length
//! per-field columns.

use crate::codec::BinaryReader;
use crate::error::Result;

/// One fixed-size record read from a decompressed data block.
pub(crate) trait TileRecord: Sized {
    /// On-disk record size in bytes, including any writer padding.
    const SIZE: usize;
    fn read(reader: &mut BinaryReader) -> Result<Self>;
}

/// Decode `count` records from a block, or `None` when the block is too
/// small to hold them.
pub(crate) fn decode_tiles<T: TileRecord>(bytes: &[u8], count: usize) -> Option<Vec<T>> {
    if count.checked_mul(T::SIZE)? > bytes.len() {
        return None;
    }
    let mut reader = BinaryReader::new(bytes);
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(T::read(&mut reader).ok()?);
    }
    Some(records)
}

/// Game/front tile: index, flags, skip, reserved — one byte each.
pub(crate) struct PlainTile {
    pub index: u8,
    pub flags: u8,
}

impl TileRecord for PlainTile {
    const SIZE: usize = 4;

    fn read(reader: &mut BinaryReader) -> Result<Self> {
        let tile = Self {
            index: reader.read_u8()?,
            flags: reader.read_u8()?,
        };
        reader.skip(2)?; // skip + reserved
        Ok(tile)
    }
}

pub(crate) struct TeleTile {
    pub number: u8,
    pub kind: u8,
}

impl TileRecord for TeleTile {
    const SIZE: usize = 2;

    fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            number: reader.read_u8()?,
            kind: reader.read_u8()?,
        })
    }
}

/// Speedup records carry a 16-bit angle; the writer's struct layout pads
/// one byte between the type and the angle.
pub(crate) struct SpeedupTile {
    pub force: u8,
    pub max_speed: u8,
    pub kind: u8,
    pub angle: i16,
}

impl TileRecord for SpeedupTile {
    const SIZE: usize = 6;

    fn read(reader: &mut BinaryReader) -> Result<Self> {
        let force = reader.read_u8()?;
        let max_speed = reader.read_u8()?;
        let kind = reader.read_u8()?;
        reader.skip(1)?;
        Ok(Self {
            force,
            max_speed,
            kind,
            angle: reader.read_i16_le()?,
        })
    }
}

pub(crate) struct SwitchTile {
    pub number: u8,
    pub kind: u8,
    pub flags: u8,
    pub delay: u8,
}

impl TileRecord for SwitchTile {
    const SIZE: usize = 4;

    fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            number: reader.read_u8()?,
            kind: reader.read_u8()?,
            flags: reader.read_u8()?,
            delay: reader.read_u8()?,
        })
    }
}

pub(crate) struct TuneTile {
    pub number: u8,
    pub kind: u8,
}

impl TileRecord for TuneTile {
    const SIZE: usize = 2;

    fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            number: reader.read_u8()?,
            kind: reader.read_u8()?,
        })
    }
}

/// Collision (game) or front-decoration layer, split into columns. Empty
/// columns mean "no data available", not an empty map.
#[derive(Debug, Clone, Default)]
pub struct TileLayer {
    pub index: Vec<u8>,
    pub flags: Vec<u8>,
}

impl TileLayer {
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub(crate) fn from_records(tiles: Vec<PlainTile>) -> Self {
        let mut layer = Self {
            index: Vec::with_capacity(tiles.len()),
            flags: Vec::with_capacity(tiles.len()),
        };
        for tile in &tiles {
            layer.index.push(tile.index);
            layer.flags.push(tile.flags);
        }
        layer
    }
}

#[derive(Debug, Clone, Default)]
pub struct TeleLayer {
    pub number: Vec<u8>,
    pub kind: Vec<u8>,
}

impl TeleLayer {
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }

    pub(crate) fn from_records(tiles: Vec<TeleTile>) -> Self {
        let mut layer = Self {
            number: Vec::with_capacity(tiles.len()),
            kind: Vec::with_capacity(tiles.len()),
        };
        for tile in &tiles {
            layer.number.push(tile.number);
            layer.kind.push(tile.kind);
        }
        layer
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpeedupLayer {
    pub force: Vec<u8>,
    pub max_speed: Vec<u8>,
    pub kind: Vec<u8>,
    pub angle: Vec<i16>,
}

impl SpeedupLayer {
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }

    pub(crate) fn from_records(tiles: Vec<SpeedupTile>) -> Self {
        let mut layer = Self {
            force: Vec::with_capacity(tiles.len()),
            max_speed: Vec::with_capacity(tiles.len()),
            kind: Vec::with_capacity(tiles.len()),
            angle: Vec::with_capacity(tiles.len()),
        };
        for tile in &tiles {
            layer.force.push(tile.force);
            layer.max_speed.push(tile.max_speed);
            layer.kind.push(tile.kind);
            layer.angle.push(tile.angle);
        }
        layer
    }
}

#[derive(Debug, Clone, Default)]
pub struct SwitchLayer {
    pub number: Vec<u8>,
    pub kind: Vec<u8>,
    pub flags: Vec<u8>,
    pub delay: Vec<u8>,
}

impl SwitchLayer {
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }

    pub(crate) fn from_records(tiles: Vec<SwitchTile>) -> Self {
        let mut layer = Self {
            number: Vec::with_capacity(tiles.len()),
            kind: Vec::with_capacity(tiles.len()),
            flags: Vec::with_capacity(tiles.len()),
            delay: Vec::with_capacity(tiles.len()),
        };
        for tile in &tiles {
            layer.number.push(tile.number);
            layer.kind.push(tile.kind);
            layer.flags.push(tile.flags);
            layer.delay.push(tile.delay);
        }
        layer
    }
}

#[derive(Debug, Clone, Default)]
pub struct TuneLayer {
    pub number: Vec<u8>,
    pub kind: Vec<u8>,
}

impl TuneLayer {
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }

    pub(crate) fn from_records(tiles: Vec<TuneTile>) -> Self {
        let mut layer = Self {
            number: Vec::with_capacity(tiles.len()),
            kind: Vec::with_capacity(tiles.len()),
        };
        for tile in &tiles {
            layer.number.push(tile.number);
            layer.kind.push(tile.kind);
        }
        layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_tiles() {
        let bytes = [1, 0, 0, 0, 0, 0, 0, 0, 2, 8, 0, 0, 0, 0, 0, 0];
        let tiles: Vec<PlainTile> = decode_tiles(&bytes, 4).unwrap();
        let layer = TileLayer::from_records(tiles);
        assert_eq!(layer.index, [1, 0, 2, 0]);
        assert_eq!(layer.flags, [0, 0, 8, 0]);
    }

    #[test]
    fn test_decode_rejects_short_block() {
        let bytes = [1, 0, 0, 0];
        assert!(decode_tiles::<PlainTile>(&bytes, 2).is_none());
    }

    #[test]
    fn test_decode_speedup_padding_and_angle() {
        // force, max_speed, kind, pad, angle lo, angle hi
        let bytes = [50, 10, 1, 0xee, 0x2c, 0x01];
        let tiles: Vec<SpeedupTile> = decode_tiles(&bytes, 1).unwrap();
        let layer = SpeedupLayer::from_records(tiles);
        assert_eq!(layer.force, [50]);
        assert_eq!(layer.max_speed, [10]);
        assert_eq!(layer.kind, [1]);
        assert_eq!(layer.angle, [300]);
    }

    #[test]
    fn test_decode_negative_angle() {
        let bytes = [0, 0, 0, 0, 0xd8, 0xff];
        let tiles: Vec<SpeedupTile> = decode_tiles(&bytes, 1).unwrap();
        assert_eq!(tiles[0].angle, -40);
    }

    #[test]
    fn test_decode_switch_tiles() {
        let bytes = [3, 22, 1, 90];
        let tiles: Vec<SwitchTile> = decode_tiles(&bytes, 1).unwrap();
        let layer = SwitchLayer::from_records(tiles);
        assert_eq!(layer.number, [3]);
        assert_eq!(layer.kind, [22]);
        assert_eq!(layer.flags, [1]);
        assert_eq!(layer.delay, [90]);
    }

    #[test]
    fn test_zero_count_is_empty() {
        let tiles: Vec<TuneTile> = decode_tiles(&[], 0).unwrap();
        let layer = TuneLayer::from_records(tiles);
        assert!(layer.is_empty());
    }
}
