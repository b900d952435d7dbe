//! Wire-format map item records.
//!
//! Every record layout is spelled out field by field against the reader;
//! nothing is derived from struct layout, so host padding and endianness
//! never leak into the format.

use crate::codec::BinaryReader;
use crate::error::Result;

/// Item-type tags registered in the container's type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Version = 0,
    Info = 1,
    Image = 2,
    Envelope = 3,
    Group = 4,
    Layer = 5,
    EnvPoints = 6,
    Sound = 7,
}

impl ItemType {
    pub const fn tag(self) -> i32 {
        self as i32
    }
}

/// Layer type discriminant for tilemap layers.
pub const LAYER_TYPE_TILES: i32 = 2;

bitflags::bitflags! {
    /// Gameplay flag bits on a tilemap layer. The set bit selects which
    /// tile-record type the layer's data block decodes as; a layer with
    /// none of these bits is purely visual.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TileLayerFlags: i32 {
        const GAME = 1;
        const TELE = 2;
        const SPEEDUP = 4;
        const FRONT = 8;
        const SWITCH = 16;
        const TUNE = 32;
    }
}

/// A group of consecutive layers sharing placement parameters. Only the
/// leading seven fields are consumed; newer group versions append clipping
/// and name fields behind them.
#[derive(Debug, Clone)]
pub struct Group {
    pub version: i32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub parallax_x: i32,
    pub parallax_y: i32,
    pub start_layer: i32,
    pub num_layers: i32,
}

impl Group {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            version: reader.read_i32_le()?,
            offset_x: reader.read_i32_le()?,
            offset_y: reader.read_i32_le()?,
            parallax_x: reader.read_i32_le()?,
            parallax_y: reader.read_i32_le()?,
            start_layer: reader.read_i32_le()?,
            num_layers: reader.read_i32_le()?,
        })
    }
}

/// Common prefix of every layer item.
#[derive(Debug, Clone)]
pub struct LayerHeader {
    pub version: i32,
    pub kind: i32,
    pub flags: i32,
}

impl LayerHeader {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            version: reader.read_i32_le()?,
            kind: reader.read_i32_le()?,
            flags: reader.read_i32_le()?,
        })
    }
}

/// Tilemap layer body, read after the [`LayerHeader`]. The five trailing
/// data references are a DDRace extension; maps written before it simply
/// end early, so those fields default to -1 (no block).
#[derive(Debug, Clone)]
pub struct Tilemap {
    pub version: i32,
    pub width: i32,
    pub height: i32,
    pub flags: TileLayerFlags,
    pub color: [i32; 4],
    pub color_env: i32,
    pub color_env_offset: i32,
    pub image: i32,
    pub data: i32,
    pub name: [i32; 3],
    pub data_tele: i32,
    pub data_speedup: i32,
    pub data_front: i32,
    pub data_switch: i32,
    pub data_tune: i32,
}

impl Tilemap {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            version: reader.read_i32_le()?,
            width: reader.read_i32_le()?,
            height: reader.read_i32_le()?,
            flags: TileLayerFlags::from_bits_truncate(reader.read_i32_le()?),
            color: [
                reader.read_i32_le()?,
                reader.read_i32_le()?,
                reader.read_i32_le()?,
                reader.read_i32_le()?,
            ],
            color_env: reader.read_i32_le()?,
            color_env_offset: reader.read_i32_le()?,
            image: reader.read_i32_le()?,
            data: reader.read_i32_le()?,
            name: [
                reader.read_i32_le()?,
                reader.read_i32_le()?,
                reader.read_i32_le()?,
            ],
            data_tele: reader.read_i32_or(-1),
            data_speedup: reader.read_i32_or(-1),
            data_front: reader.read_i32_or(-1),
            data_switch: reader.read_i32_or(-1),
            data_tune: reader.read_i32_or(-1),
        })
    }
}

/// Map-info item body. The string fields and `settings` are raw-data block
/// references; -1 means absent.
#[derive(Debug, Clone)]
pub struct InfoSettings {
    pub version: i32,
    pub author: i32,
    pub map_version: i32,
    pub credits: i32,
    pub license: i32,
    pub settings: i32,
}

impl InfoSettings {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            version: reader.read_i32_le()?,
            author: reader.read_i32_le()?,
            map_version: reader.read_i32_le()?,
            credits: reader.read_i32_le()?,
            license: reader.read_i32_le()?,
            settings: reader.read_i32_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_read_group() {
        let bytes = words(&[2, 10, -20, 100, 100, 3, 4]);
        let group = Group::read(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(group.offset_y, -20);
        assert_eq!(group.start_layer, 3);
        assert_eq!(group.num_layers, 4);
    }

    #[test]
    fn test_read_tilemap_with_ddrace_fields() {
        let bytes = words(&[
            1, 50, 40, 2, 255, 255, 255, 255, -1, 0, -1, 7, 0, 0, 0, 8, -1, -1, -1, -1,
        ]);
        let tilemap = Tilemap::read(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(tilemap.width, 50);
        assert_eq!(tilemap.height, 40);
        assert_eq!(tilemap.flags, TileLayerFlags::TELE);
        assert_eq!(tilemap.data, 7);
        assert_eq!(tilemap.data_tele, 8);
        assert_eq!(tilemap.data_tune, -1);
    }

    #[test]
    fn test_read_tilemap_legacy_ends_early() {
        // pre-DDRace payload stops after the name words
        let bytes = words(&[1, 5, 5, 1, 0, 0, 0, 0, -1, 0, -1, 2, 0, 0, 0]);
        let tilemap = Tilemap::read(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(tilemap.flags, TileLayerFlags::GAME);
        assert_eq!(tilemap.data, 2);
        assert_eq!(tilemap.data_tele, -1);
        assert_eq!(tilemap.data_switch, -1);
    }

    #[test]
    fn test_read_info_settings_short_payload() {
        // payload shorter than the full record is rejected before the
        // settings field, but a 5-field info record still parses with the
        // settings reference defaulted
        let bytes = words(&[1, -1, -1, -1, -1]);
        let info = InfoSettings::read(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(info.settings, -1);

        let bytes = words(&[1, -1]);
        assert!(InfoSettings::read(&mut BinaryReader::new(&bytes)).is_err());
    }

    #[test]
    fn test_flags_truncate_unknown_bits() {
        let flags = TileLayerFlags::from_bits_truncate(1 | 64);
        assert_eq!(flags, TileLayerFlags::GAME);
    }
}
