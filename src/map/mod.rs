//! Map semantics on top of the generic datafile container: walking groups
//! and layers, materializing the gameplay tile layers, settings and
//! derived indices.

pub mod entities;
pub mod items;
pub mod layers;
pub mod settings;

use std::path::Path;

use tracing::{debug, warn};

use crate::codec::BinaryReader;
use crate::datafile::Datafile;
use crate::error::Result;

use items::{Group, InfoSettings, ItemType, LayerHeader, TileLayerFlags, Tilemap, LAYER_TYPE_TILES};
use layers::{
    decode_tiles, PlainTile, SpeedupLayer, SpeedupTile, SwitchLayer, SwitchTile, TeleLayer,
    TeleTile, TileLayer, TileRecord, TuneLayer, TuneTile,
};

/// Optional map metadata resolved from the info item's string blocks.
#[derive(Debug, Clone, Default)]
pub struct MapInfo {
    pub author: Option<String>,
    pub version: Option<String>,
    pub credits: Option<String>,
    pub license: Option<String>,
}

/// Everything gameplay-relevant extracted from one map file.
///
/// Empty layers mean "not present in the map" (or the backing data block
/// failed to load), never "all air" — check before use. All coordinates
/// are tile coordinates; tile arrays are row-major (`y * width + x`).
#[derive(Debug, Default)]
pub struct MapData {
    pub width: i32,
    pub height: i32,
    pub game: TileLayer,
    pub front: TileLayer,
    pub tele: TeleLayer,
    pub speedup: SpeedupLayer,
    pub switches: SwitchLayer,
    pub tune: TuneLayer,
    pub settings: Vec<String>,
    pub info: MapInfo,
    pub spawn_points: Vec<(i32, i32)>,
    pub tele_outs: Vec<(i32, i32)>,
    pub tele_check_outs: Vec<(i32, i32)>,
}

impl MapData {
    pub fn has_game_layer(&self) -> bool {
        !self.game.is_empty()
    }

    /// Collision tile index at (x, y), if the game layer is present and
    /// the coordinates are inside the map.
    pub fn game_tile(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        self.game.index.get((y * self.width + x) as usize).copied()
    }

    /// Reset to the empty state, dropping every owned buffer. Safe to call
    /// repeatedly; a cleared map is indistinguishable from a fresh default.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Load a map file and extract its gameplay data.
///
/// Fatal container problems (unopenable, malformed or truncated file)
/// return an error. Per-block problems are not fatal: the affected layer
/// or settings section stays empty and the rest of the map loads.
pub fn load(path: impl AsRef<Path>) -> Result<MapData> {
    let path = path.as_ref();
    let mut datafile = Datafile::open(path)?;

    let mut map = MapData::default();
    walk_layers(&mut datafile, &mut map);
    read_info(&mut datafile, &mut map);
    map.spawn_points = entities::spawn_points(&map.game, map.width);
    map.tele_outs = entities::tele_outs(&map.tele, map.width);
    map.tele_check_outs = entities::tele_check_outs(&map.tele, map.width);

    debug!(
        path = %path.display(),
        width = map.width,
        height = map.height,
        settings = map.settings.len(),
        spawns = map.spawn_points.len(),
        "map loaded"
    );
    Ok(map)
}

/// Walk groups in item order, visiting each group's layer span and
/// dispatching tilemap layers to their extractor by flag.
fn walk_layers(datafile: &mut Datafile, map: &mut MapData) {
    let (groups_start, groups_num) = datafile.item_type(ItemType::Group.tag());
    let (layers_start, layers_num) = datafile.item_type(ItemType::Layer.tag());
    let mut consumed = TileLayerFlags::empty();

    for g in 0..groups_num {
        let Some(group) = read_group(datafile, groups_start + g) else {
            continue;
        };
        for l in 0..group.num_layers.max(0) as usize {
            let Some(index) = layer_item_index(layers_start, layers_num, group.start_layer, l)
            else {
                warn!(group = g, "group references layers outside the layer range");
                break;
            };
            let Some(tilemap) = read_tilemap(datafile, index) else {
                continue;
            };
            extract_tilemap(datafile, map, &tilemap, &mut consumed);
        }
    }
}

fn read_group(datafile: &Datafile, index: usize) -> Option<Group> {
    let parsed = datafile
        .item(index)
        .and_then(|item| Group::read(&mut BinaryReader::new(item.payload)));
    match parsed {
        Ok(group) => Some(group),
        Err(err) => {
            warn!(index, %err, "skipping unreadable group item");
            None
        }
    }
}

/// Item index for the l-th layer of a group, bounds-checked against the
/// LAYER item range. The format stores `start_layer` relative to that
/// range and nothing stops a corrupt file from pointing outside it.
fn layer_item_index(
    layers_start: usize,
    layers_num: usize,
    start_layer: i32,
    offset: usize,
) -> Option<usize> {
    if start_layer < 0 {
        return None;
    }
    let relative = (start_layer as usize).checked_add(offset)?;
    if relative >= layers_num {
        return None;
    }
    Some(layers_start + relative)
}

/// Read a layer item and, when it is a tilemap, its body. Non-tilemap
/// layers and unparsable items yield `None`.
fn read_tilemap(datafile: &Datafile, index: usize) -> Option<Tilemap> {
    let item = match datafile.item(index) {
        Ok(item) => item,
        Err(err) => {
            warn!(index, %err, "skipping unreadable layer item");
            return None;
        }
    };
    let mut reader = BinaryReader::new(item.payload);
    let header = match LayerHeader::read(&mut reader) {
        Ok(header) => header,
        Err(err) => {
            warn!(index, %err, "skipping undersized layer item");
            return None;
        }
    };
    if header.kind != LAYER_TYPE_TILES {
        return None;
    }
    match Tilemap::read(&mut reader) {
        Ok(tilemap) => Some(tilemap),
        Err(err) => {
            warn!(index, %err, "skipping undersized tilemap item");
            None
        }
    }
}

/// Dispatch one tilemap layer. Priority order is GAME, FRONT, TELE,
/// SPEEDUP, SWITCH, TUNE; a layer is consumed by exactly one extractor and
/// only the first layer of each kind across the whole walk is used. The
/// first GAME layer fixes the map dimensions; later layers are assumed to
/// share them.
fn extract_tilemap(
    datafile: &mut Datafile,
    map: &mut MapData,
    tilemap: &Tilemap,
    consumed: &mut TileLayerFlags,
) {
    if tilemap.flags.is_empty() {
        return; // purely visual layer
    }
    let Some(count) = tile_count(tilemap.width, tilemap.height) else {
        warn!(
            width = tilemap.width,
            height = tilemap.height,
            "tilemap has invalid dimensions"
        );
        return;
    };

    if tilemap.flags.contains(TileLayerFlags::GAME) {
        if claim(consumed, TileLayerFlags::GAME) {
            map.width = tilemap.width;
            map.height = tilemap.height;
            if let Some(tiles) = fetch_tiles::<PlainTile>(datafile, tilemap.data, count) {
                map.game = TileLayer::from_records(tiles);
            }
        }
    } else if tilemap.flags.contains(TileLayerFlags::FRONT) {
        if claim(consumed, TileLayerFlags::FRONT) {
            if let Some(tiles) = fetch_tiles::<PlainTile>(datafile, tilemap.data_front, count) {
                map.front = TileLayer::from_records(tiles);
            }
        }
    } else if tilemap.flags.contains(TileLayerFlags::TELE) {
        if claim(consumed, TileLayerFlags::TELE) {
            if let Some(tiles) = fetch_tiles::<TeleTile>(datafile, tilemap.data_tele, count) {
                map.tele = TeleLayer::from_records(tiles);
            }
        }
    } else if tilemap.flags.contains(TileLayerFlags::SPEEDUP) {
        if claim(consumed, TileLayerFlags::SPEEDUP) {
            if let Some(tiles) = fetch_tiles::<SpeedupTile>(datafile, tilemap.data_speedup, count) {
                map.speedup = SpeedupLayer::from_records(tiles);
            }
        }
    } else if tilemap.flags.contains(TileLayerFlags::SWITCH) {
        if claim(consumed, TileLayerFlags::SWITCH) {
            if let Some(tiles) = fetch_tiles::<SwitchTile>(datafile, tilemap.data_switch, count) {
                map.switches = SwitchLayer::from_records(tiles);
            }
        }
    } else if tilemap.flags.contains(TileLayerFlags::TUNE) {
        if claim(consumed, TileLayerFlags::TUNE) {
            if let Some(tiles) = fetch_tiles::<TuneTile>(datafile, tilemap.data_tune, count) {
                map.tune = TuneLayer::from_records(tiles);
            }
        }
    }
}

fn claim(consumed: &mut TileLayerFlags, flag: TileLayerFlags) -> bool {
    if consumed.contains(flag) {
        return false;
    }
    consumed.insert(flag);
    true
}

fn tile_count(width: i32, height: i32) -> Option<usize> {
    if width < 0 || height < 0 {
        return None;
    }
    (width as usize).checked_mul(height as usize)
}

fn fetch_tiles<T: TileRecord>(datafile: &mut Datafile, block: i32, count: usize) -> Option<Vec<T>> {
    let bytes = datafile.data(block)?;
    let tiles = decode_tiles(bytes, count);
    if tiles.is_none() {
        warn!(block, count, "tile data block too small for layer");
    }
    tiles
}

/// Resolve the first id-0 info item into metadata strings and the ordered
/// settings list. Further info items are ignored.
fn read_info(datafile: &mut Datafile, map: &mut MapData) {
    let (start, num) = datafile.item_type(ItemType::Info.tag());
    let mut found = None;
    for i in 0..num {
        match datafile.item(start + i) {
            Ok(item) if item.id == 0 => {
                found = InfoSettings::read(&mut BinaryReader::new(item.payload))
                    .map_err(|err| warn!(%err, "info item too small"))
                    .ok();
                break;
            }
            Ok(_) => {}
            Err(err) => warn!(index = start + i, %err, "skipping unreadable info item"),
        }
    }
    let Some(info) = found else {
        return;
    };

    map.info = MapInfo {
        author: info_string(datafile, info.author),
        version: info_string(datafile, info.map_version),
        credits: info_string(datafile, info.credits),
        license: info_string(datafile, info.license),
    };
    if info.settings >= 0 {
        if let Some(block) = datafile.data(info.settings) {
            map.settings = settings::parse_settings(block);
        }
    }
}

fn info_string(datafile: &mut Datafile, block: i32) -> Option<String> {
    if block < 0 {
        return None;
    }
    let text = settings::parse_string(datafile.data(block)?);
    (!text.is_empty()).then_some(text)
}
