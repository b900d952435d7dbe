//! Derived coordinate indices scanned out of the materialized layers.

use super::layers::{TeleLayer, TileLayer};

/// Entity tiles sit above the entity offset (255 - 16 * 4) in the game
/// layer's index space.
pub const TILE_SPAWN: u8 = 192;
pub const TILE_SPAWN_RED: u8 = 193;
pub const TILE_SPAWN_BLUE: u8 = 194;

/// Teleporter target tile kinds in the tele layer.
pub const TILE_TELE_OUT: u8 = 27;
pub const TILE_TELE_CHECK_OUT: u8 = 30;

/// All spawn points (default, red, blue) in row-major encounter order.
pub(crate) fn spawn_points(game: &TileLayer, width: i32) -> Vec<(i32, i32)> {
    scan_tiles(&game.index, width, |index| {
        matches!(index, TILE_SPAWN | TILE_SPAWN_RED | TILE_SPAWN_BLUE)
    })
}

pub(crate) fn tele_outs(tele: &TeleLayer, width: i32) -> Vec<(i32, i32)> {
    scan_tiles(&tele.kind, width, |kind| kind == TILE_TELE_OUT)
}

pub(crate) fn tele_check_outs(tele: &TeleLayer, width: i32) -> Vec<(i32, i32)> {
    scan_tiles(&tele.kind, width, |kind| kind == TILE_TELE_CHECK_OUT)
}

/// Collect the tile coordinates of every matching cell. Counts first so
/// the result is allocated exactly once; both passes run in the same
/// row-major order, which keeps the list deterministic.
fn scan_tiles(values: &[u8], width: i32, matches: impl Fn(u8) -> bool) -> Vec<(i32, i32)> {
    if width <= 0 {
        return Vec::new();
    }
    let count = values.iter().filter(|&&value| matches(value)).count();
    let mut positions = Vec::with_capacity(count);
    for (i, &value) in values.iter().enumerate() {
        if matches(value) {
            positions.push((i as i32 % width, i as i32 / width));
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_spawn_coordinates() {
        let mut layer = TileLayer::default();
        layer.index = vec![0; 5 * 8];
        layer.flags = vec![0; 5 * 8];
        layer.index[5 * 5 + 3] = TILE_SPAWN;
        assert_eq!(spawn_points(&layer, 5), vec![(3, 5)]);
    }

    #[test]
    fn test_all_spawn_kinds_in_encounter_order() {
        let mut layer = TileLayer::default();
        layer.index = vec![0, TILE_SPAWN_BLUE, 1, TILE_SPAWN, 0, TILE_SPAWN_RED];
        assert_eq!(spawn_points(&layer, 3), vec![(1, 0), (0, 1), (2, 1)]);
    }

    #[test]
    fn test_tele_outs_filter_kind() {
        let mut layer = TeleLayer::default();
        layer.kind = vec![26, TILE_TELE_OUT, TILE_TELE_CHECK_OUT, TILE_TELE_OUT];
        layer.number = vec![1, 1, 2, 3];
        assert_eq!(tele_outs(&layer, 2), vec![(1, 0), (1, 1)]);
        assert_eq!(tele_check_outs(&layer, 2), vec![(0, 1)]);
    }

    #[test]
    fn test_degenerate_width() {
        let mut layer = TileLayer::default();
        layer.index = vec![TILE_SPAWN];
        assert!(spawn_points(&layer, 0).is_empty());
    }
}
