pub const CANVAS_WIDTH: u16 = 50;

pub const CANVAS_HEIGHT: u16 = 50;

pub const BYTES_PER_PIXEL: usize = 3; // r, g, b

pub const CANVAS_DATA_SIZE: usize =
    (CANVAS_WIDTH as usize) * (CANVAS_HEIGHT as usize) * BYTES_PER_PIXEL;

/// Minimum slot distance between two accepted placements from the same player.
pub const PLACEMENT_COOLDOWN_SLOTS: u64 = 5;

/// Teams are 0-based: valid ids are `0..MAX_TEAMS`.
pub const MAX_TEAMS: u8 = 3;

pub const SEED_CONFIG: &[u8] = b"config";

pub const SEED_ROUND: &[u8] = b"round";

pub const SEED_CANVAS: &[u8] = b"canvas";

pub const SEED_PLAYER: &[u8] = b"player";

pub const SEED_AGENT: &[u8] = b"agent";
