//! Instruction rules applied to account state.
//!
//! Handlers in `lib.rs` resolve accounts, read the clock and then call into here, so every
//! check runs before the first write and the same code is exercised by host tests.

use anchor_lang::prelude::*;

use crate::canvas::{
    pixel_offset, read_header, CanvasCustody, CanvasData, CanvasHeader, CanvasSurface,
};
use crate::error::PixelWarsError;
use crate::state::{resolve_team, Canvas, GameConfig, PlayerStats, Round};

/// One `place_pixel` request as sent by a player.
#[derive(Clone, Copy, Debug)]
pub struct PixelRequest {
    pub x: u16,
    pub y: u16,
    pub color: [u8; 3],
    pub team_id: Option<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementReceipt {
    pub total_placements: u64,
    pub pixels_placed: u32,
    pub team_id: Option<u8>,
}

/// Activate round N+1 and initialize its freshly allocated canvas and round record.
pub fn apply_start_round(
    config: &mut GameConfig,
    canvas: &mut Canvas,
    round: &mut Round,
    canvas_bump: u8,
    round_bump: u8,
    start_slot: u64,
) -> Result<u32> {
    let round_number = config.open_round()?;
    canvas.reset(round_number, canvas_bump);
    round.begin(round_number, start_slot, round_bump);
    Ok(round_number)
}

/// Writable view of the current canvas for `place_pixel`.
///
/// The round flag is checked first: while idle the canvas PDA may not exist yet, or may still
/// be owned by the delegation program after an early `end_round`.
pub fn open_canvas<'a>(
    config: &GameConfig,
    canvas_owner: &Pubkey,
    canvas_data: &'a mut [u8],
) -> Result<CanvasData<'a>> {
    config.ensure_active()?;
    CanvasData::from_account(canvas_owner, canvas_data)
}

/// Validate and apply a single placement.
///
/// `stats` may be a brand new record (`pixels_placed == 0`); `registered_team` is the team
/// stored in the player's registration for this round, if one was supplied.
#[allow(clippy::too_many_arguments)]
pub fn apply_placement<C: CanvasSurface>(
    config: &GameConfig,
    canvas: &mut C,
    stats: &mut PlayerStats,
    registered_team: Option<u8>,
    player: Pubkey,
    stats_bump: u8,
    request: PixelRequest,
    now_slot: u64,
) -> Result<PlacementReceipt> {
    config.ensure_active()?;
    pixel_offset(request.x, request.y)?;
    require!(
        canvas.canvas_round() == config.current_round,
        PixelWarsError::StaleCanvas
    );
    let team_id = resolve_team(registered_team, request.team_id)?;
    stats.check_cooldown(now_slot)?;
    canvas
        .placements()
        .checked_add(1)
        .ok_or(PixelWarsError::ArithmeticOverflow)?;

    let pixels_placed = stats.record_placement(
        player,
        config.current_round,
        team_id,
        stats_bump,
        now_slot,
    )?;
    let total_placements = canvas.paint(request.x, request.y, request.color)?;
    Ok(PlacementReceipt {
        total_placements,
        pixels_placed,
        team_id,
    })
}

/// Finalize the active round from whatever canvas header is visible on this ledger.
pub fn apply_end_round(
    config: &mut GameConfig,
    round: &mut Round,
    header: CanvasHeader,
    end_slot: u64,
) -> Result<()> {
    config.ensure_active()?;
    require!(
        header.round == config.current_round && round.round_number == config.current_round,
        PixelWarsError::StaleCanvas
    );
    round.finish(end_slot, header.total_placements)?;
    config.close_round()
}

/// `end_round` over raw account data.
///
/// The round flag is checked before either account is decoded, so calling this while idle
/// reports `NoActiveRound` even when the round and canvas PDAs do not exist.
pub fn end_round_from_accounts(
    config: &mut GameConfig,
    canvas_data: &[u8],
    round_owner: &Pubkey,
    round_data: &mut [u8],
    end_slot: u64,
) -> Result<Round> {
    config.ensure_active()?;
    let header = read_header(canvas_data)?;
    let mut round = Round::load(round_owner, round_data)?;
    apply_end_round(config, &mut round, header, end_slot)?;
    round.store(round_data)?;
    Ok(round)
}

/// Header of the canvas to commit, or `None` when it has already left program custody and
/// there is nothing left to do.
pub fn pending_commit(
    config: &GameConfig,
    canvas_owner: &Pubkey,
    canvas_data: &[u8],
) -> Result<Option<CanvasHeader>> {
    if CanvasCustody::of(canvas_owner).is_delegated() {
        return Ok(None);
    }
    let header = read_header(canvas_data)?;
    require!(
        header.round == config.current_round,
        PixelWarsError::StaleCanvas
    );
    Ok(Some(header))
}
