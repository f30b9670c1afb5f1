//! Program state and domain types.
//!
//! `GameConfig` is the singleton that sequences rounds. Each round owns a `Round` record and a
//! zero-copy `Canvas` whose pixel buffer is a flat row-major RGB array. Per-player bookkeeping
//! lives in `PlayerStats` and optional team attribution in `AgentRegistration`.

use anchor_lang::prelude::*;

#[cfg(test)]
use crate::canvas::read_pixel;
use crate::canvas::{pixel_offset, write_pixel, CanvasSurface};
use crate::constants::{CANVAS_DATA_SIZE, MAX_TEAMS, PLACEMENT_COOLDOWN_SLOTS};
use crate::error::PixelWarsError;

/// Discriminator plus the in-memory size of [`Canvas`].
pub const CANVAS_ACCOUNT_SIZE: usize = 8 + std::mem::size_of::<Canvas>();

#[account]
#[derive(InitSpace)]
/// Global game configuration (PDA `["config"]`).
pub struct GameConfig {
    /// Admin allowed to start, delegate, commit and end rounds.
    pub authority: Pubkey,
    /// Last round number handed out; `0` means no round has ever started.
    pub current_round: u32,
    /// True between `start_round` and `end_round`.
    pub round_active: bool,
    pub bump: u8,
}

impl GameConfig {
    pub fn is_initialized(&self) -> bool {
        self.authority != Pubkey::default()
    }

    pub fn initialize(&mut self, authority: Pubkey, bump: u8) -> Result<()> {
        require!(!self.is_initialized(), PixelWarsError::AlreadyInitialized);
        self.authority = authority;
        self.current_round = 0;
        self.round_active = false;
        self.bump = bump;
        Ok(())
    }

    pub fn ensure_active(&self) -> Result<()> {
        require!(self.round_active, PixelWarsError::NoActiveRound);
        Ok(())
    }

    /// Activate the next round and return its number.
    pub fn open_round(&mut self) -> Result<u32> {
        require!(!self.round_active, PixelWarsError::RoundAlreadyActive);
        let next_round = self
            .current_round
            .checked_add(1)
            .ok_or(PixelWarsError::ArithmeticOverflow)?;
        self.current_round = next_round;
        self.round_active = true;
        Ok(next_round)
    }

    pub fn close_round(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.round_active = false;
        Ok(())
    }
}

#[account]
#[derive(InitSpace)]
/// Round metadata (PDA `["round", round_le]`). Stays on the base ledger for the whole round.
pub struct Round {
    pub round_number: u32,
    pub start_slot: u64,
    /// `0` until the round ends.
    pub end_slot: u64,
    /// Copied from the canvas counter when the round ends.
    pub total_placements: u64,
    pub ended: bool,
    pub bump: u8,
}

impl Round {
    /// Decode a round record from raw account data owned by this program.
    pub fn load(owner: &Pubkey, data: &[u8]) -> Result<Self> {
        require_keys_eq!(
            *owner,
            crate::ID,
            anchor_lang::error::ErrorCode::AccountOwnedByWrongProgram
        );
        Round::try_deserialize(&mut &data[..])
    }

    pub fn store(&self, data: &mut [u8]) -> Result<()> {
        self.try_serialize(&mut &mut data[..])
    }

    pub fn begin(&mut self, round_number: u32, start_slot: u64, bump: u8) {
        self.round_number = round_number;
        self.start_slot = start_slot;
        self.end_slot = 0;
        self.total_placements = 0;
        self.ended = false;
        self.bump = bump;
    }

    /// Finalize the round. The end marker is kept nonzero so `ended` and `end_slot != 0` agree.
    pub fn finish(&mut self, end_slot: u64, total_placements: u64) -> Result<()> {
        require!(!self.ended, PixelWarsError::RoundEnded);
        self.end_slot = end_slot.max(1);
        self.total_placements = total_placements;
        self.ended = true;
        Ok(())
    }
}

/// Pixel canvas for one round (PDA `["canvas", round_le]`).
///
/// Zero-copy so the handlers write straight into account data instead of moving the whole
/// buffer through the stack. Delegated to the ephemeral rollup while the round is live.
#[account(zero_copy(unsafe))]
#[repr(C)]
pub struct Canvas {
    pub total_placements: u64,
    /// Round this canvas belongs to.
    pub round: u32,
    pub bump: u8,
    pub _padding: [u8; 3],
    /// `[r0, g0, b0, r1, g1, b1, ...]`, row-major.
    pub pixels: [u8; CANVAS_DATA_SIZE],
}

impl Canvas {
    pub fn reset(&mut self, round: u32, bump: u8) {
        self.total_placements = 0;
        self.round = round;
        self.bump = bump;
        self._padding = [0; 3];
        self.pixels.fill(0);
    }

    /// Overwrite one cell and bump the placement counter. Returns the new counter value.
    pub fn paint(&mut self, x: u16, y: u16, color: [u8; 3]) -> Result<u64> {
        let offset = pixel_offset(x, y)?;
        let total_placements = self
            .total_placements
            .checked_add(1)
            .ok_or(PixelWarsError::ArithmeticOverflow)?;
        write_pixel(&mut self.pixels, offset, color);
        self.total_placements = total_placements;
        Ok(total_placements)
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u16, y: u16) -> Result<[u8; 3]> {
        let offset = pixel_offset(x, y)?;
        Ok(read_pixel(&self.pixels, offset))
    }
}

impl CanvasSurface for Canvas {
    fn canvas_round(&self) -> u32 {
        self.round
    }

    fn placements(&self) -> u64 {
        self.total_placements
    }

    fn paint(&mut self, x: u16, y: u16, color: [u8; 3]) -> Result<u64> {
        Canvas::paint(self, x, y, color)
    }
}

#[account]
#[derive(InitSpace)]
/// Per-player, per-round placement stats (PDA `["player", round_le, player]`).
pub struct PlayerStats {
    pub player: Pubkey,
    pub round: u32,
    pub pixels_placed: u32,
    /// Slot of the last accepted placement, used for the cooldown.
    pub last_placement_slot: u64,
    /// Team taken from the player's registration, if any.
    pub team_id: Option<u8>,
    pub bump: u8,
}

impl PlayerStats {
    pub fn check_cooldown(&self, now_slot: u64) -> Result<()> {
        // First placement of the round is never throttled.
        if self.pixels_placed == 0 {
            return Ok(());
        }
        let elapsed = now_slot.saturating_sub(self.last_placement_slot);
        require!(
            elapsed >= PLACEMENT_COOLDOWN_SLOTS,
            PixelWarsError::CooldownNotElapsed
        );
        Ok(())
    }

    pub fn record_placement(
        &mut self,
        player: Pubkey,
        round: u32,
        team_id: Option<u8>,
        bump: u8,
        now_slot: u64,
    ) -> Result<u32> {
        let pixels_placed = self
            .pixels_placed
            .checked_add(1)
            .ok_or(PixelWarsError::ArithmeticOverflow)?;
        if self.pixels_placed == 0 {
            self.player = player;
            self.round = round;
            self.bump = bump;
        }
        if team_id.is_some() {
            self.team_id = team_id;
        }
        self.pixels_placed = pixels_placed;
        self.last_placement_slot = now_slot;
        Ok(pixels_placed)
    }
}

#[account]
#[derive(InitSpace)]
/// Agent registration for a round (PDA `["agent", agent, round_le]`).
pub struct AgentRegistration {
    pub agent: Pubkey,
    pub round: u32,
    /// 0-based team id, below [`MAX_TEAMS`].
    pub team_id: u8,
    /// Unix timestamp (seconds) of registration.
    pub registered_at: i64,
    pub bump: u8,
}

impl AgentRegistration {
    pub fn register(
        &mut self,
        agent: Pubkey,
        round: u32,
        team_id: u8,
        registered_at: i64,
        bump: u8,
    ) -> Result<()> {
        require!(team_id < MAX_TEAMS, PixelWarsError::InvalidTeamId);
        require!(
            self.agent == Pubkey::default(),
            PixelWarsError::AgentAlreadyRegistered
        );
        self.agent = agent;
        self.round = round;
        self.team_id = team_id;
        self.registered_at = registered_at;
        self.bump = bump;
        Ok(())
    }
}

/// Team stored in the registration PDA, or `None` while that account was never created.
///
/// The PDA address is fixed by the player and round, so a registered player cannot hide
/// their registration by passing another account.
pub fn registration_team(owner: &Pubkey, data: &[u8]) -> Result<Option<u8>> {
    if *owner != crate::ID && data.is_empty() {
        return Ok(None);
    }
    require_keys_eq!(
        *owner,
        crate::ID,
        anchor_lang::error::ErrorCode::AccountOwnedByWrongProgram
    );
    let registration = AgentRegistration::try_deserialize(&mut &data[..])?;
    Ok(Some(registration.team_id))
}

/// Decide which team a placement is attributed to.
///
/// The registration is authoritative: a requested team must match it, and without a
/// registration no team can be claimed.
pub fn resolve_team(registered: Option<u8>, requested: Option<u8>) -> Result<Option<u8>> {
    match (registered, requested) {
        (Some(team), Some(claimed)) => {
            require!(team == claimed, PixelWarsError::InvalidTeamId);
            Ok(Some(team))
        }
        (Some(team), None) => Ok(Some(team)),
        (None, Some(_)) => err!(PixelWarsError::InvalidTeamId),
        (None, None) => Ok(None),
    }
}
