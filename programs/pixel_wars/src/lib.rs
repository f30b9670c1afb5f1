//! Pixel Wars — a shared on-chain canvas played on a Magic Block ephemeral rollup.
//!
//! High level flow:
//! - The authority creates the `GameConfig` PDA once.
//! - `start_round` allocates a fresh `Round` and zeroed `Canvas` for round N+1 and activates it.
//! - `delegate_canvas` hands the canvas to the ephemeral rollup, where `place_pixel` runs cheaply.
//! - `commit_canvas` (sent to the rollup) flushes the canvas back to the base ledger and
//!   undelegates it. Callers poll the base ledger until the owner flips back to this program.
//! - `end_round` finalizes the round on the base ledger. It accepts the canvas in either custody
//!   state, so a commit that never lands cannot wedge the admin flow.

use anchor_lang::prelude::*;
use ephemeral_rollups_sdk::anchor::{commit, delegate, ephemeral};
use ephemeral_rollups_sdk::cpi::DelegateConfig;
use ephemeral_rollups_sdk::ephem::commit_and_undelegate_accounts;
mod canvas;
mod constants;
mod error;
use error::*;
mod events;
use events::*;
mod logic;
use logic::*;
mod state;
use canvas::*;
use constants::*;
use state::*;
#[cfg(test)]
mod tests;
declare_id!("5XGbapaUWi6ViSxcCY3Ud7J7RbNdB4UNYtSr761jxWH2");

#[ephemeral]
#[program]
pub mod pixel_wars {
    use super::*;

    /// Create the singleton game config. The signer becomes the authority.
    pub fn initialize(ctx: Context<Initialize>) -> Result<()> {
        let authority = ctx.accounts.authority.key();
        ctx.accounts
            .game_config
            .initialize(authority, ctx.bumps.game_config)?;
        msg!("Pixel Wars initialized, authority: {}", authority);
        emit!(GameInitializedEvent { authority });
        Ok(())
    }

    /// Open round N+1 with a fresh round record and an all-black canvas.
    pub fn start_round(ctx: Context<StartRound>) -> Result<()> {
        let start_slot = Clock::get()?.slot;
        let mut canvas = ctx.accounts.canvas.load_init()?;
        let round_number = apply_start_round(
            &mut ctx.accounts.game_config,
            &mut canvas,
            &mut ctx.accounts.round,
            ctx.bumps.canvas,
            ctx.bumps.round,
            start_slot,
        )?;

        msg!("Round {} started at slot {}", round_number, start_slot);
        emit!(RoundStartedEvent {
            round: round_number,
            start_slot,
        });
        Ok(())
    }

    /// Delegate the current canvas to the ephemeral rollup (optionally pinning a validator).
    ///
    /// Calling this again once the canvas is already delegated is a no-op.
    pub fn delegate_canvas(ctx: Context<DelegateCanvas>) -> Result<()> {
        let config = &ctx.accounts.game_config;
        config.ensure_active()?;
        let round_number = config.current_round;
        let round_bytes = round_number.to_le_bytes();

        let (expected_canvas, _) =
            Pubkey::find_program_address(&[SEED_CANVAS, &round_bytes], &crate::ID);
        require_keys_eq!(
            ctx.accounts.pda.key(),
            expected_canvas,
            PixelWarsError::StaleCanvas
        );

        if CanvasCustody::of(ctx.accounts.pda.owner).is_delegated() {
            msg!("Canvas for round {} already delegated", round_number);
            return Ok(());
        }

        ctx.accounts.delegate_pda(
            &ctx.accounts.authority,
            &[SEED_CANVAS, &round_bytes],
            DelegateConfig {
                // Optionally set a specific validator from the first remaining account
                validator: ctx.remaining_accounts.first().map(|acc| acc.key()),
                ..Default::default()
            },
        )?;

        msg!("Canvas for round {} delegated", round_number);
        emit!(CanvasDelegatedEvent {
            round: round_number,
        });
        Ok(())
    }

    /// Paint one cell. Any player may overwrite any cell; the last write wins.
    pub fn place_pixel(
        ctx: Context<PlacePixel>,
        x: u16,
        y: u16,
        r: u8,
        g: u8,
        b: u8,
        team_id: Option<u8>,
    ) -> Result<()> {
        let config = &ctx.accounts.game_config;
        config.ensure_active()?;
        let player = ctx.accounts.player.key();
        let round_number = config.current_round;
        let now_slot = Clock::get()?.slot;
        let registered_team = {
            let registration = &ctx.accounts.registration;
            let data = registration.try_borrow_data()?;
            registration_team(registration.owner, &data)?
        };

        let canvas_info = &ctx.accounts.canvas;
        let mut data = canvas_info.try_borrow_mut_data()?;
        let mut canvas = open_canvas(config, canvas_info.owner, &mut data)?;
        let receipt = apply_placement(
            config,
            &mut canvas,
            &mut ctx.accounts.player_stats,
            registered_team,
            player,
            ctx.bumps.player_stats,
            PixelRequest {
                x,
                y,
                color: [r, g, b],
                team_id,
            },
            now_slot,
        )?;

        msg!(
            "pixel({},{}) = #{:02x}{:02x}{:02x} by {} [#{} / {}]",
            x,
            y,
            r,
            g,
            b,
            player,
            receipt.pixels_placed,
            receipt.total_placements
        );
        emit!(PixelPlacedEvent {
            player,
            round: round_number,
            x,
            y,
            color: [r, g, b],
            team_id: receipt.team_id,
        });
        Ok(())
    }

    /// Commit the canvas from the ephemeral rollup back to the base ledger and undelegate it.
    ///
    /// Runs on the rollup. Returns before the base ledger shows the new owner. Calling this again
    /// once the canvas has been handed back is a no-op.
    pub fn commit_canvas(ctx: Context<CommitCanvas>) -> Result<()> {
        let round_number = ctx.accounts.game_config.current_round;
        let pending = {
            let canvas_info = &ctx.accounts.canvas;
            let data = canvas_info.try_borrow_data()?;
            pending_commit(&ctx.accounts.game_config, canvas_info.owner, &data)?
        };
        let Some(header) = pending else {
            msg!("Canvas for round {} already committed", round_number);
            return Ok(());
        };

        commit_and_undelegate_accounts(
            &ctx.accounts.authority.to_account_info(),
            vec![&ctx.accounts.canvas],
            &ctx.accounts.magic_context,
            &ctx.accounts.magic_program,
        )?;

        msg!(
            "Canvas for round {} committed with {} placements",
            round_number,
            header.total_placements
        );
        emit!(CanvasCommitEvent {
            authority: ctx.accounts.authority.key(),
            round: round_number,
        });
        Ok(())
    }

    /// Finalize the active round on the base ledger.
    ///
    /// The canvas is read in place and never written, so this works whether or not the commit
    /// has landed. A still-delegated canvas yields the placement count of its last commit.
    pub fn end_round(ctx: Context<EndRound>) -> Result<()> {
        let round_number = ctx.accounts.game_config.current_round;
        let end_slot = Clock::get()?.slot;
        let canvas_info = &ctx.accounts.canvas;
        let custody = CanvasCustody::of(canvas_info.owner);
        let round = {
            let canvas_data = canvas_info.try_borrow_data()?;
            let round_info = &ctx.accounts.round;
            let mut round_data = round_info.try_borrow_mut_data()?;
            end_round_from_accounts(
                &mut ctx.accounts.game_config,
                &canvas_data,
                round_info.owner,
                &mut round_data,
                end_slot,
            )?
        };

        if custody.is_delegated() {
            msg!(
                "Canvas for round {} still delegated; using last committed count {}",
                round_number,
                round.total_placements
            );
        }
        msg!(
            "Round {} ended at slot {}. Total pixels: {}",
            round_number,
            round.end_slot,
            round.total_placements
        );
        emit!(RoundEndedEvent {
            round: round_number,
            end_slot: round.end_slot,
            total_placements: round.total_placements,
            canvas_delegated: custody.is_delegated(),
        });
        Ok(())
    }

    /// Register the signer as an agent on `team_id` for the active round.
    pub fn register_agent(ctx: Context<RegisterAgent>, team_id: u8) -> Result<()> {
        let config = &ctx.accounts.game_config;
        config.ensure_active()?;
        let round_number = config.current_round;
        let agent = ctx.accounts.agent.key();
        let registered_at = Clock::get()?.unix_timestamp;

        ctx.accounts.registration.register(
            agent,
            round_number,
            team_id,
            registered_at,
            ctx.bumps.registration,
        )?;

        msg!(
            "Agent {} registered for round {} as team {}",
            agent,
            round_number,
            team_id
        );
        emit!(AgentRegisteredEvent {
            agent,
            round: round_number,
            team_id,
        });
        Ok(())
    }
}

#[derive(Accounts)]
/// Accounts for creating the game config.
pub struct Initialize<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(init_if_needed, payer = authority, space = 8 + GameConfig::INIT_SPACE, seeds = [SEED_CONFIG], bump)]
    pub game_config: Account<'info, GameConfig>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
/// Accounts for opening the next round.
pub struct StartRound<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [SEED_CONFIG],
        bump = game_config.bump,
        constraint = game_config.authority == authority.key() @ PixelWarsError::Unauthorized,
        constraint = !game_config.round_active @ PixelWarsError::RoundAlreadyActive,
    )]
    pub game_config: Account<'info, GameConfig>,

    #[account(init, payer = authority, space = CANVAS_ACCOUNT_SIZE, seeds = [SEED_CANVAS, &game_config.current_round.saturating_add(1).to_le_bytes()], bump)]
    pub canvas: AccountLoader<'info, Canvas>,

    #[account(init, payer = authority, space = 8 + Round::INIT_SPACE, seeds = [SEED_ROUND, &game_config.current_round.saturating_add(1).to_le_bytes()], bump)]
    pub round: Account<'info, Round>,

    pub system_program: Program<'info, System>,
}

#[delegate]
#[derive(Accounts)]
/// Accounts for delegating the canvas PDA to an ephemeral validator.
pub struct DelegateCanvas<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        seeds = [SEED_CONFIG],
        bump = game_config.bump,
        constraint = game_config.authority == authority.key() @ PixelWarsError::Unauthorized,
    )]
    pub game_config: Account<'info, GameConfig>,

    /// CHECK: Canvas PDA for the current round, checked in the handler. Raw account info because
    /// delegation changes its owner.
    #[account(mut, del)]
    pub pda: AccountInfo<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
/// Accounts for painting one pixel (player signs, and pays for their stats on first placement).
pub struct PlacePixel<'info> {
    #[account(mut)]
    pub player: Signer<'info>,

    #[account(seeds = [SEED_CONFIG], bump = game_config.bump)]
    pub game_config: Account<'info, GameConfig>,

    /// CHECK: Canvas PDA for the current round. Decoded in the handler once the round is known
    /// to be active, which also checks the owner and discriminator.
    #[account(mut, seeds = [SEED_CANVAS, &game_config.current_round.to_le_bytes()], bump)]
    pub canvas: UncheckedAccount<'info>,

    #[account(
        init_if_needed,
        payer = player,
        space = 8 + PlayerStats::INIT_SPACE,
        seeds = [SEED_PLAYER, &game_config.current_round.to_le_bytes(), player.key().as_ref()],
        bump
    )]
    pub player_stats: Account<'info, PlayerStats>,

    /// CHECK: The player's registration PDA for the current round, always passed. Read as
    /// unattributed while it does not exist.
    #[account(seeds = [SEED_AGENT, player.key().as_ref(), &game_config.current_round.to_le_bytes()], bump)]
    pub registration: UncheckedAccount<'info>,

    pub system_program: Program<'info, System>,
}

#[commit]
#[derive(Accounts)]
/// Accounts for committing and undelegating the canvas PDA (sent to the rollup).
pub struct CommitCanvas<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        seeds = [SEED_CONFIG],
        bump = game_config.bump,
        constraint = game_config.authority == authority.key() @ PixelWarsError::Unauthorized,
    )]
    pub game_config: Account<'info, GameConfig>,

    /// CHECK: Canvas PDA for the current round. Raw account info because the commit CPI hands
    /// ownership back; the handler validates the discriminator.
    #[account(mut, seeds = [SEED_CANVAS, &game_config.current_round.to_le_bytes()], bump)]
    pub canvas: AccountInfo<'info>,
}

#[derive(Accounts)]
/// Accounts for finalizing the active round on the base ledger.
pub struct EndRound<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [SEED_CONFIG],
        bump = game_config.bump,
        constraint = game_config.authority == authority.key() @ PixelWarsError::Unauthorized,
    )]
    pub game_config: Account<'info, GameConfig>,

    /// CHECK: Canvas PDA for the current round, read-only. May still be owned by the delegation
    /// program, so the owner is not checked; the handler validates the discriminator instead.
    #[account(seeds = [SEED_CANVAS, &game_config.current_round.to_le_bytes()], bump)]
    pub canvas: UncheckedAccount<'info>,

    /// CHECK: Round PDA for the current round. Decoded in the handler once the round is known to
    /// be active, since it does not exist before the first round.
    #[account(mut, seeds = [SEED_ROUND, &game_config.current_round.to_le_bytes()], bump)]
    pub round: UncheckedAccount<'info>,
}

#[derive(Accounts)]
/// Accounts for registering an agent (agent signs and pays for the record).
pub struct RegisterAgent<'info> {
    #[account(mut)]
    pub agent: Signer<'info>,

    #[account(seeds = [SEED_CONFIG], bump = game_config.bump)]
    pub game_config: Account<'info, GameConfig>,

    #[account(
        init_if_needed,
        payer = agent,
        space = 8 + AgentRegistration::INIT_SPACE,
        seeds = [SEED_AGENT, agent.key().as_ref(), &game_config.current_round.to_le_bytes()],
        bump
    )]
    pub registration: Account<'info, AgentRegistration>,

    pub system_program: Program<'info, System>,
}
