use anchor_lang::prelude::*;

use crate::canvas::{CanvasHeader, CanvasSurface};
use crate::constants::*;
use crate::error::PixelWarsError;
use crate::logic::*;
use crate::state::*;

/// Numeric Anchor error code, for comparing against `PixelWarsError::X.into()`.
pub(crate) fn error_code(err: anchor_lang::error::Error) -> u32 {
    match err {
        anchor_lang::error::Error::AnchorError(e) => e.error_code_number,
        anchor_lang::error::Error::ProgramError(e) => panic!("unexpected program error: {e:?}"),
    }
}

/// Account state for one game as the handlers would see it, minus the runtime.
struct Game {
    config: GameConfig,
    round: Round,
    canvas: Box<Canvas>,
    stats: Vec<(Pubkey, PlayerStats)>,
    slot: u64,
}

impl Game {
    fn new() -> Self {
        let mut config = GameConfig {
            authority: Pubkey::default(),
            current_round: 0,
            round_active: false,
            bump: 0,
        };
        config.initialize(Pubkey::new_unique(), 255).unwrap();
        Game {
            config,
            round: blank_round(),
            canvas: blank_canvas(),
            stats: Vec::new(),
            slot: 100,
        }
    }

    /// Mirrors start_round: a new round gets freshly allocated (zeroed) accounts.
    fn start_round(&mut self) -> Result<u32> {
        let mut canvas = blank_canvas();
        let mut round = blank_round();
        let round_number = apply_start_round(
            &mut self.config,
            &mut canvas,
            &mut round,
            254,
            253,
            self.slot,
        )?;
        self.canvas = canvas;
        self.round = round;
        self.stats.clear();
        Ok(round_number)
    }

    fn place(&mut self, player: Pubkey, x: u16, y: u16, color: [u8; 3]) -> Result<PlacementReceipt> {
        self.place_as(player, None, x, y, color, None)
    }

    fn place_as(
        &mut self,
        player: Pubkey,
        registered_team: Option<u8>,
        x: u16,
        y: u16,
        color: [u8; 3],
        team_id: Option<u8>,
    ) -> Result<PlacementReceipt> {
        let index = match self.stats.iter().position(|(key, _)| *key == player) {
            Some(index) => index,
            None => {
                self.stats.push((player, blank_stats()));
                self.stats.len() - 1
            }
        };
        apply_placement(
            &self.config,
            &mut *self.canvas,
            &mut self.stats[index].1,
            registered_team,
            player,
            7,
            PixelRequest {
                x,
                y,
                color,
                team_id,
            },
            self.slot,
        )
    }

    fn end_round(&mut self) -> Result<()> {
        let header = CanvasHeader {
            total_placements: self.canvas.total_placements,
            round: self.canvas.round,
        };
        self.end_round_with(header)
    }

    fn end_round_with(&mut self, header: CanvasHeader) -> Result<()> {
        apply_end_round(&mut self.config, &mut self.round, header, self.slot)
    }

    fn advance(&mut self, slots: u64) {
        self.slot += slots;
    }

    fn stats_of(&self, player: &Pubkey) -> &PlayerStats {
        &self
            .stats
            .iter()
            .find(|(key, _)| key == player)
            .expect("player has stats")
            .1
    }
}

fn blank_canvas() -> Box<Canvas> {
    Box::new(Canvas {
        total_placements: 0,
        round: 0,
        bump: 0,
        _padding: [0; 3],
        pixels: [0; CANVAS_DATA_SIZE],
    })
}

/// Canvas account bytes with only the header filled in.
fn canvas_account(total_placements: u64, round: u32) -> Vec<u8> {
    let mut data = vec![0u8; CANVAS_ACCOUNT_SIZE];
    data[..8].copy_from_slice(Canvas::DISCRIMINATOR);
    data[8..16].copy_from_slice(&total_placements.to_le_bytes());
    data[16..20].copy_from_slice(&round.to_le_bytes());
    data
}

fn round_account(round: &Round) -> Vec<u8> {
    let mut data = vec![0u8; 8 + Round::INIT_SPACE];
    round.store(&mut data).unwrap();
    data
}

fn blank_round() -> Round {
    Round {
        round_number: 0,
        start_slot: 0,
        end_slot: 0,
        total_placements: 0,
        ended: false,
        bump: 0,
    }
}

fn blank_stats() -> PlayerStats {
    PlayerStats {
        player: Pubkey::default(),
        round: 0,
        pixels_placed: 0,
        last_placement_slot: 0,
        team_id: None,
        bump: 0,
    }
}

#[test]
fn first_round_scenario() {
    let mut game = Game::new();
    assert_eq!(game.start_round().unwrap(), 1);
    assert!(game.config.round_active);
    assert_eq!(game.round.round_number, 1);
    assert_eq!(game.round.start_slot, 100);
    assert_eq!(game.canvas.round, 1);

    let player = Pubkey::new_unique();
    game.place(player, 0, 0, [255, 0, 0]).unwrap();
    game.advance(PLACEMENT_COOLDOWN_SLOTS);
    game.place(player, 49, 49, [0, 0, 255]).unwrap();

    assert_eq!(game.canvas.pixel(0, 0).unwrap(), [255, 0, 0]);
    assert_eq!(game.canvas.pixel(49, 49).unwrap(), [0, 0, 255]);
    assert_eq!(game.canvas.total_placements, 2);
    assert_eq!(game.stats_of(&player).pixels_placed, 2);
    assert_eq!(game.stats_of(&player).player, player);
    assert_eq!(game.stats_of(&player).round, 1);
}

#[test]
fn fresh_canvas_is_black() {
    let mut game = Game::new();
    game.start_round().unwrap();
    assert!(game.canvas.pixels.iter().all(|byte| *byte == 0));
    assert_eq!(game.canvas.total_placements, 0);
    assert_eq!(game.canvas.pixel(25, 25).unwrap(), [0, 0, 0]);
}

#[test]
fn repeated_placements_keep_last_color() {
    let mut game = Game::new();
    game.start_round().unwrap();
    let player = Pubkey::new_unique();

    let colors = [[1, 2, 3], [200, 100, 50], [0, 0, 0], [9, 9, 9]];
    for color in colors {
        game.place(player, 7, 3, color).unwrap();
        game.advance(PLACEMENT_COOLDOWN_SLOTS);
    }

    assert_eq!(game.canvas.pixel(7, 3).unwrap(), [9, 9, 9]);
    assert_eq!(game.canvas.total_placements, colors.len() as u64);
    assert_eq!(game.stats_of(&player).pixels_placed, colors.len() as u32);
}

#[test]
fn later_player_wins_the_cell() {
    let mut game = Game::new();
    game.start_round().unwrap();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();

    game.place(bob, 10, 10, [0, 255, 0]).unwrap();
    game.advance(1);
    game.place(alice, 10, 10, [255, 0, 255]).unwrap();
    assert_eq!(game.canvas.pixel(10, 10).unwrap(), [255, 0, 255]);

    game.advance(PLACEMENT_COOLDOWN_SLOTS);
    game.place(bob, 10, 10, [0, 255, 0]).unwrap();
    assert_eq!(game.canvas.pixel(10, 10).unwrap(), [0, 255, 0]);
    assert_eq!(game.canvas.total_placements, 3);
}

#[test]
fn out_of_bounds_changes_nothing() {
    let mut game = Game::new();
    game.start_round().unwrap();
    let player = Pubkey::new_unique();

    for (x, y) in [(CANVAS_WIDTH, 0), (0, CANVAS_HEIGHT), (u16::MAX, 3)] {
        let err = game.place(player, x, y, [255, 255, 255]).unwrap_err();
        assert_eq!(error_code(err), PixelWarsError::OutOfBounds.into());
    }
    assert_eq!(game.canvas.total_placements, 0);
    assert!(game.canvas.pixels.iter().all(|byte| *byte == 0));
    assert_eq!(game.stats_of(&player).pixels_placed, 0);

    // A rejected placement does not start the cooldown.
    game.place(player, 0, 0, [1, 1, 1]).unwrap();
}

#[test]
fn cooldown_is_per_player() {
    let mut game = Game::new();
    game.start_round().unwrap();
    let alice = Pubkey::new_unique();
    let bob = Pubkey::new_unique();

    game.place(alice, 1, 1, [1, 1, 1]).unwrap();
    game.advance(PLACEMENT_COOLDOWN_SLOTS - 1);
    let err = game.place(alice, 2, 2, [2, 2, 2]).unwrap_err();
    assert_eq!(error_code(err), PixelWarsError::CooldownNotElapsed.into());
    assert_eq!(game.canvas.pixel(2, 2).unwrap(), [0, 0, 0]);
    assert_eq!(game.canvas.total_placements, 1);

    game.place(bob, 2, 2, [3, 3, 3]).unwrap();

    game.advance(1);
    game.place(alice, 2, 2, [2, 2, 2]).unwrap();
    assert_eq!(game.stats_of(&alice).last_placement_slot, game.slot);
    assert_eq!(game.canvas.total_placements, 3);
}

#[test]
fn placements_need_an_active_round() {
    let mut game = Game::new();
    let player = Pubkey::new_unique();
    let err = game.place(player, 0, 0, [1, 1, 1]).unwrap_err();
    assert_eq!(error_code(err), PixelWarsError::NoActiveRound.into());

    game.start_round().unwrap();
    game.end_round().unwrap();
    let err = game.place(player, 0, 0, [1, 1, 1]).unwrap_err();
    assert_eq!(error_code(err), PixelWarsError::NoActiveRound.into());
}

#[test]
fn stale_canvas_is_rejected() {
    let mut game = Game::new();
    game.start_round().unwrap();
    game.canvas.round = 0;
    let err = game
        .place(Pubkey::new_unique(), 0, 0, [1, 1, 1])
        .unwrap_err();
    assert_eq!(error_code(err), PixelWarsError::StaleCanvas.into());
    assert_eq!(game.canvas.total_placements, 0);
}

#[test]
fn start_and_end_alternate() {
    let mut game = Game::new();

    let err = game.end_round().unwrap_err();
    assert_eq!(error_code(err), PixelWarsError::NoActiveRound.into());

    game.start_round().unwrap();
    let err = game.start_round().unwrap_err();
    assert_eq!(error_code(err), PixelWarsError::RoundAlreadyActive.into());
    assert_eq!(game.config.current_round, 1);

    game.advance(40);
    game.end_round().unwrap();
    assert!(!game.config.round_active);
    assert!(game.round.ended);
    assert_eq!(game.round.end_slot, 140);

    let err = game.end_round().unwrap_err();
    assert_eq!(error_code(err), PixelWarsError::NoActiveRound.into());

    assert_eq!(game.start_round().unwrap(), 2);
    assert!(!game.round.ended);
    assert_eq!(game.canvas.round, 2);
}

#[test]
fn end_round_copies_canvas_count() {
    let mut game = Game::new();
    game.start_round().unwrap();
    for i in 0..4u16 {
        game.place(Pubkey::new_unique(), i, i, [10, 20, 30]).unwrap();
    }
    game.end_round().unwrap();
    assert_eq!(game.round.total_placements, 4);
}

#[test]
fn end_round_with_delegated_canvas_uses_last_commit() {
    let mut game = Game::new();
    game.start_round().unwrap();
    for i in 0..3u16 {
        game.place(Pubkey::new_unique(), i, 0, [1, 2, 3]).unwrap();
    }

    // The base-ledger copy still holds the header of an earlier commit taken after the first
    // placement; the rollup copy has moved on since.
    let committed = CanvasHeader {
        total_placements: 1,
        round: 1,
    };
    game.end_round_with(committed).unwrap();

    assert!(!game.config.round_active);
    assert!(game.round.ended);
    assert_ne!(game.round.end_slot, 0);
    assert_eq!(game.round.total_placements, 1);
}

#[test]
fn end_round_rejects_other_rounds_canvas() {
    let mut game = Game::new();
    game.start_round().unwrap();
    game.end_round().unwrap();
    game.start_round().unwrap();

    let previous = CanvasHeader {
        total_placements: 0,
        round: 1,
    };
    let err = game.end_round_with(previous).unwrap_err();
    assert_eq!(error_code(err), PixelWarsError::StaleCanvas.into());
    assert!(game.config.round_active);
    assert!(!game.round.ended);
}

#[test]
fn team_attribution_follows_registration() {
    let mut game = Game::new();
    game.start_round().unwrap();
    let agent = Pubkey::new_unique();
    let drifter = Pubkey::new_unique();

    let err = game
        .place_as(agent, Some(2), 0, 0, [1, 1, 1], Some(1))
        .unwrap_err();
    assert_eq!(error_code(err), PixelWarsError::InvalidTeamId.into());
    assert_eq!(game.canvas.total_placements, 0);

    let receipt = game
        .place_as(agent, Some(2), 0, 0, [1, 1, 1], None)
        .unwrap();
    assert_eq!(receipt.team_id, Some(2));
    assert_eq!(game.stats_of(&agent).team_id, Some(2));

    let err = game
        .place_as(drifter, None, 1, 1, [1, 1, 1], Some(0))
        .unwrap_err();
    assert_eq!(error_code(err), PixelWarsError::InvalidTeamId.into());

    let receipt = game.place(drifter, 1, 1, [1, 1, 1]).unwrap();
    assert_eq!(receipt.team_id, None);
    assert_eq!(receipt.total_placements, 2);
}

#[test]
fn canvas_account_fits_single_allocation() {
    // One CPI allocation can create at most 10 KiB.
    assert!(CANVAS_ACCOUNT_SIZE <= 10 * 1024);
    assert!(CANVAS_ACCOUNT_SIZE >= 8 + 16 + CANVAS_DATA_SIZE);
}

#[test]
fn end_round_while_idle_ignores_missing_accounts() {
    let mut game = Game::new();
    let system_program = Pubkey::default();

    // Before the first round neither PDA exists.
    let err = end_round_from_accounts(&mut game.config, &[], &system_program, &mut [], 1)
        .err()
        .unwrap();
    assert_eq!(error_code(err), PixelWarsError::NoActiveRound.into());

    // After an early end the canvas can still sit with the delegation program.
    game.start_round().unwrap();
    game.end_round().unwrap();
    let mut round_data = round_account(&game.round);
    let err = end_round_from_accounts(
        &mut game.config,
        &canvas_account(0, 1),
        &crate::ID,
        &mut round_data,
        game.slot,
    )
    .err()
    .unwrap();
    assert_eq!(error_code(err), PixelWarsError::NoActiveRound.into());
    assert_eq!(round_data, round_account(&game.round));
}

#[test]
fn end_round_writes_round_account() {
    let mut game = Game::new();
    game.start_round().unwrap();
    game.place(Pubkey::new_unique(), 1, 1, [4, 5, 6]).unwrap();
    game.advance(10);

    let mut round_data = round_account(&game.round);
    let round = end_round_from_accounts(
        &mut game.config,
        &canvas_account(game.canvas.total_placements, game.canvas.round),
        &crate::ID,
        &mut round_data,
        game.slot,
    )
    .unwrap();
    assert!(round.ended);
    assert_eq!(round.total_placements, 1);
    assert!(!game.config.round_active);

    let stored = Round::load(&crate::ID, &round_data).unwrap();
    assert!(stored.ended);
    assert_eq!(stored.end_slot, 110);
    assert_eq!(stored.total_placements, 1);
}

#[test]
fn idle_canvas_is_not_opened() {
    let mut game = Game::new();
    let mut nothing: Vec<u8> = Vec::new();
    let err = open_canvas(&game.config, &Pubkey::default(), &mut nothing)
        .err()
        .unwrap();
    assert_eq!(error_code(err), PixelWarsError::NoActiveRound.into());

    game.start_round().unwrap();
    game.end_round().unwrap();
    let delegation_program = Pubkey::new_unique();
    let mut data = canvas_account(0, 1);
    let err = open_canvas(&game.config, &delegation_program, &mut data)
        .err()
        .unwrap();
    assert_eq!(error_code(err), PixelWarsError::NoActiveRound.into());
}

#[test]
fn placement_on_account_data() {
    let mut game = Game::new();
    game.start_round().unwrap();
    let player = Pubkey::new_unique();
    let mut stats = blank_stats();
    let mut data = canvas_account(0, 1);

    let mut canvas = open_canvas(&game.config, &crate::ID, &mut data).unwrap();
    let receipt = apply_placement(
        &game.config,
        &mut canvas,
        &mut stats,
        None,
        player,
        7,
        PixelRequest {
            x: 49,
            y: 0,
            color: [255, 128, 0],
            team_id: None,
        },
        game.slot,
    )
    .unwrap();
    assert_eq!(receipt.total_placements, 1);
    assert_eq!(canvas.placements(), 1);
    assert_eq!(canvas.pixel(49, 0).unwrap(), [255, 128, 0]);
    assert_eq!(stats.pixels_placed, 1);
}

#[test]
fn commit_is_a_no_op_once_handed_back() {
    let mut game = Game::new();
    game.start_round().unwrap();

    let header = pending_commit(&game.config, &crate::ID, &canvas_account(3, 1))
        .unwrap()
        .unwrap();
    assert_eq!(header.total_placements, 3);

    // The undelegation has been scheduled; the data is irrelevant.
    let delegation_program = Pubkey::new_unique();
    assert_eq!(
        pending_commit(&game.config, &delegation_program, &[]).unwrap(),
        None
    );

    let err = pending_commit(&game.config, &crate::ID, &canvas_account(0, 7)).unwrap_err();
    assert_eq!(error_code(err), PixelWarsError::StaleCanvas.into());

    // A canvas left delegated by an early end can still be committed while idle.
    game.end_round().unwrap();
    assert!(pending_commit(&game.config, &crate::ID, &canvas_account(3, 1))
        .unwrap()
        .is_some());
}
