use anchor_lang::prelude::*;

#[event]
pub struct GameInitializedEvent {
    pub authority: Pubkey,
}

#[event]
pub struct RoundStartedEvent {
    pub round: u32,
    pub start_slot: u64,
}

#[event]
pub struct CanvasDelegatedEvent {
    pub round: u32,
}

#[event]
pub struct PixelPlacedEvent {
    pub player: Pubkey,
    pub round: u32,
    pub x: u16,
    pub y: u16,
    pub color: [u8; 3],
    pub team_id: Option<u8>,
}

#[event]
pub struct CanvasCommitEvent {
    pub authority: Pubkey,
    pub round: u32,
}

#[event]
pub struct RoundEndedEvent {
    pub round: u32,
    pub end_slot: u64,
    pub total_placements: u64,
    /// True when the canvas was still owned by the delegation program at end time.
    pub canvas_delegated: bool,
}

#[event]
pub struct AgentRegisteredEvent {
    pub agent: Pubkey,
    pub round: u32,
    pub team_id: u8,
}
