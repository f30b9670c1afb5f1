use anchor_lang::prelude::*;

#[error_code]
pub enum PixelWarsError {
    #[msg("Only the game authority can perform this action")]
    Unauthorized,

    #[msg("No active round")]
    NoActiveRound,

    #[msg("A round is already active")]
    RoundAlreadyActive,

    #[msg("Pixel coordinates out of bounds")]
    OutOfBounds,

    #[msg("Placement cooldown not elapsed")]
    CooldownNotElapsed,

    #[msg("Round has already ended")]
    RoundEnded,

    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,

    #[msg("Invalid team id")]
    InvalidTeamId,

    #[msg("Agent already registered for this round")]
    AgentAlreadyRegistered,

    #[msg("Game config is already initialized")]
    AlreadyInitialized,

    #[msg("Canvas does not belong to the current round")]
    StaleCanvas,

    #[msg("Account data is not a canvas")]
    InvalidCanvasData,
}
