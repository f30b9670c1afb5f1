//! Pixel I/O over the flat canvas buffer, plus raw access to canvas account data for handlers
//! that must check game state before trusting the account.
//!
//! Pixels are stored row-major, [`BYTES_PER_PIXEL`] bytes each. Offsets are computed once and
//! bytes are written in place; nothing here copies the buffer.

use anchor_lang::prelude::*;

use crate::constants::{BYTES_PER_PIXEL, CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::error::PixelWarsError;
use crate::state::{Canvas, CANVAS_ACCOUNT_SIZE};

const TOTAL_PLACEMENTS_RANGE: std::ops::Range<usize> = 8..16;
const ROUND_RANGE: std::ops::Range<usize> = 16..20;
const PIXELS_START: usize = 8 + std::mem::offset_of!(Canvas, pixels);

/// Byte offset of pixel `(x, y)` inside `Canvas::pixels`.
pub fn pixel_offset(x: u16, y: u16) -> Result<usize> {
    require!(
        x < CANVAS_WIDTH && y < CANVAS_HEIGHT,
        PixelWarsError::OutOfBounds
    );
    Ok((y as usize * CANVAS_WIDTH as usize + x as usize) * BYTES_PER_PIXEL)
}

/// Overwrite one cell. `offset` must come from [`pixel_offset`].
#[inline(always)]
pub fn write_pixel(pixels: &mut [u8], offset: usize, color: [u8; 3]) {
    pixels[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&color);
}

#[cfg(test)]
pub fn read_pixel(pixels: &[u8], offset: usize) -> [u8; 3] {
    [pixels[offset], pixels[offset + 1], pixels[offset + 2]]
}

/// Counter fields read straight out of canvas account data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanvasHeader {
    pub total_placements: u64,
    pub round: u32,
}

/// Read the canvas header without deserializing the pixel buffer.
///
/// Works regardless of the account owner: while delegated, the base-ledger copy keeps the
/// layout of the last commit.
pub fn read_header(data: &[u8]) -> Result<CanvasHeader> {
    let discriminator = Canvas::DISCRIMINATOR;
    require!(
        data.len() >= CANVAS_ACCOUNT_SIZE && &data[..discriminator.len()] == discriminator,
        PixelWarsError::InvalidCanvasData
    );
    let total_placements = <[u8; 8]>::try_from(&data[TOTAL_PLACEMENTS_RANGE])
        .map_err(|_| PixelWarsError::InvalidCanvasData)?;
    let round =
        <[u8; 4]>::try_from(&data[ROUND_RANGE]).map_err(|_| PixelWarsError::InvalidCanvasData)?;
    Ok(CanvasHeader {
        total_placements: u64::from_le_bytes(total_placements),
        round: u32::from_le_bytes(round),
    })
}

/// What the placement rules need from a canvas, whether it is a loaded [`Canvas`] or raw
/// account data.
pub trait CanvasSurface {
    /// Round the canvas was allocated for.
    fn canvas_round(&self) -> u32;

    fn placements(&self) -> u64;

    /// Overwrite one cell and bump the placement counter. Returns the new counter value.
    fn paint(&mut self, x: u16, y: u16, color: [u8; 3]) -> Result<u64>;
}

/// Mutable view over the data of a canvas account owned by this program.
pub struct CanvasData<'a> {
    header: CanvasHeader,
    data: &'a mut [u8],
}

impl<'a> CanvasData<'a> {
    /// Wrap account data after checking the owner and the discriminator.
    pub fn from_account(owner: &Pubkey, data: &'a mut [u8]) -> Result<Self> {
        require_keys_eq!(
            *owner,
            crate::ID,
            anchor_lang::error::ErrorCode::AccountOwnedByWrongProgram
        );
        let header = read_header(data)?;
        Ok(CanvasData { header, data })
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u16, y: u16) -> Result<[u8; 3]> {
        let offset = pixel_offset(x, y)?;
        Ok(read_pixel(&self.data[PIXELS_START..], offset))
    }
}

impl CanvasSurface for CanvasData<'_> {
    fn canvas_round(&self) -> u32 {
        self.header.round
    }

    fn placements(&self) -> u64 {
        self.header.total_placements
    }

    fn paint(&mut self, x: u16, y: u16, color: [u8; 3]) -> Result<u64> {
        let offset = pixel_offset(x, y)?;
        let total_placements = self
            .header
            .total_placements
            .checked_add(1)
            .ok_or(PixelWarsError::ArithmeticOverflow)?;
        write_pixel(&mut self.data[PIXELS_START..], offset, color);
        self.data[TOTAL_PLACEMENTS_RANGE].copy_from_slice(&total_placements.to_le_bytes());
        self.header.total_placements = total_placements;
        Ok(total_placements)
    }
}

/// Which ledger currently controls writes to the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CanvasCustody {
    /// Owned by this program on the base ledger.
    Program,
    /// Handed to the delegation program; writes happen on the ephemeral rollup.
    Delegated,
}

impl CanvasCustody {
    pub fn of(owner: &Pubkey) -> Self {
        if *owner == crate::ID {
            CanvasCustody::Program
        } else {
            CanvasCustody::Delegated
        }
    }

    pub fn is_delegated(self) -> bool {
        self == CanvasCustody::Delegated
    }
}
