//! Coordinate walker
//!
//! Tracks the reference and target cursors of one chain while its blocks
//! are consumed. The walker is created from a header and dropped when the
//! chain is done; nothing is carried over between chains.

use crate::core::chain::ChainHeader;
use crate::core::coords::map_interval;
use crate::core::error::ChainDiffError;

/// Cursor positions of the active chain
///
/// `target_cursor` is local to the target strand of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkerState {
    pub reference_cursor: u64,
    pub target_cursor: u64,
}

/// Span covered by one `Match` block, before the cursors advanced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub reference_start: u64,
    pub target_start: u64,
    pub length: u64,
}

/// Span covered by one `Gap` block, before the cursors advanced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapSpan {
    pub reference_start: u64,
    pub target_start: u64,
    pub reference_gap: u64,
    pub target_gap: u64,
}

/// Walks one chain in both coordinate systems
#[derive(Debug)]
pub struct CoordinateWalker<'h> {
    header: &'h ChainHeader,
    line: usize,
    state: WalkerState,
}

impl<'h> CoordinateWalker<'h> {
    /// Start at the header's `reference_start` / `target_start`
    pub fn new(header: &'h ChainHeader, line: usize) -> Self {
        Self {
            header,
            line,
            state: WalkerState {
                reference_cursor: header.reference_start,
                target_cursor: header.target_start,
            },
        }
    }

    pub fn state(&self) -> WalkerState {
        self.state
    }

    pub fn advance_match(&mut self, length: u64) -> MatchSpan {
        let span = MatchSpan {
            reference_start: self.state.reference_cursor,
            target_start: self.state.target_cursor,
            length,
        };
        self.state.reference_cursor += length;
        self.state.target_cursor += length;
        span
    }

    pub fn advance_gap(&mut self, reference_gap: u64, target_gap: u64) -> GapSpan {
        let span = GapSpan {
            reference_start: self.state.reference_cursor,
            target_start: self.state.target_cursor,
            reference_gap,
            target_gap,
        };
        self.state.reference_cursor += reference_gap;
        self.state.target_cursor += target_gap;
        span
    }

    /// Absolute target interval of a local interval, `None` when it runs
    /// past the header's target length
    pub fn target_interval(&self, start: u64, end: u64) -> Option<(u64, u64)> {
        map_interval(self.header.target_strand, self.header.target_length, start, end)
    }

    /// Check that the blocks covered exactly the span declared in the header
    pub fn finish(self) -> Result<WalkerState, ChainDiffError> {
        let header = self.header;
        if self.state.reference_cursor != header.reference_stop || self.state.target_cursor != header.target_stop {
            return Err(ChainDiffError::InconsistentChain {
                chain_id: header.chain_id.clone(),
                line: self.line,
                reference_cursor: self.state.reference_cursor,
                reference_stop: header.reference_stop,
                target_cursor: self.state.target_cursor,
                target_stop: header.target_stop,
            });
        }
        Ok(self.state)
    }
}
