//! State buffers
//!
//! A [`StateBuffer`] is the CPU analogue of a data texture: a side x side
//! grid of fixed-arity float tuples. Each simulation variable owns a
//! [`StatePair`] — the previous (read) and current (write) generations —
//! and the pair swaps roles once per tick instead of copying.

use crate::error::{Error, Result};
use crate::grid::{GridCoord, to_index};
use crate::types::VariableId;

/// One generation of a simulation variable's state
#[derive(Debug, Clone, Default)]
pub struct StateBuffer {
    side: usize,
    channels: usize,
    data: Vec<f32>,
}

impl StateBuffer {
    /// Zero-filled buffer
    pub fn new(side: usize, channels: usize) -> Self {
        Self {
            side,
            channels,
            data: vec![0.0; side * side * channels],
        }
    }

    /// Buffer seeded from externally loaded data
    ///
    /// The data must already be padded to `side * side * channels` floats;
    /// the core never resizes (the loader owns padding).
    pub fn from_data(
        variable: &VariableId,
        side: usize,
        channels: usize,
        data: Vec<f32>,
    ) -> Result<Self> {
        let expected = side * side * channels;
        if data.len() != expected {
            return Err(Error::ChannelMismatch {
                variable: variable.clone(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            side,
            channels,
            data,
        })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of cells, live and dead
    pub fn cell_count(&self) -> usize {
        self.side * self.side
    }

    /// Read one cell's tuple by linear index
    pub fn at(&self, index: usize) -> &[f32] {
        let base = index * self.channels;
        &self.data[base..base + self.channels]
    }

    /// Read one cell's tuple by grid coordinate
    pub fn get(&self, coord: GridCoord) -> &[f32] {
        self.at(to_index(coord, self.side))
    }

    /// Whole grid as a flat attribute array, for the renderer to bind
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

/// Double-buffered state for one simulation variable
///
/// `previous` holds the last completed generation and is the only side a
/// kernel may read; `current` is the only side a kernel may write. Keeping
/// reads and writes on disjoint buffers makes same-tick feedback hazard-free.
#[derive(Debug, Default)]
pub struct StatePair {
    previous: StateBuffer,
    current: StateBuffer,
}

impl StatePair {
    /// Both generations start as the externally supplied initial state, so
    /// the first tick reads real data from `previous`.
    pub fn init(initial: StateBuffer) -> Self {
        Self {
            previous: initial.clone(),
            current: initial,
        }
    }

    /// Read side: the last completed generation
    pub fn previous(&self) -> &StateBuffer {
        &self.previous
    }

    /// Detach the write side for the in-flight tick
    pub(crate) fn take_current(&mut self) -> StateBuffer {
        std::mem::take(&mut self.current)
    }

    pub(crate) fn put_current(&mut self, buffer: StateBuffer) {
        self.current = buffer;
    }

    /// Promote the freshly written generation. O(1) handle exchange, no copy.
    pub(crate) fn swap(&mut self) {
        std::mem::swap(&mut self.previous, &mut self.current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::to_grid;

    #[test]
    fn test_from_data_rejects_bad_length() {
        let id: VariableId = "positions".into();
        let result = StateBuffer::from_data(&id, 2, 4, vec![0.0; 15]);
        assert!(matches!(
            result,
            Err(Error::ChannelMismatch {
                expected: 16,
                actual: 15,
                ..
            })
        ));
    }

    #[test]
    fn test_cell_addressing() {
        let id: VariableId = "positions".into();
        let data: Vec<f32> = (0..18).map(|v| v as f32).collect();
        let buffer = StateBuffer::from_data(&id, 3, 2, data).unwrap();

        assert_eq!(buffer.at(0), &[0.0, 1.0]);
        assert_eq!(buffer.at(4), &[8.0, 9.0]);
        assert_eq!(buffer.get(to_grid(4, 3)), &[8.0, 9.0]);
    }

    #[test]
    fn test_swap_exchanges_generations() {
        let id: VariableId = "v".into();
        let initial = StateBuffer::from_data(&id, 1, 1, vec![1.0]).unwrap();
        let mut pair = StatePair::init(initial);

        let mut scratch = pair.take_current();
        scratch.data_mut()[0] = 2.0;
        pair.put_current(scratch);
        assert_eq!(pair.previous().at(0), &[1.0]);

        pair.swap();
        assert_eq!(pair.previous().at(0), &[2.0]);
    }
}
