use heapless::Vec;

use crate::frame::Frame;

/// Outbound frames ordered by CAN arbitration priority
///
/// Frames with equal IDs keep their insertion order, so the frames of a multi-frame
/// transfer leave in sequence.
pub struct TxQueue<const N: usize> {
    frames: Vec<Frame, N>,
}

impl<const N: usize> Default for TxQueue<N> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<const N: usize> TxQueue<N> {
    pub fn free(&self) -> usize {
        N - self.frames.len()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, frame: Frame) -> Result<(), Frame> {
        let position = self
            .frames
            .iter()
            .position(|queued| frame.has_priority_over(queued))
            .unwrap_or(self.frames.len());
        self.frames.insert(position, frame)
    }

    pub fn peek(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn pop(&mut self) -> Option<Frame> {
        if self.frames.is_empty() {
            None
        } else {
            Some(self.frames.remove(0))
        }
    }
}
