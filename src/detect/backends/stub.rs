use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Backend that never detects anything. Every frame scores 0.0 on every
/// condition, which leaves only the no-seatbelt rule able to activate.
#[derive(Default)]
pub struct StubBackend {
    frames_seen: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        self.frames_seen += 1;
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_backend_returns_no_detections() -> Result<()> {
        let mut backend = StubBackend::new();
        let frame = Frame::from_bgr(vec![0u8; 12], 2, 2, 1)?;

        assert!(backend.detect(&frame)?.is_empty());
        assert!(backend.detect(&frame)?.is_empty());
        assert_eq!(backend.frames_seen(), 2);
        Ok(())
    }
}
