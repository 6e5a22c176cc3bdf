//! Progress estimation policy.
//!
//! Upload progress is measured from bytes handed to the transport. Server-side
//! processing has no progress channel, so the displayed value during that phase
//! is an estimate driven by ticks. Keeping the policy behind a trait lets a
//! real progress feed replace the estimate without touching the state machine.

/// Where the current progress value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressSource {
    #[default]
    None,
    Measured,
    Estimated,
    Complete,
}

pub trait ProgressEstimator {
    /// Percent to display after `sent` of `total` bytes were handed to the transport.
    fn upload(&self, sent: u64, total: u64) -> u8;

    /// Percent at which processing starts once the upload is fully sent.
    fn processing_floor(&self) -> u8;

    /// Percent after one processing tick of `increment`.
    fn processing_tick(&self, current: u8, increment: u8) -> u8;

    fn complete(&self) -> u8 {
        100
    }
}

/// Upload fills `0..=upload_ceiling`, ticks creep towards `processing_ceiling`.
///
/// The ceilings only pace the display; they do not reflect server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticRamp {
    pub upload_ceiling: u8,
    pub processing_ceiling: u8,
}

impl Default for SyntheticRamp {
    fn default() -> Self {
        Self {
            upload_ceiling: 50,
            processing_ceiling: 90,
        }
    }
}

impl ProgressEstimator for SyntheticRamp {
    fn upload(&self, sent: u64, total: u64) -> u8 {
        if total == 0 {
            return self.upload_ceiling;
        }
        let sent = sent.min(total) as f64;
        let ratio = sent / total as f64;
        (ratio * f64::from(self.upload_ceiling)).round() as u8
    }

    fn processing_floor(&self) -> u8 {
        self.upload_ceiling
    }

    fn processing_tick(&self, current: u8, increment: u8) -> u8 {
        let base = current.max(self.upload_ceiling);
        base.saturating_add(increment).min(self.processing_ceiling)
    }
}

/// Display label for a percentage while a conversion is in flight.
pub fn stage_label(progress: u8) -> &'static str {
    if progress < 50 {
        "Uploading..."
    } else if progress < 90 {
        "Processing..."
    } else {
        "Almost done..."
    }
}
