use serde::Serialize;
use tracing::{debug, info};

use aircon_common::{ir::nec_frame, SignalEmitter};

use crate::host::monotonic_ms;

const IR_CARRIER_FREQ_KHZ: u32 = 38;

// Logs frames instead of driving an LED pin.
pub struct IrTransmitter {
    carrier_khz: u32,
    last_send_ms: Option<u64>,
    last_command: Option<(u8, u8)>,
    last_frame_len: usize,
    sent_frames: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrDiagnostics {
    #[serde(rename = "carrierKHz")]
    pub carrier_khz: u32,
    #[serde(rename = "lastSendMs")]
    pub last_send_ms: Option<u64>,
    #[serde(rename = "lastCommand")]
    pub last_command: Option<String>,
    #[serde(rename = "frameTimings")]
    pub frame_timings: usize,
    #[serde(rename = "sentFrames")]
    pub sent_frames: u64,
}

impl IrTransmitter {
    pub fn new() -> Self {
        Self {
            carrier_khz: IR_CARRIER_FREQ_KHZ,
            last_send_ms: None,
            last_command: None,
            last_frame_len: 0,
            sent_frames: 0,
        }
    }

    pub fn diagnostics(&self) -> IrDiagnostics {
        IrDiagnostics {
            carrier_khz: self.carrier_khz,
            last_send_ms: self.last_send_ms,
            last_command: self
                .last_command
                .map(|(address, command)| format!("{address:#04x}/{command:#04x}")),
            frame_timings: self.last_frame_len,
            sent_frames: self.sent_frames,
        }
    }
}

impl Default for IrTransmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalEmitter for IrTransmitter {
    fn emit(&mut self, address: u8, command: u8) {
        let raw = nec_frame(address, command);
        debug!("IR timings: {raw:?}");
        info!(
            "IR send address={address:#04x} command={command:#04x} ({} timings @ {}kHz)",
            raw.len(),
            self.carrier_khz
        );

        self.last_send_ms = Some(monotonic_ms());
        self.last_command = Some((address, command));
        self.last_frame_len = raw.len();
        self.sent_frames = self.sent_frames.saturating_add(1);
    }
}
