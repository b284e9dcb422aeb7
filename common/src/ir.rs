// Microseconds.
pub const NEC_LEADER_MARK_US: u16 = 9_000;
pub const NEC_LEADER_SPACE_US: u16 = 4_500;
pub const NEC_BIT_MARK_US: u16 = 562;
pub const NEC_ZERO_SPACE_US: u16 = 562;
pub const NEC_ONE_SPACE_US: u16 = 1_687;

pub const NEC_FRAME_LEN: usize = 2 + 32 * 2 + 1;

/// Alternating mark and space timings, starting with a mark. Bytes go out LSB
/// first as `address, !address, command, !command`.
pub fn nec_frame(address: u8, command: u8) -> Vec<u16> {
    let mut raw = Vec::with_capacity(NEC_FRAME_LEN);
    raw.push(NEC_LEADER_MARK_US);
    raw.push(NEC_LEADER_SPACE_US);

    for byte in [address, !address, command, !command] {
        for bit in 0..8 {
            raw.push(NEC_BIT_MARK_US);
            raw.push(if byte & (1 << bit) != 0 {
                NEC_ONE_SPACE_US
            } else {
                NEC_ZERO_SPACE_US
            });
        }
    }

    raw.push(NEC_BIT_MARK_US);
    raw
}
