//! Integrity checksum for the monitoring link

/// Streaming reflected CRC-32 (polynomial 0xEDB88320)
///
/// The standard check value applies: `Crc32::compute(b"123456789")` is
/// `0xCBF43926`.
#[derive(Debug, Clone, Copy)]
pub struct Crc32(u32);

impl Default for Crc32 {
    fn default() -> Self {
        Self(Self::INIT_VALUE)
    }
}

impl Crc32 {
    pub const LENGTH: usize = 4;
    const INIT_VALUE: u32 = 0xffff_ffff;
    const POLYNOMIAL: u32 = 0xedb8_8320;

    pub fn add(&mut self, byte: u8) {
        self.0 ^= u32::from(byte);
        for _bit in 0..8 {
            if self.0 & 1 != 0 {
                self.0 = (self.0 >> 1) ^ Self::POLYNOMIAL;
            } else {
                self.0 >>= 1;
            }
        }
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) {
        bytes.iter().for_each(|&byte| self.add(byte));
    }

    /// The checksum of everything added so far, with the final complement
    /// applied. Does not consume the accumulator.
    pub fn get(&self) -> u32 {
        !self.0
    }

    /// One-shot checksum over a byte span.
    pub fn compute(bytes: &[u8]) -> u32 {
        let mut crc = Self::default();
        crc.add_bytes(bytes);
        crc.get()
    }
}
