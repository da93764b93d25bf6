use std::ptr;

use crate::align::WORD;

/// Size of the metadata prefix in front of every payload.
pub const HEADER_SIZE: usize = WORD;

const FREE: u32 = 0;
const ALLOCATED: u32 = 1;

/// Decoded chunk header.
///
/// ```text
///   byte:  0       4       8
///          ┌───────┬───────┐
///          │ size  │ flag  │   both little-endian u32
///          └───────┴───────┘
/// ```
///
/// `size` is the payload length in bytes; `flag` is 0 for free and nonzero
/// for allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
  pub payload_size: usize,
  pub allocated: bool,
}

impl Header {
  pub const fn free(payload_size: usize) -> Self {
    Self {
      payload_size,
      allocated: false,
    }
  }

  pub const fn allocated(payload_size: usize) -> Self {
    Self {
      payload_size,
      allocated: true,
    }
  }

  pub fn decode(raw: [u8; HEADER_SIZE]) -> Self {
    let [s0, s1, s2, s3, f0, f1, f2, f3] = raw;
    let size = u32::from_le_bytes([s0, s1, s2, s3]);
    let flag = u32::from_le_bytes([f0, f1, f2, f3]);

    Self {
      payload_size: size as usize,
      allocated: flag != FREE,
    }
  }

  pub const fn encode(&self) -> [u8; HEADER_SIZE] {
    let [s0, s1, s2, s3] = (self.payload_size as u32).to_le_bytes();
    let flag = if self.allocated { ALLOCATED } else { FREE };
    let [f0, f1, f2, f3] = flag.to_le_bytes();

    [s0, s1, s2, s3, f0, f1, f2, f3]
  }

  /// Reads the header stored at `ptr`.
  ///
  /// # Safety
  ///
  /// `ptr` must be valid for reads of `HEADER_SIZE` bytes.
  pub unsafe fn load(ptr: *const u8) -> Self {
    let raw = unsafe { ptr::read_unaligned(ptr as *const [u8; HEADER_SIZE]) };
    Self::decode(raw)
  }

  /// Writes the header to `ptr`, touching no byte past `ptr + HEADER_SIZE`.
  ///
  /// # Safety
  ///
  /// `ptr` must be valid for writes of `HEADER_SIZE` bytes.
  pub unsafe fn store(
    &self,
    ptr: *mut u8,
  ) {
    unsafe { ptr::write_unaligned(ptr as *mut [u8; HEADER_SIZE], self.encode()) }
  }

  /// Bytes covered by this chunk, header included.
  pub const fn span(&self) -> usize {
    HEADER_SIZE + self.payload_size
  }

  /// Offset of the header that follows a chunk whose header sits at `offset`.
  pub const fn next_offset(
    &self,
    offset: usize,
  ) -> usize {
    offset + self.span()
  }
}
