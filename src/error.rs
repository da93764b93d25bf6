use std::panic::Location;

/// Source location of the allocator call that triggered a diagnostic.
pub type CallSite = &'static Location<'static>;

/// Exit status used when release detects a corrupted or foreign handle.
pub const FATAL_EXIT_CODE: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
  /// No free chunk is large enough. Nothing was modified.
  #[error("unable to allocate {requested} bytes ({site})")]
  OutOfMemory { requested: usize, site: CallSite },

  /// The handle does not name the payload of any chunk in the arena.
  #[error("inappropriate pointer at offset {offset:#x} ({site})")]
  InvalidPointer { offset: usize, site: CallSite },

  /// The handle names a chunk that is already free.
  #[error("double release of chunk at offset {offset:#x} ({site})")]
  DoubleRelease { offset: usize, site: CallSite },
}

impl AllocError {
  /// Whether the arena can no longer be trusted after this error.
  pub fn is_fatal(&self) -> bool {
    !matches!(self, AllocError::OutOfMemory { .. })
  }

  pub fn site(&self) -> CallSite {
    match *self {
      AllocError::OutOfMemory { site, .. }
      | AllocError::InvalidPointer { site, .. }
      | AllocError::DoubleRelease { site, .. } => site,
    }
  }
}

/// Prints a fatal error and terminates the process with [`FATAL_EXIT_CODE`].
pub fn abort_on_corruption(err: &AllocError) -> ! {
  eprintln!("release: {err}");
  std::process::exit(FATAL_EXIT_CODE)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fatal_classes() {
    let site = Location::caller();

    assert!(!AllocError::OutOfMemory { requested: 8, site }.is_fatal());
    assert!(AllocError::InvalidPointer { offset: 24, site }.is_fatal());
    assert!(AllocError::DoubleRelease { offset: 8, site }.is_fatal());
  }

  #[test]
  fn test_messages_carry_call_site() {
    let site = Location::caller();
    let err = AllocError::OutOfMemory {
      requested: 5000,
      site,
    };

    let message = err.to_string();
    assert!(message.starts_with("unable to allocate 5000 bytes ("));
    assert!(message.contains(file!()));
    assert_eq!(err.site(), site);
  }
}
