//! The arena allocator proper.
//!
//! An [`Arena`] owns `N` bytes and tiles them with chunks. Each chunk is a
//! [`Header`] followed by its payload; the next header starts right after the
//! payload, so walking from offset 0 visits every chunk and ends exactly at
//! `N`.

use std::{cell::UnsafeCell, fmt, ops::Range, panic::Location, slice};

use log::{debug, trace};

use crate::{
  align::{WORD, checked_align},
  error::{AllocError, CallSite, abort_on_corruption},
  header::{HEADER_SIZE, Header},
};

/// Capacity of the process-wide arena and of the demos.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Arena-relative offset of a chunk's payload.
///
/// Handles are plain offsets, so one can be fabricated with
/// [`Handle::from_offset`]; [`Arena::try_release`] rejects any handle that
/// does not name a real payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(usize);

impl Handle {
  pub const fn from_offset(offset: usize) -> Self {
    Self(offset)
  }

  pub const fn offset(self) -> usize {
    self.0
  }

  fn header_offset(self) -> Option<usize> {
    self.0.checked_sub(HEADER_SIZE)
  }
}

/// One chunk as seen by a walk over the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
  /// Offset of the header.
  pub offset: usize,
  pub payload_size: usize,
  pub allocated: bool,
}

impl Chunk {
  pub const fn payload_offset(&self) -> usize {
    self.offset + HEADER_SIZE
  }

  /// Header plus payload.
  pub const fn span(&self) -> usize {
    HEADER_SIZE + self.payload_size
  }

  pub const fn handle(&self) -> Handle {
    Handle(self.payload_offset())
  }
}

impl fmt::Display for Chunk {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "{:#06x} {} {} bytes",
      self.offset,
      if self.allocated { "used" } else { "free" },
      self.payload_size
    )
  }
}

/// Aggregate view of the chunk chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
  pub chunks: usize,
  pub free_chunks: usize,
  pub allocated_chunks: usize,
  pub free_bytes: usize,
  pub allocated_bytes: usize,
  /// Largest request that would currently succeed.
  pub largest_free: usize,
}

/// Chunks still allocated when the arena is inspected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeakReport {
  pub count: usize,
  pub bytes: usize,
}

impl LeakReport {
  pub fn is_clean(&self) -> bool {
    self.count == 0
  }
}

impl fmt::Display for LeakReport {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{} bytes leaked in {} objects.", self.bytes, self.count)
  }
}

/// The `N` bytes an arena carves up.
///
/// The bytes sit in an `UnsafeCell` and the arena only reaches them through
/// the raw base pointer, so taking `&mut Arena` never reborrows payloads that
/// callers already hold pointers into.
#[repr(C, align(8))]
pub struct Storage<const N: usize>(UnsafeCell<[u8; N]>);

// SAFETY: only the arena that owns or borrows a `Storage` touches its bytes,
// and `Storage` cannot be built outside this crate.
unsafe impl<const N: usize> Sync for Storage<N> {}

impl<const N: usize> Storage<N> {
  pub(crate) const fn new() -> Self {
    Self(UnsafeCell::new([0; N]))
  }
}

mod sealed {
  pub trait Sealed {}
}

/// Where an arena keeps its bytes: inline ([`Storage`]) or in a static
/// buffer (`&'static Storage`), as the [`crate::global`] arena does.
pub trait Backing<const N: usize>: sealed::Sealed {
  fn base(&self) -> *mut u8;
}

impl<const N: usize> sealed::Sealed for Storage<N> {}

impl<const N: usize> Backing<N> for Storage<N> {
  fn base(&self) -> *mut u8 {
    self.0.get().cast()
  }
}

impl<const N: usize> sealed::Sealed for &'static Storage<N> {}

impl<const N: usize> Backing<N> for &'static Storage<N> {
  fn base(&self) -> *mut u8 {
    self.0.get().cast()
  }
}

/// Where validation found a chunk, plus the chunk right before it.
struct Located {
  header: usize,
  previous: Option<usize>,
}

/// First-fit allocator over `N` inline bytes.
///
/// The arena starts uninitialized and writes its first header on the first
/// acquire or release. Dropping it runs [`Arena::finish`], which reports any
/// chunk still allocated.
///
/// Not thread safe; wrap it in a lock to share it (see [`crate::global`]).
pub struct Arena<const N: usize, S: Backing<N> = Storage<N>> {
  bytes: S,
  initialized: bool,
  finished: bool,
}

impl<const N: usize> Arena<N> {
  pub const fn new() -> Self {
    Self::with_storage(Storage::new())
  }
}

impl<const N: usize, S: Backing<N>> Arena<N, S> {
  const CAPACITY_OK: () = assert!(
    N % WORD == 0 && N >= 2 * HEADER_SIZE && N - HEADER_SIZE <= u32::MAX as usize,
    "arena capacity must be a multiple of 8, hold two headers and fit a u32 size field"
  );

  pub(crate) const fn with_storage(bytes: S) -> Self {
    let () = Self::CAPACITY_OK;

    Self {
      bytes,
      initialized: false,
      finished: false,
    }
  }

  pub const fn capacity(&self) -> usize {
    N
  }

  pub fn is_initialized(&self) -> bool {
    self.initialized
  }

  /// Writes the initial free chunk if this has not happened yet. Returns
  /// `true` only for the call that performed the initialization.
  pub fn ensure_initialized(&mut self) -> bool {
    if self.initialized {
      return false;
    }

    self.initialized = true;
    self.write_header(0, Header::free(N - HEADER_SIZE));

    debug!(
      "arena of {} bytes initialized with one free chunk of {} bytes",
      N,
      N - HEADER_SIZE
    );
    true
  }

  /// Base address of the arena bytes.
  pub fn as_ptr(&self) -> *const u8 {
    self.bytes.base()
  }

  /// Base address for writing. With `&'static Storage` backing, as in
  /// [`crate::global`], the arena itself never borrows the bytes mutably, so
  /// pointers derived from it stay usable across later calls.
  pub fn as_mut_ptr(&mut self) -> *mut u8 {
    self.bytes.base()
  }

  fn header_at(
    &self,
    offset: usize,
  ) -> Header {
    if !self.initialized {
      // Only offset 0 is reachable before the first header is written.
      return Header::free(N - HEADER_SIZE);
    }

    debug_assert!(offset + HEADER_SIZE <= N);

    // SAFETY: chunk offsets are multiples of 8 below N, and N is a multiple
    // of 8, so the header lies inside the arena.
    unsafe { Header::load(self.bytes.base().add(offset)) }
  }

  fn write_header(
    &mut self,
    offset: usize,
    header: Header,
  ) {
    debug_assert!(offset + HEADER_SIZE <= N);

    // SAFETY: as in `header_at`.
    unsafe { header.store(self.bytes.base().add(offset)) }
  }

  /// Walks the chunk chain from the start of the arena.
  pub fn chunks(&self) -> Chunks<'_, N, S> {
    Chunks {
      arena: self,
      offset: 0,
    }
  }

  fn find_free_chunk(
    &self,
    need: usize,
  ) -> Option<usize> {
    self
      .chunks()
      .find(|chunk| !chunk.allocated && chunk.payload_size >= need)
      .map(|chunk| chunk.offset)
  }

  /// Shrinks the chunk at `offset` to `need` bytes when the surplus can hold
  /// a header and a non-empty payload.
  fn split(
    &mut self,
    offset: usize,
    need: usize,
  ) {
    let header = self.header_at(offset);

    if header.payload_size <= need + HEADER_SIZE {
      return;
    }

    let remainder_offset = offset + HEADER_SIZE + need;
    let remainder = Header::free(header.payload_size - need - HEADER_SIZE);

    self.write_header(remainder_offset, remainder);
    self.write_header(
      offset,
      Header {
        payload_size: need,
        ..header
      },
    );

    trace!(
      "split chunk {:#x}: kept {} bytes, free remainder {:#x} of {} bytes",
      offset, need, remainder_offset, remainder.payload_size
    );
  }

  /// Acquires `size` bytes, rounded up to a multiple of 8.
  ///
  /// `Ok(None)` is the answer for `size == 0`. When no free chunk is large
  /// enough the arena is left untouched and [`AllocError::OutOfMemory`] is
  /// returned.
  #[track_caller]
  pub fn try_acquire(
    &mut self,
    size: usize,
  ) -> Result<Option<Handle>, AllocError> {
    if size == 0 {
      return Ok(None);
    }

    self.ensure_initialized();

    let out_of_memory = AllocError::OutOfMemory {
      requested: size,
      site: Location::caller(),
    };

    let need = match checked_align(size) {
      Some(need) if need <= N - HEADER_SIZE => need,
      _ => return Err(out_of_memory),
    };

    let offset = self.find_free_chunk(need).ok_or(out_of_memory)?;

    self.split(offset, need);

    let header = self.header_at(offset);
    self.write_header(offset, Header::allocated(header.payload_size));

    trace!(
      "acquired {} bytes at {:#x} (chunk payload {} bytes)",
      size,
      offset + HEADER_SIZE,
      header.payload_size
    );

    Ok(Some(Handle(offset + HEADER_SIZE)))
  }

  /// Like [`Arena::try_acquire`], but reports a failure on stderr and returns
  /// `None` instead of an error.
  #[track_caller]
  pub fn acquire(
    &mut self,
    size: usize,
  ) -> Option<Handle> {
    match self.try_acquire(size) {
      Ok(handle) => handle,
      Err(err) => {
        eprintln!("acquire: {err}");
        None
      }
    }
  }

  /// Walks the chain looking for the chunk whose payload starts at `handle`.
  fn find_chunk(
    &self,
    handle: Handle,
  ) -> Option<Located> {
    let target = handle.header_offset().filter(|&offset| offset < N)?;
    let mut previous = None;

    for chunk in self.chunks() {
      if chunk.offset == target {
        return Some(Located {
          header: target,
          previous,
        });
      }

      if chunk.offset > target {
        break;
      }

      previous = Some(chunk.offset);
    }

    None
  }

  fn locate(
    &self,
    handle: Handle,
    site: CallSite,
  ) -> Result<Located, AllocError> {
    self
      .find_chunk(handle)
      .ok_or(AllocError::InvalidPointer {
        offset: handle.offset(),
        site,
      })
  }

  /// Checks that `handle` is the payload start of some chunk and returns the
  /// offset of that chunk's header.
  #[track_caller]
  pub fn validate(
    &self,
    handle: Handle,
  ) -> Result<usize, AllocError> {
    self
      .locate(handle, Location::caller())
      .map(|located| located.header)
  }

  /// Releases a chunk and merges it with free neighbours.
  ///
  /// `None` is a no-op. A handle that is not a chunk start yields
  /// [`AllocError::InvalidPointer`]; a chunk that is already free yields
  /// [`AllocError::DoubleRelease`]. In both cases nothing is modified.
  #[track_caller]
  pub fn try_release(
    &mut self,
    handle: Option<Handle>,
  ) -> Result<(), AllocError> {
    let Some(handle) = handle else {
      return Ok(());
    };

    let site = Location::caller();

    self.ensure_initialized();

    let Located {
      header: offset,
      previous,
    } = self.locate(handle, site)?;

    let mut header = self.header_at(offset);

    if !header.allocated {
      return Err(AllocError::DoubleRelease {
        offset: handle.offset(),
        site,
      });
    }

    header.allocated = false;

    let next = header.next_offset(offset);
    if next < N {
      let following = self.header_at(next);

      if !following.allocated {
        header.payload_size += following.span();
        trace!("merged free chunk {:#x} into {:#x}", next, offset);
      }
    }

    self.write_header(offset, header);

    if let Some(previous) = previous {
      let preceding = self.header_at(previous);

      if !preceding.allocated {
        self.write_header(previous, Header::free(preceding.payload_size + header.span()));
        trace!("merged free chunk {:#x} into {:#x}", offset, previous);
      }
    }

    trace!("released {:#x}", handle.offset());
    Ok(())
  }

  /// Like [`Arena::try_release`], but terminates the process with
  /// [`crate::FATAL_EXIT_CODE`] when the handle is rejected.
  #[track_caller]
  pub fn release(
    &mut self,
    handle: Option<Handle>,
  ) {
    if let Err(err) = self.try_release(handle) {
      abort_on_corruption(&err);
    }
  }

  fn payload_range(
    &self,
    handle: Handle,
  ) -> Option<Range<usize>> {
    let offset = self.find_chunk(handle)?.header;
    let header = self.header_at(offset);

    header
      .allocated
      .then(|| handle.offset()..handle.offset() + header.payload_size)
  }

  /// Payload bytes of a live allocation. The slice may be longer than the
  /// requested size.
  pub fn payload(
    &self,
    handle: Handle,
  ) -> Option<&[u8]> {
    let range = self.payload_range(handle)?;

    // SAFETY: the range is the payload of a live chunk inside the arena, and
    // the borrow of `self` keeps headers from changing while it is in use.
    Some(unsafe { slice::from_raw_parts(self.bytes.base().add(range.start), range.len()) })
  }

  pub fn payload_mut(
    &mut self,
    handle: Handle,
  ) -> Option<&mut [u8]> {
    let range = self.payload_range(handle)?;

    // SAFETY: as in `payload`; `&mut self` makes the slice exclusive.
    Some(unsafe { slice::from_raw_parts_mut(self.bytes.base().add(range.start), range.len()) })
  }

  pub fn stats(&self) -> ArenaStats {
    self.chunks().fold(ArenaStats::default(), |mut stats, chunk| {
      stats.chunks += 1;

      if chunk.allocated {
        stats.allocated_chunks += 1;
        stats.allocated_bytes += chunk.payload_size;
      } else {
        stats.free_chunks += 1;
        stats.free_bytes += chunk.payload_size;
        stats.largest_free = stats.largest_free.max(chunk.payload_size);
      }

      stats
    })
  }

  /// Counts chunks that are still allocated. Does not print anything.
  pub fn leak_report(&self) -> LeakReport {
    self
      .chunks()
      .filter(|chunk| chunk.allocated)
      .fold(LeakReport::default(), |report, chunk| LeakReport {
        count: report.count + 1,
        bytes: report.bytes + chunk.payload_size,
      })
  }

  /// Final inspection of the arena. The first call prints the leak summary to
  /// stderr if anything is still allocated; later calls only return the
  /// report.
  pub fn finish(&mut self) -> LeakReport {
    let report = self.leak_report();

    if !self.finished {
      self.finished = true;

      if !report.is_clean() {
        eprintln!("arenalloc: {report}");
      }

      debug!("arena finished: {:?}", report);
    }

    report
  }
}

impl<const N: usize> Default for Arena<N> {
  fn default() -> Self {
    Self::new()
  }
}

impl<const N: usize, S: Backing<N>> Drop for Arena<N, S> {
  fn drop(&mut self) {
    self.finish();
  }
}

impl<const N: usize, S: Backing<N>> fmt::Display for Arena<N, S> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    for chunk in self.chunks() {
      writeln!(f, "{chunk}")?;
    }

    Ok(())
  }
}

/// Iterator returned by [`Arena::chunks`].
pub struct Chunks<'a, const N: usize, S: Backing<N> = Storage<N>> {
  arena: &'a Arena<N, S>,
  offset: usize,
}

impl<const N: usize, S: Backing<N>> Iterator for Chunks<'_, N, S> {
  type Item = Chunk;

  fn next(&mut self) -> Option<Self::Item> {
    if self.offset >= N {
      return None;
    }

    let header = self.arena.header_at(self.offset);
    let chunk = Chunk {
      offset: self.offset,
      payload_size: header.payload_size,
      allocated: header.allocated,
    };

    self.offset = header.next_offset(self.offset);

    Some(chunk)
  }
}
