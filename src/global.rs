//! Process-wide arena behind a `malloc`/`free` shaped interface.
//!
//! Handles are real addresses inside a static [`Arena`] of
//! [`DEFAULT_CAPACITY`] bytes. The bytes live in their own static
//! [`Storage`], so locking the arena never reborrows memory that callers
//! hold pointers into. The arena is initialized by the first
//! non-trivial call, which also registers a leak report with `atexit(3)`.
//!
//! A mutex serializes the calls themselves, but the returned pointers carry
//! no synchronization: only one thread may touch arena memory at a time.

use std::{panic::Location, ptr};

use log::{debug, warn};
use parking_lot::{Mutex, const_mutex};

use crate::{
  arena::{Arena, ArenaStats, DEFAULT_CAPACITY, Handle, LeakReport, Storage},
  error::{AllocError, abort_on_corruption},
};

type GlobalArena = Arena<DEFAULT_CAPACITY, &'static Storage<DEFAULT_CAPACITY>>;

static BYTES: Storage<DEFAULT_CAPACITY> = Storage::new();

static ARENA: Mutex<GlobalArena> = const_mutex(Arena::with_storage(&BYTES));

extern "C" fn report_leaks_at_exit() {
  // A fatal release exits without holding the lock, but never block here.
  if let Some(mut arena) = ARENA.try_lock() {
    arena.finish();
  }
}

fn initialize(arena: &mut GlobalArena) {
  if !arena.ensure_initialized() {
    return;
  }

  // SAFETY: the callback is a plain function that only touches the static
  // arena through its mutex.
  match unsafe { libc::atexit(report_leaks_at_exit) } {
    0 => debug!("leak report registered for process exit"),
    status => warn!("atexit failed with {status}; leaks will not be reported"),
  }
}

fn offset_of(
  arena: &GlobalArena,
  ptr: *mut u8,
) -> Option<usize> {
  (ptr as usize)
    .checked_sub(arena.as_ptr() as usize)
    .filter(|&offset| offset < DEFAULT_CAPACITY)
}

/// Acquires `size` bytes from the process-wide arena.
///
/// Returns a null pointer for `size == 0` and, after printing a diagnostic
/// with the caller's location, when the arena has no room.
#[track_caller]
pub fn acquire(size: usize) -> *mut u8 {
  if size == 0 {
    return ptr::null_mut();
  }

  let mut arena = ARENA.lock();

  initialize(&mut arena);

  match arena.try_acquire(size) {
    Ok(Some(handle)) => arena.as_mut_ptr().wrapping_add(handle.offset()),
    Ok(None) => ptr::null_mut(),
    Err(err) => {
      eprintln!("acquire: {err}");
      ptr::null_mut()
    }
  }
}

/// Releases a pointer returned by [`acquire`]. Null is ignored.
///
/// Any other pointer that is not a live allocation (foreign, interior, or
/// already released) terminates the process with
/// [`crate::FATAL_EXIT_CODE`].
#[track_caller]
pub fn release(ptr: *mut u8) {
  if ptr.is_null() {
    return;
  }

  let mut arena = ARENA.lock();

  initialize(&mut arena);

  let result = match offset_of(&arena, ptr) {
    Some(offset) => arena.try_release(Some(Handle::from_offset(offset))),
    None => Err(AllocError::InvalidPointer {
      offset: ptr as usize,
      site: Location::caller(),
    }),
  };

  drop(arena);

  if let Err(err) = result {
    abort_on_corruption(&err);
  }
}

pub fn leak_report() -> LeakReport {
  ARENA.lock().leak_report()
}

pub fn stats() -> ArenaStats {
  ARENA.lock().stats()
}

/// One line per chunk, as printed by the `walkthrough` demo.
pub fn chunk_map() -> String {
  ARENA.lock().to_string()
}
