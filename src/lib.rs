//! # arenalloc - A First-Fit Arena Allocator
//!
//! This crate provides a **first-fit allocator** over a single fixed-size
//! arena. It does not ask the operating system for memory: every allocation
//! is carved out of `N` bytes owned by an [`Arena`], and every byte of those
//! `N` belongs to exactly one chunk at all times.
//!
//! ## Overview
//!
//! The arena is an implicit free list. There are no pointers between chunks;
//! the size stored in each header is enough to find the next one:
//!
//! ```text
//!   Arena of N bytes:
//!
//!   offset 0                                                          N
//!   ┌────┬──────────┬────┬──────┬────┬──────────────────────────────┐
//!   │ H  │  used    │ H  │ free │ H  │             free             │
//!   └────┴──────────┴────┴──────┴────┴──────────────────────────────┘
//!     │               ▲
//!     └── 8 + size ───┘   next header = offset + 8 + payload_size
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   arenalloc
//!   ├── align      - Word rounding (align!, checked_align)
//!   ├── header     - 8-byte chunk header encoding
//!   ├── error      - AllocError and the fatal exit status
//!   ├── arena      - Arena<N>: acquire, release, validation, leak report
//!   └── global     - Process-wide arena with a malloc/free shaped facade
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use arenalloc::Arena;
//!
//! let mut arena = Arena::<4096>::new();
//!
//! let handle = arena.acquire(100).expect("arena has room");
//! arena.payload_mut(handle).unwrap()[..5].copy_from_slice(b"hello");
//!
//! arena.release(Some(handle));
//! assert!(arena.leak_report().is_clean());
//! ```
//!
//! ## How It Works
//!
//! **Acquire** rounds the request up to 8 bytes and takes the first free
//! chunk that is large enough. If more than a header's worth is left over,
//! the surplus becomes a new free chunk:
//!
//! ```text
//!   acquire(100):
//!
//!   before  ┌────┬────────────────────────────────────────┐
//!           │ H  │               free 4088                │
//!           └────┴────────────────────────────────────────┘
//!   after   ┌────┬────────┬────┬──────────────────────────┐
//!           │ H  │used 104│ H  │        free 3976         │
//!           └────┴────────┴────┴──────────────────────────┘
//!                ▲
//!                └── handle (payload, never the header)
//! ```
//!
//! **Release** checks that the handle is the payload of a real chunk, marks
//! it free, then merges it with a free successor and a free predecessor, so
//! no two free chunks are ever adjacent:
//!
//! ```text
//!   ┌────┬──────┬────┬──────┬────┬──────┐        ┌────┬──────────────────────┐
//!   │ H  │ free │ H  │ used │ H  │ free │  ───►  │ H  │      free            │
//!   └────┴──────┴────┴──────┴────┴──────┘        └────┴──────────────────────┘
//!                        ▲ release
//! ```
//!
//! ## Errors
//!
//! - Running out of space is recoverable: [`Arena::acquire`] prints a
//!   diagnostic and returns `None`.
//! - Releasing a pointer that is not a live chunk (foreign, interior, or
//!   already released) is corruption: [`Arena::release`] prints a diagnostic
//!   and exits with [`FATAL_EXIT_CODE`]. The `try_*` variants return the
//!   [`AllocError`] instead.
//! - Chunks still allocated when an arena is finished (explicitly, on drop,
//!   or at process exit for the [`global`] arena) are reported on stderr.
//!
//! ## Limitations
//!
//! - **Fixed capacity**: the arena never grows
//! - **Linear scans**: acquire and release are O(number of chunks)
//! - **8-byte alignment only**
//! - **Single-threaded**: [`Arena`] needs `&mut self`; the [`global`] facade
//!   serializes calls but not the use of the memory it hands out

pub mod align;
mod arena;
mod error;
pub mod global;
mod header;

pub use arena::{
  Arena, ArenaStats, Backing, Chunk, Chunks, DEFAULT_CAPACITY, Handle, LeakReport, Storage,
};
pub use error::{AllocError, CallSite, FATAL_EXIT_CODE};
pub use header::HEADER_SIZE;
