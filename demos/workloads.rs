//! The five memgrind workloads, shared by the `memgrind` demo and bench.

use arenalloc::{Arena, Handle};
use rand::Rng;

const OBJECTS: usize = 120;

/// Acquire and immediately release a 1-byte object, 120 times.
pub fn alloc_free_immediately<const N: usize>(arena: &mut Arena<N>) {
  for _ in 0..OBJECTS {
    let handle = arena.acquire(1);
    arena.release(handle);
  }
}

/// Acquire 120 1-byte objects, then release them all.
pub fn alloc_all_then_free<const N: usize>(arena: &mut Arena<N>) {
  let handles: Vec<_> = (0..OBJECTS).map(|_| arena.acquire(1)).collect();

  for handle in handles {
    arena.release(handle);
  }
}

/// Randomly acquire or release 1-byte objects until 120 have been acquired.
pub fn random_alloc_free<const N: usize, R: Rng>(
  arena: &mut Arena<N>,
  rng: &mut R,
) {
  let mut live = Vec::with_capacity(OBJECTS);
  let mut acquired = 0;

  while acquired < OBJECTS {
    if live.is_empty() || rng.random_bool(0.5) {
      live.push(arena.acquire(1));
      acquired += 1;
    } else {
      let index = rng.random_range(0..live.len());
      arena.release(live.swap_remove(index));
    }
  }

  for handle in live {
    arena.release(handle);
  }
}

/// Build a 50-node singly linked list inside the arena, then tear it down
/// from the head.
///
/// Node layout: bytes 0..4 hold the value, bytes 8..16 the offset of the next
/// node (0 for none).
pub fn linked_list<const N: usize>(arena: &mut Arena<N>) {
  const NODES: u32 = 50;
  const NODE_SIZE: usize = 16;

  let mut head: Option<Handle> = None;

  for value in 0..NODES {
    let Some(node) = arena.acquire(NODE_SIZE) else {
      break;
    };
    let next = head.map_or(0, |h| h.offset() as u64);

    if let Some(bytes) = arena.payload_mut(node) {
      bytes[..4].copy_from_slice(&value.to_le_bytes());
      bytes[8..16].copy_from_slice(&next.to_le_bytes());
    }

    head = Some(node);
  }

  while let Some(node) = head {
    let next = arena.payload(node).map_or(0, |bytes| {
      let mut raw = [0u8; 8];
      raw.copy_from_slice(&bytes[8..16]);
      u64::from_le_bytes(raw)
    });

    arena.release(Some(node));
    head = (next != 0).then(|| Handle::from_offset(next as usize));
  }
}

/// Acquire 60 objects cycling through six sizes, then release them all.
pub fn varying_sizes<const N: usize>(arena: &mut Arena<N>) {
  const SIZES: [usize; 6] = [1, 8, 16, 32, 64, 128];

  let handles: Vec<_> = (0..60)
    .map(|i| arena.acquire(SIZES[i % SIZES.len()]))
    .collect();

  for handle in handles {
    arena.release(handle);
  }
}

pub fn run_all<const N: usize, R: Rng>(
  arena: &mut Arena<N>,
  rng: &mut R,
) {
  alloc_free_immediately(arena);
  alloc_all_then_free(arena);
  random_alloc_free(arena, rng);
  linked_list(arena);
  varying_sizes(arena);
}
