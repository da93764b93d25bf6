use arenalloc::{AllocError, Arena, DEFAULT_CAPACITY, HEADER_SIZE, Handle};

type TestArena = Arena<DEFAULT_CAPACITY>;

#[test]
fn basic_acquire_write_release() {
  let mut arena = TestArena::new();

  let handle = arena.acquire(100).unwrap();
  arena.payload_mut(handle).unwrap()[..100].fill(b'A');
  assert!(arena.payload(handle).unwrap()[..100].iter().all(|&b| b == b'A'));

  arena.release(Some(handle));
  assert!(arena.finish().is_clean());
}

#[test]
fn coalesce_two_adjacent_chunks() {
  let mut arena = TestArena::new();

  let p1 = arena.acquire(500);
  let p2 = arena.acquire(500);
  let p3 = arena.acquire(500);

  arena.release(p1);
  arena.release(p2);

  let big = arena.acquire(900);
  assert_eq!(big, p1);

  arena.release(big);
  arena.release(p3);
  assert_eq!(arena.stats().chunks, 1);
}

#[test]
fn coalesce_reverse_order() {
  let mut arena = TestArena::new();

  let handles: Vec<_> = (0..3).map(|_| arena.acquire(300)).collect();

  for handle in handles.into_iter().rev() {
    arena.release(handle);
  }

  let stats = arena.stats();
  assert_eq!(stats.chunks, 1);
  assert_eq!(stats.largest_free, DEFAULT_CAPACITY - HEADER_SIZE);
  assert!(arena.acquire(800).is_some());
}

#[test]
fn errors_leave_arena_usable() {
  let mut arena = TestArena::new();

  let p = arena.acquire(100).unwrap();

  assert!(matches!(
    arena.try_release(Some(Handle::from_offset(p.offset() + 16))),
    Err(AllocError::InvalidPointer { .. })
  ));

  arena.try_release(Some(p)).unwrap();

  assert!(matches!(
    arena.try_release(Some(p)),
    Err(AllocError::DoubleRelease { .. })
  ));

  assert!(arena.acquire(DEFAULT_CAPACITY - HEADER_SIZE).is_some());
}

#[test]
fn chunks_tile_the_arena() {
  let mut arena = TestArena::new();

  let handles: Vec<_> = [24, 1, 300, 64, 7].iter().map(|&s| arena.acquire(s)).collect();
  arena.release(handles[1]);
  arena.release(handles[3]);

  let covered: usize = arena.chunks().map(|chunk| chunk.span()).sum();
  assert_eq!(covered, DEFAULT_CAPACITY);

  for chunk in arena.chunks().filter(|chunk| chunk.allocated) {
    assert!(handles.contains(&Some(chunk.handle())));
  }
}
