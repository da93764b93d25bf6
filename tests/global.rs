//! Process-level behavior of the global arena.
//!
//! Tests that must observe an exit status or the exit-time leak report re-run
//! this test binary as a child, filtered down to themselves, and inspect the
//! child's status and stderr.

use std::{
  env,
  process::{Command, Output},
  ptr,
};

use arenalloc::{DEFAULT_CAPACITY, FATAL_EXIT_CODE, HEADER_SIZE, global};

const CHILD_ENV: &str = "ARENALLOC_TEST_CHILD";

fn in_child() -> bool {
  env::var_os(CHILD_ENV).is_some()
}

fn run_in_child(test: &str) -> Output {
  Command::new(env::current_exe().unwrap())
    .args(["--exact", test, "--nocapture", "--test-threads=1"])
    .env(CHILD_ENV, "1")
    .output()
    .unwrap()
}

fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn facade_round_trip() {
  if in_child() {
    return;
  }

  assert!(global::acquire(0).is_null());
  global::release(ptr::null_mut());

  let p = global::acquire(100);
  let q = global::acquire(50);

  assert!(!p.is_null());
  assert!(!q.is_null());
  assert_eq!(p as usize % 8, 0);
  assert_eq!(q as usize % 8, 0);
  assert!(q as usize >= p as usize + 104 + HEADER_SIZE);

  unsafe {
    ptr::write_bytes(p, b'A', 100);
    ptr::write_bytes(q, b'B', 50);

    assert!((0..100).all(|i| *p.add(i) == b'A'));
    assert!((0..50).all(|i| *q.add(i) == b'B'));
  }

  assert_eq!(global::leak_report().count, 2);
  assert_eq!(global::chunk_map().lines().count(), 3);

  assert!(global::acquire(DEFAULT_CAPACITY).is_null());

  // Live pointers stay readable and writable while other calls rewrite
  // headers around them.
  let r = global::acquire(200);
  assert!(!r.is_null());

  unsafe {
    ptr::write_bytes(r, b'C', 200);
    *p.add(99) = b'Z';
  }

  global::release(r);
  let s = global::acquire(16);
  assert_eq!(s, r);

  unsafe {
    ptr::write_bytes(s, b'D', 16);

    assert!((0..99).all(|i| *p.add(i) == b'A'));
    assert_eq!(*p.add(99), b'Z');
    assert!((0..50).all(|i| *q.add(i) == b'B'));
    assert!((0..16).all(|i| *s.add(i) == b'D'));
  }

  global::release(s);

  global::release(q);
  global::release(p);

  let stats = global::stats();
  assert_eq!(stats.chunks, 1);
  assert_eq!(stats.largest_free, DEFAULT_CAPACITY - HEADER_SIZE);
  assert!(global::leak_report().is_clean());
}

#[test]
fn double_release_exits_with_corruption_status() {
  if in_child() {
    let p = global::acquire(100);
    global::release(p);
    global::release(p);
    return;
  }

  let output = run_in_child("double_release_exits_with_corruption_status");

  assert_eq!(output.status.code(), Some(FATAL_EXIT_CODE));
  assert!(stderr(&output).contains("double release"));
  assert!(stderr(&output).contains(file!()));
}

#[test]
fn interior_pointer_exits_with_corruption_status() {
  if in_child() {
    let p = global::acquire(100);
    global::release(p.wrapping_add(16));
    return;
  }

  let output = run_in_child("interior_pointer_exits_with_corruption_status");

  assert_eq!(output.status.code(), Some(FATAL_EXIT_CODE));
  assert!(stderr(&output).contains("inappropriate pointer"));
}

#[test]
fn foreign_pointer_exits_with_corruption_status() {
  if in_child() {
    let mut x = 5u64;
    global::release(&mut x as *mut u64 as *mut u8);
    return;
  }

  let output = run_in_child("foreign_pointer_exits_with_corruption_status");

  assert_eq!(output.status.code(), Some(FATAL_EXIT_CODE));
  assert!(stderr(&output).contains("inappropriate pointer"));
}

#[test]
fn leaks_are_reported_at_exit() {
  if in_child() {
    global::acquire(10);
    let middle = global::acquire(20);
    global::acquire(30);
    global::release(middle);
    return;
  }

  let output = run_in_child("leaks_are_reported_at_exit");

  assert!(output.status.success());
  assert!(stderr(&output).contains("arenalloc: 48 bytes leaked in 2 objects."));
}

#[test]
fn clean_exit_reports_nothing() {
  if in_child() {
    let p = global::acquire(64);
    let q = global::acquire(64);
    global::release(p);
    global::release(q);
    return;
  }

  let output = run_in_child("clean_exit_reports_nothing");

  assert!(output.status.success());
  assert!(!stderr(&output).contains("leaked"));
}
