use std::{env, io::Read, ptr};

use arenalloc::global;

/// Waits until the user presses ENTER, when the demo runs with `--pause`.
/// Useful to read each chunk map before the next step changes it.
fn block_until_enter_pressed(pause: bool) {
  if !pause {
    return;
  }

  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints every chunk of the process-wide arena, one per line.
fn print_chunk_map(label: &str) {
  println!("[{}] chunk map:", label);
  for line in global::chunk_map().lines() {
    println!("    {line}");
  }
}

fn main() {
  env_logger::init();

  let pause = env::args().any(|arg| arg == "--pause");

  print_chunk_map("start");
  block_until_enter_pressed(pause);

  // --------------------------------------------------------------------
  // 1) Acquire three 500-byte objects. Each rounds up to 504 bytes and is
  //    split off the front of the single free chunk.
  // --------------------------------------------------------------------
  let first = global::acquire(500);
  let second = global::acquire(500);
  let third = global::acquire(500);
  println!("\n[1] Acquire 3 x 500 bytes");
  println!("[1] first = {:?}, second = {:?}, third = {:?}", first, second, third);
  print_chunk_map("1");

  block_until_enter_pressed(pause);

  // --------------------------------------------------------------------
  // 2) Release the first two. The second merges into the first, leaving a
  //    single free chunk of 504 + 8 + 504 bytes.
  // --------------------------------------------------------------------
  global::release(first);
  global::release(second);
  println!("\n[2] Release first and second");
  print_chunk_map("2");

  block_until_enter_pressed(pause);

  // --------------------------------------------------------------------
  // 3) Acquire 900 bytes. First fit finds the merged chunk before the tail
  //    and splits the surplus off it.
  // --------------------------------------------------------------------
  let big = global::acquire(900);
  println!("\n[3] Acquire 900 bytes");
  println!(
    "[3] big == first? {}",
    if big == first {
      "Yes, it reused the merged chunk"
    } else {
      "No, it allocated somewhere else"
    }
  );
  print_chunk_map("3");

  // Write something into the allocated memory to show it's usable.
  unsafe {
    ptr::write_bytes(big, 0xAB, 900);
    println!("[3] Initialized big with 0xAB, last byte = 0x{:X}", big.add(899).read());
  }

  block_until_enter_pressed(pause);

  // --------------------------------------------------------------------
  // 4) Ask for more than is left. The allocator prints a diagnostic with
  //    this call site and returns null; nothing changes.
  // --------------------------------------------------------------------
  let too_big = global::acquire(4000);
  println!("\n[4] Acquire 4000 bytes -> null? {}", too_big.is_null());
  print_chunk_map("4");

  block_until_enter_pressed(pause);

  // --------------------------------------------------------------------
  // 5) End of demo. `big` and `third` are never released, so the leak report
  //    registered at first use prints them when the process exits.
  // --------------------------------------------------------------------
  let stats = global::stats();
  println!(
    "\n[5] End of example. {} chunk(s) still allocated, {} bytes; expect a leak report below.",
    stats.allocated_chunks, stats.allocated_bytes
  );
}
