//! Stress driver: runs every memgrind workload 50 times and reports the time.
//!
//! ```text
//! cargo run --release --example memgrind [seed]
//! ```

use std::{env, time::Instant};

use arenalloc::{Arena, DEFAULT_CAPACITY};
use rand::{SeedableRng, rngs::StdRng};

#[path = "workloads.rs"]
mod workloads;

const ROUNDS: u32 = 50;

fn main() {
  env_logger::init();

  let seed: u64 = env::args()
    .nth(1)
    .and_then(|arg| arg.parse().ok())
    .unwrap_or_else(rand::random);

  let mut rng = StdRng::seed_from_u64(seed);
  let mut arena = Arena::<DEFAULT_CAPACITY>::new();

  println!("Running stress test (seed {seed})...");

  let start = Instant::now();

  for _ in 0..ROUNDS {
    workloads::run_all(&mut arena, &mut rng);
  }

  let elapsed = start.elapsed();

  println!("Total time: {:?}", elapsed);
  println!("Average time per run: {:?}", elapsed / ROUNDS);

  let stats = arena.stats();
  println!(
    "Arena after the run: {} chunk(s), {} of {} bytes free",
    stats.chunks,
    stats.free_bytes,
    arena.capacity()
  );
}
