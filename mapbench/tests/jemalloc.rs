//! Heap readings from jemalloc statistics
//! 基于 jemalloc 统计的堆读数

#![cfg(feature = "jemalloc")]

use std::hint::black_box;

use aok::{OK, Void};
use log::trace;
use mapbench::{
  CountingAlloc, Fixture, JemallocProbe, MapKind, MemProbe, Runner, Scenario, Workload,
};
use tikv_jemallocator::Jemalloc;

#[global_allocator]
static ALLOC: CountingAlloc<Jemalloc> = CountingAlloc::new(Jemalloc);

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

// single test: the counters are process-wide
#[test]
fn test_jemalloc_probe() -> Void {
  let probe = JemallocProbe::new(&ALLOC);

  let before = probe.sample();
  let v: Vec<u64> = vec![1; 1 << 20];
  let mid = probe.sample();
  assert!(mid.allocs > before.allocs);
  assert!(mid.bytes >= before.bytes + (8 << 20));
  drop(black_box(v));
  assert!(probe.sample().bytes < mid.bytes);

  let mut runner = Runner::new(Workload::new(3), &probe);
  let fix = Fixture::<u64>::generate(Scenario::InsertRandom, 50_000, runner.workload())?;
  let m = runner.run_once(MapKind::Hashbrown, &fix)?;
  assert!(m.allocs > 0);
  assert!(m.bytes >= 50_000 * 16);

  trace!("{m:?}");
  OK
}
