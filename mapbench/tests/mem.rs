//! Allocation accounting through a counting global allocator
//! 通过计数全局分配器进行分配统计

use std::{alloc::System, hint::black_box};

use aok::{OK, Void};
use log::trace;
use mapbench::{
  CountingAlloc, Fixture, KeyShape, MapHandle, MapKind, MemProbe, Runner, Scenario, Workload,
};

#[global_allocator]
static ALLOC: CountingAlloc<System> = CountingAlloc::new(System);

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

/// Holds nothing and never allocates
struct NullMap;

impl MapHandle<u64, u64> for NullMap {
  fn put(&mut self, _: u64, _: u64) -> bool {
    false
  }

  fn get(&self, _: &u64) -> Option<u64> {
    None
  }

  fn remove(&mut self, _: &u64) -> bool {
    false
  }

  fn each(&self, _: &mut dyn FnMut(&u64, &u64) -> bool) {}

  fn clear(&mut self) {}

  fn len(&self) -> usize {
    0
  }

  fn shape(&self) -> KeyShape {
    KeyShape::U64
  }

  fn name(&self) -> &'static str {
    "void"
  }
}

// single test: the counters are process-wide
#[test]
fn test_counting() -> Void {
  let before = ALLOC.sample();
  let v: Vec<u64> = Vec::with_capacity(4096);
  let mid = ALLOC.sample();
  assert!(mid.allocs > before.allocs);
  assert!(mid.bytes >= before.bytes + 4096 * 8);
  drop(black_box(v));
  assert!(ALLOC.sample().bytes < mid.bytes);

  let mut runner = Runner::new(Workload::new(1), &ALLOC);
  let fix = Fixture::<u64>::generate(Scenario::InsertRandom, 10_000, runner.workload())?;
  let grow = runner.run_once(MapKind::Std, &fix)?;
  // growing from empty rehashes several times
  assert!(grow.allocs > 0);
  assert!(grow.bytes >= 10_000 * 16);

  let fix = Fixture::<u64>::generate(Scenario::ReadRandom, 10_000, runner.workload())?;
  let read = runner.run_once(MapKind::Std, &fix)?;
  // lookups allocate nothing
  assert!(read.allocs < grow.allocs);
  assert!(read.bytes >= 10_000 * 16);

  // harness buffers never count toward the container
  for scenario in [Scenario::Mixed, Scenario::ReadMiss] {
    let fix = Fixture::<u64>::generate(scenario, 100_000, runner.workload())?;
    let empty = runner.run_with(&fix, "void", |_| {
      Ok(Box::new(NullMap) as Box<dyn MapHandle<u64, u64>>)
    })?;
    assert_eq!(empty.bytes, 0, "{scenario}");
    assert_eq!(empty.allocs, 0, "{scenario}");
  }

  trace!("insert {grow:?} read {read:?}");
  OK
}
