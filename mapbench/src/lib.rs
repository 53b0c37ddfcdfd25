//! Map benchmarking harness: seeded workloads, phase-separated scenarios, memory accounting
//! 映射基准框架：可复现负载、分阶段场景、内存统计

pub mod collect;
pub mod conf;
pub mod error;
pub mod map;
pub mod mem;
pub mod runner;
pub mod scenario;
pub mod workload;

#[cfg(feature = "jemalloc")]
pub use mem::JemallocProbe;

pub use self::{
  collect::{Collector, Measurement, Record, Summary},
  conf::Conf,
  error::{Error, Result, Violation},
  map::{Key, KeyShape, Load, MapHandle, MapKind, build},
  mem::{CountingAlloc, MemProbe, MemSample, NoProbe},
  runner::{Runner, Stopwatch, run_suite},
  scenario::{Fixture, Op, Phase, Scenario, plan_mixed},
  workload::{GenKey, KeySeq, Workload},
};
