//! Tests for measurement export and aggregation
//! 测量导出与汇总测试

use std::time::Duration;

use aok::{OK, Void};
use log::trace;
use mapbench::{
  Collector, Error, KeyShape, Load, Measurement, Scenario, Summary, Violation,
};
use sonic_rs::JsonValueTrait;

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

fn row(map: &'static str, n: usize, ms: u64, load: Load) -> Measurement {
  Measurement {
    shape: KeyShape::U64,
    scenario: Scenario::ReadRandom,
    map,
    n,
    elapsed: Duration::from_millis(ms),
    load,
    bytes: 1000 * ms,
    allocs: ms,
  }
}

#[test]
fn test_summary_mean() -> Void {
  let rows = [
    row("std", 100, 2, Load::known(0.5)),
    row("std", 100, 4, Load::known(0.7)),
  ];
  let s = Summary::of(&rows).expect("non-empty");
  assert_eq!(s.reps, 2);
  assert_eq!(s.elapsed, Duration::from_millis(3));
  assert_eq!(s.bytes, 3000);
  assert_eq!(s.allocs, 3);
  let load = s.load.get().expect("known load");
  assert!((load - 0.6).abs() < 1e-6, "{load}");

  assert!(Summary::of(&[]).is_none());
  OK
}

#[test]
fn test_summary_keeps_unknown() -> Void {
  let rows = [
    row("btree", 100, 1, Load::known(0.5)),
    row("btree", 100, 1, Load::UNKNOWN),
    row("btree", 100, 1, Load::known(0.9)),
  ];
  let s = Summary::of(&rows).expect("non-empty");
  assert_eq!(s.load, Load::UNKNOWN);
  // an average of -1 and real values must never look like a utilization
  assert_eq!(s.load.get(), None);
  OK
}

#[test]
fn test_ops_per_sec() -> Void {
  let rows = [
    row("std", 1000, 1, Load::UNKNOWN),
    row("std", 1000, 3, Load::UNKNOWN),
  ];
  let s = Summary::of(&rows).expect("non-empty");
  assert!((s.ops_per_sec() - 500_000.0).abs() < 1.0);
  let m = Measurement {
    elapsed: Duration::ZERO,
    ..rows[0].clone()
  };
  let s = Summary::of(&[m]).expect("non-empty");
  assert_eq!(s.ops_per_sec(), 0.0);
  OK
}

#[test]
fn test_json_lines() -> Void {
  let mut col = Collector::new(Vec::new());
  col.push(row("dashmap", 10, 5, Load::UNKNOWN))?;
  col.push(row("std", 10, 5, Load::known(0.25)))?;

  let out = String::from_utf8(col.into_inner())?;
  let lines: Vec<&str> = out.lines().collect();
  assert_eq!(lines.len(), 2);

  let v: sonic_rs::Value = sonic_rs::from_str(lines[0])?;
  assert_eq!(v["loadFactor"].as_f64(), Some(-1.0));
  assert_eq!(v["map"].as_str(), Some("dashmap"));
  assert_eq!(v["shape"].as_str(), Some("u64"));
  assert_eq!(v["scenario"].as_str(), Some("read_random"));
  assert_eq!(v["elementCount"].as_u64(), Some(10));
  assert_eq!(v["byteEstimate"].as_u64(), Some(5000));
  assert_eq!(v["allocationCount"].as_u64(), Some(5));
  assert_eq!(v["elapsedNs"].as_u64(), Some(5_000_000));

  let v: sonic_rs::Value = sonic_rs::from_str(lines[1])?;
  assert_eq!(v["loadFactor"].as_f64(), Some(0.25));

  trace!("{out}");
  OK
}

#[test]
fn test_violations_kept_apart() -> Void {
  let mut col = Collector::new(Vec::new());
  col.push(row("std", 10, 1, Load::known(0.5)))?;
  col.fail(&Error::Violation {
    scenario: "read_random",
    map: "std",
    n: 10,
    violation: Violation::Missing { pos: 3 },
  });
  assert_eq!(col.rows().len(), 1);
  assert_eq!(col.violations().len(), 1);
  assert!(col.violations()[0].contains("position 3"));
  assert!(String::from_utf8(col.into_inner())?.lines().count() == 1);
  OK
}

#[test]
fn test_summaries_grouping() -> Void {
  let mut col = Collector::new(std::io::sink());
  for ms in [1, 3] {
    col.push(row("std", 10, ms, Load::known(0.5)))?;
  }
  col.push(row("btree", 10, 2, Load::UNKNOWN))?;
  col.push(row("std", 20, 8, Load::known(0.5)))?;
  col.log_last();

  let sums = col.summaries();
  assert_eq!(sums.len(), 3);
  assert_eq!((sums[0].map, sums[0].n, sums[0].reps), ("std", 10, 2));
  assert_eq!(sums[0].elapsed, Duration::from_millis(2));
  assert_eq!((sums[1].map, sums[1].load), ("btree", Load::UNKNOWN));
  assert_eq!((sums[2].map, sums[2].n, sums[2].reps), ("std", 20, 1));
  OK
}
