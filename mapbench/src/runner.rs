//! Scenario runner: SETUP → MEASURE → OBSERVE per repetition
//! 场景运行器：每次重复依次经历 SETUP → MEASURE → OBSERVE

use std::{
  hint::black_box,
  io::Write,
  time::{Duration, Instant},
};

use log::{debug, trace};

use crate::{
  collect::{Collector, Measurement},
  conf::Conf,
  error::{Error, Result, Violation},
  map::{KeyShape, MapHandle, MapKind, build},
  mem::MemProbe,
  scenario::{Fixture, Op, Phase, Scenario, plan_mixed},
  workload::{GenKey, Workload},
};

/// Accumulating timer; only time between `start` and `stop` counts
/// 累加计时器；仅统计 `start` 与 `stop` 之间的时间
#[derive(Debug, Default)]
pub struct Stopwatch {
  started: Option<Instant>,
  total: Duration,
}

impl Stopwatch {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn start(&mut self) {
    if self.started.is_none() {
      self.started = Some(Instant::now());
    }
  }

  #[inline]
  pub fn stop(&mut self) {
    if let Some(t) = self.started.take() {
      self.total += t.elapsed();
    }
  }

  #[inline]
  #[must_use]
  pub fn elapsed(&self) -> Duration {
    self.total
  }
}

struct Ctx {
  scenario: Scenario,
  map: &'static str,
  n: usize,
}

impl Ctx {
  fn fail(&self, violation: Violation) -> Error {
    Error::Violation {
      scenario: self.scenario.name(),
      map: self.map,
      n: self.n,
      violation,
    }
  }

  fn advance(&self, phase: Phase) -> Phase {
    let next = phase.next().unwrap_or(phase);
    trace!("{} {} n={}: {phase:?} -> {next:?}", self.scenario, self.map, self.n);
    next
  }
}

enum Outcome {
  Done,
  Misses(usize),
  Visited(usize),
}

/// Drives repetitions; owns the run's workload generator
/// 驱动各次重复；持有本次运行的负载生成器
pub struct Runner<'p, P: ?Sized> {
  wl: Workload,
  probe: &'p P,
}

impl<'p, P: MemProbe + ?Sized> Runner<'p, P> {
  pub fn new(wl: Workload, probe: &'p P) -> Self {
    Self { wl, probe }
  }

  #[inline]
  pub fn workload(&mut self) -> &mut Workload {
    &mut self.wl
  }

  /// One repetition against a freshly built `kind`
  /// 针对新构建的 `kind` 执行一次重复
  pub fn run_once<K: GenKey>(&mut self, kind: MapKind, fix: &Fixture<K>) -> Result<Measurement> {
    self.run_with(fix, kind.name(), |reserve| {
      build::<K, u64>(kind, K::SHAPE, reserve)
    })
  }

  /// One repetition against a handle produced by `make`.
  /// `make` receives the capacity hint (0 for none) and must return a brand-new handle.
  ///
  /// 针对 `make` 产生的句柄执行一次重复。
  /// `make` 接收容量提示（0 表示无），且必须返回全新句柄。
  pub fn run_with<K, F>(&mut self, fix: &Fixture<K>, map: &'static str, mut make: F) -> Result<Measurement>
  where
    K: GenKey,
    F: FnMut(usize) -> Result<Box<dyn MapHandle<K, u64>>>,
  {
    let scenario = fix.scenario;
    let n = fix.n();
    let half = n / 2;
    let ctx = Ctx { scenario, map, n };
    let mut phase = Phase::Setup;

    // SETUP: private copies so the shared sequence is never reordered
    let mut keys = fix.keys.to_vec();
    let generated;
    let misses: &[K] = match (&fix.misses, scenario.needs_misses()) {
      (_, false) => &[],
      (Some(seq), true) => seq.keys(),
      (None, true) => {
        generated = self.wl.disjoint(&fix.keys)?;
        generated.keys()
      }
    };
    // harness buffers are all allocated before `base`
    let (plan, mut slots): (Vec<Op>, Vec<Option<K>>) = if scenario == Scenario::Mixed {
      let plan = plan_mixed(n, &mut self.wl);
      self.wl.shuffle(&mut keys);
      (plan, keys.drain(..).map(Some).collect())
    } else {
      (Vec::new(), Vec::new())
    };

    let base = self.probe.sample();
    let mut m = make(if scenario.reserve() { n } else { 0 })?;
    if m.shape() != K::SHAPE {
      return Err(Error::ShapeMismatch {
        expected: K::SHAPE,
        actual: m.shape(),
      });
    }

    match scenario {
      Scenario::InsertShuffled | Scenario::InsertRandom | Scenario::InsertReserved => {}
      Scenario::Mixed => {
        // generated order; `slots` already holds the shuffled set
        for k in &fix.keys[..half] {
          m.put(k.clone(), 1);
        }
      }
      _ => {
        for k in &keys {
          m.put(k.clone(), 1);
        }
      }
    }

    match scenario {
      Scenario::DeleteRandom | Scenario::ReadShuffled | Scenario::ReadRandom => {
        self.wl.shuffle(&mut keys);
      }
      Scenario::ReadHalfDeleted => {
        self.wl.shuffle(&mut keys);
        for (pos, k) in keys[..half].iter().enumerate() {
          if !m.remove(k) {
            return Err(ctx.fail(Violation::NotRemoved { pos }));
          }
        }
        self.wl.shuffle(&mut keys);
      }
      _ => {}
    }

    phase = ctx.advance(phase);
    let before = self.probe.sample();
    let mut sw = Stopwatch::new();
    sw.start();
    let outcome = match scenario {
      Scenario::InsertShuffled | Scenario::InsertRandom | Scenario::InsertReserved => {
        // drain keeps the buffer alive, so its bytes stay out of the estimate
        for k in keys.drain(..) {
          m.put(k, 1);
        }
        Outcome::Done
      }
      Scenario::DeleteRandom => {
        for (pos, k) in keys.iter().enumerate() {
          if !m.remove(k) {
            return Err(ctx.fail(Violation::NotRemoved { pos }));
          }
        }
        Outcome::Done
      }
      Scenario::ReadShuffled | Scenario::ReadRandom => {
        for (pos, k) in keys.iter().enumerate() {
          if m.get(k).is_none() {
            return Err(ctx.fail(Violation::Missing { pos }));
          }
        }
        Outcome::Done
      }
      Scenario::ReadMiss => {
        for (pos, k) in misses.iter().enumerate() {
          if m.get(k).is_some() {
            return Err(ctx.fail(Violation::Unexpected { pos }));
          }
        }
        Outcome::Done
      }
      Scenario::ReadHalfDeleted => {
        let mut missed = 0;
        for k in &keys {
          missed += usize::from(m.get(k).is_none());
        }
        Outcome::Misses(missed)
      }
      Scenario::Iterate => {
        let mut visited = 0;
        m.each(&mut |k, v| {
          black_box((k, v));
          visited += 1;
          false
        });
        Outcome::Visited(visited)
      }
      Scenario::Mixed => {
        for (op, slot) in plan.iter().zip(slots.iter_mut()) {
          match op {
            Op::Read => {
              if let Some(k) = slot {
                black_box(m.get(k));
              }
            }
            Op::Insert => {
              if let Some(k) = slot.take() {
                m.put(k, 1);
              }
            }
            Op::Delete => {
              if let Some(k) = slot {
                m.remove(k);
              }
            }
          }
        }
        Outcome::Done
      }
    };
    sw.stop();
    let measured = self.probe.sample();

    phase = ctx.advance(phase);
    debug_assert_eq!(phase, Phase::Observe);
    let after = self.probe.sample();
    let load = m.load();

    let expect_len = match scenario {
      Scenario::InsertShuffled | Scenario::InsertRandom | Scenario::InsertReserved => Some(n),
      Scenario::DeleteRandom => Some(0),
      _ => None,
    };
    if let Some(expected) = expect_len {
      let actual = m.len();
      if actual != expected {
        return Err(ctx.fail(Violation::Size { expected, actual }));
      }
    }
    match outcome {
      Outcome::Misses(actual) if actual != half => {
        return Err(ctx.fail(Violation::MissCount {
          expected: half,
          actual,
        }));
      }
      Outcome::Visited(actual) if actual != n => {
        return Err(ctx.fail(Violation::Visited {
          expected: n,
          actual,
        }));
      }
      _ => {}
    }

    let elapsed = sw.elapsed();
    trace!("{} {map} n={n}: {elapsed:?} load={load}", scenario);
    drop(slots);
    Ok(Measurement {
      shape: K::SHAPE,
      scenario,
      map,
      n,
      elapsed,
      load,
      bytes: after.bytes.saturating_sub(base.bytes),
      allocs: measured.allocs.saturating_sub(before.allocs),
    })
  }

  /// Every applicable scenario × size × map × repetition for key type `K`
  /// 针对键类型 `K` 运行所有适用的 场景 × 规模 × 实现 × 重复
  pub fn suite<K: GenKey, W: Write>(&mut self, conf: &Conf, col: &mut Collector<W>) -> Result<()> {
    for scenario in Scenario::ALL.into_iter().filter(|s| s.applies(K::SHAPE)) {
      for &n in &conf.ranges {
        // generated once, shared by every map below
        let fix = Fixture::<K>::generate(scenario, n, &mut self.wl)?;
        debug!("{}/{scenario} n={n}: fixture ready", K::SHAPE);
        for &kind in &conf.maps {
          let mut clean = true;
          for _ in 0..conf.repeat {
            match self.run_once(kind, &fix) {
              Ok(m) => col.push(m)?,
              Err(e) if e.is_violation() => {
                col.fail(&e);
                clean = false;
                break;
              }
              Err(e) => return Err(e),
            }
          }
          if clean {
            col.log_last();
          }
        }
      }
    }
    Ok(())
  }
}

/// Run the whole configured suite; violations go to `col`, configuration errors abort
/// 运行完整配置的测试集；违例记入 `col`，配置错误则中止
pub fn run_suite<P, W>(conf: &Conf, probe: &P, col: &mut Collector<W>) -> Result<()>
where
  P: MemProbe + ?Sized,
  W: Write,
{
  let mut runner = Runner::new(Workload::new(conf.seed), probe);
  for &shape in &conf.shapes {
    match shape {
      KeyShape::U32 => runner.suite::<u32, W>(conf, col)?,
      KeyShape::U64 => runner.suite::<u64, W>(conf, col)?,
      KeyShape::Text => runner.suite::<String, W>(conf, col)?,
    }
  }
  col.flush()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stopwatch_counts_only_running_windows() {
    let mut sw = Stopwatch::new();
    assert_eq!(sw.elapsed(), Duration::ZERO);
    sw.stop();
    assert_eq!(sw.elapsed(), Duration::ZERO);

    sw.start();
    std::thread::sleep(Duration::from_millis(2));
    sw.stop();
    let first = sw.elapsed();
    assert!(first >= Duration::from_millis(2));

    std::thread::sleep(Duration::from_millis(2));
    assert_eq!(sw.elapsed(), first);
  }
}
