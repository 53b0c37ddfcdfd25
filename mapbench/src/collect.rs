//! Metrics collector
//! 指标收集器

use std::{io::Write, time::Duration};

use log::{error, info};
use serde::Serialize;

use crate::{
  error::{Error, Result},
  map::{KeyShape, Load},
  scenario::Scenario,
};

/// Result of one repetition
/// 单次重复的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
  pub shape: KeyShape,
  pub scenario: Scenario,
  pub map: &'static str,
  pub n: usize,
  /// MEASURE phase only
  /// 仅 MEASURE 阶段
  pub elapsed: Duration,
  pub load: Load,
  /// Heap growth from construction to end of MEASURE
  /// 从构建到 MEASURE 结束的堆增长
  pub bytes: u64,
  /// Allocation calls inside MEASURE
  /// MEASURE 内的分配调用次数
  pub allocs: u64,
}

impl Measurement {
  #[must_use]
  pub fn record(&self) -> Record {
    Record {
      shape: self.shape.name(),
      scenario: self.scenario.name(),
      map: self.map,
      element_count: self.n,
      load_factor: self.load,
      byte_estimate: self.bytes,
      allocation_count: self.allocs,
      elapsed_ns: self.elapsed.as_nanos() as u64,
    }
  }
}

/// Exported row
/// 导出行
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
  pub shape: &'static str,
  pub scenario: &'static str,
  pub map: &'static str,
  pub element_count: usize,
  /// `-1` when unknown
  /// 未知时为 `-1`
  pub load_factor: Load,
  pub byte_estimate: u64,
  pub allocation_count: u64,
  pub elapsed_ns: u64,
}

/// Aggregate of the repetitions of one (shape, scenario, map, n)
/// 同一 (形状, 场景, 实现, n) 各次重复的汇总
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
  pub shape: KeyShape,
  pub scenario: Scenario,
  pub map: &'static str,
  pub n: usize,
  pub reps: usize,
  pub elapsed: Duration,
  pub bytes: u64,
  pub allocs: u64,
  /// Unknown if any repetition reported unknown
  /// 任一重复报告未知即为未知
  pub load: Load,
}

impl Summary {
  /// Operations per second over the mean elapsed, one operation per element
  /// 按平均耗时计算的每秒操作数（每个元素一次操作）
  #[must_use]
  pub fn ops_per_sec(&self) -> f64 {
    let secs = self.elapsed.as_secs_f64();
    if secs == 0.0 {
      return 0.0;
    }
    self.n as f64 / secs
  }

  /// Mean over `rows`; `None` when empty
  /// 对 `rows` 求均值；为空时返回 `None`
  #[must_use]
  pub fn of(rows: &[Measurement]) -> Option<Self> {
    let first = rows.first()?;
    let reps = rows.len();
    let elapsed = rows.iter().map(|m| m.elapsed).sum::<Duration>() / reps as u32;
    let bytes = rows.iter().map(|m| m.bytes).sum::<u64>() / reps as u64;
    let allocs = rows.iter().map(|m| m.allocs).sum::<u64>() / reps as u64;
    let load = if rows.iter().all(|m| m.load.is_known()) {
      let mean = rows.iter().map(|m| m.load.raw() as f64).sum::<f64>() / reps as f64;
      Load::known(mean)
    } else {
      Load::UNKNOWN
    };
    Some(Self {
      shape: first.shape,
      scenario: first.scenario,
      map: first.map,
      n: first.n,
      reps,
      elapsed,
      bytes,
      allocs,
      load,
    })
  }
}

/// Owns measurements until exported; keeps violations apart
/// 在导出前持有测量结果；违例单独存放
pub struct Collector<W> {
  out: W,
  rows: Vec<Measurement>,
  violations: Vec<String>,
}

impl<W: Write> Collector<W> {
  pub fn new(out: W) -> Self {
    Self {
      out,
      rows: Vec::new(),
      violations: Vec::new(),
    }
  }

  /// Store and stream one measurement as a JSON line
  /// 保存一条测量并以 JSON 行输出
  pub fn push(&mut self, m: Measurement) -> Result<()> {
    let line = sonic_rs::to_string(&m.record())?;
    writeln!(self.out, "{line}")?;
    self.rows.push(m);
    Ok(())
  }

  /// Report a violation; it never reaches the aggregates
  /// 报告违例；违例永不进入汇总
  pub fn fail(&mut self, err: &Error) {
    error!("correctness violation: {err}");
    self.violations.push(err.to_string());
  }

  #[inline]
  pub fn rows(&self) -> &[Measurement] {
    &self.rows
  }

  #[inline]
  pub fn violations(&self) -> &[String] {
    &self.violations
  }

  /// Summaries in first-seen order
  /// 按首次出现顺序的汇总
  pub fn summaries(&self) -> Vec<Summary> {
    let mut keys: Vec<(KeyShape, Scenario, &'static str, usize)> = Vec::new();
    for m in &self.rows {
      let key = (m.shape, m.scenario, m.map, m.n);
      if !keys.contains(&key) {
        keys.push(key);
      }
    }
    keys
      .into_iter()
      .filter_map(|(shape, scenario, map, n)| {
        let group: Vec<Measurement> = self
          .rows
          .iter()
          .filter(|m| m.shape == shape && m.scenario == scenario && m.map == map && m.n == n)
          .cloned()
          .collect();
        Summary::of(&group)
      })
      .collect()
  }

  /// Log the summary of the latest (shape, scenario, map, n)
  /// 记录最近一组 (形状, 场景, 实现, n) 的汇总
  pub fn log_last(&self) {
    let Some(last) = self.rows.last() else {
      return;
    };
    let group: Vec<Measurement> = self
      .rows
      .iter()
      .rev()
      .take_while(|m| {
        m.shape == last.shape && m.scenario == last.scenario && m.map == last.map && m.n == last.n
      })
      .cloned()
      .collect();
    if let Some(s) = Summary::of(&group) {
      info!(
        "{}/{} {} n={}: {:.2?} x{} {:.0} ops/s bytes={} allocs={} load={}",
        s.shape,
        s.scenario,
        s.map,
        s.n,
        s.elapsed,
        s.reps,
        s.ops_per_sec(),
        s.bytes,
        s.allocs,
        s.load
      );
    }
  }

  pub fn flush(&mut self) -> Result<()> {
    self.out.flush()?;
    Ok(())
  }

  pub fn into_inner(self) -> W {
    self.out
  }
}
