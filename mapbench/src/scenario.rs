//! Scenario catalogue and their inputs
//! 场景目录及其输入

use std::fmt::{self, Display};

use rand::Rng;

use crate::{
  error::{Error, Result},
  map::KeyShape,
  workload::{GenKey, KeySeq, Workload},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
  /// Put a shuffled `1..=n`
  InsertShuffled,
  /// Put `n` random keys
  InsertRandom,
  /// Put `n` random keys after `reserve(n)`
  InsertReserved,
  /// Remove every key in an order different from insertion
  DeleteRandom,
  /// Hit lookups over shuffled-sequential keys
  ReadShuffled,
  /// Hit lookups over random keys
  ReadRandom,
  /// Lookups of keys disjoint from the inserted set
  ReadMiss,
  /// Lookups after a random half was removed
  ReadHalfDeleted,
  /// One full traversal
  Iterate,
  /// 50% reads, 25% inserts, 25% deletes
  Mixed,
}

/// Key family a scenario draws from
/// 场景使用的键族
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
  Sequential,
  Random,
}

impl Scenario {
  pub const ALL: [Scenario; 10] = [
    Self::InsertShuffled,
    Self::InsertRandom,
    Self::InsertReserved,
    Self::DeleteRandom,
    Self::ReadShuffled,
    Self::ReadRandom,
    Self::ReadMiss,
    Self::ReadHalfDeleted,
    Self::Iterate,
    Self::Mixed,
  ];

  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::InsertShuffled => "insert_shuffled",
      Self::InsertRandom => "insert_random",
      Self::InsertReserved => "insert_reserved",
      Self::DeleteRandom => "delete_random",
      Self::ReadShuffled => "read_shuffled",
      Self::ReadRandom => "read_random",
      Self::ReadMiss => "read_miss",
      Self::ReadHalfDeleted => "read_half_deleted",
      Self::Iterate => "iterate",
      Self::Mixed => "mixed",
    }
  }

  #[must_use]
  pub const fn source(self) -> Source {
    match self {
      Self::InsertShuffled | Self::ReadShuffled => Source::Sequential,
      _ => Source::Random,
    }
  }

  /// Sequential families only exist for integer keys
  /// 顺序键族仅适用于整数键
  #[must_use]
  pub const fn applies(self, shape: KeyShape) -> bool {
    match self.source() {
      Source::Sequential => shape.is_int(),
      Source::Random => true,
    }
  }

  /// Whether the handle is constructed with a `reserve(n)` hint
  /// 句柄构建时是否带 `reserve(n)` 提示
  #[must_use]
  pub const fn reserve(self) -> bool {
    matches!(self, Self::InsertReserved | Self::DeleteRandom)
  }

  #[must_use]
  pub const fn needs_misses(self) -> bool {
    matches!(self, Self::ReadMiss)
  }
}

impl Display for Scenario {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Repetition phase
/// 重复阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// Unmeasured preparation
  Setup,
  /// Timed window
  Measure,
  /// Unmeasured; load factor and invariants
  Observe,
}

impl Phase {
  /// Next phase, `None` after OBSERVE
  /// 下一阶段，OBSERVE 之后为 `None`
  #[must_use]
  pub const fn next(self) -> Option<Phase> {
    match self {
      Self::Setup => Some(Self::Measure),
      Self::Measure => Some(Self::Observe),
      Self::Observe => None,
    }
  }
}

/// Operation category of the mixed workload
/// 混合负载的操作类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
  Read = 0,
  Insert = 1,
  Delete = 2,
}

impl Op {
  /// Uniform 4-way choice where two outcomes read
  /// 4 路均匀选择，其中两路为读
  #[inline]
  pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
    match rng.random_range(0..4u8) {
      0 | 1 => Self::Read,
      2 => Self::Insert,
      _ => Self::Delete,
    }
  }
}

/// One operation per key, drawn before the timed window
/// 每个键一个操作，在计时窗口之前抽取
pub fn plan_mixed(n: usize, wl: &mut Workload) -> Vec<Op> {
  (0..n).map(|_| Op::draw(wl.rng())).collect()
}

/// Inputs of one scenario run, shared read-only by every implementation
/// 单次场景运行的输入，所有实现只读共享
#[derive(Debug, Clone)]
pub struct Fixture<K> {
  pub scenario: Scenario,
  pub keys: KeySeq<K>,
  pub misses: Option<KeySeq<K>>,
}

impl<K: GenKey> Fixture<K> {
  pub fn generate(scenario: Scenario, n: usize, wl: &mut Workload) -> Result<Self> {
    if !scenario.applies(K::SHAPE) {
      return Err(Error::Unsupported {
        scenario: scenario.name(),
        shape: K::SHAPE,
      });
    }
    let keys = match scenario.source() {
      Source::Sequential => wl.seq_shuffled::<K>(n)?,
      Source::Random => wl.random::<K>(n)?,
    };
    let misses = if scenario.needs_misses() {
      Some(wl.disjoint(&keys)?)
    } else {
      None
    };
    Ok(Self {
      scenario,
      keys,
      misses,
    })
  }

  /// Build from existing sequences
  /// 由已有序列构建
  pub fn with_keys(scenario: Scenario, keys: KeySeq<K>, misses: Option<KeySeq<K>>) -> Self {
    Self {
      scenario,
      keys,
      misses,
    }
  }

  #[inline]
  #[must_use]
  pub fn n(&self) -> usize {
    self.keys.len()
  }
}
