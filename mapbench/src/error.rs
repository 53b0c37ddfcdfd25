use thiserror::Error;

use crate::map::KeyShape;

/// mapbench specialized Result type.
/// mapbench 专用的 Result 类型。
pub type Result<T> = std::result::Result<T, Error>;

/// Correctness violation detected inside one repetition.
/// 单次重复中检测到的正确性违例。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
  /// An inserted key was not found.
  /// 已插入的键未找到。
  #[error("inserted key not found (position {pos})")]
  Missing { pos: usize },
  /// A key that was never inserted was found.
  /// 从未插入的键被找到。
  #[error("missed key was found (position {pos})")]
  Unexpected { pos: usize },
  /// Removing a live key reported it absent.
  /// 删除存在的键却报告不存在。
  #[error("live key reported absent on remove (position {pos})")]
  NotRemoved { pos: usize },
  #[error("unexpected lookup accumulation: {actual} misses, expected {expected}")]
  MissCount { expected: usize, actual: usize },
  #[error("size is {actual}, expected {expected}")]
  Size { expected: usize, actual: usize },
  #[error("visited {actual} entries, expected {expected}")]
  Visited { expected: usize, actual: usize },
}

/// mapbench error enum.
/// mapbench 错误枚举。
#[derive(Error, Debug)]
pub enum Error {
  /// Correctness failure, fatal to the current repetition.
  /// 正确性失败，终止当前重复。
  #[error("{scenario} on {map} (n={n}): {violation}")]
  Violation {
    scenario: &'static str,
    map: &'static str,
    n: usize,
    violation: Violation,
  },
  #[error("Unknown map: {0}")]
  UnknownMap(String),
  #[error("Unknown key shape: {0}")]
  UnknownShape(String),
  #[error("Invalid value for {name}: {value:?}")]
  InvalidEnv { name: &'static str, value: String },
  #[error("{0} must not be empty")]
  Empty(&'static str),
  #[error("Duplicate key at position {0}")]
  DuplicateKey(usize),
  #[error("Key shape mismatch: expected {expected}, got {actual}")]
  ShapeMismatch {
    expected: KeyShape,
    actual: KeyShape,
  },
  /// Requested more distinct keys than the shape's domain holds.
  /// 请求的不同键数量超过键形状的值域。
  #[error("{shape} domain cannot supply {requested} distinct keys")]
  DomainExhausted { shape: KeyShape, requested: usize },
  /// Rejection sampling gave up after too many consecutive duplicates.
  /// 拒绝采样连续重复过多后放弃。
  #[error("{shape} generator rejected {rejects} candidates in a row")]
  RejectLimit { shape: KeyShape, rejects: usize },
  #[error("Scenario {scenario} does not apply to {shape} keys")]
  Unsupported {
    scenario: &'static str,
    shape: KeyShape,
  },
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Serialization error: {0}")]
  Json(#[from] sonic_rs::Error),
}

impl Error {
  /// Whether this is a correctness violation rather than a configuration problem
  /// 是否为正确性违例（而非配置问题）
  #[inline]
  #[must_use]
  pub fn is_violation(&self) -> bool {
    matches!(self, Self::Violation { .. })
  }
}
