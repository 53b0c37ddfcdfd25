//! Workload generator: unique, seeded key sequences
//! 负载生成器：唯一且可复现的键序列

use std::ops::Deref;

use log::debug;
use rand::{
  Rng, SeedableRng,
  distr::{Alphanumeric, SampleString},
  rngs::StdRng,
  seq::SliceRandom,
};
use rapidhash::RapidHashSet;

use crate::{
  error::{Error, Result},
  map::{Key, KeyShape},
};

pub const SEED: u64 = 42;

/// Consecutive duplicate draws tolerated before giving up
/// 放弃前可容忍的连续重复抽样次数
pub const MAX_REJECTS: usize = 1 << 16;

/// Length bounds of opaque text identifiers
/// 不透明文本标识符的长度范围
pub const MIN_ID_LEN: usize = 12;
pub const MAX_ID_LEN: usize = 36;

/// Keys the generator can draw
/// 生成器可抽样的键
pub trait GenKey: Key {
  /// Distinct non-sentinel values the domain holds, `None` if practically unbounded
  /// 值域中非哨兵值的数量，`None` 表示近似无界
  fn domain() -> Option<u128>;

  fn draw(rng: &mut StdRng) -> Self;

  /// Reserved value never handed out
  /// 永不生成的保留值
  fn is_sentinel(&self) -> bool;

  /// `i`-th key of the sequential family, `None` when the shape has none
  /// 顺序族中的第 `i` 个键，形状不支持时为 `None`
  fn nth(i: u64) -> Option<Self>;
}

impl GenKey for u32 {
  #[inline]
  fn domain() -> Option<u128> {
    Some(u32::MAX as u128)
  }

  #[inline]
  fn draw(rng: &mut StdRng) -> Self {
    rng.random()
  }

  #[inline]
  fn is_sentinel(&self) -> bool {
    *self == 0
  }

  #[inline]
  fn nth(i: u64) -> Option<Self> {
    u32::try_from(i).ok()
  }
}

impl GenKey for u64 {
  #[inline]
  fn domain() -> Option<u128> {
    Some(u64::MAX as u128)
  }

  #[inline]
  fn draw(rng: &mut StdRng) -> Self {
    rng.random()
  }

  #[inline]
  fn is_sentinel(&self) -> bool {
    *self == 0
  }

  #[inline]
  fn nth(i: u64) -> Option<Self> {
    Some(i)
  }
}

impl GenKey for String {
  fn domain() -> Option<u128> {
    None
  }

  fn draw(rng: &mut StdRng) -> Self {
    let len = rng.random_range(MIN_ID_LEN..=MAX_ID_LEN);
    Alphanumeric.sample_string(rng, len)
  }

  #[inline]
  fn is_sentinel(&self) -> bool {
    self.is_empty()
  }

  fn nth(_: u64) -> Option<Self> {
    None
  }
}

/// Immutable key sequence without duplicates
/// 无重复元素的不可变键序列
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySeq<K> {
  keys: Vec<K>,
}

impl<K: Key> KeySeq<K> {
  /// Wrap caller-supplied keys, rejecting duplicates
  /// 包装外部提供的键，拒绝重复
  pub fn from_keys(keys: Vec<K>) -> Result<Self> {
    let mut seen = RapidHashSet::with_capacity_and_hasher(keys.len(), Default::default());
    if let Some(pos) = keys.iter().position(|k| !seen.insert(k)) {
      return Err(Error::DuplicateKey(pos));
    }
    Ok(Self { keys })
  }

  #[inline]
  #[must_use]
  pub fn shape(&self) -> KeyShape {
    K::SHAPE
  }

  #[inline]
  #[must_use]
  pub fn keys(&self) -> &[K] {
    &self.keys
  }
}

impl<K> Deref for KeySeq<K> {
  type Target = [K];

  #[inline]
  fn deref(&self) -> &Self::Target {
    &self.keys
  }
}

/// Owner of the run's pseudo-random source
/// 持有本次运行的伪随机源
pub struct Workload {
  rng: StdRng,
}

impl Default for Workload {
  fn default() -> Self {
    Self::new(SEED)
  }
}

impl Workload {
  pub fn new(seed: u64) -> Self {
    Self {
      rng: StdRng::seed_from_u64(seed),
    }
  }

  #[inline]
  pub fn rng(&mut self) -> &mut StdRng {
    &mut self.rng
  }

  /// Permutation of `1..=n`
  /// `1..=n` 的随机排列
  pub fn seq_shuffled<K: GenKey>(&mut self, n: usize) -> Result<KeySeq<K>> {
    if !K::SHAPE.is_int() {
      return Err(Error::Unsupported {
        scenario: "seq_shuffled",
        shape: K::SHAPE,
      });
    }
    check_domain::<K>(n, n)?;
    let mut keys = (1..=n as u64)
      .map(K::nth)
      .collect::<Option<Vec<K>>>()
      .ok_or(Error::DomainExhausted {
        shape: K::SHAPE,
        requested: n,
      })?;
    keys.shuffle(&mut self.rng);
    debug!("seq_shuffled {} n={n}", K::SHAPE);
    Ok(KeySeq { keys })
  }

  /// `n` distinct keys drawn uniformly from the whole domain, sentinel excluded.
  /// For text keys these are opaque variable-length identifiers.
  ///
  /// 从整个值域均匀抽取 `n` 个不同的键（排除哨兵）。
  /// 文本键即为不透明的变长标识符。
  pub fn random<K: GenKey>(&mut self, n: usize) -> Result<KeySeq<K>> {
    check_domain::<K>(n, n)?;
    let mut seen = RapidHashSet::with_capacity_and_hasher(n, Default::default());
    let keys = self.fill(n, &mut seen)?;
    debug!("random {} n={n}", K::SHAPE);
    Ok(KeySeq { keys })
  }

  /// Opaque identifier sequence (alias of `random::<String>`)
  /// 不透明标识符序列（`random::<String>` 的别名）
  pub fn ids(&mut self, n: usize) -> Result<KeySeq<String>> {
    self.random::<String>(n)
  }

  /// Same-size sequence sharing no key with `base`
  /// 与 `base` 无交集的等长序列
  pub fn disjoint<K: GenKey>(&mut self, base: &KeySeq<K>) -> Result<KeySeq<K>> {
    let n = base.len();
    check_domain::<K>(n.saturating_mul(2), n)?;
    let mut seen = RapidHashSet::with_capacity_and_hasher(n * 2, Default::default());
    seen.extend(base.iter().cloned());
    let keys = self.fill(n, &mut seen)?;
    debug!("disjoint {} n={n}", K::SHAPE);
    Ok(KeySeq { keys })
  }

  /// Reorder in place; the set of values is untouched
  /// 原地重排，值集合不变
  #[inline]
  pub fn shuffle<T>(&mut self, items: &mut [T]) {
    items.shuffle(&mut self.rng);
  }

  /// Rejection sampling against `seen`
  /// 基于 `seen` 的拒绝采样
  fn fill<K: GenKey>(&mut self, n: usize, seen: &mut RapidHashSet<K>) -> Result<Vec<K>> {
    let mut keys = Vec::with_capacity(n);
    let mut rejects = 0;
    while keys.len() < n {
      let k = K::draw(&mut self.rng);
      if k.is_sentinel() || seen.contains(&k) {
        rejects += 1;
        if rejects >= MAX_REJECTS {
          return Err(Error::RejectLimit {
            shape: K::SHAPE,
            rejects,
          });
        }
        continue;
      }
      rejects = 0;
      seen.insert(k.clone());
      keys.push(k);
    }
    Ok(keys)
  }
}

fn check_domain<K: GenKey>(total: usize, requested: usize) -> Result<()> {
  match K::domain() {
    Some(cap) if total as u128 > cap => Err(Error::DomainExhausted {
      shape: K::SHAPE,
      requested,
    }),
    _ => Ok(()),
  }
}
