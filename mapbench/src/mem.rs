//! Allocation accounting
//! 内存分配统计

use std::{
  alloc::{GlobalAlloc, Layout},
  sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

/// Heap reading at one instant
/// 某一时刻的堆读数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemSample {
  /// Live heap bytes
  /// 存活堆字节数
  pub bytes: u64,
  /// Cumulative allocation calls
  /// 累计分配调用次数
  pub allocs: u64,
}

/// Source of heap readings
/// 堆读数来源
pub trait MemProbe {
  /// Up-to-date reading; probes with cached statistics refresh them first
  /// 最新读数；带缓存统计的探针需先刷新
  fn sample(&self) -> MemSample;
}

/// Probe reporting zeros, for runs without an accounting allocator
/// 返回零值的探针，用于未启用统计分配器的运行
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl MemProbe for NoProbe {
  fn sample(&self) -> MemSample {
    MemSample::default()
  }
}

/// Global allocator wrapper counting calls and live bytes
/// 统计调用次数与存活字节的全局分配器包装
///
/// ```rust,ignore
/// #[global_allocator]
/// static ALLOC: CountingAlloc<tikv_jemallocator::Jemalloc> =
///   CountingAlloc::new(tikv_jemallocator::Jemalloc);
/// ```
pub struct CountingAlloc<A> {
  inner: A,
  allocs: AtomicU64,
  live: AtomicUsize,
}

impl<A> CountingAlloc<A> {
  pub const fn new(inner: A) -> Self {
    Self {
      inner,
      allocs: AtomicU64::new(0),
      live: AtomicUsize::new(0),
    }
  }

  #[inline]
  pub fn allocs(&self) -> u64 {
    self.allocs.load(Ordering::Relaxed)
  }

  #[inline]
  pub fn live(&self) -> usize {
    self.live.load(Ordering::Relaxed)
  }

  #[inline]
  fn on_alloc(&self, size: usize) {
    self.allocs.fetch_add(1, Ordering::Relaxed);
    self.live.fetch_add(size, Ordering::Relaxed);
  }
}

// SAFETY: every call is forwarded unchanged to `inner`; only counters are touched on the side.
unsafe impl<A: GlobalAlloc> GlobalAlloc for CountingAlloc<A> {
  #[inline]
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    // SAFETY: caller upholds GlobalAlloc::alloc contract
    let ptr = unsafe { self.inner.alloc(layout) };
    if !ptr.is_null() {
      self.on_alloc(layout.size());
    }
    ptr
  }

  #[inline]
  unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
    // SAFETY: caller upholds GlobalAlloc::alloc_zeroed contract
    let ptr = unsafe { self.inner.alloc_zeroed(layout) };
    if !ptr.is_null() {
      self.on_alloc(layout.size());
    }
    ptr
  }

  #[inline]
  unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
    // SAFETY: caller upholds GlobalAlloc::dealloc contract
    unsafe { self.inner.dealloc(ptr, layout) };
    self.live.fetch_sub(layout.size(), Ordering::Relaxed);
  }

  #[inline]
  unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
    // SAFETY: caller upholds GlobalAlloc::realloc contract
    let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };
    if !new_ptr.is_null() {
      self.allocs.fetch_add(1, Ordering::Relaxed);
      let old = layout.size();
      if new_size >= old {
        self.live.fetch_add(new_size - old, Ordering::Relaxed);
      } else {
        self.live.fetch_sub(old - new_size, Ordering::Relaxed);
      }
    }
    new_ptr
  }
}

impl<A> MemProbe for CountingAlloc<A> {
  fn sample(&self) -> MemSample {
    MemSample {
      bytes: self.live() as u64,
      allocs: self.allocs(),
    }
  }
}

#[cfg(feature = "jemalloc")]
pub use je::JemallocProbe;

#[cfg(feature = "jemalloc")]
mod je {
  use log::warn;
  use tikv_jemalloc_ctl::{epoch, stats};
  use tikv_jemallocator::Jemalloc;

  use super::{CountingAlloc, MemProbe, MemSample};

  /// Byte readings from jemalloc's own statistics, call counts from the wrapper
  /// 字节数取自 jemalloc 自身统计，调用次数取自包装器
  pub struct JemallocProbe {
    counter: &'static CountingAlloc<Jemalloc>,
  }

  impl JemallocProbe {
    pub fn new(counter: &'static CountingAlloc<Jemalloc>) -> Self {
      Self { counter }
    }
  }

  impl MemProbe for JemallocProbe {
    fn sample(&self) -> MemSample {
      // jemalloc caches its counters per epoch
      if let Err(e) = epoch::advance() {
        warn!("jemalloc epoch advance failed: {e}");
      }
      let bytes = match stats::allocated::read() {
        Ok(v) => v as u64,
        Err(e) => {
          warn!("jemalloc stats unavailable ({e}), falling back to wrapper counters");
          self.counter.live() as u64
        }
      };
      MemSample {
        bytes,
        allocs: self.counter.allocs(),
      }
    }
  }
}
