use std::{
  fs::File,
  io::{self, BufWriter, Write},
};

use anyhow::{Context, Result, bail};
use log::info;
use mapbench::{Collector, Conf, CountingAlloc, JemallocProbe, run_suite};
use tikv_jemallocator::Jemalloc;

#[global_allocator]
static ALLOC: CountingAlloc<Jemalloc> = CountingAlloc::new(Jemalloc);

fn main() -> Result<()> {
  log_init::init();

  let conf = Conf::from_env().context("reading configuration from environment")?;
  info!(
    "ranges={:?} maps={:?} shapes={:?} seed={} repeat={}",
    conf.ranges, conf.maps, conf.shapes, conf.seed, conf.repeat
  );

  let out: Box<dyn Write> = match &conf.out {
    Some(path) => Box::new(BufWriter::new(
      File::create(path).with_context(|| format!("creating {}", path.display()))?,
    )),
    None => Box::new(BufWriter::new(io::stdout().lock())),
  };

  let probe = JemallocProbe::new(&ALLOC);
  let mut col = Collector::new(out);
  run_suite(&conf, &probe, &mut col)?;

  let violations = col.violations().len();
  info!("{} measurements, {violations} violations", col.rows().len());
  if violations > 0 {
    bail!("{violations} correctness violations");
  }
  Ok(())
}
