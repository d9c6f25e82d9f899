use std::io::{self, BufWriter, Write};
use std::thread;

use anyhow::Context;
use keyflake::{
    ClockRegression, KeyflakeId, LockKeyGenerator, MonotonicClock, TimeSource, WallClock,
};

use crate::{
    config::{ClockKind, GenerateConfig, InspectArgs},
    output::{IdRecord, write_ids, write_json_line},
};

/// Runs `keyflake generate`, writing the IDs to `out`.
pub fn generate<W: Write>(config: &GenerateConfig, out: &mut W) -> anyhow::Result<()> {
    let ids = match config.clock {
        ClockKind::Wall => draw_ids(config, WallClock::default())?,
        ClockKind::Monotonic => {
            let clock = MonotonicClock::try_default().context("failed to anchor monotonic clock")?;
            draw_ids(config, clock)?
        }
    };

    write_ids(out, &ids, config.format).context("failed to write ids")
}

/// Draws `config.count` IDs from one generator shared by `config.threads`
/// threads.
///
/// A single thread returns IDs in issue order. Several threads return them
/// as ordered by [`merge_batches`].
fn draw_ids<T>(config: &GenerateConfig, clock: T) -> anyhow::Result<Vec<KeyflakeId>>
where
    T: TimeSource + Send + Sync,
{
    let generator = LockKeyGenerator::with_policy(config.machine_id, clock, config.policy)
        .context("failed to create generator")?;

    tracing::info!(
        machine_id = config.machine_id,
        count = config.count,
        threads = config.threads,
        clock = ?config.clock,
        policy = ?config.policy,
        "generating ids"
    );

    if config.threads <= 1 {
        return Ok((0..config.count).map(|_| generator.next_id()).collect());
    }

    let per_thread = config.count / config.threads;
    let remainder = config.count % config.threads;

    let batches = thread::scope(|s| {
        let handles: Vec<_> = (0..config.threads)
            .map(|i| {
                let quota = per_thread + usize::from(i < remainder);
                let generator = &generator;
                s.spawn(move || (0..quota).map(|_| generator.next_id()).collect::<Vec<_>>())
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow::anyhow!("generator thread panicked"))
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    let ids = merge_batches(batches, config.policy);
    tracing::debug!(
        first = ?ids.first().map(KeyflakeId::to_raw),
        last = ?ids.last().map(KeyflakeId::to_raw),
        "generated ids"
    );
    Ok(ids)
}

/// Joins per-thread batches.
///
/// Under [`ClockRegression::Wait`] every ID is greater than the ones issued
/// before it, so the result is sorted into issue order. Under
/// [`ClockRegression::Tolerate`] a regression can issue smaller IDs later;
/// batches are kept as drawn, one thread after another.
fn merge_batches(batches: Vec<Vec<KeyflakeId>>, policy: ClockRegression) -> Vec<KeyflakeId> {
    let mut ids = batches.concat();
    if policy == ClockRegression::Wait {
        ids.sort_unstable();
    }
    ids
}

/// Runs `keyflake inspect`.
pub fn inspect<W: Write>(args: &InspectArgs, out: &mut W) -> anyhow::Result<()> {
    for &raw in &args.ids {
        let id = KeyflakeId::from_raw(raw);
        if args.json {
            write_json_line(out, &IdRecord::from(id))?;
        } else {
            writeln!(out, "{id:?}")?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Buffered, locked stdout.
pub fn stdout() -> BufWriter<io::StdoutLock<'static>> {
    BufWriter::new(io::stdout().lock())
}
