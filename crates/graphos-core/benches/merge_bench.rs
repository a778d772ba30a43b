//! Compares the sorter's streak-optimized k-way merge against a naive
//! merge that re-heapifies on every emitted record, over near-sorted
//! multi-run input (the case the streak optimization targets).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use graphos_common::Result;
use graphos_common::memory::buffer::BufferManager;
use graphos_core::{Processor, Sorter, SorterConfig};

const RUN_COUNT: usize = 8;
const RUN_LEN: usize = 2_000;

/// Generates `RUN_COUNT` already-sorted runs, interleaved the way a real
/// spill cascade would produce them, so the minimum cursor tends to stay
/// the minimum for long streaks.
fn interleaved_runs() -> Vec<Vec<i64>> {
    (0..RUN_COUNT)
        .map(|run| {
            (0..RUN_LEN)
                .map(|i| (i * RUN_COUNT + run) as i64)
                .collect()
        })
        .collect()
}

struct CountingSink(u64);

impl Processor<i64> for CountingSink {
    fn process(&mut self, record: i64) -> Result<()> {
        self.0 += record as u64;
        Ok(())
    }
}

fn sorter_merge(runs: &[Vec<i64>]) {
    let buffer_manager = Arc::new(BufferManager::with_defaults());
    let mut sorter = Sorter::try_new(
        "bench-sorter",
        |a: &i64, b: &i64| a.cmp(b),
        None,
        SorterConfig::default(),
        Box::new(CountingSink(0)),
        Some(&buffer_manager),
    )
    .unwrap();

    for run in runs {
        for &value in run {
            sorter.process(value).unwrap();
        }
    }
    sorter.close().unwrap();
}

struct HeapItem {
    value: i64,
    run: usize,
    index: usize,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl Eq for HeapItem {}
impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other.value.cmp(&self.value)
    }
}

/// A k-way merge that pushes and pops the heap on every single record,
/// never taking advantage of a cursor remaining the minimum across
/// consecutive emissions.
fn naive_reheapify_merge(runs: &[Vec<i64>]) -> u64 {
    let mut heap = BinaryHeap::new();
    for (run, values) in runs.iter().enumerate() {
        if !values.is_empty() {
            heap.push(HeapItem {
                value: values[0],
                run,
                index: 0,
            });
        }
    }

    let mut sum = 0u64;
    while let Some(HeapItem { value, run, index }) = heap.pop() {
        sum += value as u64;
        let next_index = index + 1;
        if next_index < runs[run].len() {
            heap.push(HeapItem {
                value: runs[run][next_index],
                run,
                index: next_index,
            });
        }
    }
    sum
}

fn bench_merge(c: &mut Criterion) {
    let runs = interleaved_runs();
    let mut group = c.benchmark_group("k_way_merge");

    group.bench_with_input(BenchmarkId::new("streak_optimized", RUN_COUNT), &runs, |b, runs| {
        b.iter(|| sorter_merge(black_box(runs)));
    });
    group.bench_with_input(BenchmarkId::new("naive_reheapify", RUN_COUNT), &runs, |b, runs| {
        b.iter(|| black_box(naive_reheapify_merge(black_box(runs))));
    });

    group.finish();
}

criterion_group!(benches, bench_merge);
criterion_main!(benches);
