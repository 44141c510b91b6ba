//! Row-parallel helpers for grid stages.

use rayon::prelude::*;

/// Multiplier for number of chunks relative to CPU threads.
const CHUNKS_PER_THREAD: usize = 2;

/// Rows per parallel chunk so that a grid of `rows` splits into roughly
/// `threads * 2` chunks. At least 1.
#[inline]
pub fn rows_per_chunk(rows: usize) -> usize {
    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    (rows / num_chunks).max(1)
}

/// Fills `out` (a row-major buffer with `cols` columns) row by row in parallel.
///
/// `f` receives the row index and the mutable output row.
pub fn par_fill_rows<T, F>(out: &mut [T], cols: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    if out.is_empty() || cols == 0 {
        return;
    }
    debug_assert_eq!(out.len() % cols, 0);

    let rows = out.len() / cols;
    let chunk_rows = rows_per_chunk(rows);

    out.par_chunks_mut(cols * chunk_rows)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let row_start = chunk_idx * chunk_rows;
            for (local, row) in chunk.chunks_mut(cols).enumerate() {
                f(row_start + local, row);
            }
        });
}

/// Builds a vector of `len` values computed from their index, in parallel.
pub fn par_map_indices<T, F>(len: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..len).into_par_iter().map(f).collect()
}
