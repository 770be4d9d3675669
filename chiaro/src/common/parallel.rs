//! Row-aligned parallel iteration over plane storage.

use rayon::prelude::*;

/// Multiplier for number of chunks relative to CPU threads.
/// Extra chunks keep threads busy when some rows are cheaper than others.
const CHUNKS_PER_THREAD: usize = 3;

/// Number of rows per chunk so that `height` splits into roughly
/// `threads * CHUNKS_PER_THREAD` chunks. Minimum of 1 row per chunk.
#[inline]
pub fn rows_per_chunk(height: usize) -> usize {
    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    (height / num_chunks).max(1)
}

/// Extension trait for splitting row-major storage into parallel row chunks.
pub trait ParRowsMut<T: Send> {
    /// Split into mutable chunks of whole rows, each `stride` elements long.
    /// Yields `(first_row, chunk)` pairs.
    fn par_rows_mut<'a>(
        &'a mut self,
        stride: usize,
    ) -> impl IndexedParallelIterator<Item = (usize, &'a mut [T])>
    where
        T: 'a;
}

impl<T: Send> ParRowsMut<T> for [T] {
    fn par_rows_mut<'a>(
        &'a mut self,
        stride: usize,
    ) -> impl IndexedParallelIterator<Item = (usize, &'a mut [T])>
    where
        T: 'a,
    {
        assert!(stride > 0, "stride must be positive");
        let rows = rows_per_chunk(self.len() / stride);
        self.par_chunks_mut(stride * rows)
            .enumerate()
            .map(move |(idx, chunk)| (idx * rows, chunk))
    }
}

/// Split three equally sized row-major buffers into zipped parallel row chunks.
/// Yields `(first_row, (a, b, c))`.
pub fn par_rows_mut3<'a, A: Send, B: Send, C: Send>(
    a: &'a mut [A],
    b: &'a mut [B],
    c: &'a mut [C],
    stride: usize,
) -> impl IndexedParallelIterator<Item = (usize, (&'a mut [A], &'a mut [B], &'a mut [C]))> {
    assert_eq!(a.len(), b.len(), "Zipped slices must have equal length");
    assert_eq!(a.len(), c.len(), "Zipped slices must have equal length");
    assert!(stride > 0, "stride must be positive");
    let rows = rows_per_chunk(a.len() / stride);
    let chunk = stride * rows;
    a.par_chunks_mut(chunk)
        .zip(b.par_chunks_mut(chunk))
        .zip(c.par_chunks_mut(chunk))
        .enumerate()
        .map(move |(idx, ((a, b), c))| (idx * rows, (a, b, c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_per_chunk_minimum_one() {
        assert_eq!(rows_per_chunk(0), 1);
        assert_eq!(rows_per_chunk(1), 1);
    }

    #[test]
    fn test_par_rows_mut_offsets() {
        let width = 10;
        let height = 23;
        let mut data = vec![0usize; width * height];

        data.par_rows_mut(width).for_each(|(first_row, chunk)| {
            assert_eq!(chunk.len() % width, 0, "Chunk not row-aligned");
            for (local_y, row) in chunk.chunks_mut(width).enumerate() {
                let y = first_row + local_y;
                for (x, v) in row.iter_mut().enumerate() {
                    *v = y * width + x;
                }
            }
        });

        for (i, &v) in data.iter().enumerate() {
            assert_eq!(v, i);
        }
    }

    /// Row index of every sample, written through a generic element type.
    fn fill_row_indices<T: Send + From<u16>>(data: &mut [T], stride: usize) {
        data.par_rows_mut(stride).for_each(|(first_row, chunk)| {
            for (local_y, row) in chunk.chunks_mut(stride).enumerate() {
                for v in row.iter_mut() {
                    *v = T::from((first_row + local_y) as u16);
                }
            }
        });
    }

    #[test]
    fn test_par_rows_mut_generic_element() {
        let mut wide = vec![0u32; 5 * 9];
        fill_row_indices(&mut wide, 5);
        let mut float = vec![0.0f32; 4 * 6];
        fill_row_indices(&mut float, 4);

        for (i, &v) in wide.iter().enumerate() {
            assert_eq!(v, (i / 5) as u32);
        }
        for (i, &v) in float.iter().enumerate() {
            assert_eq!(v, (i / 4) as f32);
        }
    }

    #[test]
    fn test_par_rows_mut3_offsets() {
        let width = 7;
        let height = 13;
        let mut a = vec![0i32; width * height];
        let mut b = vec![0i32; width * height];
        let mut c = vec![0i32; width * height];

        par_rows_mut3(&mut a, &mut b, &mut c, width).for_each(|(first_row, (a, b, c))| {
            let rows = a.len() / width;
            for local_y in 0..rows {
                let y = (first_row + local_y) as i32;
                for x in 0..width {
                    let idx = local_y * width + x;
                    a[idx] = y;
                    b[idx] = y * 2;
                    c[idx] = y * 3;
                }
            }
        });

        for y in 0..height {
            for x in 0..width {
                let i = y * width + x;
                assert_eq!(a[i], y as i32);
                assert_eq!(b[i], y as i32 * 2);
                assert_eq!(c[i], y as i32 * 3);
            }
        }
    }
}
