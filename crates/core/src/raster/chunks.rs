//! Chunk layout of a raster grid
//!
//! Large rasters are processed as independent rectangular chunks. The chunk
//! grid only describes the partition; it never owns data. Trailing chunks
//! may be smaller than the nominal chunk size, and zero-sized chunks are legal
//! (they simply contribute nothing to a reduction).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A rectangular block of cells addressed in source-grid coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Row offset in the source grid
    pub row_offset: usize,
    /// Column offset in the source grid
    pub col_offset: usize,
    /// Number of rows in this chunk
    pub rows: usize,
    /// Number of columns in this chunk
    pub cols: usize,
}

impl Chunk {
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_offset,
            col_offset,
            rows,
            cols,
        }
    }

    /// Number of cells in the chunk
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Source row range covered by this chunk
    pub fn row_range(&self) -> std::ops::Range<usize> {
        self.row_offset..self.row_offset + self.rows
    }

    /// Source column range covered by this chunk
    pub fn col_range(&self) -> std::ops::Range<usize> {
        self.col_offset..self.col_offset + self.cols
    }
}

/// Partition of a 2-D grid into row bands and column bands.
///
/// Every chunk is the product of one row band and one column band, so the
/// grid is fully described by the two lists of band sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkGrid {
    row_chunks: Vec<usize>,
    col_chunks: Vec<usize>,
}

impl ChunkGrid {
    /// Regular chunking with ragged trailing chunks
    pub fn regular(rows: usize, cols: usize, chunk_rows: usize, chunk_cols: usize) -> Result<Self> {
        if chunk_rows == 0 || chunk_cols == 0 {
            return Err(Error::invalid_parameter(
                "chunk_size",
                format!("({chunk_rows}, {chunk_cols})"),
                "chunk dimensions must be positive",
            ));
        }
        Ok(Self {
            row_chunks: split_axis(rows, chunk_rows),
            col_chunks: split_axis(cols, chunk_cols),
        })
    }

    /// A single chunk covering the whole grid
    pub fn single(rows: usize, cols: usize) -> Self {
        Self {
            row_chunks: vec![rows],
            col_chunks: vec![cols],
        }
    }

    /// Explicit chunk sizes along each axis. Zero-sized entries are allowed.
    pub fn from_sizes(row_chunks: Vec<usize>, col_chunks: Vec<usize>) -> Self {
        Self {
            row_chunks,
            col_chunks,
        }
    }

    /// Grid shape `(rows, cols)` covered by the chunks
    pub fn shape(&self) -> (usize, usize) {
        (self.row_chunks.iter().sum(), self.col_chunks.iter().sum())
    }

    pub fn row_chunks(&self) -> &[usize] {
        &self.row_chunks
    }

    pub fn col_chunks(&self) -> &[usize] {
        &self.col_chunks
    }

    /// Number of chunks
    pub fn len(&self) -> usize {
        self.row_chunks.len() * self.col_chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All chunks in row-major order
    pub fn chunks(&self) -> Vec<Chunk> {
        let mut out = Vec::with_capacity(self.len());
        let mut row_offset = 0;
        for &rows in &self.row_chunks {
            let mut col_offset = 0;
            for &cols in &self.col_chunks {
                out.push(Chunk::new(row_offset, col_offset, rows, cols));
                col_offset += cols;
            }
            row_offset += rows;
        }
        out
    }
}

fn split_axis(total: usize, size: usize) -> Vec<usize> {
    if total == 0 {
        return vec![0];
    }
    let mut sizes = vec![size; total / size];
    if total % size != 0 {
        sizes.push(total % size);
    }
    sizes
}
