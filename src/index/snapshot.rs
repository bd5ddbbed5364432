//! Immutable pairing of the record list and its embedding matrix.

use crate::error::ValidationError;
use crate::types::{EmbeddingMatrix, ProviderRecord};

/// An internally consistent view of the index at one point in time.
///
/// Row `i` of [`matrix`](Self::matrix) is the embedding of
/// `records()[i].embedding_text()`; `records().len() == matrix().rows()`
/// holds for every value of this type. A snapshot is never mutated: an
/// insert builds a new one with [`append`](Self::append).
#[derive(Clone, Debug)]
pub struct Snapshot {
    records: Vec<ProviderRecord>,
    matrix: EmbeddingMatrix,
}

impl Snapshot {
    /// Pairs a record list with its matrix.
    ///
    /// # Errors
    ///
    /// Returns `InvalidField` if the row count differs from the record count.
    pub fn new(
        records: Vec<ProviderRecord>,
        matrix: EmbeddingMatrix,
    ) -> Result<Self, ValidationError> {
        if records.len() != matrix.rows() {
            return Err(ValidationError::invalid_field(
                "matrix",
                format!(
                    "{} rows for {} records",
                    matrix.rows(),
                    records.len()
                ),
            ));
        }
        Ok(Self { records, matrix })
    }

    /// A snapshot with no records.
    pub fn empty(dimension: usize) -> Self {
        Self {
            records: Vec::new(),
            matrix: EmbeddingMatrix::empty(dimension),
        }
    }

    /// Number of records (equal to the number of matrix rows).
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the snapshot holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimension of every row.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.matrix.dimension()
    }

    /// Records in positional order.
    #[inline]
    pub fn records(&self) -> &[ProviderRecord] {
        &self.records
    }

    /// The embedding matrix, row-aligned with [`records`](Self::records).
    #[inline]
    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    /// Builds a new snapshot with one more record and row.
    ///
    /// `self` is left unmodified.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `vector` has the wrong length.
    pub fn append(&self, record: ProviderRecord, vector: &[f32]) -> Result<Self, ValidationError> {
        let matrix = self.matrix.with_row(vector)?;
        let mut records = Vec::with_capacity(self.records.len() + 1);
        records.extend_from_slice(&self.records);
        records.push(record);
        Ok(Self { records, matrix })
    }
}
