//! Core domain types: provider records and their embedding matrix.

use std::fmt;

use crate::error::ValidationError;

/// Separator placed between a provider's name and its services when the
/// pair is turned into the text that gets embedded.
pub const EMBEDDING_TEXT_SEPARATOR: &str = ". ";

/// A single embedding vector.
pub type Embedding = Vec<f32>;

/// A service provider: an organization name and a free-text description of
/// what it offers.
///
/// Records are immutable once created; both fields are guaranteed non-blank.
///
/// # Example
/// ```
/// use provider_index::ProviderRecord;
///
/// let record = ProviderRecord::new("Test Org", "Utility assistance").unwrap();
/// assert_eq!(record.embedding_text(), "Test Org. Utility assistance");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProviderRecord {
    name: String,
    services: String,
}

impl ProviderRecord {
    /// Creates a record, rejecting empty or whitespace-only fields.
    ///
    /// Field names in errors use the wire names (`provider`, `services`).
    pub fn new(
        name: impl Into<String>,
        services: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let services = services.into();

        if name.trim().is_empty() {
            return Err(ValidationError::required_field("provider"));
        }
        if services.trim().is_empty() {
            return Err(ValidationError::required_field("services"));
        }

        Ok(Self { name, services })
    }

    /// The provider's name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The provider's services description.
    #[inline]
    pub fn services(&self) -> &str {
        &self.services
    }

    /// The text whose embedding represents this record: `name + ". " + services`.
    pub fn embedding_text(&self) -> String {
        format!("{}{EMBEDDING_TEXT_SEPARATOR}{}", self.name, self.services)
    }
}

impl fmt::Display for ProviderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.services)
    }
}

/// Dense `N x D` matrix of `f32`, stored row-major.
///
/// Row `i` is the embedding of record `i` in the paired record list.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingMatrix {
    dimension: usize,
    /// Flat values: `data[row * dimension + col]`.
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Creates an empty matrix with zero rows.
    pub fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Wraps a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `dimension` is 0 or the buffer length
    /// is not a multiple of it.
    pub fn from_flat(dimension: usize, data: Vec<f32>) -> Result<Self, ValidationError> {
        if dimension == 0 || data.len() % dimension != 0 {
            return Err(ValidationError::dimension_mismatch(dimension, data.len()));
        }
        Ok(Self { dimension, data })
    }

    /// Stacks individual vectors into a matrix.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` for the first row whose length is not `dimension`.
    pub fn from_rows(dimension: usize, rows: &[Embedding]) -> Result<Self, ValidationError> {
        let mut data = Vec::with_capacity(rows.len() * dimension);
        for row in rows {
            if row.len() != dimension {
                return Err(ValidationError::dimension_mismatch(dimension, row.len()));
            }
            data.extend_from_slice(row);
        }
        Self::from_flat(dimension, data)
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    /// Number of columns.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns row `i`, or `None` if out of range.
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Iterates over rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.dimension.max(1))
    }

    /// The flat row-major values.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns a new matrix with `row` appended, leaving `self` untouched.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `row.len() != self.dimension()`.
    pub fn with_row(&self, row: &[f32]) -> Result<Self, ValidationError> {
        if row.len() != self.dimension {
            return Err(ValidationError::dimension_mismatch(self.dimension, row.len()));
        }
        let mut data = Vec::with_capacity(self.data.len() + row.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(row);
        Ok(Self {
            dimension: self.dimension,
            data,
        })
    }
}
