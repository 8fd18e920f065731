// ScratchBuffer - reused (pixel, sample) output buffer
//
// A calibrator owns exactly one scratch buffer and overwrites it on every
// event. Two allocation policies exist:
// - Eager: allocated at construction with the configured (pixels, samples)
// - Lazy: allocated on the first event, shaped like that event's input
//
// Once allocated the shape is fixed. Every later request is checked against
// it and a mismatch is reported instead of writing into the wrong layout.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// When the output buffer is allocated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferPolicy {
    /// Allocate at construction with the configured shape
    #[default]
    Eager,
    /// Allocate on first use with the first input's shape
    Lazy,
}

/// Exclusively owned output buffer reused across events
#[derive(Debug)]
pub struct ScratchBuffer {
    policy: BufferPolicy,
    data: Option<Array2<f32>>,
}

impl ScratchBuffer {
    /// Create a scratch buffer
    ///
    /// # Arguments
    /// * `policy` - Allocation policy
    /// * `shape` - (pixels, samples) allocated immediately under `Eager`,
    ///   ignored under `Lazy`
    pub fn new(policy: BufferPolicy, shape: (usize, usize)) -> Self {
        let data = match policy {
            BufferPolicy::Eager => Some(Array2::zeros(shape)),
            BufferPolicy::Lazy => None,
        };
        Self { policy, data }
    }

    pub fn policy(&self) -> BufferPolicy {
        self.policy
    }

    /// Shape of the allocated buffer, `None` while a lazy buffer is unset
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.data.as_ref().map(|data| data.dim())
    }

    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// Read-only view of the current contents
    pub fn view(&self) -> Option<ArrayView2<'_, f32>> {
        self.data.as_ref().map(|data| data.view())
    }

    /// Check that an input of `shape` fits the buffer without allocating
    ///
    /// An unset lazy buffer accepts any shape.
    pub fn check(&self, shape: (usize, usize)) -> Result<(), CalibrationError> {
        match self.shape() {
            Some(expected) if expected != shape => Err(CalibrationError::ShapeMismatch {
                expected,
                actual: shape,
            }),
            _ => Ok(()),
        }
    }

    /// Get the buffer ready to receive an event of `shape`
    ///
    /// Allocates an unset lazy buffer with `shape` (this happens once), then
    /// validates `shape` against the allocated buffer.
    ///
    /// # Errors
    /// * `ShapeMismatch` - buffer already allocated with a different shape
    pub fn prepare(
        &mut self,
        shape: (usize, usize),
    ) -> Result<&mut Array2<f32>, CalibrationError> {
        self.check(shape)?;
        if self.data.is_none() {
            tracing::debug!(
                "[ScratchBuffer] Allocating lazy buffer {}x{}",
                shape.0,
                shape.1
            );
        }
        Ok(self.data.get_or_insert_with(|| Array2::zeros(shape)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eager_allocates_at_construction() {
        let buffer = ScratchBuffer::new(BufferPolicy::Eager, (4, 16));
        assert!(buffer.is_allocated());
        assert_eq!(buffer.shape(), Some((4, 16)));
        assert!(buffer.view().unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_lazy_allocates_on_first_prepare() {
        let mut buffer = ScratchBuffer::new(BufferPolicy::Lazy, (4, 16));
        assert!(!buffer.is_allocated());
        assert_eq!(buffer.shape(), None);

        let data = buffer.prepare((2, 8)).expect("first prepare allocates");
        assert_eq!(data.dim(), (2, 8));
        assert_eq!(buffer.shape(), Some((2, 8)));
    }

    #[test]
    fn test_lazy_shape_is_fixed_after_first_prepare() {
        let mut buffer = ScratchBuffer::new(BufferPolicy::Lazy, (4, 16));
        buffer.prepare((2, 8)).unwrap();

        let err = buffer.prepare((3, 8)).unwrap_err();
        assert_eq!(
            err,
            CalibrationError::ShapeMismatch {
                expected: (2, 8),
                actual: (3, 8),
            }
        );
        assert_eq!(buffer.shape(), Some((2, 8)));
    }

    #[test]
    fn test_eager_rejects_mismatched_shape() {
        let mut buffer = ScratchBuffer::new(BufferPolicy::Eager, (4, 16));
        assert!(buffer.prepare((4, 15)).is_err());
        assert!(buffer.prepare((4, 16)).is_ok());
    }

    #[test]
    fn test_prepare_reuses_allocation() {
        let mut buffer = ScratchBuffer::new(BufferPolicy::Eager, (2, 2));
        let first = buffer.prepare((2, 2)).unwrap().as_ptr();
        let second = buffer.prepare((2, 2)).unwrap().as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn test_check_does_not_allocate() {
        let buffer = ScratchBuffer::new(BufferPolicy::Lazy, (1, 1));
        assert!(buffer.check((9, 9)).is_ok());
        assert!(!buffer.is_allocated());
    }

    #[test]
    fn test_policy_serde_lowercase() {
        let policy: BufferPolicy = serde_json::from_str("\"lazy\"").unwrap();
        assert_eq!(policy, BufferPolicy::Lazy);
        assert_eq!(BufferPolicy::default(), BufferPolicy::Eager);
    }
}
