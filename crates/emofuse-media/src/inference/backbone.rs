//! Inference runtime boundary.

use crate::error::{MediaError, MediaResult};

/// A dense `f32` tensor in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl ModelInput {
    /// Create an input, checking that `data` fills `shape`.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> MediaResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(MediaError::internal(format!(
                "Tensor shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A loaded classifier network: normalized input in, raw class scores out.
///
/// Implementations are loaded once and shared read-only between requests;
/// any locking the runtime needs happens inside `forward`.
pub trait EmotionBackbone: Send + Sync {
    /// Run one forward pass. Scores are in the model's class order.
    fn forward(&self, input: &ModelInput) -> MediaResult<Vec<f32>>;

    /// Identifier for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_must_match_data() {
        assert!(ModelInput::new(vec![1, 2, 3], vec![0.0; 6]).is_ok());
        assert!(ModelInput::new(vec![1, 2, 3], vec![0.0; 5]).is_err());
    }
}
