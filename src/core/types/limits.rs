use thiserror::Error;

/// Limits classify the size range of resizeable storage associated with memory types and
/// table types. If no maximum is given, the respective storage can grow to any size.
///
/// A maximum, when present, is never below the minimum; [`Limits::new`] is the
/// only way to build limits with a maximum.
///
/// <https://www.w3.org/TR/wasm-core-2/#limits>
/// <https://www.w3.org/TR/wasm-core-2/#binary-limits>
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Limits {
    min: u32,
    max: Option<u32>,
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("invalid limits: maximum {max} is below minimum {min}")]
pub struct InvalidLimitsError {
    pub min: u32,
    pub max: u32,
}

impl Limits {
    pub fn new(min: u32, max: Option<u32>) -> Result<Self, InvalidLimitsError> {
        match max {
            Some(max) if max < min => Err(InvalidLimitsError { min, max }),
            _ => Ok(Self { min, max }),
        }
    }

    /// Limits without an upper bound.
    pub fn at_least(min: u32) -> Self {
        Self { min, max: None }
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_max_below_min() {
        assert_eq!(
            Limits::new(2, Some(1)),
            Err(InvalidLimitsError { min: 2, max: 1 })
        );
        assert_eq!(Limits::new(1, Some(1)).unwrap().max(), Some(1));
        assert_eq!(Limits::at_least(3).max(), None);
    }
}
