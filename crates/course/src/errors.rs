use thiserror::Error;

pub type Result<T> = std::result::Result<T, CourseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CourseError {
    #[error("Invalid course: {0}")]
    InvalidCourse(String),

    #[error("Out of bounds: {value} is outside [{min}, {max}]")]
    OutOfBounds { value: f64, min: f64, max: f64 },

    #[error("Invalid point: lat={lat}, lon={lon}")]
    InvalidPoint { lat: f64, lon: f64 },

    #[error("Invalid index {index} (len {len}): {reason}")]
    InvalidIndex {
        index: usize,
        len: usize,
        reason: String,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("GPX parsing error: {0}")]
    GpxParsing(String),
}

impl CourseError {
    pub(crate) fn index(index: usize, len: usize, reason: impl Into<String>) -> Self {
        CourseError::InvalidIndex {
            index,
            len,
            reason: reason.into(),
        }
    }

    /// True for the index-class failures (bad mutation index, too few points to delete).
    pub fn is_invalid_index(&self) -> bool {
        matches!(self, CourseError::InvalidIndex { .. })
    }
}
