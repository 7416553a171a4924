//! Error types for spline sampling and mesh bending.

use thiserror::Error;

/// Broad category of a [`SplineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A time, distance or index argument lies outside its valid domain.
    OutOfRange,
    /// A structural edit would break the spline.
    InvalidOperation,
    /// Malformed configuration passed to a setter.
    InvalidArgument,
}

/// Errors raised by spline, curve and bender operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplineError {
    /// Curve or spline time outside `[0, max]`.
    #[error("time must be between 0 and {max} (was {value})")]
    TimeOutOfRange {
        /// The requested time.
        value: f32,
        /// Upper bound of the valid domain.
        max: f32,
    },

    /// Distance outside `[0, length]`.
    #[error("distance must be between 0 and {length} (was {value})")]
    DistanceOutOfRange {
        /// The requested distance.
        value: f32,
        /// Length of the curve or spline.
        length: f32,
    },

    /// Node index outside the node list.
    #[error("node index {index} out of range for {len} nodes")]
    NodeIndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Current node count.
        len: usize,
    },

    /// A spline needs at least two nodes.
    #[error("a spline needs at least 2 nodes (has {0})")]
    NotEnoughNodes(usize),

    /// Nodes can only be inserted between two existing nodes.
    #[error("can't insert a node at index 0")]
    InsertAtStart,

    /// Interval start outside `[0, length)`.
    #[error("interval start must be 0 or greater and lesser than spline length {length} (was {start})")]
    InvalidIntervalStart {
        /// The requested start.
        start: f32,
        /// Spline length.
        length: f32,
    },

    /// Interval end neither 0 nor in `(start, length]`.
    #[error("interval end must be 0 or greater than interval start {start}, and lesser than spline length {length} (was {end})")]
    InvalidIntervalEnd {
        /// Interval start.
        start: f32,
        /// The requested end.
        end: f32,
        /// Spline length.
        length: f32,
    },

    /// Height range bounds reversed or not finite.
    #[error("height range must satisfy min <= max (was {min}..{max})")]
    InvalidHeightRange {
        /// Lower ratio.
        min: f32,
        /// Upper ratio.
        max: f32,
    },

    /// `compute` called before a source mesh was set.
    #[error("no source mesh set on the mesh bender")]
    MissingSource,

    /// `compute` called before any interval was set.
    #[error("no interval set on the mesh bender")]
    MissingInterval,

    /// The target handed to `compute` is not the one the interval was set on.
    #[error("bend target does not match the interval the bender was configured with")]
    TargetMismatch,

    /// The curve the bender was bound to no longer exists on the spline.
    #[error("curve {0} is not part of the spline")]
    CurveNotFound(u64),
}

impl SplineError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TimeOutOfRange { .. }
            | Self::DistanceOutOfRange { .. }
            | Self::NodeIndexOutOfRange { .. } => ErrorKind::OutOfRange,
            Self::NotEnoughNodes(_)
            | Self::InsertAtStart
            | Self::MissingSource
            | Self::MissingInterval
            | Self::CurveNotFound(_) => ErrorKind::InvalidOperation,
            Self::InvalidIntervalStart { .. }
            | Self::InvalidIntervalEnd { .. }
            | Self::InvalidHeightRange { .. }
            | Self::TargetMismatch => ErrorKind::InvalidArgument,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = SplineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let err = SplineError::DistanceOutOfRange { value: -1.0, length: 2.0 };
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(SplineError::NotEnoughNodes(2).kind(), ErrorKind::InvalidOperation);
        assert_eq!(SplineError::InsertAtStart.kind(), ErrorKind::InvalidOperation);
        let err = SplineError::InvalidIntervalStart { start: 5.0, length: 4.0 };
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_message() {
        let err = SplineError::TimeOutOfRange { value: 1.5, max: 1.0 };
        assert_eq!(err.to_string(), "time must be between 0 and 1 (was 1.5)");
    }
}
