// SPDX-License-Identifier: MIT
// Errors shared by the resolver, the planner and the row copier.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripError {
    /// Content id could not be parsed as an integer.
    InvalidContentId(String),
    /// A plan was requested with zero strips.
    ZeroStrips,
    /// A plan was requested for an image with no rows (or no columns).
    EmptyImage,
    /// The plan was built for a different image size than the buffer handed in.
    PlanMismatch { plan_h: u32, image_h: u32 },
    /// Source stride is shorter than one tightly packed row.
    StrideTooSmall { stride: usize, row_bytes: usize },
    /// A source or destination buffer cannot hold the planned rows.
    BufferTooSmall { needed: usize, got: usize },
}

impl std::fmt::Display for StripError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StripError::InvalidContentId(id) => write!(f, "Content id '{}' is not an integer", id),
            StripError::ZeroStrips => write!(f, "Strip count must be greater than 0"),
            StripError::EmptyImage => write!(f, "Image has no rows to reassemble"),
            StripError::PlanMismatch { plan_h, image_h } => write!(
                f,
                "Plan built for height {} but image has height {}",
                plan_h, image_h
            ),
            StripError::StrideTooSmall { stride, row_bytes } => write!(
                f,
                "Stride of {} bytes is shorter than a {} byte row",
                stride, row_bytes
            ),
            StripError::BufferTooSmall { needed, got } => {
                write!(f, "Buffer too small: need {} bytes, got {}", needed, got)
            }
        }
    }
}

impl std::error::Error for StripError {}
