use ndarray::{Array2, ShapeError};
use thiserror::Error;

use crate::{nms::Nms, Rect};

#[derive(Error, Debug)]
pub enum AnchorFacesError {
    #[error("Invalid image size: {width}x{height}")]
    InvalidImageSize { width: usize, height: usize },
    #[error("Tensor `{tensor}` has {actual} rows, expected {expected}")]
    TensorRows {
        tensor: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Tensor `{tensor}` has {actual} columns, expected {expected}")]
    TensorColumns {
        tensor: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Tensor `{tensor}` has {len} values, not a multiple of the row width {row_width}")]
    TensorLength {
        tensor: &'static str,
        len: usize,
        row_width: usize,
    },
    #[error("Tensor shape error: {0}")]
    Shape(ShapeError),
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

impl From<ShapeError> for AnchorFacesError {
    fn from(err: ShapeError) -> Self {
        AnchorFacesError::Shape(err)
    }
}

pub type AnchorFacesResult<R> = Result<R, AnchorFacesError>;

/// Number of landmark points predicted per face.
pub const NUM_LANDMARKS: usize = 5;

/// Five `(x, y)` landmark points in pixels, ordered as in [`LandmarkKind`].
pub type Landmarks = [(f32, f32); NUM_LANDMARKS];

/// Facial landmark, in the order the network regresses them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkKind {
    RightEye = 0,
    LeftEye = 1,
    NoseTip = 2,
    RightMouthCorner = 3,
    LeftMouthCorner = 4,
}

/// Number of values in a row of [`faces_to_array`].
pub const FACE_ROW_LEN: usize = 4 + 2 * NUM_LANDMARKS + 1;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Face {
    pub rect: Rect,
    pub confidence: f32,
    pub landmarks: Landmarks,
}

impl Face {
    pub fn landmark(&self, kind: LandmarkKind) -> (f32, f32) {
        self.landmarks[kind as usize]
    }

    /// Flattens the face as `x, y, w, h, re_x, re_y, le_x, le_y, nt_x, nt_y,
    /// rcm_x, rcm_y, lcm_x, lcm_y, score`.
    pub fn to_row(&self) -> [f32; FACE_ROW_LEN] {
        let mut row = [0.0; FACE_ROW_LEN];
        let (x, y, width, height) = self.rect.to_xywh();
        row[..4].copy_from_slice(&[x, y, width, height]);
        for (i, (lx, ly)) in self.landmarks.iter().enumerate() {
            row[4 + 2 * i] = *lx;
            row[5 + 2 * i] = *ly;
        }
        row[FACE_ROW_LEN - 1] = self.confidence;
        row
    }
}

/// Stacks faces into an `N × 15` array, one [`Face::to_row`] per row.
pub fn faces_to_array(faces: &[Face]) -> Array2<f32> {
    let mut array = Array2::zeros((faces.len(), FACE_ROW_LEN));
    for (mut row, face) in array.rows_mut().into_iter().zip(faces) {
        row.iter_mut()
            .zip(face.to_row())
            .for_each(|(dst, value)| *dst = value);
    }
    array
}

#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectionParams {
    pub score_threshold: f32,
    pub nms: Nms,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            score_threshold: 0.9,
            nms: Nms::default(),
        }
    }
}

impl DetectionParams {
    /// Rejects thresholds that cannot select anything meaningful.
    pub fn validate(&self) -> AnchorFacesResult<()> {
        if !self.score_threshold.is_finite() {
            return Err(AnchorFacesError::InvalidParams(format!(
                "score threshold must be finite, got {}",
                self.score_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.nms.iou_threshold) {
            return Err(AnchorFacesError::InvalidParams(format!(
                "NMS threshold must be within [0, 1], got {}",
                self.nms.iou_threshold
            )));
        }
        Ok(())
    }
}
