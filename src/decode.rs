use ndarray::{ArrayView1, ArrayView2, ArrayViewD, Axis};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{
    detection::{AnchorFacesError, AnchorFacesResult, Landmarks, NUM_LANDMARKS},
    priorboxes::Prior,
    Face, Rect,
};

/// Values per anchor in `loc`: box deltas followed by landmark deltas.
pub const LOC_WIDTH: usize = 4 + 2 * NUM_LANDMARKS;
/// Values per anchor in `conf`: background and face scores.
pub const CONF_WIDTH: usize = 2;
/// Values per anchor in `iou`.
pub const IOU_WIDTH: usize = 1;

/// Variances used to decode regression deltas.
///
/// `center` scales center offsets, landmark offsets and the width; `height`
/// scales only the height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variance {
    pub center: f32,
    pub height: f32,
}

impl Default for Variance {
    fn default() -> Self {
        Self {
            center: 0.1,
            height: 0.2,
        }
    }
}

/// Fuses classification and localization quality into one score.
///
/// The IoU estimate is clamped to `[0, 1]` before the geometric mean.
pub fn fused_score(face_score: f32, iou: f32) -> f32 {
    (face_score * iou.clamp(0.0, 1.0)).sqrt()
}

/// Borrowed `loc`, `conf` and `iou` outputs of one forward pass.
#[derive(Debug, Clone, Copy)]
pub struct NetworkOutputs<'a> {
    loc: ArrayView2<'a, f32>,
    conf: ArrayView2<'a, f32>,
    iou: ArrayView2<'a, f32>,
}

fn check_columns(
    tensor: &'static str,
    view: &ArrayView2<f32>,
    expected: usize,
) -> AnchorFacesResult<()> {
    if view.ncols() != expected {
        return Err(AnchorFacesError::TensorColumns {
            tensor,
            expected,
            actual: view.ncols(),
        });
    }
    Ok(())
}

fn rows_from_slice<'a>(
    tensor: &'static str,
    data: &'a [f32],
    width: usize,
) -> AnchorFacesResult<ArrayView2<'a, f32>> {
    if data.len() % width != 0 {
        return Err(AnchorFacesError::TensorLength {
            tensor,
            len: data.len(),
            row_width: width,
        });
    }
    Ok(ArrayView2::from_shape((data.len() / width, width), data)?)
}

fn rows_from_dyn<'a>(
    tensor: &'static str,
    view: ArrayViewD<'a, f32>,
    width: usize,
) -> AnchorFacesResult<ArrayView2<'a, f32>> {
    // A rank-1 tensor is a column of single values.
    let last = match view.shape() {
        [_] if width == 1 => width,
        shape => shape.last().copied().unwrap_or(0),
    };
    if last != width {
        return Err(AnchorFacesError::TensorColumns {
            tensor,
            expected: width,
            actual: last,
        });
    }
    let rows = view.len() / width;
    Ok(view.into_shape((rows, width))?)
}

impl<'a> NetworkOutputs<'a> {
    /// Wraps `loc` (N×14), `conf` (N×2) and `iou` (N×1) views.
    pub fn new(
        loc: ArrayView2<'a, f32>,
        conf: ArrayView2<'a, f32>,
        iou: ArrayView2<'a, f32>,
    ) -> AnchorFacesResult<Self> {
        check_columns("loc", &loc, LOC_WIDTH)?;
        check_columns("conf", &conf, CONF_WIDTH)?;
        check_columns("iou", &iou, IOU_WIDTH)?;
        Ok(Self { loc, conf, iou })
    }

    /// Wraps flat row-major buffers as handed out by an inference runtime.
    pub fn from_slices(
        loc: &'a [f32],
        conf: &'a [f32],
        iou: &'a [f32],
    ) -> AnchorFacesResult<Self> {
        Self::new(
            rows_from_slice("loc", loc, LOC_WIDTH)?,
            rows_from_slice("conf", conf, CONF_WIDTH)?,
            rows_from_slice("iou", iou, IOU_WIDTH)?,
        )
    }

    /// Wraps dynamic-rank tensors such as `[1, N, 14]`, folding leading axes into rows.
    pub fn from_dyn(
        loc: ArrayViewD<'a, f32>,
        conf: ArrayViewD<'a, f32>,
        iou: ArrayViewD<'a, f32>,
    ) -> AnchorFacesResult<Self> {
        Self::new(
            rows_from_dyn("loc", loc, LOC_WIDTH)?,
            rows_from_dyn("conf", conf, CONF_WIDTH)?,
            rows_from_dyn("iou", iou, IOU_WIDTH)?,
        )
    }

    /// Fails unless every tensor has exactly `expected` rows.
    pub fn check_rows(&self, expected: usize) -> AnchorFacesResult<()> {
        for (tensor, view) in [("loc", &self.loc), ("conf", &self.conf), ("iou", &self.iou)] {
            if view.nrows() != expected {
                return Err(AnchorFacesError::TensorRows {
                    tensor,
                    expected,
                    actual: view.nrows(),
                });
            }
        }
        Ok(())
    }

    /// Pairs the prior of anchor `index` with its rows in the three tensors.
    ///
    /// Callers check rows first; an out-of-range `index` panics.
    pub(crate) fn anchor(&self, prior: Prior, index: usize) -> AnchorRecord<'a> {
        let loc = self.loc;
        AnchorRecord {
            prior,
            loc: loc.index_axis_move(Axis(0), index),
            face_score: self.conf[[index, 1]],
            iou: self.iou[[index, 0]],
        }
    }

    fn count_clamped_iou(&self) -> usize {
        self.iou
            .iter()
            .filter(|iou| !(0.0..=1.0).contains(*iou))
            .count()
    }
}

/// Everything needed to decode a single anchor.
#[derive(Debug, Clone, Copy)]
pub struct AnchorRecord<'a> {
    pub prior: Prior,
    pub loc: ArrayView1<'a, f32>,
    pub face_score: f32,
    pub iou: f32,
}

impl AnchorRecord<'_> {
    pub fn score(&self) -> f32 {
        fused_score(self.face_score, self.iou)
    }

    /// Decodes the box and landmarks into pixel coordinates.
    pub fn decode(&self, variance: Variance, image_size: (usize, usize)) -> Face {
        let Prior {
            cx: anchor_cx,
            cy: anchor_cy,
            width: s_kx,
            height: s_ky,
        } = self.prior;
        let (image_width, image_height) = (image_size.0 as f32, image_size.1 as f32);
        let loc = &self.loc;

        let cx = (anchor_cx + loc[0] * variance.center * s_kx) * image_width;
        let cy = (anchor_cy + loc[1] * variance.center * s_ky) * image_height;
        let width = s_kx * (loc[2] * variance.center).exp() * image_width;
        let height = s_ky * (loc[3] * variance.height).exp() * image_height;

        let mut landmarks: Landmarks = [(0.0, 0.0); NUM_LANDMARKS];
        for (k, landmark) in landmarks.iter_mut().enumerate() {
            let (dx, dy) = (loc[4 + 2 * k], loc[5 + 2 * k]);
            *landmark = (
                (anchor_cx + dx * variance.center * s_kx) * image_width,
                (anchor_cy + dy * variance.center * s_ky) * image_height,
            );
        }

        Face {
            rect: Rect::centered_at(cx, cy, width, height),
            confidence: self.score(),
            landmarks,
        }
    }
}

/// Turns network outputs into one face candidate per prior.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    image_size: (usize, usize),
    variance: Variance,
}

impl Decoder {
    pub fn new(image_size: (usize, usize), variance: Variance) -> Self {
        Self {
            image_size,
            variance,
        }
    }

    /// Decodes every anchor, keeping anchor order.
    ///
    /// Fails before decoding when the tensors do not have one row per prior.
    pub fn decode(
        &self,
        priors: &[Prior],
        outputs: &NetworkOutputs,
    ) -> AnchorFacesResult<Vec<Face>> {
        outputs.check_rows(priors.len())?;

        let clamped = outputs.count_clamped_iou();
        if clamped > 0 {
            warn!(clamped, "IoU estimates outside [0, 1] were clamped");
        }

        #[cfg(feature = "rayon")]
        let faces: Vec<Face> = priors
            .par_iter()
            .enumerate()
            .map(|(i, prior)| outputs.anchor(*prior, i).decode(self.variance, self.image_size))
            .collect();

        #[cfg(not(feature = "rayon"))]
        let faces: Vec<Face> = priors
            .iter()
            .enumerate()
            .map(|(i, prior)| outputs.anchor(*prior, i).decode(self.variance, self.image_size))
            .collect();

        debug!(candidates = faces.len(), "decoded anchors");
        Ok(faces)
    }
}
