//! Anchor layout shared with the detection network.
//!
//! The network emits one `loc`/`conf`/`iou` row per prior, in exactly the order
//! produced here: level (stride 8 → 64), then feature-map row, then column,
//! then anchor size. Any change to that order is a new layout version and
//! needs a matching model.

use itertools::iproduct;
use tracing::debug;

use crate::detection::{AnchorFacesError, AnchorFacesResult};

/// Version of the prior ordering contract with the network output layout.
pub const PRIOR_LAYOUT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriorBoxesParams {
    /// Anchor sizes in pixels, one set per detection level.
    pub min_sizes: Vec<Vec<usize>>,
    /// Stride in pixels of each detection level.
    pub steps: Vec<usize>,
}

impl Default for PriorBoxesParams {
    fn default() -> Self {
        Self {
            min_sizes: vec![
                vec![10, 16, 24],
                vec![32, 48],
                vec![64, 96],
                vec![128, 192, 256],
            ],
            steps: vec![8, 16, 32, 64],
        }
    }
}

/// Anchor box, normalized to the input image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prior {
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
}

/// Feature-map sizes `(width, height)` of the detection levels.
///
/// The stem halves the input twice, rounding up on the first halving; every
/// detection level then halves its predecessor, truncating.
pub fn feature_map_sizes(image_size: (usize, usize), levels: usize) -> Vec<(usize, usize)> {
    let stem = ((image_size.0 + 1) / 2 / 2, (image_size.1 + 1) / 2 / 2);
    std::iter::successors(Some(stem), |&(width, height)| Some((width / 2, height / 2)))
        .skip(1)
        .take(levels)
        .collect()
}

/// Ordered prior list for one input resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorBoxes {
    priors: Vec<Prior>,
    image_size: (usize, usize),
}

impl PriorBoxes {
    pub fn new(params: &PriorBoxesParams, image_size: (usize, usize)) -> AnchorFacesResult<Self> {
        let (image_width, image_height) = image_size;
        if image_width == 0 || image_height == 0 {
            return Err(AnchorFacesError::InvalidImageSize {
                width: image_width,
                height: image_height,
            });
        }
        if params.min_sizes.len() != params.steps.len() {
            return Err(AnchorFacesError::InvalidParams(format!(
                "{} anchor size sets for {} strides",
                params.min_sizes.len(),
                params.steps.len()
            )));
        }

        let feature_map_sizes = feature_map_sizes(image_size, params.steps.len());
        let capacity = feature_map_sizes
            .iter()
            .zip(params.min_sizes.iter())
            .map(|(f, min_sizes)| f.0 * f.1 * min_sizes.len())
            .sum();
        let mut priors = Vec::with_capacity(capacity);

        for ((f, min_sizes), step) in feature_map_sizes
            .iter()
            .zip(params.min_sizes.iter())
            .zip(params.steps.iter())
        {
            let step = *step as f32;
            for (i, j) in iproduct!(0..f.1, 0..f.0) {
                for min_size in min_sizes {
                    let s_kx = *min_size as f32 / image_width as f32;
                    let s_ky = *min_size as f32 / image_height as f32;
                    let cx = (j as f32 + 0.5) * step / image_width as f32;
                    let cy = (i as f32 + 0.5) * step / image_height as f32;
                    priors.push(Prior {
                        cx,
                        cy,
                        width: s_kx,
                        height: s_ky,
                    });
                }
            }
        }

        debug!(
            width = image_width,
            height = image_height,
            count = priors.len(),
            "generated priors"
        );

        Ok(Self { priors, image_size })
    }

    /// Input resolution `(width, height)` the priors were generated for.
    pub fn image_size(&self) -> (usize, usize) {
        self.image_size
    }

    pub fn len(&self) -> usize {
        self.priors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.priors.is_empty()
    }

    pub fn as_slice(&self) -> &[Prior] {
        &self.priors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Prior> {
        self.priors.iter()
    }
}

impl std::ops::Deref for PriorBoxes {
    type Target = [Prior];

    fn deref(&self) -> &Self::Target {
        &self.priors
    }
}
