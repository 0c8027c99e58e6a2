use ndarray::ArrayView2;
use tracing::debug;

use crate::{
    decode::{Decoder, NetworkOutputs, Variance},
    detection::{AnchorFacesResult, DetectionParams},
    priorboxes::{PriorBoxes, PriorBoxesParams},
    Face, Nms,
};

/// Post-processor for one input resolution.
///
/// The prior list is generated once and only read afterwards, so a detector
/// can be shared across threads.
#[derive(Debug, Clone)]
pub struct FaceDetector {
    priors: PriorBoxes,
    prior_params: PriorBoxesParams,
    variance: Variance,
    params: DetectionParams,
}

impl FaceDetector {
    /// Creates a detector with the default anchor layout.
    ///
    /// # Arguments
    ///
    /// * `input_size` - Network input `(width, height)` in pixels.
    /// * `params` - Default thresholds for [`FaceDetector::detect`].
    pub fn new(input_size: (usize, usize), params: DetectionParams) -> AnchorFacesResult<Self> {
        FaceDetectorBuilder::new(input_size.0, input_size.1)
            .detect_params(params)
            .build()
    }

    pub fn priors(&self) -> &PriorBoxes {
        &self.priors
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Network input `(width, height)` the detector expects outputs for.
    pub fn input_size(&self) -> (usize, usize) {
        self.priors.image_size()
    }

    /// Regenerates the priors for a new input resolution.
    pub fn set_input_size(&mut self, width: usize, height: usize) -> AnchorFacesResult<()> {
        if (width, height) != self.input_size() {
            self.priors = PriorBoxes::new(&self.prior_params, (width, height))?;
        }
        Ok(())
    }

    /// Detects faces with the detector's own parameters.
    pub fn detect(&self, outputs: &NetworkOutputs) -> AnchorFacesResult<Vec<Face>> {
        self.detect_with(outputs, &self.params)
    }

    /// Detects faces with parameters overriding the detector's for this call.
    pub fn detect_with(
        &self,
        outputs: &NetworkOutputs,
        params: &DetectionParams,
    ) -> AnchorFacesResult<Vec<Face>> {
        params.validate()?;
        let faces = Decoder::new(self.input_size(), self.variance).decode(&self.priors, outputs)?;
        let faces = params
            .nms
            .suppress_non_maxima(faces, params.score_threshold);
        debug!(faces = faces.len(), "detected faces");
        Ok(faces)
    }
}

/// Builder for face detectors.
pub struct FaceDetectorBuilder {
    input_size: (usize, usize),
    prior_params: PriorBoxesParams,
    variance: Variance,
    params: DetectionParams,
}

impl FaceDetectorBuilder {
    /// Create a new builder for the given network input size.
    ///
    /// # Arguments
    ///
    /// * `width` - Input width in pixels.
    /// * `height` - Input height in pixels.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            input_size: (width, height),
            prior_params: PriorBoxesParams::default(),
            variance: Variance::default(),
            params: DetectionParams::default(),
        }
    }

    /// Set the detection parameters.
    pub fn detect_params(mut self, params: DetectionParams) -> Self {
        self.params = params;
        self
    }

    /// Set the minimum confidence of detected faces.
    pub fn score_threshold(mut self, score_threshold: f32) -> Self {
        self.params.score_threshold = score_threshold;
        self
    }

    /// Set the non-maximum suppression.
    pub fn nms(mut self, nms: Nms) -> Self {
        self.params.nms = nms;
        self
    }

    /// Set the anchor layout. It must match the one the model was trained with.
    pub fn prior_params(mut self, prior_params: PriorBoxesParams) -> Self {
        self.prior_params = prior_params;
        self
    }

    /// Set the decoding variances.
    pub fn variance(mut self, variance: Variance) -> Self {
        self.variance = variance;
        self
    }

    /// Builds a new detector.
    pub fn build(&self) -> AnchorFacesResult<FaceDetector> {
        self.params.validate()?;
        let priors = PriorBoxes::new(&self.prior_params, self.input_size)?;

        Ok(FaceDetector {
            priors,
            prior_params: self.prior_params.clone(),
            variance: self.variance,
            params: self.params,
        })
    }
}

/// Decodes and suppresses one set of network outputs.
///
/// One-shot form of [`FaceDetector::detect`]: the priors are generated for
/// this call only.
#[allow(clippy::too_many_arguments)]
pub fn detect<'a>(
    image_width: usize,
    image_height: usize,
    loc: ArrayView2<'a, f32>,
    conf: ArrayView2<'a, f32>,
    iou: ArrayView2<'a, f32>,
    score_threshold: f32,
    nms_threshold: f32,
    top_k: usize,
) -> AnchorFacesResult<Vec<Face>> {
    let detector = FaceDetectorBuilder::new(image_width, image_height)
        .score_threshold(score_threshold)
        .nms(Nms {
            iou_threshold: nms_threshold,
            top_k,
        })
        .build()?;
    detector.detect(&NetworkOutputs::new(loc, conf, iou)?)
}
