use ndarray::Array2;
use rstest::fixture;

use crate::{
    decode::{NetworkOutputs, CONF_WIDTH, IOU_WIDTH, LOC_WIDTH},
    detection::NUM_LANDMARKS,
    priorboxes::{PriorBoxes, PriorBoxesParams},
    Face, FaceDetector, FaceDetectorBuilder, Rect,
};

/// Owned network outputs with zero deltas and zero scores.
pub struct SyntheticOutputs {
    pub loc: Array2<f32>,
    pub conf: Array2<f32>,
    pub iou: Array2<f32>,
}

impl SyntheticOutputs {
    pub fn new(num_anchors: usize) -> Self {
        Self {
            loc: Array2::zeros((num_anchors, LOC_WIDTH)),
            conf: Array2::zeros((num_anchors, CONF_WIDTH)),
            iou: Array2::zeros((num_anchors, IOU_WIDTH)),
        }
    }

    pub fn set_scores(&mut self, anchor: usize, face_score: f32, iou: f32) {
        self.conf[[anchor, 0]] = 1.0 - face_score;
        self.conf[[anchor, 1]] = face_score;
        self.iou[[anchor, 0]] = iou;
    }

    pub fn view(&self) -> NetworkOutputs<'_> {
        NetworkOutputs::new(self.loc.view(), self.conf.view(), self.iou.view())
            .expect("Synthetic outputs have valid widths.")
    }
}

pub fn face_at(rect: (f32, f32, f32, f32), confidence: f32) -> Face {
    Face {
        rect: Rect::at(rect.0, rect.1).with_size(rect.2, rect.3),
        confidence,
        landmarks: [(rect.0, rect.1); NUM_LANDMARKS],
    }
}

#[fixture]
pub fn priors_320x240() -> PriorBoxes {
    PriorBoxes::new(&PriorBoxesParams::default(), (320, 240)).expect("Can't generate priors.")
}

#[fixture]
pub fn detector_320x240() -> FaceDetector {
    FaceDetectorBuilder::new(320, 240)
        .build()
        .expect("Can't build the detector.")
}
