//! Post-processing for anchor-based face detectors.
//!
//! Turns the `loc`, `conf` and `iou` outputs of a single-shot face detection
//! network into ranked faces with bounding boxes and five landmarks. Running
//! the network is left to the caller.

mod rect;
pub use rect::{PixelRect, Rect};

mod detection;
pub use detection::{
    faces_to_array, AnchorFacesError, AnchorFacesResult, DetectionParams, Face, LandmarkKind,
    Landmarks, FACE_ROW_LEN, NUM_LANDMARKS,
};

mod priorboxes;
pub use priorboxes::{
    feature_map_sizes, Prior, PriorBoxes, PriorBoxesParams, PRIOR_LAYOUT_VERSION,
};

mod decode;
pub use decode::{
    fused_score, AnchorRecord, Decoder, NetworkOutputs, Variance, CONF_WIDTH, IOU_WIDTH,
    LOC_WIDTH,
};

mod nms;
pub use nms::Nms;

#[cfg(test)]
pub mod testing;

mod detector;

pub use detector::{detect, FaceDetector, FaceDetectorBuilder};
