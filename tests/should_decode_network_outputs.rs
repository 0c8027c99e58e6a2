use anchor_faces::{
    faces_to_array, DetectionParams, FaceDetector, FaceDetectorBuilder, LandmarkKind,
    NetworkOutputs, Nms, CONF_WIDTH, FACE_ROW_LEN, IOU_WIDTH, LOC_WIDTH,
};
use approx::assert_abs_diff_eq;
use rstest::{fixture, rstest};

/// Flat outputs as an inference runtime would hand them over.
struct RawOutputs {
    loc: Vec<f32>,
    conf: Vec<f32>,
    iou: Vec<f32>,
}

impl RawOutputs {
    fn zeros(num_anchors: usize) -> Self {
        Self {
            loc: vec![0.0; num_anchors * LOC_WIDTH],
            conf: vec![0.0; num_anchors * CONF_WIDTH],
            iou: vec![0.0; num_anchors * IOU_WIDTH],
        }
    }

    fn set_face(&mut self, anchor: usize, face_score: f32, iou: f32) {
        self.conf[anchor * CONF_WIDTH] = 1.0 - face_score;
        self.conf[anchor * CONF_WIDTH + 1] = face_score;
        self.iou[anchor] = iou;
    }

    fn view(&self) -> NetworkOutputs<'_> {
        NetworkOutputs::from_slices(&self.loc, &self.conf, &self.iou).expect("Bad output layout.")
    }
}

#[fixture]
fn detector() -> FaceDetector {
    FaceDetectorBuilder::new(320, 240)
        .detect_params(DetectionParams::default())
        .nms(Nms::default())
        .build()
        .expect("Fail to build the face detector.")
}

/// Index of the stride-8 anchor at `(row, column)` with size index `size`.
fn level_3_anchor(row: usize, column: usize, size: usize) -> usize {
    (row * 40 + column) * 3 + size
}

#[rstest]
fn should_decode_network_outputs(detector: FaceDetector) {
    let mut outputs = RawOutputs::zeros(detector.priors().len());
    outputs.set_face(level_3_anchor(0, 0, 0), 0.95, 1.0);
    outputs.set_face(level_3_anchor(0, 0, 1), 0.92, 1.0);
    let far = level_3_anchor(10, 20, 0);
    outputs.set_face(far, 0.9216, 1.0);
    // Nose tip of the far face moves one variance-scaled prior width right.
    outputs.loc[far * LOC_WIDTH + 8] = 10.0;

    let faces = detector.detect(&outputs.view()).unwrap();

    assert_eq!(faces.len(), 2);

    assert_abs_diff_eq!(faces[0].confidence, 0.95f32.sqrt(), epsilon = 1e-6);
    assert_abs_diff_eq!(faces[0].rect.x, -1.0, epsilon = 1e-3);
    assert_abs_diff_eq!(faces[0].rect.y, -1.0, epsilon = 1e-3);

    assert_abs_diff_eq!(faces[1].confidence, 0.96, epsilon = 1e-5);
    assert_abs_diff_eq!(faces[1].rect.x, 159.0, epsilon = 1e-3);
    assert_abs_diff_eq!(faces[1].rect.y, 79.0, epsilon = 1e-3);
    assert_abs_diff_eq!(faces[1].rect.width, 10.0, epsilon = 1e-3);
    assert_abs_diff_eq!(faces[1].rect.height, 10.0, epsilon = 1e-3);

    let (nose_x, nose_y) = faces[1].landmark(LandmarkKind::NoseTip);
    assert_abs_diff_eq!(nose_x, 174.0, epsilon = 1e-3);
    assert_abs_diff_eq!(nose_y, 84.0, epsilon = 1e-3);
    let (eye_x, eye_y) = faces[1].landmark(LandmarkKind::RightEye);
    assert_abs_diff_eq!(eye_x, 164.0, epsilon = 1e-3);
    assert_abs_diff_eq!(eye_y, 84.0, epsilon = 1e-3);

    let rows = faces_to_array(&faces);
    assert_eq!(rows.dim(), (2, FACE_ROW_LEN));
    assert_abs_diff_eq!(rows[[1, FACE_ROW_LEN - 1]], 0.96, epsilon = 1e-5);
}

#[rstest]
fn should_reject_outputs_of_another_resolution(detector: FaceDetector) {
    let outputs = RawOutputs::zeros(23500);
    assert!(detector.detect(&outputs.view()).is_err());
}

#[rstest]
fn should_detect_concurrently(detector: FaceDetector) {
    let mut outputs = RawOutputs::zeros(detector.priors().len());
    outputs.set_face(level_3_anchor(5, 5, 2), 1.0, 1.0);

    let results: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| detector.detect(&outputs.view()).unwrap().len()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results, vec![1; 4]);
}
