use anchor_faces::{FaceDetectorBuilder, NetworkOutputs, CONF_WIDTH, IOU_WIDTH, LOC_WIDTH};
use criterion::{criterion_group, criterion_main, Criterion};

fn criterion_benchmark(c: &mut Criterion) {
    for (name, width, height) in [("postprocess_320x240", 320, 240), ("postprocess_640x640", 640, 640)] {
        let face_detector = FaceDetectorBuilder::new(width, height)
            .score_threshold(0.5)
            .build()
            .expect("Fail to build the face detector.");
        let num_anchors = face_detector.priors().len();

        let loc: Vec<f32> = (0..num_anchors * LOC_WIDTH)
            .map(|i| ((i % 7) as f32 - 3.0) * 0.1)
            .collect();
        let conf: Vec<f32> = (0..num_anchors * CONF_WIDTH)
            .map(|i| (i % 11) as f32 / 10.0)
            .collect();
        let iou: Vec<f32> = (0..num_anchors * IOU_WIDTH)
            .map(|i| (i % 13) as f32 / 12.0)
            .collect();
        let outputs = NetworkOutputs::from_slices(&loc, &conf, &iou).expect("Bad output layout.");

        c.bench_function(name, |b| b.iter(|| face_detector.detect(&outputs).unwrap()));
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
