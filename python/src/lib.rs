use numpy::{
    ndarray::{Array1, Array2, Array3},
    IntoPyArray, PyArray1, PyArray2, PyArray3, PyReadonlyArrayDyn,
};
use pyo3::{exceptions::PyValueError, prelude::*};
use rust::{DetectionParams, NetworkOutputs, Nms, NUM_LANDMARKS};
use anchor_faces as rust;

fn to_py_err(err: rust::AnchorFacesError) -> PyErr {
    PyErr::new::<PyValueError, _>(err.to_string())
}

/// Face detector post-processor wrapper.
#[pyclass]
struct FaceDetector {
    detector: rust::FaceDetector,
}

#[pymethods]
impl FaceDetector {
    /// Creates a post-processor for the given network input size.
    ///
    /// # Arguments
    ///
    /// * `width` - Network input width in pixels.
    /// * `height` - Network input height in pixels.
    /// * `score_threshold` - The confidence threshold for face detection.
    /// * `nms_threshold` - The IoU threshold for non-maximum suppression.
    /// * `top_k` - Maximum number of faces entering suppression; 0 keeps all.
    #[new]
    #[pyo3(signature = (width, height, score_threshold=0.9, nms_threshold=0.3, top_k=5000))]
    fn new(
        width: usize,
        height: usize,
        score_threshold: f32,
        nms_threshold: f32,
        top_k: usize,
    ) -> PyResult<Self> {
        let detector = rust::FaceDetectorBuilder::new(width, height)
            .detect_params(DetectionParams {
                score_threshold,
                nms: Nms {
                    iou_threshold: nms_threshold,
                    top_k,
                },
            })
            .build()
            .map_err(to_py_err)?;
        Ok(Self { detector })
    }

    /// Number of anchors the network outputs must have.
    #[getter]
    fn num_priors(&self) -> usize {
        self.detector.priors().len()
    }

    /// Detects faces from the network outputs.
    ///
    /// # Arguments
    ///
    /// * `loc` - float32 array of shape (N, 14) or (1, N, 14).
    /// * `conf` - float32 array of shape (N, 2) or (1, N, 2).
    /// * `iou` - float32 array of shape (N, 1) or (1, N, 1).
    ///
    /// # Returns
    ///
    /// A tuple containing:
    ///
    /// * `rects` - A 2D array of shape (num_faces, 4) containing the bounding boxes of the detected faces.
    /// * `scores` - A 1D array of shape (num_faces,) containing the confidence scores of the detected faces.
    /// * `landmarks` - A 3D array of shape (num_faces, 5, 2) containing the landmarks of the detected faces.
    fn detect<'py>(
        &self,
        py: Python<'py>,
        loc: PyReadonlyArrayDyn<f32>,
        conf: PyReadonlyArrayDyn<f32>,
        iou: PyReadonlyArrayDyn<f32>,
    ) -> PyResult<(&'py PyArray2<f32>, &'py PyArray1<f32>, &'py PyArray3<f32>)> {
        let outputs = NetworkOutputs::from_dyn(loc.as_array(), conf.as_array(), iou.as_array())
            .map_err(to_py_err)?;
        let faces = self.detector.detect(&outputs).map_err(to_py_err)?;

        let mut rect_array = Array2::zeros((faces.len(), 4));
        let mut score_array = Array1::zeros(faces.len());
        let mut landmarks_array = Array3::<f32>::zeros((faces.len(), NUM_LANDMARKS, 2));
        for (i, face) in faces.iter().enumerate() {
            rect_array[(i, 0)] = face.rect.x;
            rect_array[(i, 1)] = face.rect.y;
            rect_array[(i, 2)] = face.rect.width;
            rect_array[(i, 3)] = face.rect.height;

            score_array[i] = face.confidence;

            for (j, (x, y)) in face.landmarks.iter().enumerate() {
                landmarks_array[(i, j, 0)] = *x;
                landmarks_array[(i, j, 1)] = *y;
            }
        }

        Ok((
            rect_array.into_pyarray(py),
            score_array.into_pyarray(py),
            landmarks_array.into_pyarray(py),
        ))
    }
}

/// py-anchor-faces is a Python binding to the anchor-faces library.
#[pymodule]
fn py_anchor_faces(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_class::<FaceDetector>()?;
    Ok(())
}
