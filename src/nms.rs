use tracing::{debug, trace};

use crate::{rect::PixelRect, Face};

/// Non-maximum suppression.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Nms {
    /// Faces overlapping an accepted face by more than this IoU are dropped.
    pub iou_threshold: f32,
    /// Maximum number of eligible faces entering suppression; `0` keeps all.
    pub top_k: usize,
}

impl Default for Nms {
    fn default() -> Self {
        Self {
            iou_threshold: 0.3,
            top_k: 5000,
        }
    }
}

impl Nms {
    /// Suppress non-maxima faces.
    ///
    /// # Arguments
    ///
    /// * `faces` - Candidate faces, in anchor order.
    /// * `score_threshold` - Minimum confidence for a face to be kept.
    ///
    /// # Returns
    ///
    /// * `Vec<Face>` - Kept faces by descending confidence. Equal confidences
    ///   keep their input order.
    pub fn suppress_non_maxima(&self, faces: Vec<Face>, score_threshold: f32) -> Vec<Face> {
        let total = faces.len();
        let mut faces: Vec<Face> = faces
            .into_iter()
            .filter(|face| face.confidence >= score_threshold)
            .collect();

        // Stable, so ties stay in anchor order.
        faces.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        if self.top_k > 0 {
            faces.truncate(self.top_k);
        }

        if faces.len() <= 1 {
            debug!(candidates = total, kept = faces.len(), "non-maximum suppression");
            return faces;
        }

        let mut nms_faces: Vec<Face> = Vec::with_capacity(faces.len());
        let mut kept_rects: Vec<PixelRect> = Vec::with_capacity(faces.len());
        for face in faces {
            let rect = face.rect.to_pixel_rect();
            let suppressed_by = kept_rects
                .iter()
                .position(|kept| kept.iou(&rect) > self.iou_threshold);

            match suppressed_by {
                Some(index) => trace!(
                    confidence = face.confidence,
                    by = index,
                    "suppressed overlapping face"
                ),
                None => {
                    kept_rects.push(rect);
                    nms_faces.push(face);
                }
            }
        }

        debug!(candidates = total, kept = nms_faces.len(), "non-maximum suppression");
        nms_faces
    }
}
