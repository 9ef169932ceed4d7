use anyhow::{ensure, Result};
use ndarray::{s, ArrayView2};

use crate::domain::detection::RawBox;

/// Vista `[4 + classes, candidates]` de la salida `[1, 4 + classes, candidates]` del modelo.
/// Cualquier otra forma es un error, nunca un pánico.
pub fn head_output<'a>(dims: &[usize], data: &'a [f32]) -> Result<ArrayView2<'a, f32>> {
    ensure!(
        dims.len() == 3 && dims[0] == 1,
        "expected detector output [1, 4 + classes, candidates], got {dims:?}"
    );
    Ok(ArrayView2::from_shape((dims[1], dims[2]), data)?)
}

/// Decodifica la salida `[4 + classes, candidates]` de la cabeza de YOLOv8.
/// Las filas 0..4 son `cx, cy, w, h`; el resto, puntuaciones por clase.
/// Se descartan los candidatos cuya mejor puntuación no supera `conf_threshold`.
pub fn decode_candidates(output: ArrayView2<f32>, conf_threshold: f32) -> Vec<RawBox> {
    if output.shape()[0] <= 4 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for i in 0..output.shape()[1] {
        let scores = output.slice(s![4.., i]);
        let (class_index, max_score) = scores
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (c, v)| if v > best.1 { (c, v) } else { best });

        if max_score > conf_threshold {
            let cx = output[[0, i]];
            let cy = output[[1, i]];
            let w = output[[2, i]];
            let h = output[[3, i]];
            out.push(RawBox {
                class_index,
                confidence: max_score,
                xyxy: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            });
        }
    }
    out
}

pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// NMS voraz por clase. El resultado va ordenado por confianza descendente y tiene como
/// mucho `max_detections` cajas.
pub fn non_maximum_suppression(
    mut candidates: Vec<RawBox>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawBox> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawBox> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_index == candidate.class_index && iou(&k.xyxy, &candidate.xyxy) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Construye una salida `[4 + classes, n]` a partir de filas `(cx, cy, w, h, class, score)`.
    fn head(classes: usize, rows: &[(f32, f32, f32, f32, usize, f32)]) -> Array2<f32> {
        let mut out = Array2::<f32>::zeros((4 + classes, rows.len()));
        for (i, &(cx, cy, w, h, class, score)) in rows.iter().enumerate() {
            out[[0, i]] = cx;
            out[[1, i]] = cy;
            out[[2, i]] = w;
            out[[3, i]] = h;
            out[[4 + class, i]] = score;
        }
        out
    }

    fn raw(class_index: usize, confidence: f32, xyxy: [f32; 4]) -> RawBox {
        RawBox { class_index, confidence, xyxy }
    }

    #[test]
    fn decodes_center_boxes_and_filters_low_scores() {
        let out = head(3, &[(50.0, 40.0, 20.0, 10.0, 2, 0.9), (10.0, 10.0, 4.0, 4.0, 1, 0.1)]);
        let boxes = decode_candidates(out.view(), 0.25);
        assert_eq!(boxes, vec![raw(2, 0.9, [40.0, 35.0, 60.0, 45.0])]);
    }

    #[test]
    fn score_equal_to_threshold_is_dropped() {
        let out = head(1, &[(5.0, 5.0, 2.0, 2.0, 0, 0.25)]);
        assert!(decode_candidates(out.view(), 0.25).is_empty());
    }

    #[test]
    fn head_output_accepts_single_batch() {
        let data = vec![0.0f32; 15];
        let view = head_output(&[1, 5, 3], &data).unwrap();
        assert_eq!(view.shape(), &[5, 3]);
    }

    #[test]
    fn head_output_rejects_bad_shapes() {
        let data = vec![0.0f32; 30];
        assert!(head_output(&[], &data[..1]).is_err());
        assert!(head_output(&[0, 5, 3], &[]).is_err());
        assert!(head_output(&[2, 5, 3], &data).is_err());
        assert!(head_output(&[5, 3], &data[..15]).is_err());
        assert!(head_output(&[1, 5, 3], &data[..10]).is_err());
    }

    #[test]
    fn degenerate_output_decodes_to_nothing() {
        let out = Array2::<f32>::zeros((4, 10));
        assert!(decode_candidates(out.view(), 0.0).is_empty());
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert_eq!(iou(&a, &a), 1.0);
        assert_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        assert_eq!(iou(&a, &[5.0, 0.0, 15.0, 10.0]), 50.0 / 150.0);
    }

    #[test]
    fn nms_suppresses_overlaps_within_a_class_only() {
        let boxes = vec![
            raw(0, 0.6, [0.5, 0.5, 10.5, 10.5]),
            raw(0, 0.9, [0.0, 0.0, 10.0, 10.0]),
            raw(1, 0.8, [0.0, 0.0, 10.0, 10.0]),
            raw(0, 0.5, [50.0, 50.0, 60.0, 60.0]),
        ];
        let kept = non_maximum_suppression(boxes, 0.7, 300);
        let summary: Vec<_> = kept.iter().map(|b| (b.class_index, b.confidence)).collect();
        assert_eq!(summary, vec![(0, 0.9), (1, 0.8), (0, 0.5)]);
    }

    #[test]
    fn nms_caps_result_count() {
        let boxes = (0..10)
            .map(|i| raw(0, i as f32 / 10.0, [i as f32 * 20.0, 0.0, i as f32 * 20.0 + 10.0, 10.0]))
            .collect();
        let kept = non_maximum_suppression(boxes, 0.7, 3);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].confidence, 0.9);
    }
}
