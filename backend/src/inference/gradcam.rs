use ndarray::Array2;
use tch::{Kind, Tensor};

use crate::inference::classifier::Classifier;
use crate::inference::error::PredictError;

/// Computes the Grad-CAM relevance map for `class_idx` on a preprocessed
/// input. The feature map of the target layer is detached and re-marked as
/// requiring gradients, the head is re-applied on top of it, and the
/// gradient of the selected class score w.r.t. the feature map is pooled
/// into per-channel weights.
pub fn compute(
    classifier: &Classifier,
    input: &Tensor,
    class_idx: usize,
    epsilon: f32,
) -> Result<Array2<f32>, PredictError> {
    let features = classifier.features(input)?.detach().set_requires_grad(true);
    let scores = classifier.head(&features)?;

    // Scalar loss: the score of the class being explained.
    let loss = scores.select(0, 0).select(0, class_idx as i64);
    loss.backward();

    let grads = features.grad();
    if !grads.defined() {
        return Err(PredictError::GradCam(
            "no gradient reached the target layer".to_string(),
        ));
    }

    // [1, C, H, W] gradients -> one weight per channel.
    let pooled = grads.mean_dim([0, 2, 3].as_slice(), false, Kind::Float);
    let weights = pooled.view([1, -1, 1, 1]);
    let cam = (features.detach() * weights)
        .sum_dim_intlist([1].as_slice(), false, Kind::Float)
        .squeeze_dim(0);

    let size = cam.size();
    if size.len() != 2 {
        return Err(PredictError::GradCam(format!(
            "expected a 2-d relevance map, got shape {size:?}"
        )));
    }
    let (h, w) = (size[0] as usize, size[1] as usize);
    let mut buf = vec![0f32; h * w];
    cam.contiguous().to_kind(Kind::Float).copy_data(&mut buf, h * w);

    let mut map = Array2::from_shape_vec((h, w), buf)
        .map_err(|e| PredictError::GradCam(e.to_string()))?;
    normalize_relevance(&mut map, epsilon);
    Ok(map)
}

/// Clamps the map to non-negative values and divides by its maximum plus
/// `epsilon`. An all-zero map stays all-zero.
pub fn normalize_relevance(map: &mut Array2<f32>, epsilon: f32) {
    map.mapv_inplace(|v| v.max(0.0));
    let max = map.fold(0.0f32, |acc, &v| acc.max(v));
    map.mapv_inplace(|v| v / (max + epsilon));
}

/// Conventional substitute map for healthy predictions.
pub fn zero_relevance(spatial: usize) -> Array2<f32> {
    Array2::zeros((spatial, spatial))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn normalize_clamps_negatives_and_scales_to_unit_max() {
        let mut map = array![[-2.0f32, 0.0, 1.0], [3.0, 4.0, -0.5]];
        normalize_relevance(&mut map, 1e-8);
        assert!(map.iter().all(|&v| v >= 0.0));
        let max = map.fold(0.0f32, |acc, &v| acc.max(v));
        assert!((max - 1.0).abs() < 1e-6);
        assert_eq!(map[[0, 0]], 0.0);
        assert!((map[[1, 0]] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_all_zero_map_untouched() {
        let mut map = Array2::<f32>::zeros((7, 7));
        normalize_relevance(&mut map, 1e-8);
        assert!(map.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn normalize_handles_all_negative_input() {
        let mut map = array![[-1.0f32, -3.0], [-0.2, -7.5]];
        normalize_relevance(&mut map, 1e-8);
        assert!(map.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn zero_relevance_has_requested_resolution() {
        let map = zero_relevance(7);
        assert_eq!(map.dim(), (7, 7));
        assert!(map.iter().all(|&v| v == 0.0));
    }
}
