/// Class index to label mapping for the classifier output.
/// The order is fixed by the trained model and must never be reordered.
pub const LABELS: [&str; 4] = [
    "healthy",
    "pituitary_tumor",
    "glioma_tumor",
    "meningioma_tumor",
];

/// Index of the `healthy` class, for which no explanation is produced.
pub const HEALTHY: usize = 0;

/// Index of the highest probability. Ties resolve to the lowest index.
pub fn argmax(probs: &[f32]) -> usize {
    let mut best = 0;
    for (i, &p) in probs.iter().enumerate() {
        if p > probs[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_order_matches_model_output() {
        assert_eq!(LABELS[HEALTHY], "healthy");
        assert_eq!(LABELS[1], "pituitary_tumor");
        assert_eq!(LABELS[2], "glioma_tumor");
        assert_eq!(LABELS[3], "meningioma_tumor");
    }

    #[test]
    fn argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 0.2, 0.6, 0.1]), 2);
        assert_eq!(argmax(&[0.9, 0.05, 0.03, 0.02]), 0);
    }

    #[test]
    fn argmax_ties_resolve_to_lowest_index() {
        assert_eq!(argmax(&[0.25, 0.25, 0.25, 0.25]), 0);
        assert_eq!(argmax(&[0.1, 0.45, 0.45, 0.0]), 1);
    }
}
