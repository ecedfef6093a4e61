use std::collections::HashSet;

use crate::cluster::NOISE;

/// 为每个逻辑分组挑选代表图片的下标，按原始顺序返回
///
/// 每个非噪声簇取原始顺序中的第一张；噪声点虽然共用同一个标签值，
/// 但彼此之间并无相似关系，因此每个噪声点单独成组，全部保留
pub fn representatives(labels: &[i32]) -> Vec<usize> {
    let mut seen = HashSet::new();
    let mut reps = vec![];
    for (i, &label) in labels.iter().enumerate() {
        if label == NOISE || seen.insert(label) {
            reps.push(i);
        }
    }
    reps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_per_cluster() {
        assert_eq!(representatives(&[0, 0, 1, 1, 2]), [0, 2, 4]);
    }

    #[test]
    fn test_noise_points_stay_singletons() {
        // 两个噪声点不能被合并成一组
        assert_eq!(representatives(&[0, NOISE, 0, NOISE]), [0, 1, 3]);
    }

    #[test]
    fn test_all_noise() {
        assert_eq!(representatives(&[NOISE, NOISE, NOISE]), [0, 1, 2]);
    }

    #[test]
    fn test_empty() {
        assert!(representatives(&[]).is_empty());
    }

    #[test]
    fn test_size_never_exceeds_input() {
        let labels = [0, 1, 0, NOISE, 1, 2];
        assert!(representatives(&labels).len() <= labels.len());
    }
}
