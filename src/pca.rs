use ndarray::{Array1, Array2, ArrayView2, Axis};

/// 幂迭代轮数，对 2 维投影足够收敛
const POWER_ITERATIONS: usize = 100;

/// 将向量投影到前两个主成分，返回 n x 2 矩阵
///
/// 中心化后对协方差矩阵做幂迭代，第二主成分通过抽去第一主成分的分量得到。
/// 初始向量固定，相同输入的投影结果是确定的。
pub fn project_2d(data: ArrayView2<f32>) -> Array2<f32> {
    let mean = data.mean_axis(Axis(0)).expect("embedding matrix must not be empty");
    let centered = &data - &mean;
    let cov = centered.t().dot(&centered);

    let pc1 = dominant_eigenvector(&cov, None);
    let pc2 = dominant_eigenvector(&cov, Some(&pc1));

    let mut out = Array2::zeros((data.nrows(), 2));
    out.column_mut(0).assign(&centered.dot(&pc1));
    out.column_mut(1).assign(&centered.dot(&pc2));
    out
}

/// 对称矩阵的主特征向量；给定 deflate 时先抽去该方向的分量
fn dominant_eigenvector(cov: &Array2<f32>, deflate: Option<&Array1<f32>>) -> Array1<f32> {
    let d = cov.nrows();
    // 非对称的固定初始向量，避免恰好与主成分正交
    let mut v = Array1::from_iter((0..d).map(|i| (i + 1) as f32));
    let norm = v.dot(&v).sqrt();
    v /= norm;

    for _ in 0..POWER_ITERATIONS {
        let mut next = cov.dot(&v);
        if let Some(u) = deflate {
            let proj = next.dot(u);
            next = next - u * proj;
        }
        let norm = next.dot(&next).sqrt();
        if norm <= f32::EPSILON {
            // 数据在剩余方向上没有方差，返回零向量即可
            return Array1::zeros(d);
        }
        v = next / norm;
    }
    v
}
