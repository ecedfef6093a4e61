use std::collections::VecDeque;

use clap::ValueEnum;
use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;

/// 噪声点的保留标签
pub const NOISE: i32 = -1;

/// 尚未访问的点，仅在聚类过程中使用
const UNVISITED: i32 = -2;

/// 距离度量
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cosine,
    Euclidean,
}

impl Metric {
    pub fn distance(&self, a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
        match self {
            Metric::Cosine => {
                let dot = a.dot(&b);
                let na = a.dot(&a).sqrt();
                let nb = b.dot(&b).sqrt();
                // 零向量与任何向量都不相似
                if na == 0.0 || nb == 0.0 {
                    return 1.0;
                }
                1.0 - dot / (na * nb)
            }
            Metric::Euclidean => {
                let mut sum = 0.0;
                for (x, y) in a.iter().zip(b.iter()) {
                    sum += (x - y) * (x - y);
                }
                sum.sqrt()
            }
        }
    }
}

/// 基于距离的聚类器接口，每个点返回一个整数标签，噪声点为 [`NOISE`]
pub trait Clusterer {
    fn fit_predict(&self, data: ArrayView2<f32>) -> Vec<i32>;
}

/// DBSCAN 密度聚类
///
/// 邻居数量按包含自身计算，达到 min_samples 即为核心点。
/// 簇的编号由扩散顺序决定，但相同输入和参数下的划分结果是确定的。
pub struct Dbscan {
    pub eps: f32,
    pub min_samples: usize,
    pub metric: Metric,
}

impl Dbscan {
    pub fn new(eps: f32, min_samples: usize, metric: Metric) -> Self {
        Self { eps, min_samples, metric }
    }

    /// 并行计算每个点 eps 邻域内的点，包含自身
    fn neighbors(&self, data: ArrayView2<f32>) -> Vec<Vec<usize>> {
        let n = data.nrows();
        (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .filter(|&j| self.metric.distance(data.row(i), data.row(j)) <= self.eps)
                    .collect()
            })
            .collect()
    }
}

impl Clusterer for Dbscan {
    fn fit_predict(&self, data: ArrayView2<f32>) -> Vec<i32> {
        let n = data.nrows();
        let neighbors = self.neighbors(data);
        let mut labels = vec![UNVISITED; n];
        let mut cluster = 0;

        for i in 0..n {
            if labels[i] != UNVISITED {
                continue;
            }
            if neighbors[i].len() < self.min_samples {
                labels[i] = NOISE;
                continue;
            }

            // 从核心点 i 开始按索引顺序扩散，保证划分结果可复现
            labels[i] = cluster;
            let mut queue = VecDeque::from(neighbors[i].clone());
            while let Some(j) = queue.pop_front() {
                if labels[j] == NOISE {
                    // 边界点：此前被判为噪声，归入当前簇
                    labels[j] = cluster;
                    continue;
                }
                if labels[j] != UNVISITED {
                    continue;
                }
                labels[j] = cluster;
                if neighbors[j].len() >= self.min_samples {
                    queue.extend(neighbors[j].iter().copied());
                }
            }
            cluster += 1;
        }

        labels
    }
}
