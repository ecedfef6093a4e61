use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use fastembed::{ImageEmbedding, ImageInitOptions};
use log::info;
use ndarray::Array2;

use crate::config::EmbedModel;

/// 图片向量编码器的统一接口
///
/// 输出矩阵每行对应一个输入路径，顺序保持不变
pub trait ImageEncoder {
    fn embed(&self, paths: &[PathBuf]) -> Result<Array2<f32>>;
}

/// 基于 fastembed 的预训练视觉编码器
///
/// 每次运行只加载一次，由调用方显式构造后注入流水线
pub struct ClipEncoder {
    model: ImageEmbedding,
}

impl ClipEncoder {
    pub fn load(model: EmbedModel) -> Result<Self> {
        info!("加载模型: {:?}", model);
        let model = ImageEmbedding::try_new(
            ImageInitOptions::new(model.into()).with_show_download_progress(true),
        )
        .context("加载模型失败")?;
        Ok(Self { model })
    }
}

impl ImageEncoder for ClipEncoder {
    fn embed(&self, paths: &[PathBuf]) -> Result<Array2<f32>> {
        // 整个图片集作为单个批次推理，不做内部分块
        let embeddings = self.model.embed(paths.to_vec(), Some(paths.len()))?;
        ensure!(!embeddings.is_empty(), "向量计算结果为空");
        let dim = embeddings[0].len();
        let flat = embeddings.into_iter().flatten().collect::<Vec<_>>();
        Ok(Array2::from_shape_vec((flat.len() / dim, dim), flat)?)
    }
}
