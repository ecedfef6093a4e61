use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use fastembed::ImageEmbeddingModel;

use crate::cluster::Metric;

#[derive(Parser, Debug, Clone)]
#[command(name = "imdedup", version)]
pub struct Opts {
    #[command(flatten)]
    pub source: SourceOptions,
    #[command(flatten)]
    pub embed: EmbedOptions,
    #[command(flatten)]
    pub cluster: ClusterOptions,
    #[command(flatten)]
    pub output: OutputOptions,
}

/// 图片来源，目录和视频必须二选一
#[derive(Parser, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SourceOptions {
    /// 待去重的图片目录
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,
    /// 待去重的视频文件，按场景切分后抽取代表帧
    #[arg(short, long, value_name = "FILE")]
    pub video: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct EmbedOptions {
    /// 用于计算图片向量的预训练模型
    #[arg(short, long, value_enum, default_value_t = EmbedModel::ClipVitB32)]
    pub model: EmbedModel,
}

#[derive(Parser, Debug, Clone)]
pub struct ClusterOptions {
    /// DBSCAN 邻域半径
    #[arg(short, long, value_name = "EPS", default_value_t = 0.2, value_parser = parse_epsilon)]
    pub epsilon: f32,
    /// DBSCAN 核心点的最小邻居数量，按包含自身计算
    #[arg(short = 's', long, value_name = "N", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub min_samples: u32,
    /// DBSCAN 距离度量
    #[arg(short = 't', long, value_enum, default_value_t = Metric::Cosine)]
    pub metric: Metric,
}

#[derive(Parser, Debug, Clone)]
pub struct OutputOptions {
    /// 代表图片的输出目录
    #[arg(short, long, value_name = "DIR", default_value = "output")]
    pub output_dir: PathBuf,
    /// 将分组明细以 JSON 形式写入指定文件
    #[arg(short = 'r', long, value_name = "FILE")]
    pub report: Option<PathBuf>,
    /// 绘制向量的 PCA 散点图
    #[arg(short, long)]
    pub plot: bool,
    /// 绘制带缩略图的 PCA 散点图，与 --plot 同时给出时被忽略
    #[arg(short = 'i', long)]
    pub plot_images: bool,
}

/// fastembed 支持的图片向量模型
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum EmbedModel {
    ClipVitB32,
    Resnet50,
    UnicomVitB16,
    UnicomVitB32,
    NomicEmbedVisionV15,
}

impl From<EmbedModel> for ImageEmbeddingModel {
    fn from(model: EmbedModel) -> Self {
        match model {
            EmbedModel::ClipVitB32 => Self::ClipVitB32,
            EmbedModel::Resnet50 => Self::Resnet50,
            EmbedModel::UnicomVitB16 => Self::UnicomVitB16,
            EmbedModel::UnicomVitB32 => Self::UnicomVitB32,
            EmbedModel::NomicEmbedVisionV15 => Self::NomicEmbedVisionV15,
        }
    }
}

fn parse_epsilon(s: &str) -> anyhow::Result<f32> {
    let eps: f32 = s.parse()?;
    if !eps.is_finite() || eps <= 0.0 {
        return Err(anyhow::anyhow!("epsilon 必须为大于 0 的有限值: {}", s));
    }
    Ok(eps)
}
