use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use indicatif::{ProgressBar, ProgressIterator};
use log::info;
use serde::Serialize;

use crate::clean;
use crate::cluster::{Clusterer, NOISE};
use crate::config::Opts;
use crate::embed::ImageEncoder;
use crate::pca;
use crate::plot;
use crate::select;
use crate::source;
use crate::utils::pb_style;

/// 单次去重运行的结果汇总
#[derive(Debug, Serialize)]
pub struct Summary {
    /// 加载的图片总数
    pub loaded: usize,
    /// 清洗后剩余的图片数
    pub kept: usize,
    /// 非噪声簇的数量
    pub clusters: usize,
    /// 噪声点的数量
    pub noise: usize,
    /// 每个逻辑分组的明细
    pub groups: Vec<GroupReport>,
}

#[derive(Debug, Serialize)]
pub struct GroupReport {
    /// 簇标签，噪声点为 -1
    pub label: i32,
    /// 代表图片，即该组按原始顺序的第一张
    pub representative: PathBuf,
    /// 组内所有图片
    pub members: Vec<PathBuf>,
}

/// 执行完整的去重流水线：加载 → 清洗 → 向量化 → 聚类 → 选取代表 → 输出
///
/// 编码器通过工厂延迟构造，保证输入校验的失败都发生在模型加载之前。
/// 整个流程严格串行、单趟执行，任何一步失败都会中止本次运行。
pub fn run<E, F>(opts: &Opts, load_encoder: F, clusterer: &dyn Clusterer) -> Result<Summary>
where
    E: ImageEncoder,
    F: FnOnce() -> Result<E>,
{
    fs::create_dir_all(&opts.output.output_dir)
        .with_context(|| format!("无法创建输出目录 {}", opts.output.output_dir.display()))?;

    // 目录和视频二选一由 clap 保证
    let (images, _frames_guard) = match (&opts.source.directory, &opts.source.video) {
        (Some(dir), None) => (source::load_from_directory(dir)?, None),
        (None, Some(video)) => {
            let (images, tmp) = source::load_from_video(video)?;
            (images, Some(tmp))
        }
        _ => unreachable!("图片来源必须二选一"),
    };
    let loaded = images.len();

    let images = clean::filter_technical(images);
    ensure!(!images.is_empty(), "清洗后没有剩余图片，无法聚类");
    info!("清洗完成，剩余 {} / {} 张图片", images.len(), loaded);

    // 向量化之后不再需要像素数据，只保留路径
    let paths = images.into_iter().map(|record| record.path).collect::<Vec<_>>();

    let encoder = load_encoder()?;
    let embeddings = encoder.embed(&paths)?;
    ensure!(
        embeddings.nrows() == paths.len(),
        "向量数量 {} 与图片数量 {} 不一致",
        embeddings.nrows(),
        paths.len()
    );

    let labels = clusterer.fit_predict(embeddings.view());
    let reps = select::representatives(&labels);
    let summary = build_summary(loaded, &paths, &labels, &reps);
    info!("聚类完成：{} 个簇，{} 个噪声点", summary.clusters, summary.noise);

    // 复制代表图片到输出目录，文件名保持不变，重名时后者覆盖前者
    let pb = ProgressBar::new(reps.len() as u64).with_style(pb_style()).with_message("复制图片");
    for &i in reps.iter().progress_with(pb) {
        let src = &paths[i];
        let name = src.file_name().with_context(|| format!("无效的文件名: {}", src.display()))?;
        let dst = opts.output.output_dir.join(name);
        fs::copy(src, &dst)
            .with_context(|| format!("复制 {} 到 {} 失败", src.display(), dst.display()))?;
    }

    if let Some(report) = &opts.output.report {
        fs::write(report, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("写入分组明细 {} 失败", report.display()))?;
        info!("分组明细已写入 {}", report.display());
    }

    // --plot 优先，两个绘图开关同时给出时只绘制普通散点图
    if opts.output.plot || opts.output.plot_images {
        let projected = pca::project_2d(embeddings.view());
        if opts.output.plot {
            let target = opts.output.output_dir.join("embeddings.png");
            plot::plot_embeddings(&target, projected.view(), &labels)?;
            info!("散点图已写入 {}", target.display());
        } else {
            let target = opts.output.output_dir.join("embeddings_images.png");
            plot::plot_embeddings_with_images(&target, &paths, projected.view(), &labels)?;
            info!("缩略图散点图已写入 {}", target.display());
        }
    }

    Ok(summary)
}

fn build_summary(loaded: usize, paths: &[PathBuf], labels: &[i32], reps: &[usize]) -> Summary {
    let mut groups = Vec::with_capacity(reps.len());
    for &rep in reps {
        let label = labels[rep];
        let members = if label == NOISE {
            vec![paths[rep].clone()]
        } else {
            labels
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l == label)
                .map(|(i, _)| paths[i].clone())
                .collect()
        };
        groups.push(GroupReport { label, representative: paths[rep].clone(), members });
    }
    let noise = labels.iter().filter(|&&l| l == NOISE).count();
    Summary { loaded, kept: paths.len(), clusters: reps.len() - noise, noise, groups }
}
