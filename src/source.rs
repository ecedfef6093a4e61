use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressIterator};
use log::info;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::utils::pb_style;

/// 支持的图片后缀名
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

/// 场景切换检测阈值，对应 ffmpeg select 滤镜的 scene 值
const SCENE_THRESHOLD: f32 = 0.4;

/// 一张已解码的图片及其来源路径
///
/// 像素数据只在清洗阶段使用，向量计算开始后即被丢弃，下游只保留路径
#[derive(Debug)]
pub struct ImageRecord {
    pub image: DynamicImage,
    pub path: PathBuf,
}

/// 从目录加载所有图片，不递归子目录，按文件名排序以保证顺序稳定
pub fn load_from_directory(dir: &Path) -> Result<Vec<ImageRecord>> {
    if !dir.is_dir() {
        bail!("目录 {} 不存在", dir.display());
    }

    let mut entries = vec![];
    let mut total = 0usize;
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        total += 1;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if let Some(ext) = path.extension() {
            if IMAGE_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str()) {
                entries.push(path);
            }
        }
    }
    if total == 0 {
        bail!("目录 {} 为空", dir.display());
    }
    info!("扫描完成，共 {} 张图片", entries.len());

    let pb = ProgressBar::new(entries.len() as u64).with_style(pb_style()).with_message("加载图片");
    let mut images = Vec::with_capacity(entries.len());
    for path in entries.into_iter().progress_with(pb) {
        let image =
            image::open(&path).with_context(|| format!("无法解码图片 {}", path.display()))?;
        images.push(ImageRecord { image, path });
    }
    Ok(images)
}

/// 从视频中按场景切换抽取代表帧，再按目录方式加载
///
/// 返回的临时目录句柄必须存活到代表帧被复制完为止，由调用方持有
pub fn load_from_video(video: &Path) -> Result<(Vec<ImageRecord>, TempDir)> {
    if !video.is_file() {
        bail!("视频文件 {} 不存在", video.display());
    }
    if Command::new("ffmpeg").arg("-version").output().is_err() {
        bail!("未找到 ffmpeg，从视频抽帧需要先安装 ffmpeg");
    }

    let tmp = TempDir::new()?;
    info!("开始检测场景切换: {}", video.display());

    // 第一帧总是保留，其余帧只在场景切换幅度超过阈值时保留
    let filter = format!("select='eq(n,0)+gt(scene,{})'", SCENE_THRESHOLD);
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-i"])
        .arg(video)
        .args(["-vf", &filter, "-fps_mode", "vfr"])
        .arg(tmp.path().join("scene_%04d.jpg"))
        .output()
        .context("执行 ffmpeg 失败")?;
    if !output.status.success() {
        bail!("ffmpeg 抽帧失败: {}", String::from_utf8_lossy(&output.stderr).trim());
    }

    let images = load_from_directory(tmp.path())?;
    info!("共抽取 {} 个场景代表帧", images.len());
    Ok((images, tmp))
}
