use std::cell::Cell;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use ndarray::Array2;

use imdedup::cluster::{Dbscan, Metric};
use imdedup::config::Opts;
use imdedup::embed::ImageEncoder;
use imdedup::pipeline;

/// 测试用编码器：把图片缩小到 8x8 后直接以像素值作为向量
///
/// 内容相近的图片得到相近的向量，足以驱动完整的流水线
struct StubEncoder;

impl ImageEncoder for StubEncoder {
    fn embed(&self, paths: &[PathBuf]) -> Result<Array2<f32>> {
        let mut flat = vec![];
        for path in paths {
            let small = image::open(path)?.resize_exact(8, 8, FilterType::Triangle).to_rgb8();
            flat.extend(small.pixels().flat_map(|p| p.0).map(f32::from));
        }
        Ok(Array2::from_shape_vec((paths.len(), 192), flat)?)
    }
}

/// 灰度渐变图，offset 制造细微差异来模拟近似重复
fn gradient(offset: u8) -> RgbImage {
    RgbImage::from_fn(64, 64, |x, y| {
        let v = (x * 2 + y) as u8 + offset;
        Rgb([v, v, v])
    })
}

fn stripes() -> RgbImage {
    RgbImage::from_fn(64, 64, |x, _| {
        let v = if (x / 8) % 2 == 0 { 30 } else { 200 };
        Rgb([v, v, v])
    })
}

fn reverse_gradient() -> RgbImage {
    RgbImage::from_fn(64, 64, |x, y| {
        let v = 200u8.saturating_sub((x * 2 + y) as u8);
        Rgb([v, v, v])
    })
}

fn dbscan_from(opts: &Opts) -> Dbscan {
    Dbscan::new(opts.cluster.epsilon, opts.cluster.min_samples as usize, opts.cluster.metric)
}

#[test]
fn test_end_to_end_dedup() -> Result<()> {
    let input = tempfile::tempdir()?;
    let work = tempfile::tempdir()?;
    let out_dir = work.path().join("output");
    let report = work.path().join("clusters.json");

    // 3 张近似重复 + 2 张内容不同的图片
    gradient(0).save(input.path().join("dup1.png"))?;
    gradient(2).save(input.path().join("dup2.png"))?;
    gradient(4).save(input.path().join("dup3.png"))?;
    stripes().save(input.path().join("uniq1.png"))?;
    reverse_gradient().save(input.path().join("uniq2.png"))?;

    let opts = Opts::try_parse_from([
        "imdedup",
        "-d",
        input.path().to_str().unwrap(),
        "-o",
        out_dir.to_str().unwrap(),
        "-r",
        report.to_str().unwrap(),
        "-t",
        "euclidean",
        "-e",
        "60",
    ])?;
    let summary = pipeline::run(&opts, || Ok(StubEncoder), &dbscan_from(&opts))?;

    assert_eq!(summary.loaded, 5);
    assert_eq!(summary.kept, 5);
    assert_eq!(summary.clusters, 1);
    assert_eq!(summary.noise, 2);

    // 输出目录应恰好包含 3 个文件：重复组的第一张 + 两张单独的
    let mut files: Vec<_> = fs::read_dir(&out_dir)?
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    files.sort();
    assert_eq!(files, ["dup1.png", "uniq1.png", "uniq2.png"]);

    // 复制出来的文件必须与原文件逐字节一致
    assert_eq!(fs::read(out_dir.join("dup1.png"))?, fs::read(input.path().join("dup1.png"))?);

    // 分组明细包含 3 个组，重复组有 3 个成员
    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report)?)?;
    let groups = report["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0]["members"].as_array().unwrap().len(), 3);
    Ok(())
}

#[test]
fn test_all_filtered_fails_before_embedding() -> Result<()> {
    let input = tempfile::tempdir()?;
    let work = tempfile::tempdir()?;
    RgbImage::from_pixel(64, 64, Rgb([128, 128, 128])).save(input.path().join("flat.png"))?;

    let opts = Opts::try_parse_from([
        "imdedup",
        "-d",
        input.path().to_str().unwrap(),
        "-o",
        work.path().join("output").to_str().unwrap(),
    ])?;

    let encoder_loaded = Cell::new(false);
    let clusterer = Dbscan::new(0.2, 2, Metric::Cosine);
    let err = pipeline::run(
        &opts,
        || {
            encoder_loaded.set(true);
            Ok(StubEncoder)
        },
        &clusterer,
    )
    .unwrap_err();

    assert!(err.to_string().contains("清洗后没有剩余图片"));
    // 数据不足必须在模型加载之前发现
    assert!(!encoder_loaded.get());
    Ok(())
}

#[test]
fn test_plot_flag_takes_precedence() -> Result<()> {
    let input = tempfile::tempdir()?;
    let work = tempfile::tempdir()?;
    let out_dir = work.path().join("output");

    gradient(0).save(input.path().join("a.png"))?;
    stripes().save(input.path().join("b.png"))?;
    reverse_gradient().save(input.path().join("c.png"))?;

    // 两个绘图开关同时给出时，只生成普通散点图
    let opts = Opts::try_parse_from([
        "imdedup",
        "-d",
        input.path().to_str().unwrap(),
        "-o",
        out_dir.to_str().unwrap(),
        "-t",
        "euclidean",
        "-e",
        "60",
        "-p",
        "-i",
    ])?;
    pipeline::run(&opts, || Ok(StubEncoder), &dbscan_from(&opts))?;

    assert!(out_dir.join("embeddings.png").exists());
    assert!(!out_dir.join("embeddings_images.png").exists());
    Ok(())
}

#[test]
fn test_plot_images_when_plot_absent() -> Result<()> {
    let input = tempfile::tempdir()?;
    let work = tempfile::tempdir()?;
    let out_dir = work.path().join("output");

    gradient(0).save(input.path().join("a.png"))?;
    stripes().save(input.path().join("b.png"))?;

    let opts = Opts::try_parse_from([
        "imdedup",
        "-d",
        input.path().to_str().unwrap(),
        "-o",
        out_dir.to_str().unwrap(),
        "-t",
        "euclidean",
        "-e",
        "60",
        "-i",
    ])?;
    pipeline::run(&opts, || Ok(StubEncoder), &dbscan_from(&opts))?;

    assert!(out_dir.join("embeddings_images.png").exists());
    assert!(!out_dir.join("embeddings.png").exists());
    Ok(())
}
