use std::iter;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::imageops::FilterType;
use ndarray::ArrayView2;
use plotters::backend::DrawingBackend;
use plotters::element::BitMapElement;
use plotters::prelude::*;

use crate::cluster::NOISE;

/// 缩略图边长，单位像素
const THUMBNAIL_SIZE: u32 = 50;
/// 画布尺寸
const PLOT_SIZE: (u32, u32) = (1200, 800);

fn style_for(label: i32) -> ShapeStyle {
    // 噪声点统一为黑色，簇按调色板取色
    if label == NOISE { BLACK.filled() } else { Palette99::pick(label as usize).filled() }
}

/// 根据点集计算带边距的坐标范围
fn padded_ranges(points: ArrayView2<f32>) -> (Range<f64>, Range<f64>) {
    let mut min = [f64::MAX; 2];
    let mut max = [f64::MIN; 2];
    for row in points.rows() {
        for k in 0..2 {
            let v = row[k] as f64;
            min[k] = min[k].min(v);
            max[k] = max[k].max(v);
        }
    }
    let pad = |lo: f64, hi: f64| {
        let span = if hi > lo { hi - lo } else { 1.0 };
        lo - span * 0.1..hi + span * 0.1
    };
    (pad(min[0], max[0]), pad(min[1], max[1]))
}

/// 将 2 维投影按簇标签着色后绘制成散点图
pub fn plot_embeddings(output: &Path, points: ArrayView2<f32>, labels: &[i32]) -> Result<()> {
    let (x_range, y_range) = padded_ranges(points);
    let root = BitMapBackend::new(output, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root).margin(16).build_cartesian_2d(x_range, y_range)?;
    chart.draw_series(points.rows().into_iter().zip(labels).map(|(p, &label)| {
        Circle::new((p[0] as f64, p[1] as f64), 5, style_for(label))
    }))?;

    root.present()?;
    Ok(())
}

/// 在散点的位置上叠加对应图片的缩略图
///
/// 缩略图从来源路径重新解码，不依赖清洗阶段的像素数据
pub fn plot_embeddings_with_images(
    output: &Path,
    image_paths: &[PathBuf],
    points: ArrayView2<f32>,
    labels: &[i32],
) -> Result<()> {
    let (x_range, y_range) = padded_ranges(points);
    let root = BitMapBackend::new(output, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root).margin(16).build_cartesian_2d(x_range, y_range)?;
    chart.draw_series(points.rows().into_iter().zip(labels).map(|(p, &label)| {
        Circle::new((p[0] as f64, p[1] as f64), 8, style_for(label))
    }))?;

    for (path, p) in image_paths.iter().zip(points.rows()) {
        let thumb = image::open(path)
            .with_context(|| format!("无法解码图片 {}", path.display()))?
            .resize_exact(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Nearest)
            .to_rgb8();

        let mut elem: BitMapElement<(f64, f64)> =
            BitMapElement::new((p[0] as f64, p[1] as f64), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));
        {
            let mut backend = elem.as_bitmap_backend();
            for (x, y, pixel) in thumb.enumerate_pixels() {
                backend
                    .draw_pixel(
                        (x as i32, y as i32),
                        RGBColor(pixel[0], pixel[1], pixel[2]).to_backend_color(),
                    )
                    .map_err(|e| anyhow::anyhow!("绘制缩略图失败: {}", e))?;
            }
        }
        chart.draw_series(iter::once(elem))?;
    }

    root.present()?;
    Ok(())
}
