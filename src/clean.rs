use image::GrayImage;
use indicatif::{ProgressBar, ProgressIterator};
use log::debug;

use crate::source::ImageRecord;
use crate::utils::pb_style;

/// 低于该灰度值的像素视为黑色
const BLACK_THRESHOLD: u8 = 10;
/// 高于该灰度值的像素视为白色
const WHITE_THRESHOLD: u8 = 180;
/// 黑色或白色像素超过该比例时视为纯色帧
const PIXEL_FRACTION_THRESHOLD: f64 = 0.95;
/// 灰度方差低于该值时视为近似纯色帧
const VARIANCE_THRESHOLD: f64 = 500.0;
/// 拉普拉斯方差低于该值时视为模糊
const BLUR_THRESHOLD: f64 = 100.0;

/// 判断图片是否为技术帧，即纯黑、纯白或近似纯色的无内容帧
pub fn is_technical_frame(gray: &GrayImage) -> bool {
    let total = (gray.width() as u64 * gray.height() as u64) as f64;
    let mut black = 0u64;
    let mut white = 0u64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for pixel in gray.pixels() {
        let v = pixel[0];
        if v < BLACK_THRESHOLD {
            black += 1;
        }
        if v > WHITE_THRESHOLD {
            white += 1;
        }
        let v = v as f64;
        sum += v;
        sum_sq += v * v;
    }
    let mean = sum / total;
    let variance = sum_sq / total - mean * mean;

    let is_black = black as f64 / total > PIXEL_FRACTION_THRESHOLD;
    let is_white = white as f64 / total > PIXEL_FRACTION_THRESHOLD;
    let is_uniform = variance < VARIANCE_THRESHOLD;

    is_black || is_white || is_uniform
}

/// 拉普拉斯方差模糊检测，返回 (方差, 是否模糊)
///
/// 默认流水线不调用该检查，仅作为可独立调用的谓词提供
pub fn blur_score(gray: &GrayImage) -> (f64, bool) {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return (0.0, true);
    }
    let mut values = Vec::with_capacity(((w - 2) * (h - 2)) as usize);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap = 4.0 * gray.get_pixel(x, y)[0] as f64
                - gray.get_pixel(x - 1, y)[0] as f64
                - gray.get_pixel(x + 1, y)[0] as f64
                - gray.get_pixel(x, y - 1)[0] as f64
                - gray.get_pixel(x, y + 1)[0] as f64;
            values.push(lap);
        }
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (variance, variance < BLUR_THRESHOLD)
}

/// 过滤掉技术帧，保留原始顺序
pub fn filter_technical(images: Vec<ImageRecord>) -> Vec<ImageRecord> {
    let pb = ProgressBar::new(images.len() as u64).with_style(pb_style()).with_message("清洗图片");
    images
        .into_iter()
        .progress_with(pb)
        .filter(|record| {
            let technical = is_technical_frame(&record.image.to_luma8());
            if technical {
                debug!("过滤技术帧: {}", record.path.display());
            }
            !technical
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    fn flat(value: u8) -> GrayImage {
        GrayImage::from_pixel(64, 64, Luma([value]))
    }

    /// 类似照片的渐变图，方差远超阈值
    fn gradient() -> GrayImage {
        GrayImage::from_fn(64, 64, |x, y| Luma([(x * 2 + y) as u8]))
    }

    fn checkerboard() -> GrayImage {
        GrayImage::from_fn(64, 64, |x, y| Luma([if (x + y) % 2 == 0 { 0 } else { 255 }]))
    }

    #[test]
    fn test_black_frame_is_technical() {
        assert!(is_technical_frame(&flat(0)));
    }

    #[test]
    fn test_white_frame_is_technical() {
        assert!(is_technical_frame(&flat(255)));
    }

    #[test]
    fn test_low_variance_is_technical_regardless_of_mean() {
        // 中间灰度，既不黑也不白，但方差为 0
        assert!(is_technical_frame(&flat(128)));
    }

    #[test]
    fn test_normal_image_is_not_technical() {
        assert!(!is_technical_frame(&gradient()));
    }

    #[test]
    fn test_blur_score_flat_image() {
        let (variance, blurry) = blur_score(&flat(100));
        assert_eq!(variance, 0.0);
        assert!(blurry);
    }

    #[test]
    fn test_blur_score_sharp_image() {
        let (variance, blurry) = blur_score(&checkerboard());
        assert!(variance > BLUR_THRESHOLD);
        assert!(!blurry);
    }

    #[test]
    fn test_filter_keeps_order() {
        let records = vec![
            ImageRecord { image: gradient().into(), path: "a.png".into() },
            ImageRecord { image: flat(0).into(), path: "b.png".into() },
            ImageRecord { image: checkerboard().into(), path: "c.png".into() },
        ];
        let kept = filter_technical(records);
        let paths: Vec<_> = kept.iter().map(|r| r.path.to_str().unwrap()).collect();
        assert_eq!(paths, ["a.png", "c.png"]);
    }
}
