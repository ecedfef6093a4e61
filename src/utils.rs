use indicatif::ProgressStyle;

/// 进度条的统一样式
pub fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>6}/{len:6} [{elapsed_precise}] {msg}")
        .expect("failed to build progress style")
        .progress_chars("=>-")
}
