use anyhow::Result;
use clap::Parser;
use log::info;

use imdedup::cluster::Dbscan;
use imdedup::config::Opts;
use imdedup::embed::ClipEncoder;
use imdedup::pipeline;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();
    let clusterer = Dbscan::new(
        opts.cluster.epsilon,
        opts.cluster.min_samples as usize,
        opts.cluster.metric,
    );
    let summary = pipeline::run(&opts, || ClipEncoder::load(opts.embed.model), &clusterer)?;
    info!(
        "去重完成：{} 张图片保留 {} 个代表，输出目录 {}",
        summary.kept,
        summary.groups.len(),
        opts.output.output_dir.display()
    );
    Ok(())
}
