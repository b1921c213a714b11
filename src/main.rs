use anyhow::{bail, Context};
use clap::Parser;
use img_compressor::cli::{Args, Commands};
use img_compressor::constants::PROGRESS_TEMPLATE;
use img_compressor::{
    collect_input_files, delivery, export_batch, format_file_size, logger, report, server, Batch,
    CandidateFile, CompressionProfile, CompressionWorkflow, Compressor, HttpCompressor,
    ImageCompressor, LogNotifier, RunOutcome, ServerConfig, ServerOverrides,
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init(args.quiet, args.verbose);

    match args.command {
        Commands::Serve { config, host, port, temp_dir, profile } => {
            let overrides = ServerOverrides { host, port, temp_dir, profile };
            let config = ServerConfig::load(config.as_deref(), overrides)?;
            let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
            runtime.block_on(server::serve(config))?;
        }
        Commands::Compress { inputs, output, profile, recursive, parallel, threads, server } => {
            setup_thread_pool(threads);
            let paths = collect_input_files(&inputs, recursive)?;
            match server {
                Some(url) => {
                    report!("🌐 Compressing through {}", url);
                    compress_files(&paths, &output, profile, parallel, HttpCompressor::new(&url)?)?;
                }
                None => {
                    compress_files(&paths, &output, profile, parallel, ImageCompressor::for_profile(profile))?;
                }
            }
        }
    }

    Ok(())
}

fn setup_thread_pool(threads: Option<usize>) {
    if let Some(num_threads) = threads {
        ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to set thread pool size: {}", e);
            });
    }
}

fn compress_files<C: Compressor>(
    paths: &[PathBuf],
    output: &Path,
    profile: CompressionProfile,
    parallel: bool,
    compressor: C,
) -> anyhow::Result<()> {
    let notifier = LogNotifier;
    let start_time = Instant::now();

    let candidates = paths
        .iter()
        .map(|path| CandidateFile::from_path(path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut batch = Batch::new();
    let upload = batch.add_files(candidates, profile, &notifier);
    report!(
        "📁 {} images queued ({} rejected, {} without a type)",
        upload.accepted,
        upload.rejected.len(),
        upload.dropped
    );

    if parallel {
        report!(
            "🚀 Using {} threads ({} CPU cores available)",
            rayon::current_num_threads(),
            num_cpus::get()
        );
    }
    let workflow = CompressionWorkflow::new(compressor).parallel(parallel);
    let progress = if logger::is_quiet() {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template(PROGRESS_TEMPLATE) {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };
    progress.set_message(format!("Compressing {} images", batch.len()));
    let outcome = workflow.run(&mut batch, &notifier);
    progress.finish_and_clear();

    match outcome {
        RunOutcome::NothingToCompress => bail!("No valid images to compress"),
        RunOutcome::Failed { index, error } => {
            // Earlier results stay in the batch; show them even though nothing is saved.
            report_results(&batch, false);
            let name = batch.get(index).map(|item| item.name.clone()).unwrap_or_default();
            return Err(anyhow::Error::new(error)
                .context(format!("Failed to compress {} (image {})", name, index + 1)));
        }
        RunOutcome::Completed { .. } => {}
    }

    let written = export_batch(&batch, output)?;
    let (total_original, total_compressed) = report_results(&batch, true);

    report!(
        "🎉 {} images saved to {:?} in {:.2?}",
        written.len(),
        output,
        start_time.elapsed()
    );
    report!(
        "📊 Total: {} -> {} ({}%)",
        format_file_size(total_original),
        format_file_size(total_compressed),
        img_compressor::size_reduction_percent(total_original, total_compressed)
    );

    Ok(())
}

/// Prints one line per compressed item and returns the byte totals.
fn report_results(batch: &Batch, saved: bool) -> (u64, u64) {
    let mut total_original = 0u64;
    let mut total_compressed = 0u64;

    for (index, item) in batch.items().iter().enumerate() {
        if let Some(result) = &item.result {
            total_original += item.original_size;
            total_compressed += result.compressed_size;
            let target = if saved {
                delivery::download_name(index)
            } else {
                "not saved".to_string()
            };
            report!(
                "✅ {} -> {}: {} -> {} ({}%)",
                item.name,
                target,
                format_file_size(item.original_size),
                format_file_size(result.compressed_size),
                result.size_reduction
            );
        }
    }

    (total_original, total_compressed)
}
