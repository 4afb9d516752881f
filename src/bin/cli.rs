//! Command-line driver for the upload orchestrator.
//!
//! Queues the given image files, submits them through the sequential or
//! remote-batch strategy, and writes the optimized results (individually or
//! as one zip archive) into the output directory.

use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use optipress::client::{
    RemoteBatchUploader, SequentialUploader, SharedParams, UploadOrchestrator, UploadStrategy,
};
use optipress::config::Config;
use optipress::domains::optimization::{
    OutputFormat, QUALITY_MAX, QUALITY_MIN, SCALE_MAX, SCALE_MIN,
};

struct CliArgs {
    remote: bool,
    base_url: Option<String>,
    params: SharedParams,
    out_dir: PathBuf,
    zip: bool,
    files: Vec<PathBuf>,
}

fn print_usage() {
    eprintln!("Usage: optipress [OPTIONS] <files...>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --remote            submit one batched request to the remote optimize service");
    eprintln!("  --base-url <URL>    endpoint base URL (default from OPTIPRESS_REMOTE_BASE_URL)");
    eprintln!("  --format <F>        webp | png | jpg (default webp)");
    eprintln!("  --quality <N>       60-100 (default 80)");
    eprintln!("  --scale <N>         10-100 (default 100)");
    eprintln!("  --out <DIR>         output directory (default .)");
    eprintln!("  --zip               bundle all results into optimized-images.zip");
}

fn parse_args(args: Vec<String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs {
        remote: false,
        base_url: None,
        params: SharedParams::default(),
        out_dir: PathBuf::from("."),
        zip: false,
        files: Vec::new(),
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--remote" => parsed.remote = true,
            "--zip" => parsed.zip = true,
            "--base-url" => {
                parsed.base_url = Some(iter.next().ok_or("--base-url requires a value")?);
            }
            "--format" => {
                let value = iter.next().ok_or("--format requires a value")?;
                parsed.params.format =
                    OutputFormat::from_str(&value).map_err(|e| e.to_string())?;
            }
            "--quality" => {
                let value = iter.next().ok_or("--quality requires a value")?;
                let quality: u8 = value
                    .parse()
                    .map_err(|_| format!("invalid quality: {}", value))?;
                parsed.params.quality = quality.clamp(QUALITY_MIN, QUALITY_MAX);
            }
            "--scale" => {
                let value = iter.next().ok_or("--scale requires a value")?;
                let scale: u8 = value
                    .parse()
                    .map_err(|_| format!("invalid scale: {}", value))?;
                parsed.params.scale = scale.clamp(SCALE_MIN, SCALE_MAX);
            }
            "--out" => {
                parsed.out_dir = PathBuf::from(iter.next().ok_or("--out requires a value")?);
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option: {}", other));
            }
            file => parsed.files.push(PathBuf::from(file)),
        }
    }

    if parsed.files.is_empty() {
        return Err("no input files given".to_string());
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let args = match parse_args(std::env::args().skip(1).collect()) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {}", message);
            print_usage();
            process::exit(1);
        }
    };

    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| config.remote_base_url.clone());

    let mut orchestrator = UploadOrchestrator::new(config.request_timeout);
    orchestrator.set_params(args.params);

    for path in &args.files {
        if let Err(e) = orchestrator.add_file(path).await {
            log::error!("Skipping {}: {}", path.display(), e);
        }
    }
    if orchestrator.queue_len() == 0 {
        eprintln!("error: no usable input files");
        process::exit(1);
    }

    let strategy: Box<dyn UploadStrategy> = if args.remote {
        Box::new(RemoteBatchUploader {
            base_url: base_url.clone(),
        })
    } else {
        Box::new(SequentialUploader {
            base_url: base_url.clone(),
        })
    };

    let report = orchestrator.upload_all(strategy.as_ref()).await?;
    println!(
        "Optimized {}/{} files in {}ms",
        report.received, report.submitted, report.duration_ms
    );

    tokio::fs::create_dir_all(&args.out_dir).await?;
    let extension = args.params.format.extension();
    if args.zip {
        let path = args.out_dir.join("optimized-images.zip");
        orchestrator.download_all_zip(&path).await?;
        println!("Wrote {}", path.display());
    } else {
        for i in 0..orchestrator.results_len() {
            let path = args
                .out_dir
                .join(format!("optimized-image{}.{}", i, extension));
            orchestrator.download_one(i, &path).await?;
            println!("Wrote {}", path.display());
        }
    }

    orchestrator.clear_queue();
    Ok(())
}
