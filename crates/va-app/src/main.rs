use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use va_ascii::pipeline::FramePipeline;
use va_core::config::save_params;

pub mod cli;
pub mod convert;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level)
        .init();

    cli.validate()?;

    // 3. Paramètres : défauts → --load-config → flags
    let params = cli.resolve_params()?;
    if let Some(path) = cli.save_config.as_deref() {
        save_params(&params, path)?;
    }

    let mut pipeline = FramePipeline::new(params.clone()).context("Paramètres invalides")?;

    // 4. Source
    let mut source = va_source::open_source(&cli.input, params.fps)?;
    let (w, h) = source.native_size();
    let (cols, rows) = pipeline.grid_size(w, h)?;
    log::info!("Source {w}x{h} → grille {cols}x{rows}");

    // 5. Aperçu
    if cli.preview {
        let block = convert::preview(source.as_mut(), &mut pipeline)?;
        println!("Aperçu de la première frame :");
        println!("{block}");
        return Ok(());
    }

    // 6. Conversion
    let output = cli.output.as_deref().context("--output manquant")?;
    let start = Instant::now();
    let mut sink = va_export::open_sink(cli.format, output, params.fps, cli.font.as_deref())?;
    let stats = convert::run_conversion(source.as_mut(), &pipeline, sink.as_mut())?;
    sink.finish()?;

    log::info!("Sortie {} écrite : {}", cli.format, output.display());
    log::info!(
        "Conversion terminée en {:.2}s ({} frames)",
        start.elapsed().as_secs_f64(),
        stats.frames
    );
    Ok(())
}
