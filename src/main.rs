//! Pixelchain CLI - run image pipelines from the command line.

use anyhow::{bail, Context, Result};
use pixelchain::codec;
use pixelchain::config::Settings;
use pixelchain::prelude::*;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

fn main() -> ExitCode {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ Could not load settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_level))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("pixelchain");

    if args.len() < 2 {
        print_usage(program);
        return ExitCode::FAILURE;
    }

    let result = match args[1].as_str() {
        "list" => {
            list_steps();
            Ok(())
        }
        "info" => match args.get(2) {
            Some(name) => step_info(name),
            None => Err(anyhow::anyhow!("Please specify a step name")),
        },
        "schema" => print_schema(),
        "process" => {
            if args.len() < 5 {
                eprintln!("Usage: {} process <input> <output> <pipeline.json>", program);
                return ExitCode::FAILURE;
            }
            process_image(Path::new(&args[2]), Path::new(&args[3]), Path::new(&args[4]), &settings)
        }
        "batch" => {
            if args.len() < 5 {
                eprintln!("Usage: {} batch <input_dir> <output_dir> <pipeline.json>", program);
                return ExitCode::FAILURE;
            }
            process_batch(Path::new(&args[2]), Path::new(&args[3]), Path::new(&args[4]), &settings)
        }
        "help" | "--help" | "-h" => {
            print_usage(program);
            Ok(())
        }
        "--version" | "-V" => {
            println!("{} {}", pixelchain::NAME, pixelchain::VERSION);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(program);
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage(program: &str) {
    println!("🎨 Pixelchain - image pipelines v{}", pixelchain::VERSION);
    println!();
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  list                                   List all available steps");
    println!("  info <step>                            Show detailed info about a step");
    println!("  schema                                 Print every step's parameters as JSON");
    println!("  process <in> <out> <pipeline.json>     Run a pipeline on one image");
    println!("  batch <in_dir> <out_dir> <pipeline.json>  Run a pipeline on every image in a directory");
    println!("  help                                   Show this help message");
    println!();
    println!("Pipeline files are JSON arrays such as:");
    println!(r#"  [{{"step": "brightness", "params": {{"factor": 1.2}}}}, {{"step": "rotate", "params": {{"degrees": 90}}}}]"#);
    println!();
    println!("Settings are read from {} or ${}.", pixelchain::config::DEFAULT_CONFIG_FILE, pixelchain::config::CONFIG_ENV);
}

fn list_steps() {
    let registry = StepRegistry::global();

    println!("Available steps ({} total):", registry.len());
    println!();

    for category in [Category::Color, Category::Blur, Category::Sharpen, Category::Transform] {
        let names = registry.steps_by_category(category);
        if names.is_empty() {
            continue;
        }
        println!("  📁 {}", category.display_name());
        for name in names {
            if let Some(metadata) = registry.get_metadata(name) {
                println!("      • {} - {}", name, metadata.description);
            }
        }
        println!();
    }
}

fn step_info(name: &str) -> Result<()> {
    let registry = StepRegistry::global();
    let Some(metadata) = registry.get_metadata(name) else {
        bail!("Step not found: {} (use 'list' to see available steps)", name);
    };

    println!("Step: {}", metadata.display_name);
    println!("Name: {}", metadata.name);
    println!("Category: {}", metadata.category.display_name());
    println!();
    println!("Description:");
    println!("  {}", metadata.description);
    println!();

    if !metadata.parameters.is_empty() {
        println!("Parameters:");
        for param in &metadata.parameters {
            println!(
                "  • {} [{}] = {}",
                param.name,
                param.param_type.display_name(),
                param.default_value
            );
            if !param.description.is_empty() {
                println!("    {}", param.description);
            }
            for constraint in &param.constraints {
                println!("    {}", constraint.description());
            }
        }
    }
    Ok(())
}

fn print_schema() -> Result<()> {
    let json = serde_json::to_string_pretty(&pixelchain::list_steps())?;
    println!("{}", json);
    Ok(())
}

fn load_pipeline(path: &Path) -> Result<PipelineDefinition> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading pipeline {}", path.display()))?;
    PipelineDefinition::from_json(&text).with_context(|| format!("parsing pipeline {}", path.display()))
}

fn report_problems(report: &ValidationReport) {
    eprintln!("❌ {}", report.summary());
    for line in report.detailed_errors() {
        eprintln!("   {}", line);
    }
}

fn process_image(input: &Path, output: &Path, pipeline_path: &Path, settings: &Settings) -> Result<()> {
    let definition = load_pipeline(pipeline_path)?;
    let image = codec::load_image(input).with_context(|| format!("loading {}", input.display()))?;

    println!("🔍 Validating pipeline ({} steps)...", definition.len());
    let runner = PipelineRunner::global();
    let report = runner.check(&definition, Some(image.dimensions()));
    if !report.can_execute() {
        report_problems(&report);
        bail!("pipeline is not valid for {}", input.display());
    }
    let pipeline = runner.validate(&definition, Some(image.dimensions()))?;

    println!("⚙️  Processing {} -> {}", input.display(), output.display());
    let runner = runner.with_options(RunOptions::new().with_progress(|update| match update {
        ProgressUpdate::StepStarted { index, step, total } => {
            println!("   • [{}/{}] {}", index + 1, total, step);
        }
        ProgressUpdate::Completed { total_duration_ms, steps_executed } => {
            println!("✅ Complete in {}ms ({} steps)", total_duration_ms, steps_executed);
        }
        _ => {}
    }));
    let result = runner.execute(image, &pipeline)?;

    codec::save_image(&result.image, output, settings.jpeg_quality)
        .with_context(|| format!("saving {}", output.display()))?;
    println!("🎉 Image saved to: {}", output.display());
    Ok(())
}

fn collect_images(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let walker = WalkDir::new(dir).follow_links(true);
    let walker = if recursive { walker } else { walker.max_depth(1) };
    walker
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| image::ImageFormat::from_path(path).is_ok())
        .collect()
}

fn process_batch(input_dir: &Path, output_dir: &Path, pipeline_path: &Path, settings: &Settings) -> Result<()> {
    if !input_dir.is_dir() {
        bail!("{} is not a directory", input_dir.display());
    }
    let definition = load_pipeline(pipeline_path)?;

    let runner = PipelineRunner::global();
    let report = runner.check(&definition, None);
    if !report.can_execute() {
        report_problems(&report);
        bail!("pipeline is not valid");
    }

    let inputs = collect_images(input_dir, settings.recursive);
    if inputs.is_empty() {
        println!("⚠️  No images found in {}", input_dir.display());
        return Ok(());
    }
    println!("📂 Processing {} images from {}", inputs.len(), input_dir.display());

    let results: Vec<(PathBuf, Result<()>)> = inputs
        .par_iter()
        .map(|input| {
            let relative = input.strip_prefix(input_dir).unwrap_or(input);
            let output = output_dir.join(relative);
            let result = (|| -> Result<()> {
                let image = codec::load_image(input)?;
                let out = runner.run(image, &definition)?;
                codec::save_image(&out.image, &output, settings.jpeg_quality)?;
                Ok(())
            })();
            (input.clone(), result)
        })
        .collect();

    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(()) => println!("   ✓ {}", path.display()),
            Err(e) => {
                failed += 1;
                eprintln!("   ✗ {}: {:#}", path.display(), e);
            }
        }
    }

    println!();
    println!("✅ {} succeeded, {} failed", results.len() - failed, failed);
    if failed > 0 {
        bail!("{} of {} images failed", failed, results.len());
    }
    Ok(())
}
