use std::fs;
use std::io::{self, Read};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use worklogbot::cli_args::{Cli, Command};
use worklogbot::config::Config;
use worklogbot::llm::catalog::ModelCatalog;
use worklogbot::llm::prompt_builder::build_prompt;
use worklogbot::logging::init_logger;
use worklogbot::template::DEFAULT_TEMPLATE;
use worklogbot::{
    ChangeSet, LlmProvider, Pipeline, PipelineError, PrTemplate, Style, StructuredResult,
    build_provider,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let cfg = Config::from_sources(&cli)?;
    log::debug!(
        "Using {} with model {}",
        cfg.provider.kind.display_name(),
        cfg.provider.model
    );

    if let Command::Models = cli.command {
        return run_models(&cfg);
    }

    let change = read_change(&cli)?;
    if change.is_empty() {
        println!("No changes found.");
        return Ok(());
    }

    match &cli.command {
        Command::Prompt { style } => {
            let style = style.unwrap_or(cfg.default_style);
            println!("{}", build_prompt(&change, style));
            Ok(())
        }
        Command::Worklog { style } => {
            let style = style.unwrap_or(cfg.default_style);
            if !style.is_worklog() {
                anyhow::bail!("worklog needs the technical or business style, got {style}");
            }
            let provider = build_provider(&cfg.provider)?;
            run_summary(provider.as_ref(), &change, style)
        }
        Command::Commit => {
            let provider = build_provider(&cfg.provider)?;
            run_summary(provider.as_ref(), &change, Style::CommitMessage)
        }
        Command::Pr { template, commits } => {
            let template = match template {
                Some(path) => {
                    let raw = fs::read_to_string(path).with_context(|| {
                        format!("failed to read PR template {}", path.display())
                    })?;
                    PrTemplate::new(path.display().to_string(), raw)
                }
                None => PrTemplate::new("built-in", DEFAULT_TEMPLATE),
            };
            let provider = build_provider(&cfg.provider)?;
            run_pr(provider.as_ref(), &change, &template, commits)
        }
        Command::Models => Ok(()),
    }
}

/// The diff comes from `--diff FILE` or stdin.
fn read_change(cli: &Cli) -> Result<ChangeSet> {
    let text = match &cli.diff {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read diff {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read diff from stdin")?;
            buf
        }
    };
    Ok(ChangeSet::new(text))
}

fn run_summary(provider: &dyn LlmProvider, change: &ChangeSet, style: Style) -> Result<()> {
    let pipeline = Pipeline::new(provider);
    let spinner = spinner(&format!("Asking {}...", provider.kind().display_name()));
    let outcome = pipeline.summarize(change, style);
    spinner.finish_and_clear();

    match outcome {
        Ok(result) => {
            if let StructuredResult::Worklog(worklog) = &result {
                if worklog.stand_up_script.is_empty() {
                    log::warn!("Model reply had no stand-up script section");
                }
            }
            for (title, body) in result.sections() {
                preview(title, &body);
            }
            Ok(())
        }
        Err(PipelineError::NoChanges) => {
            println!("No changes found.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn run_pr(
    provider: &dyn LlmProvider,
    change: &ChangeSet,
    template: &PrTemplate,
    commits: &[String],
) -> Result<()> {
    let pipeline = Pipeline::new(provider);
    let spinner = spinner(&format!("Asking {}...", provider.kind().display_name()));
    let outcome = pipeline.describe_pull_request(change, template, commits);
    spinner.finish_and_clear();

    match outcome {
        Ok(filled) => {
            log::info!("Filled PR template {}", template.identity);
            for (title, body) in StructuredResult::Template(filled).sections() {
                preview(title, &body);
            }
            Ok(())
        }
        Err(PipelineError::NoChanges) => {
            println!("No changes found.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn run_models(cfg: &Config) -> Result<()> {
    let provider = build_provider(&cfg.provider)?;
    let mut catalog = ModelCatalog::new();
    let models = catalog.models(&cfg.provider, provider.as_ref())?;

    if models.is_empty() {
        println!("No models reported by {}.", cfg.provider.kind.display_name());
    }
    for model in models {
        if *model == cfg.provider.model {
            println!("{} {}", model, "(selected)".green());
        } else {
            println!("{model}");
        }
    }
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn preview(title: &str, body: &str) {
    let header = format!("----- {title} Preview -----");
    println!();
    println!("{}", header.bold());
    println!("{body}");
    println!("{}", "-".repeat(header.len()));
}
