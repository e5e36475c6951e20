use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use geoanalyzer::models::{Analysis, AnalysisReport, DashboardStats};
use geoanalyzer::{Config, Error, GeoPipeline, Storage};

#[derive(Parser, Debug)]
#[command(name = "geoanalyzer")]
#[command(version = "0.1.0")]
#[command(about = "Score how well a web page surfaces in AI-driven search and answer engines")]
struct Args {
    /// Database path for storing results (overrides DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a page, analyze it and store the report
    Analyze {
        /// Page URL; https:// is assumed when no scheme is given
        url: String,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show a stored report
    Report {
        id: i64,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// List stored analyses, newest first
    History {
        /// Maximum number of analyses to list
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Totals, average score and the most recent analyses
    Dashboard {
        /// Number of recent analyses to show
        #[arg(long, default_value = "5")]
        recent: usize,
    },
    /// Delete a stored analysis and everything attached to it
    Delete { id: i64 },
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Text,
    Markdown,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("geoanalyzer=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(database) = args.database {
        config.database_path = database;
    }

    let storage = Storage::new(&config.database_path)?;

    match args.command {
        Command::Analyze { url, output } => {
            let pipeline = GeoPipeline::from_config(&config, storage)?;

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
            );
            spinner.set_message(format!("Analyzing {} with {}", url, pipeline.provider_name()));
            spinner.enable_steady_tick(Duration::from_millis(100));

            let outcome = pipeline.run_analysis(&url).await;
            spinner.finish_and_clear();

            let analysis_id = match outcome {
                Ok(id) => id,
                Err(e) if e.is_fetch_failure() => {
                    anyhow::bail!("Could not analyze {}: {}. Nothing was saved.", url, e)
                }
                Err(e) => return Err(e.into()),
            };

            let report = pipeline
                .storage()
                .get_analysis(analysis_id)?
                .ok_or(Error::AnalysisNotFound(analysis_id))?;
            write_report(&report, &output)?;
        }
        Command::Report { id, output } => {
            let report = storage
                .get_analysis(id)?
                .ok_or(Error::AnalysisNotFound(id))?;
            write_report(&report, &output)?;
        }
        Command::History { limit } => {
            let analyses = match limit {
                Some(limit) => storage.list_recent_analyses(limit)?,
                None => storage.list_analyses()?,
            };
            if analyses.is_empty() {
                println!("No analyses yet.");
            }
            for analysis in &analyses {
                println!("{}", format_row(analysis));
            }
        }
        Command::Dashboard { recent } => {
            let stats = storage.dashboard_stats(recent)?;
            print!("{}", format_dashboard(&stats));
        }
        Command::Delete { id } => {
            if storage.delete_analysis(id)? {
                println!("Deleted analysis #{}", id);
            } else {
                return Err(Error::AnalysisNotFound(id).into());
            }
        }
    }

    Ok(())
}

fn write_report(report: &AnalysisReport, args: &OutputArgs) -> anyhow::Result<()> {
    let output = match args.format {
        Format::Json => serde_json::to_string_pretty(report)?,
        Format::Markdown => format_markdown(report),
        Format::Text => format_text(report),
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output)?;
        tracing::info!("Output written to: {}", path);
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_row(analysis: &Analysis) -> String {
    format!(
        "#{:<5} {:>3}/100  {}  {}  ({})",
        analysis.id,
        analysis.geo_score,
        analysis.created_at.format("%Y-%m-%d %H:%M"),
        analysis.url,
        analysis.title
    )
}

fn format_dashboard(stats: &DashboardStats) -> String {
    let mut output = String::new();

    output.push_str("\n=== GEO Dashboard ===\n\n");
    output.push_str(&format!("Total scans: {}\n", stats.total_scans));
    output.push_str(&format!("Average GEO score: {}\n", stats.average_score as u64));
    output.push_str(&format!(
        "Stored simulations: {}\nStored recommendations: {}\n",
        stats.totals.simulations, stats.totals.recommendations
    ));

    if !stats.recent.is_empty() {
        output.push_str("\nRecent analyses:\n");
        for analysis in &stats.recent {
            output.push_str(&format!("  {}\n", format_row(analysis)));
        }
    }

    output
}

fn format_text(report: &AnalysisReport) -> String {
    let analysis = &report.analysis;
    let mut output = String::new();

    output.push_str(&format!("\n=== GEO Report #{}: {} ===\n\n", analysis.id, analysis.title));
    output.push_str(&format!("URL: {}\n", analysis.url));
    output.push_str(&format!("GEO Score: {}/100\n", analysis.geo_score));

    output.push_str("\nGap Analysis:\n");
    output.push_str(&format!("  {}\n", analysis.gap_analysis));

    if !report.simulations.is_empty() {
        output.push_str("\nSearch Engine Simulation:\n");
        for sim in &report.simulations {
            output.push_str(&format!(
                "  [{}] visibility {}/100\n    Q: {}\n    A: {}\n",
                sim.engine, sim.visibility_score, sim.query, sim.simulation_text
            ));
        }
    }

    if !report.recommendations.is_empty() {
        output.push_str("\nRecommendations:\n");
        for (i, rec) in report.recommendations.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, rec.text));
        }
    }

    output.push_str(&format!(
        "\nAnalyzed on: {}\n",
        analysis.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

fn format_markdown(report: &AnalysisReport) -> String {
    let analysis = &report.analysis;
    let mut output = String::new();

    output.push_str(&format!("# GEO Report: {}\n\n", analysis.title));
    output.push_str("| Metric | Value |\n|--------|-------|\n");
    output.push_str(&format!("| URL | {} |\n", analysis.url));
    output.push_str(&format!("| GEO Score | {}/100 |\n", analysis.geo_score));

    output.push_str("\n## Gap Analysis\n\n");
    output.push_str(&analysis.gap_analysis);
    output.push('\n');

    if !report.simulations.is_empty() {
        output.push_str("\n## Search Engine Simulation\n\n");
        output.push_str("| Engine | Query | Visibility |\n");
        output.push_str("|--------|-------|------------|\n");
        for sim in &report.simulations {
            output.push_str(&format!(
                "| {} | {} | {}/100 |\n",
                sim.engine, sim.query, sim.visibility_score
            ));
        }
        for sim in &report.simulations {
            output.push_str(&format!("\n**{}**\n\n> {}\n", sim.engine, sim.simulation_text));
        }
    }

    if !report.recommendations.is_empty() {
        output.push_str("\n## Recommendations\n\n");
        for rec in &report.recommendations {
            output.push_str(&format!("- {}\n", rec.text));
        }
    }

    output.push_str(&format!(
        "\n---\n*Analyzed on {}*\n",
        analysis.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}
