use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ifc_ids_checker::check::{derive_status, run_check, AggregatedResults, ResultsStore};
use ifc_ids_checker::config::Config;
use ifc_ids_checker::export::{export_bcf, export_csv, export_json, ValidationReport};
use ifc_ids_checker::fix::{
    explain, local_status, manual_fix, request_recommendations, rule_based_recommendations,
    validation_context, LinePrompter,
};
use ifc_ids_checker::ids::SpecificationStore;
use ifc_ids_checker::model::{CheckContext, Element};
use ifc_ids_checker::parser::{parse_ifc_file, LoadedModel};
use ifc_ids_checker::remote::{
    bcf_from_generated, draft_issue, GeneratedIssue, HttpTracker, IssueContext, IssueTracker,
    OpenAiClient, PortalClient, TextGenerator,
};
use ifc_ids_checker::ui::App;

#[derive(Parser, Debug)]
#[command(name = "ifc-ids-checker")]
#[command(about = "IFC IDS Checker - validate IFC elements against IDS specifications")]
#[command(version)]
struct Args {
    /// Path to IFC file
    #[arg(required = true)]
    file: PathBuf,

    /// IDS document to check against
    #[arg(long, value_name = "FILE", conflicts_with = "fetch")]
    ids: Option<PathBuf>,

    /// Fetch the IDS document of IDS_PROJECT_GUID from the BIM portal
    #[arg(long)]
    fetch: bool,

    /// Export the validation report to CSV
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Export the validation report to JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Explain, suggest and interactively fix one element
    #[arg(long, value_name = "GUID")]
    fix: Option<String>,

    /// With --fix, write a BCF issue for the element
    #[arg(long, value_name = "FILE", requires = "fix")]
    bcf: Option<PathBuf>,

    /// With --bcf, also submit the issue to TRACKER_URL
    #[arg(long, requires = "bcf")]
    submit: bool,

    /// Write logs to a file (the TUI logs nothing otherwise)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Args {
    fn headless(&self) -> bool {
        self.csv.is_some() || self.json.is_some() || self.fix.is_some()
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(args.log_file.as_deref(), !args.headless())?;

    let config = Config::from_env()?;
    let runtime = Runtime::new()?;
    let _guard = runtime.enter();

    let model = parse_ifc_file(&args.file)?;
    let store = load_specifications(&args, &config, &runtime);
    let results = ResultsStore::new();

    if !args.headless() {
        let terminal = ratatui::init();
        let result = App::new(model, store, results, config.reconcile_interval).run(terminal);
        ratatui::restore();
        return result;
    }

    let run = run_check(store.specs(), CheckContext::new(&model, &model));
    let latest = results.publish(run.results.clone());

    if args.csv.is_some() || args.json.is_some() {
        let report = ValidationReport::new(&model, &run);
        if let Some(csv_path) = &args.csv {
            export_csv(&report, csv_path)?;
            println!("Exported to CSV: {}", csv_path.display());
        }
        if let Some(json_path) = &args.json {
            export_json(&report, json_path)?;
            println!("Exported to JSON: {}", json_path.display());
        }
    }

    if let Some(guid) = &args.fix {
        run_fix(guid, &args, &config, &model, &store, &latest, &runtime)?;
    }

    Ok(())
}

fn init_logging(log_file: Option<&Path>, tui: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ifc_ids_checker=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("cannot create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        // Log lines would corrupt the terminal UI
        None if tui => {}
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

/// Reads the IDS document from `--ids` or the portal. Any failure leaves the
/// store empty, so every check run reports no specifications.
fn load_specifications(args: &Args, config: &Config, runtime: &Runtime) -> SpecificationStore {
    let document = if let Some(path) = &args.ids {
        match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "Cannot read IDS file");
                None
            }
        }
    } else if args.fetch {
        match &config.project_guid {
            Some(guid) => {
                let portal = PortalClient::new(&config.portal_host, config.portal_token.clone());
                runtime.block_on(portal.fetch_ids(guid))
            }
            None => {
                tracing::warn!("--fetch needs IDS_PROJECT_GUID");
                None
            }
        }
    } else {
        None
    };

    let mut store = SpecificationStore::new();
    match document {
        Some(document) => {
            store.load(&document);
        }
        None => tracing::warn!("No IDS document loaded, nothing to check"),
    }
    store
}

fn run_fix(
    guid: &str,
    args: &Args,
    config: &Config,
    model: &LoadedModel,
    store: &SpecificationStore,
    results: &AggregatedResults,
    runtime: &Runtime,
) -> Result<()> {
    let element = model
        .project_element(guid)
        .ok_or_else(|| eyre!("no element with GlobalId {guid}"))?;
    let element = element.with_status(derive_status(guid, Some(results)));

    let client = config
        .openai_api_key
        .as_deref()
        .map(|key| OpenAiClient::new(&config.openai_base_url, key, &config.openai_model));
    let generator = client.as_ref().map(|c| c as &dyn TextGenerator);

    let requirements = store.requirements_for(&element.element_type);
    let validation = validation_context(&element, Some(results));

    println!("{} {}: {}", element.element_type, element.id, element.status);
    println!(
        "{}",
        runtime.block_on(explain(generator, &element, &requirements, &validation))
    );

    let cancel = CancellationToken::new();
    let recommendation = generator
        .and_then(|g| {
            runtime.block_on(request_recommendations(
                g,
                &element,
                &validation,
                config.retry_policy(),
                &cancel,
            ))
        })
        .unwrap_or_else(|| rule_based_recommendations(&element));

    if !recommendation.analysis.is_empty() {
        println!("\n{}", recommendation.analysis);
    }
    for suggestion in &recommendation.suggestions {
        println!("{}:", suggestion.label);
        for option in &suggestion.options {
            println!("  {} ({})", option.value, option.reason);
        }
    }

    let mut prompter = LinePrompter::new(io::stdin().lock(), io::stdout());
    let fix = manual_fix(&element, &mut prompter);
    if fix.fixed {
        let fixed = Element::new(element.guid.clone(), element.element_type.clone(), fix.props);
        println!("Local status after fix: {}", local_status(&fixed));
    } else {
        println!("No changes made.");
    }

    if let Some(path) = &args.bcf {
        let ctx = IssueContext {
            project_name: &model.project_name,
            author: &config.issue_author,
            requirements: &requirements,
        };
        let issue = generator
            .and_then(|g| runtime.block_on(draft_issue(g, &element, &validation, &ctx)))
            .unwrap_or_else(|| bcf_from_generated(&element, GeneratedIssue::default(), &ctx));

        export_bcf(&issue, path)?;
        println!("Exported BCF issue: {}", path.display());

        if args.submit {
            let tracker = HttpTracker::new(&config.tracker_url);
            let response = runtime.block_on(tracker.submit(&issue))?;
            match (response.success, response.key, response.error) {
                (true, key, _) => println!("Submitted issue {}", key.as_deref().unwrap_or("-")),
                (false, _, error) => {
                    return Err(eyre!(
                        "tracker refused issue: {}",
                        error.as_deref().unwrap_or("unknown error")
                    ));
                }
            }
        }
    }

    Ok(())
}
