use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

use preeclampsia_insights::config::{self, InsightConfig};
use preeclampsia_insights::models::{HealthRecord, TriggerEvent};
use preeclampsia_insights::pipeline::{
    dietary, rules, InsightGenerator, InsightPipeline, OpenAiClient, Registry,
};
use preeclampsia_insights::store::{JsonProfileStore, JsonlInsightSink};

const CLINICAL_SINK_FILE: &str = "insights.jsonl";
const DIETARY_SINK_FILE: &str = "dietary_insights.jsonl";

/// Preeclampsia insights - status and dietary notes for health-tracking records
#[derive(Parser)]
#[command(name = "preeclampsia-insights")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline for one record and persist the insights
    Process {
        #[command(flatten)]
        record: RecordArgs,

        /// Directory holding users/ and the insight files
        #[arg(long, env = "INSIGHTS_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Attempt external generation (overrides INSIGHTS_AI_ENABLED)
        #[arg(long)]
        enable_ai: bool,
    },
    /// Print the rule-based status and dietary text only
    Rules {
        #[command(flatten)]
        record: RecordArgs,
    },
}

#[derive(Args)]
struct RecordArgs {
    /// Record collection (activity, vital_signs, weight, symptoms, temperature, consumption)
    #[arg(long)]
    record_type: String,

    /// Record identifier
    #[arg(long, default_value = "cli-record")]
    record_id: String,

    /// JSON file with the record's field map (stdin when omitted)
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
}

impl RecordArgs {
    fn event(&self) -> Result<TriggerEvent> {
        let raw = match &self.input {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("reading record from stdin")?;
                buf
            }
        };
        let fields: Value = serde_json::from_str(&raw).context("record input is not valid JSON")?;
        if !fields.is_object() {
            anyhow::bail!("record input must be a JSON object");
        }
        Ok(TriggerEvent::new(&self.record_type, &self.record_id, fields))
    }
}

fn main() -> Result<()> {
    preeclampsia_insights::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Process {
            record,
            data_dir,
            enable_ai,
        } => run_process(&record, data_dir, enable_ai),
        Command::Rules { record } => run_rules(&record),
    }
}

fn run_process(record: &RecordArgs, data_dir: Option<PathBuf>, enable_ai: bool) -> Result<()> {
    let mut settings = InsightConfig::from_env().context("loading configuration")?;
    if enable_ai {
        settings.ai_enabled = true;
    }
    if data_dir.is_some() {
        settings.data_dir = data_dir;
    }
    let data_dir = settings.resolve_data_dir()?;

    tracing::info!(
        version = config::APP_VERSION,
        ai_enabled = settings.ai_enabled,
        variant = settings.prompt_variant.as_str(),
        "Processing record"
    );

    let generator: Option<Box<dyn InsightGenerator + Send + Sync>> = if settings.ai_enabled {
        let client = OpenAiClient::new(
            &settings.api_base_url,
            settings.api_key.clone(),
            &settings.model,
            settings.timeout_secs,
        )?;
        if !client.has_credential() {
            tracing::warn!("No API credential configured, external generation will fall back");
        }
        Some(Box::new(client))
    } else {
        None
    };

    let pipeline = InsightPipeline::new(settings.policy(), Registry::default(), generator);
    let profiles = JsonProfileStore::new(&data_dir);
    let clinical_sink = JsonlInsightSink::new(data_dir.join(CLINICAL_SINK_FILE));
    let dietary_sink = JsonlInsightSink::new(data_dir.join(DIETARY_SINK_FILE));

    let persisted = pipeline.process_and_persist(&record.event()?, &profiles, &clinical_sink, &dietary_sink)?;

    let output = json!({
        "severity": persisted.severity,
        "clinical": persisted.clinical,
        "dietary": persisted.dietary,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_rules(record: &RecordArgs) -> Result<()> {
    let registry = Registry::default();
    let parsed = HealthRecord::from_event(&record.event()?)?;

    let finding = rules::evaluate(&parsed.measurement, &registry);
    let advice = dietary::recommend(&parsed.measurement, &registry);

    let output = json!({
        "record_type": parsed.record_type(),
        "severity": finding.severity,
        "clinical": finding.text,
        "dietary": advice,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
