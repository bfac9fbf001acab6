use anyhow::{bail, Context, Result};
use cognibot_lib::models::AnalysisReport;
use cognibot_lib::services::detection::{context_snippet, summarize};
use cognibot_lib::services::{
    AnalysisPipeline, AppConfig, ConfigStore, FormatStyle, ResponseFormatter, RetryPolicy,
    OPENAI_PROVIDER,
};
use serde::Serialize;
use tracing::warn;

/// Flags that consume the following argument as their value.
const VALUE_FLAGS: &[&str] = &["--file", "--context", "--retries", "--config-dir", "--set-key"];

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_arg_values(args: &[String], key: &str) -> Vec<String> {
    args.iter()
        .enumerate()
        .filter(|(_, a)| *a == key)
        .filter_map(|(i, _)| args.get(i + 1).cloned())
        .collect()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

/// Words that are neither flags nor flag values.
fn positional_text(args: &[String]) -> String {
    let mut words = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        words.push(arg.as_str());
    }
    words.join(" ")
}

fn open_store(config_dir: Option<String>) -> Option<ConfigStore> {
    match config_dir {
        Some(dir) => Some(ConfigStore::new(dir.into())),
        None => ConfigStore::default_config_dir().map(ConfigStore::new),
    }
}

/// Store or remove the provider key, then exit without analyzing.
fn manage_key(config_dir: Option<String>, new_key: Option<String>) -> Result<()> {
    let store = open_store(config_dir).context("no config directory available; pass --config-dir <dir>")?;
    match new_key {
        Some(key) => {
            store
                .set_api_key(OPENAI_PROVIDER, key.trim())
                .with_context(|| format!("writing {}", store.config_file().display()))?;
            eprintln!("API key saved to {}", store.config_file().display());
        }
        None => {
            store
                .delete_api_key(OPENAI_PROVIDER)
                .with_context(|| format!("writing {}", store.config_file().display()))?;
            eprintln!("API key removed from {}", store.config_file().display());
        }
    }
    Ok(())
}

fn load_config(config_dir: Option<String>) -> Result<AppConfig> {
    let mut config = match open_store(config_dir) {
        Some(store) => store
            .load()
            .with_context(|| format!("loading {}", store.config_file().display()))?,
        None => AppConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

fn print_pattern_details(report: &AnalysisReport, text: &str) {
    if report.pattern_matches.is_empty() {
        return;
    }
    println!();
    println!("{}", summarize(&report.pattern_matches));
    for m in &report.pattern_matches {
        println!(
            "  [{}] bytes=[{},{}] confidence={:.2}  ...{}...",
            m.category,
            m.span.start,
            m.span.end,
            m.confidence,
            context_snippet(text, m.span).replace('\n', " ")
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || has_flag(&args, "--help") {
        eprintln!(
            "Usage:\n  analyze [--file <path>] [--context <msg>]... [--no-llm] [--json] [--retries <n>] [--explain] [--manual] [--config-dir <dir>] [text...]\n  analyze --set-key <key> | --delete-key [--config-dir <dir>]\n\nNotes:\n  - The API key is read from OPENAI_API_KEY or the config file.\n  - `--no-llm` runs pattern matching only.\n  - `--retries <n>` retries transient service failures up to n attempts in total."
        );
        return Ok(());
    }

    cognibot_lib::init_logging();

    let new_key = parse_arg_value(&args, "--set-key");
    if new_key.is_some() || has_flag(&args, "--delete-key") {
        return manage_key(parse_arg_value(&args, "--config-dir"), new_key);
    }

    let text = match parse_arg_value(&args, "--file") {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?,
        None => positional_text(&args),
    };
    if text.trim().is_empty() {
        bail!("nothing to analyze: pass text or --file <path>");
    }

    let context = parse_arg_values(&args, "--context");
    let use_llm = !has_flag(&args, "--no-llm");
    let json_output = has_flag(&args, "--json");
    let explain = has_flag(&args, "--explain");
    let style = if has_flag(&args, "--manual") {
        FormatStyle::Manual
    } else {
        FormatStyle::Automatic
    };

    let config = load_config(parse_arg_value(&args, "--config-dir"))?;
    let mut pipeline = AnalysisPipeline::from_config(&config, use_llm).context("building HTTP client")?;
    if let Some(raw) = parse_arg_value(&args, "--retries") {
        let attempts: usize = raw.parse().with_context(|| format!("invalid --retries value: {}", raw))?;
        pipeline = pipeline.with_retry(RetryPolicy::with_attempts(attempts));
    }

    let report = pipeline.analyze(&text, &context).await?;

    let educational = if explain {
        match pipeline.explain(&report, &text).await {
            Ok(reply) => reply,
            Err(kind) => {
                warn!("educational reply unavailable: {}", kind);
                None
            }
        }
    } else {
        None
    };

    if json_output {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Output<'a> {
            #[serde(flatten)]
            report: &'a AnalysisReport,
            #[serde(skip_serializing_if = "Option::is_none")]
            educational_reply: Option<&'a str>,
        }

        let out = Output {
            report: &report,
            educational_reply: educational.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let formatter = ResponseFormatter::new(style);
    println!("{}", formatter.format_with_reply(&report.verdict, educational.as_deref()));
    print_pattern_details(&report, &text);
    println!();
    println!(
        "Actionable: {} (confidence {:.2}, threshold {:.2})",
        if report.verdict.actionable { "yes" } else { "no" },
        report.verdict.confidence,
        report.verdict.threshold
    );

    Ok(())
}
