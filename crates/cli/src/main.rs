use anyhow::{bail, Context};
use clap::{CommandFactory, Parser, Subcommand};
use htable_core::config::{expansion_from_env_value, key_case_from_env_value};
use htable_core::walker::{FieldView, GroupView};
use htable_core::{
    Control, CurrentValue, EngineConfig, Expansion, FieldValue, FormSession, KeyCase, KeyScope,
    NodeId, OutlineNode, RawInput, SchemaDocument, UnknownInputPolicy, ViewNode,
};
use htable_query::{
    timeout_from_env_value, ClientConfig, FilterClient, RequestShape, ResultTable,
    DEFAULT_BASE_URL,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const COLLAPSED_CHEVRON: &str = "▸";
const EXPANDED_CHEVRON: &str = "▾";

#[derive(Parser)]
#[command(name = "htable")]
#[command(about = "Schema-driven clinical filter forms")]
struct Cli {
    /// Key case policy: preserve or lowercase (overrides HTABLE_KEY_CASE)
    #[arg(long, global = true, value_name = "CASE")]
    key_case: Option<String>,
    /// Qualify state keys with the full node path, joined by SEP (default ".")
    #[arg(
        long,
        global = true,
        value_name = "SEP",
        num_args = 0..=1,
        default_missing_value = "."
    )]
    qualify_keys: Option<String>,
    /// Reject date values that are not YYYY-MM-DD
    #[arg(long, global = true)]
    strict_dates: bool,
    /// Fail to load schemas that use an unknown inputType
    #[arg(long, global = true)]
    reject_unknown_inputs: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the browse tree (groups start collapsed)
    Outline {
        /// Schema document (.json, .yaml or .yml)
        schema: PathBuf,
        /// Expand every group
        #[arg(long)]
        expand_all: bool,
        /// Expand the group with this node id (repeatable)
        #[arg(long = "expand", value_name = "ID")]
        expand: Vec<String>,
    },
    /// List the state keys the schema declares
    Keys {
        /// Schema document (.json, .yaml or .yml)
        schema: PathBuf,
    },
    /// Show the data-entry form with current values (groups start expanded)
    Form {
        /// Schema document (.json, .yaml or .yml)
        schema: PathBuf,
        /// Set a field value (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Collapse the group with this node id (repeatable)
        #[arg(long = "collapse", value_name = "ID")]
        collapse: Vec<String>,
    },
    /// Post the form state to the filter query service
    Submit {
        /// Schema document (.json, .yaml or .yml)
        schema: PathBuf,
        /// Set a field value (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Service base URL (overrides HTABLE_FILTER_URL)
        #[arg(long)]
        url: Option<String>,
        /// Endpoint path on the service
        #[arg(long, default_value = htable_query::FILTER_ENDPOINT)]
        endpoint: String,
        /// Post the bare snapshot instead of wrapping it in {"filters": ...}
        #[arg(long)]
        bare: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("htable=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Outline {
            schema,
            expand_all,
            expand,
        } => {
            let mut session = open_session(&cli, schema, Expansion::Collapsed)?;
            if *expand_all {
                session.expand_all();
            }
            for id in expand {
                session.set_expanded(&parse_id(id)?, true)?;
            }
            for line in outline_lines(&session.outline()) {
                println!("{line}");
            }
        }
        Commands::Keys { schema } => {
            let session = open_session(&cli, schema, Expansion::Expanded)?;
            for key in session.declared_keys() {
                println!("{key}");
            }
        }
        Commands::Form {
            schema,
            set,
            collapse,
        } => {
            let mut session = open_session(&cli, schema, Expansion::Expanded)?;
            apply_assignments(&mut session, set)?;
            for id in collapse {
                session.set_expanded(&parse_id(id)?, false)?;
            }
            for line in form_lines(&session.view()) {
                println!("{line}");
            }
            println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
        }
        Commands::Submit {
            schema,
            set,
            url,
            endpoint,
            bare,
        } => {
            let mut session = open_session(&cli, schema, Expansion::Expanded)?;
            apply_assignments(&mut session, set)?;

            let base_url = url
                .clone()
                .or_else(|| std::env::var("HTABLE_FILTER_URL").ok())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
            let timeout = timeout_from_env_value(std::env::var("HTABLE_TIMEOUT_SECS").ok())?;
            let shape = if *bare {
                RequestShape::Bare
            } else {
                RequestShape::Wrapped
            };
            let config = ClientConfig::new(base_url)?
                .with_endpoint(endpoint.as_str())
                .with_shape(shape)
                .with_timeout(timeout);

            let client = FilterClient::new(config)?;
            let response = match client.submit(&session.snapshot()).await {
                Ok(response) => response,
                Err(err) => bail!(err.user_message()),
            };

            println!("{}", response.query_text());
            let table = ResultTable::from_response(&response);
            if table.is_empty() {
                println!("No matching compositions.");
            } else {
                println!("{}", table.to_text());
            }
        }
    }

    Ok(())
}

/// Resolves engine configuration from flags, then environment, then defaults.
fn engine_config(cli: &Cli, fallback_expansion: Expansion) -> anyhow::Result<EngineConfig> {
    let key_case = match &cli.key_case {
        Some(value) => value.parse::<KeyCase>()?,
        None => key_case_from_env_value(std::env::var("HTABLE_KEY_CASE").ok())?,
    };
    let default_expansion =
        expansion_from_env_value(std::env::var("HTABLE_DEFAULT_EXPANSION").ok(), fallback_expansion)?;
    let key_scope = match &cli.qualify_keys {
        Some(separator) => KeyScope::Path {
            separator: separator.clone(),
        },
        None => KeyScope::Name,
    };
    let unknown_inputs = if cli.reject_unknown_inputs {
        UnknownInputPolicy::Reject
    } else {
        UnknownInputPolicy::FallBackToText
    };

    Ok(EngineConfig::new(
        default_expansion,
        key_case,
        key_scope,
        unknown_inputs,
        cli.strict_dates,
    )?)
}

fn open_session(
    cli: &Cli,
    schema: &Path,
    fallback_expansion: Expansion,
) -> anyhow::Result<FormSession> {
    let config = engine_config(cli, fallback_expansion)?;
    let document = SchemaDocument::load(schema, config.unknown_inputs())
        .with_context(|| format!("failed to load schema {}", schema.display()))?;
    tracing::info!("loaded schema {}", schema.display());
    Ok(FormSession::new(Arc::new(document), config))
}

fn parse_id(text: &str) -> anyhow::Result<NodeId> {
    Ok(text.parse::<NodeId>()?)
}

/// Splits `key=value`. Only the first `=` separates; the value may be empty.
fn parse_assignment(text: &str) -> anyhow::Result<(&str, &str)> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => bail!("expected KEY=VALUE, got {text:?}"),
    }
}

fn apply_assignments(session: &mut FormSession, assignments: &[String]) -> anyhow::Result<()> {
    for assignment in assignments {
        let (key, value) = parse_assignment(assignment)?;
        session
            .edit_key(key, RawInput::text(value))
            .with_context(|| format!("failed to set {key:?}"))?;
    }
    Ok(())
}

fn outline_lines(root: &OutlineNode) -> Vec<String> {
    root.rows()
        .into_iter()
        .map(|row| {
            let indent = "  ".repeat(row.depth);
            let marker = match (row.has_children, row.expanded) {
                (false, _) => " ",
                (true, false) => COLLAPSED_CHEVRON,
                (true, true) => EXPANDED_CHEVRON,
            };
            format!("{indent}{marker} {}  [{}]", row.name, row.id)
        })
        .collect()
}

fn form_lines(root: &ViewNode) -> Vec<String> {
    let mut out = Vec::new();
    push_view_lines(root, &mut out);
    out
}

fn push_view_lines(node: &ViewNode, out: &mut Vec<String>) {
    match node {
        ViewNode::Group(group) => {
            out.push(group_line(group));
            for child in &group.children {
                push_view_lines(child, out);
            }
        }
        ViewNode::Field(field) => out.push(field_line(field)),
    }
}

fn group_line(group: &GroupView) -> String {
    let chevron = if group.expanded {
        EXPANDED_CHEVRON
    } else {
        COLLAPSED_CHEVRON
    };
    let mut line = format!("{}{chevron} {}  [{}]", "  ".repeat(group.depth), group.name, group.id);
    if let Some(help) = &group.help_text {
        line.push_str(&format!("  ({help})"));
    }
    line
}

fn field_line(field: &FieldView) -> String {
    let mut line = format!(
        "{}  {} <{}> = {}",
        "  ".repeat(field.depth),
        field.name,
        field.control.kind().as_str(),
        describe_current(&field.current)
    );
    if let Control::Select { options, .. } = &field.control {
        line.push_str(&format!("  options: -- No Selection --, {}", options.join(", ")));
    }
    if let Some(help) = &field.help_text {
        line.push_str(&format!("  ({help})"));
    }
    line
}

fn describe_value(value: Option<&FieldValue>) -> String {
    match value {
        None => "(unset)".to_string(),
        Some(FieldValue::Text(text)) => format!("{text:?}"),
        Some(FieldValue::Flag(flag)) => flag.to_string(),
    }
}

fn describe_current(current: &CurrentValue) -> String {
    match current {
        CurrentValue::Fixed(value) => format!("{value:?} (read-only)"),
        CurrentValue::Single(value) => describe_value(value.as_ref()),
        CurrentValue::Flag(flag) => flag.to_string(),
        CurrentValue::Range { start, end } => format!(
            "{} .. {}",
            describe_value(start.as_ref()),
            describe_value(end.as_ref())
        ),
    }
}
