//! Outline inspector.
//!
//! Builds a page model from files and prints its outline with node kinds,
//! validation states and actions.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use colored::Colorize;
use pagemodel::{
    AnnotationBundle, I18nBundle, ModelOptions, NodeId, PageEditModel, ValidationState,
    config::load_document,
};

#[derive(Parser, Debug)]
#[command(name = "pagemodel")]
#[command(about = "Print the editable outline of a page")]
struct Cli {
    /// Page schema (JSON or TOML)
    #[arg(short, long, required_unless_present = "options_schema")]
    schema: Option<PathBuf>,

    /// Page data (JSON or TOML)
    #[arg(short, long, required_unless_present = "options_schema")]
    data: Option<PathBuf>,

    /// Annotation bundle
    #[arg(short, long)]
    annotations: Option<PathBuf>,

    /// Resolved i18n bundle
    #[arg(short, long)]
    i18n: Option<PathBuf>,

    /// Model options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print every node, not only outline nodes
    #[arg(long)]
    all: bool,

    /// Print the options file schema and exit
    #[arg(long)]
    options_schema: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.options_schema {
        println!("{}", serde_json::to_string_pretty(&ModelOptions::json_schema())?);
        return Ok(());
    }

    let (Some(schema), Some(data)) = (&cli.schema, &cli.data) else {
        bail!("--schema and --data are required");
    };
    let schema = load_document(schema)?;
    let data = load_document(data)?;
    let annotations: AnnotationBundle = match &cli.annotations {
        Some(path) => serde_json::from_value(load_document(path)?)
            .with_context(|| format!("invalid annotation bundle {}", path.display()))?,
        None => AnnotationBundle::default(),
    };
    let bundle: I18nBundle = match &cli.i18n {
        Some(path) => serde_json::from_value(load_document(path)?)
            .with_context(|| format!("invalid i18n bundle {}", path.display()))?,
        None => I18nBundle::new(),
    };
    let options = match &cli.config {
        Some(path) => ModelOptions::from_file(path)?,
        None => ModelOptions::default(),
    };

    let model = PageEditModel::new(schema, data, annotations, options)?;
    print_node(&model, &bundle, model.root(), 0, cli.all)?;
    Ok(())
}

fn print_node(
    model: &PageEditModel,
    bundle: &I18nBundle,
    id: NodeId,
    depth: usize,
    all: bool,
) -> anyhow::Result<()> {
    let node = model.tree().node(id);
    let shown = all || node.view_node || depth == 0;
    let next = if shown { depth + 1 } else { depth };

    if shown {
        let name = model.display_name(id, bundle)?;
        let state = match node.state {
            ValidationState::Valid => "valid".green(),
            ValidationState::Invalid => "invalid".red(),
            ValidationState::Skipped => "skipped".yellow(),
        };
        let actions = model
            .supported_actions(id)?
            .iter()
            .map(|a| {
                let label = format!("{:?}", a.kind);
                if a.is_enabled() {
                    label.normal()
                } else {
                    label.dimmed()
                }
                .to_string()
            })
            .collect::<Vec<_>>()
            .join(",");
        let mut line = format!(
            "{}{} {} {}",
            "  ".repeat(depth),
            name.bold(),
            format!("{:?}", node.kind).cyan(),
            state
        );
        if node.custom {
            line += &format!(" {}", "custom".purple());
        }
        if !actions.is_empty() {
            line += &format!(" [{actions}]");
        }
        println!("{line}");
        for message in &node.messages {
            println!("{}  ! {}", "  ".repeat(depth), message.text.yellow());
        }
    }

    for child in model.tree().children(id) {
        print_node(model, bundle, child, next, all)?;
    }
    Ok(())
}
