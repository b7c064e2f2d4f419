use anyhow::Context as _;
use clap::{Parser, Subcommand};
use k8s_provider::{
    Context, Settings,
    framework::{
        CreateRequest, DeleteRequest, Diagnostics, ImportStateRequest, ReadRequest, Resource,
        UpdateRequest,
    },
    resources::{self, core::service_account::ServiceAccountResource},
    telemetry,
};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::process::ExitCode;
use tracing::*;

/// Manage a Kubernetes ServiceAccount with server-side apply.
///
/// Configuration and state documents are JSON, read from a file or `-` for stdin.
#[derive(Parser)]
#[command(name = "k8s-provider", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resource schemas as YAML
    Schema,
    /// Validate and plan a configuration, then create the object
    Create {
        #[arg(long, default_value = "-")]
        config: String,
    },
    /// Refresh a state document from the cluster
    Read {
        #[arg(long, default_value = "-")]
        state: String,
    },
    /// Validate and plan a configuration against prior state, then update the object
    Update {
        #[arg(long)]
        config: String,
        #[arg(long)]
        state: String,
    },
    /// Delete the object recorded in a state document
    Delete {
        #[arg(long, default_value = "-")]
        state: String,
    },
    /// Import an existing object by `namespace/name`
    Import { id: String },
}

#[derive(Serialize)]
struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<Value>,
    diagnostics: Diagnostics,
}

fn read_document(path: &str) -> anyhow::Result<Value> {
    let mut raw = String::new();
    if path == "-" {
        std::io::stdin().read_to_string(&mut raw)?;
    } else {
        raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    }
    serde_json::from_str(&raw).with_context(|| format!("{path} is not a JSON document"))
}

fn print(output: &Output) -> anyhow::Result<ExitCode> {
    for diagnostic in output.diagnostics.iter() {
        warn!("{diagnostic}");
    }
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(if output.diagnostics.has_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    telemetry::init();
    let cli = Cli::parse();

    // Read settings
    let settings = Settings::new()?;

    if let Command::Schema = cli.command {
        print!("{}", resources::schema_documents(settings.apply())?);
        return Ok(ExitCode::SUCCESS);
    }

    let context = Context::connect(settings).await?;
    let resource = ServiceAccountResource::new(context);
    let schema = resource.schema();
    info!("Managing {}", resource.type_name());

    let output = match cli.command {
        Command::Schema => return Ok(ExitCode::SUCCESS),
        Command::Create { config } => {
            let config = read_document(&config)?;
            let mut diagnostics = Diagnostics::new();
            schema.validate(&config, &mut diagnostics);
            if diagnostics.has_error() {
                Output {
                    state: None,
                    diagnostics,
                }
            } else {
                let plan = schema.plan(&config, None);
                let response = resource.create(CreateRequest { plan }).await;
                Output {
                    state: response.state,
                    diagnostics: response.diagnostics,
                }
            }
        }
        Command::Read { state } => {
            let state = read_document(&state)?;
            let response = resource.read(ReadRequest { state }).await;
            Output {
                state: response.state,
                diagnostics: response.diagnostics,
            }
        }
        Command::Update { config, state } => {
            let config = read_document(&config)?;
            let state = read_document(&state)?;
            let mut diagnostics = Diagnostics::new();
            schema.validate(&config, &mut diagnostics);
            let plan = schema.plan(&config, Some(&state));
            let replace = schema.requires_replace(&state, &plan);
            for path in replace {
                let description = schema
                    .attribute(&path)
                    .map(|a| a.description.as_str())
                    .unwrap_or_default();
                diagnostics.add_attribute_error(
                    &path,
                    "Resource requires replacement",
                    format!(
                        "Changing {path} forces a new resource, delete and create it instead. {description}"
                    ),
                );
            }
            if diagnostics.has_error() {
                Output {
                    state: Some(state),
                    diagnostics,
                }
            } else {
                let response = resource.update(UpdateRequest { plan, state }).await;
                Output {
                    state: response.state,
                    diagnostics: response.diagnostics,
                }
            }
        }
        Command::Delete { state } => {
            let state = read_document(&state)?;
            let response = resource.delete(DeleteRequest { state }).await;
            Output {
                state: None,
                diagnostics: response.diagnostics,
            }
        }
        Command::Import { id } => {
            let imported = resource.import_state(ImportStateRequest { id }).await;
            match imported.state {
                Some(state) if !imported.diagnostics.has_error() => {
                    // fill the remaining attributes from the cluster
                    let mut response = resource.read(ReadRequest { state }).await;
                    let mut diagnostics = imported.diagnostics;
                    diagnostics.extend(std::mem::take(&mut response.diagnostics));
                    Output {
                        state: response.state,
                        diagnostics,
                    }
                }
                state => Output {
                    state,
                    diagnostics: imported.diagnostics,
                },
            }
        }
    };

    print(&output)
}
