mod collect;
mod config;
mod display;
mod review;

use clap::{Parser, Subcommand};
use nietdoen_ai::PromptBuilder;
use nietdoen_core::{Language, sign_schema};

#[derive(Parser)]
#[command(name = "nietdoen", version, about = "Collect and describe no-bicycle-parking signs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the sign fields.
    Schema {
        /// Leave out the coordinate fields.
        #[arg(long)]
        no_coordinates: bool,
    },
    /// Print the instruction payload sent to the model.
    Prompt {
        #[arg(long, default_value = "dutch")]
        language: Language,

        #[arg(long)]
        pretty: bool,
    },
    /// Sign in, analyze a photo of a sign, review the result, and save it.
    Collect(Box<config::CollectArgs>),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("nietdoen v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Schema { no_coordinates } => {
            let schema = sign_schema()?.with_coordinates(!no_coordinates);
            print!("{}", display::schema_table(&schema));
        }
        Command::Prompt { language, pretty } => {
            let schema = sign_schema()?;
            let payload = PromptBuilder::new(&schema).payload(language);
            if pretty {
                let value: serde_json::Value = serde_json::from_str(&payload)?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{payload}");
            }
        }
        Command::Collect(args) => collect::run(*args).await?,
    }
    Ok(())
}
