mod commands;
mod logging;
mod status;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use memo_storage::{Approval, Config, StorageError};
use std::path::PathBuf;

use crate::status::StatusMessage;

#[derive(Parser)]
#[command(name = "memo-storage")]
#[command(about = "Store short text or JSON payloads on Solana and read them back", version)]
struct Cli {
    /// Network: devnet, testnet, mainnet or localnet
    #[arg(long, global = true, env = "SOLANA_NETWORK")]
    network: Option<String>,
    /// RPC endpoint, overrides the network default
    #[arg(long, global = true, env = "SOLANA_RPC_URL")]
    rpc_url: Option<String>,
    /// Ask on the terminal before connecting the wallet and before every signature
    #[arg(long, global = true)]
    prompt: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect the wallet and show its address and balance
    Address,
    /// Store a payload in a new account
    Store {
        #[command(flatten)]
        input: PayloadArgs,
        /// Where to write the storage keypair if the memo step fails (default: <address>.json)
        #[arg(long)]
        save_keypair: Option<PathBuf>,
        /// Memo encoding: framed or legacy
        #[arg(long, env = "MEMO_FORMAT")]
        format: Option<String>,
    },
    /// Retrieve the payload stored for an account
    Retrieve {
        /// Storage account address
        address: String,
        #[command(flatten)]
        window: WindowArgs,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Output::Text)]
        output: Output,
    },
    /// Write the missing memo for an account created by a failed store
    Repair {
        /// Storage account keypair file saved by `store`
        #[arg(short, long)]
        keypair: PathBuf,
        #[command(flatten)]
        input: PayloadArgs,
        #[command(flatten)]
        window: WindowArgs,
    },
}

#[derive(Args)]
struct PayloadArgs {
    /// Payload text
    #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
    content: Option<String>,
    /// Read the payload from a file
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Validate and store the payload as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct WindowArgs {
    /// Maximum number of history signatures to inspect
    #[arg(long, env = "RETRIEVE_MAX_DEPTH")]
    depth: Option<usize>,
    /// Signatures requested per history page
    #[arg(long, env = "RETRIEVE_PAGE_SIZE")]
    page_size: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let _guard = match logging::init_logging() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", StatusMessage::error(format!("{:#}", e)));
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli).await {
        let text = match e.downcast_ref::<StorageError>() {
            Some(err) => format!("[{}] {}", err.code(), err),
            None => format!("{:#}", e),
        };
        eprintln!("{}", StatusMessage::error(text));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(network) = &cli.network {
        config.cluster = network.parse()?;
    }
    if let Some(url) = cli.rpc_url {
        config.rpc_url = Some(url);
    }
    let approval = if cli.prompt {
        Approval::Prompt
    } else {
        Approval::Auto
    };

    match cli.command {
        Commands::Address => commands::handle_address(&config, approval).await?,
        Commands::Store {
            input,
            save_keypair,
            format,
        } => {
            if let Some(format) = format {
                config.memo_format = format.parse()?;
            }
            let payload = commands::read_payload(input.content, input.file, input.json)?;
            commands::handle_store(&config, approval, payload, save_keypair).await?
        }
        Commands::Retrieve {
            address,
            window,
            output,
        } => {
            window.apply(&mut config);
            commands::handle_retrieve(&config, &address, output == Output::Json).await?
        }
        Commands::Repair {
            keypair,
            input,
            window,
        } => {
            window.apply(&mut config);
            let payload = commands::read_payload(input.content, input.file, input.json)?;
            commands::handle_repair(&config, approval, &keypair, payload).await?
        }
    }

    Ok(())
}

impl WindowArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(depth) = self.depth {
            config.max_depth = depth.max(1);
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size.max(1);
        }
    }
}
