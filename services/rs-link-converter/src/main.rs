//!
//! src/main.rs  Andrew Belles  Oct 19th, 2026
//!
//! Command line entry. Either converts a single link and prints the
//! result as json, or serves the converter over http
//!
//!

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use rs_link_converter::{
    config, logging, server, ConversionResult, ConvertError, Converter, ServiceError
};
use rs_link_converter::server::ErrorBody;

#[derive(Parser, Debug)]
#[command(name = "rs-link-converter", version, about = "Spotify <-> Qobuz link converter")]
struct Cli {
    #[command(subcommand)]
    command: Command
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one share link
    Convert {
        link: String,
        /// Look up and score a concrete candidate on the target service
        #[arg(long)]
        resolve: bool,
        #[arg(long)]
        pretty: bool
    },
    /// Serve POST /convert over http
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>
    }
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    let cli = Cli::parse();

    let mut cfgs = config::load_config()?;
    let guard    = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service="rs-link-converter",
        version=%env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let converter = Converter::from_config(&cfgs)?;

    match cli.command {
        Command::Convert { link, resolve, pretty } => {
            match convert_once(&converter, &link, resolve).await {
                Some(Ok(result)) => print_result(&result, pretty)?,
                Some(Err(e)) => {
                    eprintln!("{}", serde_json::to_string(&ErrorBody::from(&e))?);
                    drop(guard);
                    std::process::exit(1);
                }
                None => {
                    tracing::warn!("convert.cancelled");
                    drop(guard);
                    std::process::exit(130);
                }
            }
        }
        Command::Serve { bind } => {
            if let Some(addr) = bind {
                cfgs.server.bind_addr = addr;
            }
            server::serve(converter, cfgs.server).await?;
        }
    }

    Ok(())
}

/// Runs one conversion, None if interrupted with ctrl-c
async fn convert_once(
    converter: &Converter,
    link: &str,
    resolve: bool
) -> Option<Result<ConversionResult, ConvertError>> {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            watcher.cancel();
        }
    });

    let work = async {
        if resolve {
            converter.convert_scored(link).await
        } else {
            converter.convert(link).await
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => None,
        result = work => Some(result)
    }
}

fn print_result(result: &ConversionResult, pretty: bool) -> Result<(), ServiceError> {
    let out = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{out}");
    Ok(())
}
