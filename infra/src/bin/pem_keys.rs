//! Generates the RSA key pair used to seal refresh tokens.
//!
//! Without arguments the keys go to `SSO_PRIVATE_KEY_PATH` and
//! `SSO_PUBLIC_KEY_PATH` (default `./storage/secret/`).

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use sso_core::services::token::{RsaKeyPair, DEFAULT_KEY_BITS};
use sso_infra::{init_logging_once, KeyFiles};
use sso_shared::config::AppConfig;

#[derive(Parser, Debug)]
#[command(version, about = "Generate the refresh token RSA key pair", long_about = None)]
struct Cli {
    /// Directory to write oauth-private.key and oauth-public.key into
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// RSA modulus size
    #[arg(short, long, env = "SSO_KEY_BITS", default_value_t = DEFAULT_KEY_BITS)]
    bits: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    init_logging_once(&config.logging);

    if cli.bits < 2048 {
        anyhow::bail!("refusing to generate a {}-bit key; use at least 2048", cli.bits);
    }

    let files = match cli.out_dir {
        Some(dir) => KeyFiles::in_dir(dir),
        None => KeyFiles::from_config(&config.token),
    };

    tracing::info!(bits = cli.bits, "Generating RSA key pair");
    let keys = RsaKeyPair::generate(cli.bits).context("key generation failed")?;
    tracing::info!("Private key generated");

    files.write(&keys).context("writing key files failed")?;
    println!(
        "Keys written to {} and {}",
        files.private_key.display(),
        files.public_key.display()
    );
    Ok(())
}
