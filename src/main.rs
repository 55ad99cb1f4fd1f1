use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use usmauth::{AuthAlgorithm, AuthenticatedMessage, AuthenticationProvider, MasterKey, RawMessage};
use zeroize::Zeroizing;

#[derive(Debug, Parser)]
#[command(name = "usmkey")]
#[command(
    version,
    about = "Derive SNMPv3 USM localized keys and compute authentication digests."
)]
struct Cli {
    /// Authentication protocol (md5 or sha1)
    #[arg(
        long,
        global = true,
        env = "USMKEY_PROTOCOL",
        default_value = "sha1",
        value_name = "PROTOCOL"
    )]
    protocol: AuthAlgorithm,

    /// Print machine-readable JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args)]
struct MessageArgs {
    /// Authoritative engine id in hex
    #[arg(long, value_name = "HEX")]
    engine_id: String,

    /// Byte offset of the digest field in the message
    #[arg(long, value_name = "N")]
    offset: usize,

    /// File holding the serialized message
    input: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Prints the master key and the key localized to an engine
    #[command(arg_required_else_help = true)]
    Key {
        /// Authoritative engine id in hex
        #[arg(long, value_name = "HEX")]
        engine_id: String,
    },

    /// Computes the digest of a message and installs it
    #[command(arg_required_else_help = true)]
    Sign {
        #[command(flatten)]
        message: MessageArgs,

        /// Write the signed message here instead of printing it as hex
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Checks the digest carried by a message
    #[command(arg_required_else_help = true)]
    Verify {
        #[command(flatten)]
        message: MessageArgs,
    },

    /// Shows key and digest sizes for the protocol
    Info,
}

#[derive(Serialize)]
struct KeyReport {
    algorithm: AuthAlgorithm,
    engine_id: String,
    master_key: String,
    localized_key: String,
}

#[derive(Serialize)]
struct SignReport {
    algorithm: AuthAlgorithm,
    digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Serialize)]
struct VerifyReport {
    algorithm: AuthAlgorithm,
    valid: bool,
}

#[derive(Serialize)]
struct InfoReport {
    algorithm: AuthAlgorithm,
    key_len: usize,
    digest_len: usize,
    clean_digest: String,
}

fn decode_engine_id(hex_str: &str) -> Result<Vec<u8>> {
    let trimmed = hex_str.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let engine_id = hex::decode(digits).context("engine id must be hex encoded")?;
    if engine_id.is_empty() {
        bail!("engine id must not be empty");
    }
    Ok(engine_id)
}

fn load_message(args: &MessageArgs, algorithm: AuthAlgorithm) -> Result<RawMessage> {
    let engine_id = decode_engine_id(&args.engine_id)?;
    let bytes = fs::read(&args.input)
        .with_context(|| format!("failed to read message from {}", args.input.display()))?;
    let message = RawMessage::new(bytes, args.offset, algorithm.digest_len())?;
    Ok(message.with_engine_id(engine_id))
}

fn build_provider(
    algorithm: AuthAlgorithm,
    passphrase: &Zeroizing<String>,
) -> Result<AuthenticationProvider> {
    AuthenticationProvider::new(algorithm, passphrase.as_bytes()).context("unusable passphrase")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let algorithm = args.protocol;

    match args.command {
        Commands::Key { engine_id } => {
            let engine_id = decode_engine_id(&engine_id)?;
            let passphrase = auth::read_passphrase()?;
            let master = MasterKey::from_password(algorithm, passphrase.as_bytes())
                .context("unusable passphrase")?;
            drop(passphrase);
            let localized = master.localize(&engine_id);

            let report = KeyReport {
                algorithm,
                engine_id: hex::encode(&engine_id),
                master_key: hex::encode(master.as_bytes()),
                localized_key: hex::encode(localized.as_bytes()),
            };
            if args.json {
                print_json(&report)?;
            } else {
                println!("algorithm:     {}", report.algorithm);
                println!("engine id:     {}", report.engine_id);
                println!("master key:    {}", report.master_key);
                println!("localized key: {}", report.localized_key);
            }
        }
        Commands::Sign { message, output } => {
            let mut msg = load_message(&message, algorithm)?;
            let passphrase = auth::read_passphrase()?;
            let provider = build_provider(algorithm, &passphrase)?;
            drop(passphrase);

            let digest = provider.sign(&mut msg)?;

            let signed_hex = match &output {
                Some(path) => {
                    fs::write(path, msg.as_bytes())
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    None
                }
                None => Some(hex::encode(msg.as_bytes())),
            };

            let report = SignReport {
                algorithm,
                digest: digest.to_hex(),
                message: signed_hex,
            };
            if args.json {
                print_json(&report)?;
            } else {
                println!("digest:  {}", report.digest);
                match (&report.message, &output) {
                    (Some(hex_msg), _) => println!("message: {hex_msg}"),
                    (None, Some(path)) => println!("signed message written to {}", path.display()),
                    (None, None) => {}
                }
            }
        }
        Commands::Verify { message } => {
            let msg = load_message(&message, algorithm)?;
            let passphrase = auth::read_passphrase()?;
            let provider = build_provider(algorithm, &passphrase)?;
            drop(passphrase);

            let valid = provider.verify(&msg)?;
            if args.json {
                print_json(&VerifyReport { algorithm, valid })?;
            }
            if !valid {
                bail!(
                    "authentication failed: digest {} does not match",
                    hex::encode(msg.digest())
                );
            }
            if !args.json {
                println!("digest ok");
            }
        }
        Commands::Info => {
            let clean = usmauth::AuthDigest::clean(algorithm);
            let report = InfoReport {
                algorithm,
                key_len: algorithm.key_len(),
                digest_len: algorithm.digest_len(),
                clean_digest: clean.to_hex(),
            };
            if args.json {
                print_json(&report)?;
            } else {
                println!("algorithm:    {}", report.algorithm);
                println!("key length:   {}", report.key_len);
                println!("digest:       {} bytes", report.digest_len);
                println!("clean digest: {}", report.clean_digest);
            }
        }
    }

    Ok(())
}
