//! `sealcfg` CLI: encrypt, decrypt and inspect configuration maps whose
//! values may contain secret leaves.
//!
//! A config map is a JSON or YAML mapping from `namespace:name` keys to
//! values. Secrets are marked as `{"secure": "<value>"}`: cleartext in a
//! plaintext map, ciphertext in an encrypted one.
//!
//! ## Usage
//!
//! ```sh
//! # Encrypt every secret in a plaintext map (stdin → stdout, JSON)
//! echo '{"app:db":{"password":{"secure":"hunter2"}}}' | sealcfg encrypt --crypter base64
//!
//! # Decrypt a YAML map from file to file
//! sealcfg decrypt --crypter base64 -i config.dev.yaml -o plain.yaml
//!
//! # Show values with secrets redacted
//! sealcfg decrypt --crypter blind --reveal -i config.json
//!
//! # Read one value
//! sealcfg get app:db --path password --crypter base64 -i config.json
//!
//! # Count secrets and batch requests
//! sealcfg stats --chunk-size-bytes 1024 -i config.json
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sealcfg_core::{
    chunk_by_size, collect_secrets, Base64Crypter, Batcher, BlindingCrypter, ConfigMap, Decrypter,
    Encrypter, Key, NopCrypter, PlaintextTree, PropertyPath, DEFAULT_CHUNK_SIZE_BYTES,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sealcfg",
    version,
    about = "Encrypt and decrypt secret values in JSON/YAML configuration maps"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter used when RUST_LOG is not set (e.g. "debug", "sealcfg_core=trace")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt the secrets of a plaintext config map
    Encrypt {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        crypto: CryptoArgs,
    },
    /// Decrypt the secrets of an encrypted config map
    Decrypt {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        crypto: CryptoArgs,
        /// Write secrets as bare values instead of `{"secure": ...}` markers
        #[arg(long)]
        reveal: bool,
    },
    /// Decrypt and print a single value
    Get {
        /// Config key, `namespace:name`
        key: String,
        /// Property path inside the value, e.g. `db.hosts[0]`
        #[arg(long, default_value = "")]
        path: String,
        #[command(flatten)]
        io: IoArgs,
        /// Crypter used to decrypt the value
        #[arg(long, value_enum, default_value_t = CrypterKind::Nop)]
        crypter: CrypterKind,
    },
    /// Show secret counts and the number of batch requests a pass would make
    Stats {
        #[command(flatten)]
        io: IoArgs,
        /// Upper bound on secret bytes per batch request
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE_BYTES)]
        chunk_size_bytes: usize,
    },
}

#[derive(Args)]
struct IoArgs {
    /// Input file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
    /// Output file (writes to stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,
    /// Document format; inferred from the input file extension when omitted
    #[arg(long, value_enum)]
    format: Option<Format>,
}

#[derive(Args)]
struct CryptoArgs {
    /// Crypter used for secret values
    #[arg(long, value_enum, default_value_t = CrypterKind::Nop)]
    crypter: CrypterKind,
    /// Upper bound on secret bytes per batch request
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE_BYTES)]
    chunk_size_bytes: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CrypterKind {
    /// Identity: ciphertext equals plaintext
    Nop,
    /// Reversible base64 encoding (not encryption)
    Base64,
    /// Replace every secret with a redaction token (decrypt only)
    Blind,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Encrypt { io, crypto } => {
            let format = io.format();
            let text = read_input(io.input.as_deref())?;
            let plaintext: BTreeMap<Key, PlaintextTree> =
                parse(format, &text).context("Failed to parse plaintext config map")?;
            let encrypter = encrypter(crypto.crypter)?;
            let batcher = Batcher::with_chunk_size(crypto.chunk_size_bytes);
            info!(entries = plaintext.len(), crypter = ?crypto.crypter, "encrypting config map");

            let encrypted = ConfigMap::encrypt(&plaintext, encrypter.as_ref(), &batcher)
                .context("Failed to encrypt config map")?;
            write_output(io.output.as_deref(), &render(format, &encrypted)?)?;
        }
        Commands::Decrypt { io, crypto, reveal } => {
            let format = io.format();
            let map = read_config_map(&io, format)?;
            let decrypter = decrypter(crypto.crypter);
            let batcher = Batcher::with_chunk_size(crypto.chunk_size_bytes);
            info!(entries = map.len(), crypter = ?crypto.crypter, reveal, "decrypting config map");

            let plaintext = map
                .decrypt(decrypter.as_ref(), &batcher)
                .context("Failed to decrypt config map")?;
            let rendered = if reveal {
                let revealed: serde_json::Map<String, serde_json::Value> = plaintext
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.reveal()))
                    .collect();
                render(format, &revealed)?
            } else {
                render(format, &plaintext)?
            };
            write_output(io.output.as_deref(), &rendered)?;
        }
        Commands::Get {
            key,
            path,
            io,
            crypter,
        } => {
            let format = io.format();
            let map = read_config_map(&io, format)?;
            let key: Key = key.parse().context("Invalid config key")?;
            let path = PropertyPath::parse(&path).context("Invalid property path")?;
            debug!(key = %key, path = %path, "reading single value");

            let value = map
                .decrypt_value(&key, &path, decrypter(crypter).as_ref())
                .with_context(|| format!("Failed to decrypt {key}"))?;
            let Some(value) = value else {
                bail!("No value at {key} {path}");
            };
            let rendered = match value.reveal() {
                serde_json::Value::String(s) => s,
                other => serde_json::to_string_pretty(&other)?,
            };
            write_output(io.output.as_deref(), &format!("{rendered}\n"))?;
        }
        Commands::Stats {
            io,
            chunk_size_bytes,
        } => {
            let format = io.format();
            let map = read_config_map(&io, format)?;
            let trees: Vec<_> = map.iter().map(|(_, tree)| tree).collect();
            let (_, pending) = collect_secrets(&trees);
            let secret_bytes: usize = pending.iter().map(String::len).sum();
            let requests = chunk_by_size(&pending, chunk_size_bytes).len();

            let report = format!(
                "Entries:         {}\nSecure entries:  {}\nSecure values:   {}\nSecret bytes:    {}\nBatch requests:  {} (chunk size {} bytes)\n",
                map.len(),
                map.secure_keys().len(),
                pending.len(),
                secret_bytes,
                requests,
                chunk_size_bytes
            );
            write_output(io.output.as_deref(), &report)?;
        }
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

impl IoArgs {
    /// `--format` if given, else the input extension, else JSON.
    fn format(&self) -> Format {
        if let Some(format) = self.format {
            return format;
        }
        let extension = self
            .input
            .as_deref()
            .and_then(|input| Path::new(input).extension())
            .and_then(|ext| ext.to_str());
        match extension {
            Some("yaml" | "yml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

fn encrypter(kind: CrypterKind) -> Result<Box<dyn Encrypter>> {
    match kind {
        CrypterKind::Nop => Ok(Box::new(NopCrypter)),
        CrypterKind::Base64 => Ok(Box::new(Base64Crypter)),
        CrypterKind::Blind => bail!("The 'blind' crypter can only decrypt"),
    }
}

fn decrypter(kind: CrypterKind) -> Box<dyn Decrypter> {
    match kind {
        CrypterKind::Nop => Box::new(NopCrypter),
        CrypterKind::Base64 => Box::new(Base64Crypter),
        CrypterKind::Blind => Box::new(BlindingCrypter),
    }
}

fn read_config_map(io: &IoArgs, format: Format) -> Result<ConfigMap> {
    let text = read_input(io.input.as_deref())?;
    parse(format, &text).context("Failed to parse config map")
}

fn parse<T: DeserializeOwned>(format: Format, text: &str) -> Result<T> {
    Ok(match format {
        Format::Json => serde_json::from_str(text)?,
        Format::Yaml => serde_yaml::from_str(text)?,
    })
}

fn render<T: Serialize>(format: Format, value: &T) -> Result<String> {
    Ok(match format {
        Format::Json => serde_json::to_string_pretty(value)? + "\n",
        Format::Yaml => serde_yaml::to_string(value)?,
    })
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
