use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use sequence_primitives::{
    codec::{decode_calls, encode_calls},
    recovery::{self, RecoveryLeaf, RecoveryTopology},
    session::{self, SessionsTopology},
    typed_data,
    types::{Calls, ParentedPayload, SessionPermissions},
    ConfigurationTree,
};
use serde::{de::DeserializeOwned, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Encode, hash and edit Sequence wallet payloads and configuration topologies.
///
/// Topologies and payloads are read from JSON files; binary outputs are printed as 0x-hex.
/// Editing commands rewrite the topology file in place unless `--output` is given.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Packed call batches.
    #[command(subcommand)]
    Calls(CallsCommand),
    /// Signing hashes of wallet payloads.
    #[command(subcommand)]
    Payload(PayloadCommand),
    /// Session permission topologies.
    #[command(subcommand)]
    Sessions(SessionsCommand),
    /// Recovery topologies.
    #[command(subcommand)]
    Recovery(RecoveryCommand),
}

/// Wallet the payload is signed for.
#[derive(Args, Debug)]
struct WalletArgs {
    #[arg(long, env = "SEQUENCE_WALLET")]
    wallet: Address,

    #[arg(long, env = "SEQUENCE_CHAIN_ID")]
    chain_id: U256,
}

/// A topology file and where to write the edited result.
#[derive(Args, Debug)]
struct EditArgs {
    /// Topology JSON to read.
    #[arg(long)]
    topology: PathBuf,

    /// Write here instead of rewriting `--topology`.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl EditArgs {
    fn destination(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.topology)
    }
}

#[derive(Subcommand, Debug)]
enum CallsCommand {
    /// Encode a `Calls` JSON file.
    Encode {
        input: PathBuf,
        /// Calls to this address omit their target.
        #[arg(long, env = "SEQUENCE_SELF_ADDRESS")]
        self_address: Option<Address>,
    },
    /// Decode 0x-hex into `Calls` JSON.
    Decode {
        data: String,
        #[arg(long, env = "SEQUENCE_SELF_ADDRESS")]
        self_address: Option<Address>,
    },
}

#[derive(Subcommand, Debug)]
enum PayloadCommand {
    /// Digest a wallet signer signs for a payload JSON file.
    Hash {
        input: PathBuf,
        #[command(flatten)]
        wallet: WalletArgs,
    },
    /// Digest a recovery signer signs for a payload JSON file.
    RecoveryHash {
        input: PathBuf,
        #[command(flatten)]
        wallet: WalletArgs,
        /// Sign for every chain (chain id zero in the domain).
        #[arg(long)]
        no_chain_id: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SessionsCommand {
    /// Write a topology holding only an empty blacklist and the identity signer.
    Empty {
        identity_signer: Address,
        #[arg(long)]
        output: PathBuf,
    },
    /// Add an explicit session from a `SessionPermissions` JSON file.
    Add {
        #[command(flatten)]
        edit: EditArgs,
        permissions: PathBuf,
    },
    Remove {
        #[command(flatten)]
        edit: EditArgs,
        signer: Address,
    },
    /// Drop sessions whose deadline has passed.
    Clean {
        #[command(flatten)]
        edit: EditArgs,
        /// Unix seconds; defaults to the current time.
        #[arg(long)]
        now: Option<u64>,
    },
    /// Hide every session not named in the keep lists behind its hash.
    Minimise {
        #[command(flatten)]
        edit: EditArgs,
        #[arg(long, value_delimiter = ',')]
        explicit: Vec<Address>,
        #[arg(long, value_delimiter = ',')]
        implicit: Vec<Address>,
    },
    Balance {
        #[command(flatten)]
        edit: EditArgs,
    },
    BlacklistAdd {
        #[command(flatten)]
        edit: EditArgs,
        address: Address,
    },
    BlacklistRemove {
        #[command(flatten)]
        edit: EditArgs,
        address: Address,
    },
    /// Print the binary encoding.
    Encode { topology: PathBuf },
    /// Print the image hash.
    Hash { topology: PathBuf },
}

#[derive(Subcommand, Debug)]
enum RecoveryCommand {
    /// Build a balanced topology from a JSON array of recovery leaves.
    Build {
        leaves: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Keep only one signer's leaves visible.
    Trim {
        #[command(flatten)]
        edit: EditArgs,
        signer: Address,
    },
    Encode { topology: PathBuf },
    /// Decode 0x-hex into topology JSON.
    Decode {
        data: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Hash { topology: PathBuf },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Calls(cmd) => run_calls(cmd),
        Command::Payload(cmd) => run_payload(cmd),
        Command::Sessions(cmd) => run_sessions(cmd),
        Command::Recovery(cmd) => run_recovery(cmd),
    }
}

fn init_tracing() {
    // stdout carries command output; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_calls(cmd: CallsCommand) -> Result<()> {
    match cmd {
        CallsCommand::Encode {
            input,
            self_address,
        } => {
            let calls: Calls = read_json(&input)?;
            let encoded = encode_calls(&calls, self_address).context("failed encoding calls")?;
            println!("{}", to_hex(&encoded));
        }
        CallsCommand::Decode { data, self_address } => {
            let bytes = from_hex(&data)?;
            let calls = decode_calls(&bytes, self_address).context("failed decoding calls")?;
            print_json(&calls)?;
        }
    }
    Ok(())
}

fn run_payload(cmd: PayloadCommand) -> Result<()> {
    match cmd {
        PayloadCommand::Hash { input, wallet } => {
            let payload: ParentedPayload = read_json(&input)?;
            let digest = typed_data::hash(wallet.wallet, wallet.chain_id, &payload)
                .context("failed hashing payload")?;
            println!("{digest}");
        }
        PayloadCommand::RecoveryHash {
            input,
            wallet,
            no_chain_id,
        } => {
            let payload: ParentedPayload = read_json(&input)?;
            let digest =
                recovery::hash_recovery_payload(&payload, wallet.wallet, wallet.chain_id, no_chain_id)
                    .context("failed hashing recovery payload")?;
            println!("{digest}");
        }
    }
    Ok(())
}

fn run_sessions(cmd: SessionsCommand) -> Result<()> {
    match cmd {
        SessionsCommand::Empty {
            identity_signer,
            output,
        } => write_json_atomic(&output, &session::empty_sessions_topology(identity_signer)),
        SessionsCommand::Add { edit, permissions } => {
            let topology = read_sessions(&edit.topology)?;
            let permissions: SessionPermissions = read_json(&permissions)?;
            let updated = session::add_explicit_session(&topology, permissions)?;
            write_json_atomic(edit.destination(), &updated)
        }
        SessionsCommand::Remove { edit, signer } => {
            let topology = read_sessions(&edit.topology)?;
            let updated = session::remove_explicit_session(&topology, signer)
                .ok_or_else(|| anyhow!("removing {signer} leaves an empty topology"))?;
            write_json_atomic(edit.destination(), &updated)
        }
        SessionsCommand::Clean { edit, now } => {
            let now = match now {
                Some(now) => now,
                None => unix_now()?,
            };
            debug!(now, "cleaning expired sessions");
            let topology = read_sessions(&edit.topology)?;
            let updated = session::clean_sessions_topology(&topology, now)
                .ok_or_else(|| anyhow!("every leaf expired; nothing left to write"))?;
            write_json_atomic(edit.destination(), &updated)
        }
        SessionsCommand::Minimise {
            edit,
            explicit,
            implicit,
        } => {
            let topology = read_sessions(&edit.topology)?;
            let updated = session::minimise_sessions_topology(&topology, &explicit, &implicit)?;
            write_json_atomic(edit.destination(), &updated)
        }
        SessionsCommand::Balance { edit } => {
            let topology = read_sessions(&edit.topology)?;
            write_json_atomic(edit.destination(), &session::balance_sessions_topology(&topology))
        }
        SessionsCommand::BlacklistAdd { edit, address } => {
            let topology = read_sessions(&edit.topology)?;
            let updated = session::add_to_implicit_blacklist(&topology, address)?;
            write_json_atomic(edit.destination(), &updated)
        }
        SessionsCommand::BlacklistRemove { edit, address } => {
            let topology = read_sessions(&edit.topology)?;
            let updated = session::remove_from_implicit_blacklist(&topology, address)?;
            write_json_atomic(edit.destination(), &updated)
        }
        SessionsCommand::Encode { topology } => {
            let topology = read_sessions(&topology)?;
            let encoded = session::encode_sessions_topology(&topology)?;
            println!("{}", to_hex(&encoded));
            Ok(())
        }
        SessionsCommand::Hash { topology } => {
            let topology = read_sessions(&topology)?;
            println!("{}", topology.hash_configuration()?);
            Ok(())
        }
    }
}

fn run_recovery(cmd: RecoveryCommand) -> Result<()> {
    match cmd {
        RecoveryCommand::Build { leaves, output } => {
            let leaves: Vec<RecoveryLeaf> = read_json(&leaves)?;
            let topology = recovery::from_recovery_leaves(&leaves)?;
            write_json_atomic(&output, &topology)
        }
        RecoveryCommand::Trim { edit, signer } => {
            let topology: RecoveryTopology = read_json(&edit.topology)?;
            write_json_atomic(edit.destination(), &recovery::trim_topology(&topology, signer))
        }
        RecoveryCommand::Encode { topology } => {
            let topology: RecoveryTopology = read_json(&topology)?;
            let encoded = recovery::encode_topology(&topology)?;
            println!("{}", to_hex(&encoded));
            Ok(())
        }
        RecoveryCommand::Decode { data, output } => {
            let topology = recovery::decode_topology(&from_hex(&data)?)
                .context("failed decoding recovery topology")?;
            match output {
                Some(path) => write_json_atomic(&path, &topology),
                None => print_json(&topology),
            }
        }
        RecoveryCommand::Hash { topology } => {
            let topology: RecoveryTopology = read_json(&topology)?;
            println!("{}", topology.hash());
            Ok(())
        }
    }
}

fn read_sessions(path: &Path) -> Result<SessionsTopology> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    session::sessions_topology_from_json(&raw)
        .with_context(|| format!("failed parsing session topology in {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed parsing JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("failed serialising JSON")?);
    Ok(())
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let serialised = serde_json::to_string_pretty(value).context("failed serialising JSON")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serialised.as_bytes())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed replacing {}", path.display()))?;
    info!(path = %path.display(), "wrote topology");
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn unix_now() -> Result<u64> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    u64::try_from(now).map_err(|_| anyhow!("system clock is before the unix epoch"))
}

fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn from_hex(data: &str) -> Result<Vec<u8>> {
    let trimmed = data.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).with_context(|| format!("invalid hex input `{data}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::try_parse_from([
            "sequence-topology",
            "sessions",
            "minimise",
            "--topology",
            "sessions.json",
            "--explicit",
            "0x1111111111111111111111111111111111111111,0x2222222222222222222222222222222222222222",
        ])
        .unwrap();
        match cli.command {
            Command::Sessions(SessionsCommand::Minimise {
                edit,
                explicit,
                implicit,
            }) => {
                assert_eq!(edit.destination(), Path::new("sessions.json"));
                assert_eq!(explicit.len(), 2);
                assert!(implicit.is_empty());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn hex_accepts_an_optional_prefix() {
        assert_eq!(from_hex("0x1141").unwrap(), vec![0x11, 0x41]);
        assert_eq!(from_hex("1141").unwrap(), vec![0x11, 0x41]);
        assert!(from_hex("0xzz").is_err());
        assert_eq!(to_hex(&[0x11, 0x41]), "0x1141");
    }

    #[test]
    fn edits_are_written_atomically() {
        let dir = std::env::temp_dir().join(format!("sequence-topology-{}", std::process::id()));
        let path = dir.join("sessions.json");
        let identity = Address::repeat_byte(0x1d);

        write_json_atomic(&path, &session::empty_sessions_topology(identity)).unwrap();
        assert!(!tmp_path_for(&path).exists());

        let topology = read_sessions(&path).unwrap();
        assert_eq!(session::get_identity_signer(&topology).unwrap(), Some(identity));
        fs::remove_dir_all(&dir).unwrap();
    }
}
