//! `port-breakout` CLI entry point.
//!
//! Wires a [`TreeStore`], a Redis-backed Config DB/Asic DB client pair, and
//! a [`DpbTransaction`] together for one breakout run, then exits with the
//! code `--current-mode`/`--new-mode` mapping to `delPorts`/`addPorts`/
//! `portJson` requires.

use std::collections::BTreeMap;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use sonic_dpb_common::{tables, DpbError, Node};
use sonic_dpb_db::{defaults, AsicDbClient, ConfigDbClient, RedisAsicDb, RedisConfigDb};
use sonic_dpb_engine::DpbTransaction;
use sonic_yang_tree::TreeStore;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Dynamic port breakout for a SONiC switch.
#[derive(Parser, Debug)]
#[command(name = "port-breakout")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base port of the physical group to break out (e.g. "Ethernet0").
    #[arg(long, default_value = "Ethernet0")]
    port: String,

    /// Current lane-grouping mode of the port.
    #[arg(short = 'c', long, value_enum)]
    current_mode: BreakoutMode,

    /// Desired lane-grouping mode of the port.
    #[arg(short = 'n', long, value_enum)]
    new_mode: BreakoutMode,

    /// Merge the platform defaults file into the new ports' rows.
    #[arg(short = 'l', long, default_value_t = false)]
    load_default: bool,

    /// Force deletion even if dependent configuration (VLAN/portchannel
    /// membership) would be orphaned.
    #[arg(long, default_value_t = false)]
    force: bool,

    /// Config DB Redis host.
    #[arg(long, default_value = "localhost")]
    config_db_host: String,

    /// Config DB Redis port.
    #[arg(long, default_value_t = 6379)]
    config_db_port: u16,

    /// Directory containing the switch's YANG modules.
    #[arg(long, default_value = "/usr/local/yang-models")]
    yang_dir: String,

    /// Path to the per-platform port defaults JSON document.
    #[arg(long, default_value = "/etc/sonic/port_breakout_config_db.json")]
    defaults_file: String,

    /// Raise logging to debug.
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BreakoutMode {
    #[value(name = "1x100G[40G]")]
    OneByHundredG,
    #[value(name = "4x25G[10G]")]
    FourByTwentyFiveG,
    #[value(name = "2x50G")]
    TwoByFiftyG,
}

/// Builds the `(delPorts, addPorts, portJson)` triple for one mode, rooted
/// at `base_index` (the numeric suffix of `--port`).
fn mode_plan(mode: BreakoutMode, base_index: u32) -> (Vec<String>, Node) {
    let port = |offset: u32| format!("Ethernet{}", base_index + offset);
    let alias = |lane: u32| format!("Eth{}/{}", base_index / 4 + 1, lane + 1);

    let rows: Vec<(String, Node)> = match mode {
        BreakoutMode::OneByHundredG => vec![(
            port(0),
            Node::root([
                (tables::fields::ALIAS.to_string(), Node::scalar(alias(0))),
                (tables::fields::ADMIN_STATUS.to_string(), Node::scalar("up")),
                (tables::fields::LANES.to_string(), Node::scalar("65,66,67,68")),
                (tables::fields::DESCRIPTION.to_string(), Node::scalar("")),
                (tables::fields::SPEED.to_string(), Node::scalar("100000")),
            ]),
        )],
        BreakoutMode::FourByTwentyFiveG => (0..4)
            .map(|i| {
                (
                    port(i),
                    Node::root([
                        (tables::fields::ALIAS.to_string(), Node::scalar(alias(i))),
                        (tables::fields::DESCRIPTION.to_string(), Node::scalar("")),
                        (tables::fields::INDEX.to_string(), Node::scalar("0")),
                        (tables::fields::LANES.to_string(), Node::scalar((65 + i).to_string())),
                        (tables::fields::SPEED.to_string(), Node::scalar("25000")),
                    ]),
                )
            })
            .collect(),
        BreakoutMode::TwoByFiftyG => vec![
            (
                port(0),
                Node::root([
                    (tables::fields::ALIAS.to_string(), Node::scalar(alias(0))),
                    (tables::fields::ADMIN_STATUS.to_string(), Node::scalar("up")),
                    (tables::fields::LANES.to_string(), Node::scalar("65,66")),
                    (tables::fields::DESCRIPTION.to_string(), Node::scalar("")),
                    (tables::fields::SPEED.to_string(), Node::scalar("50000")),
                ]),
            ),
            (
                port(2),
                Node::root([
                    (tables::fields::ALIAS.to_string(), Node::scalar(alias(2))),
                    (tables::fields::ADMIN_STATUS.to_string(), Node::scalar("up")),
                    (tables::fields::LANES.to_string(), Node::scalar("67,68")),
                    (tables::fields::DESCRIPTION.to_string(), Node::scalar("")),
                    (tables::fields::SPEED.to_string(), Node::scalar("50000")),
                ]),
            ),
        ],
    };

    let ports: Vec<String> = rows.iter().map(|(name, _)| name.clone()).collect();
    let port_table: BTreeMap<String, Node> = rows.into_iter().collect();
    (ports, Node::root([(tables::PORT_TABLE.to_string(), Node::Map(port_table))]))
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");
}

fn invalid_port_name(port: &str) -> ExitCode {
    error!("port name '{}' does not end in a numeric suffix", port);
    ExitCode::FAILURE
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.current_mode == args.new_mode {
        error!("current-mode and new-mode are identical, nothing to do");
        return ExitCode::FAILURE;
    }

    let Some(index) = args.port.trim_start_matches("Ethernet").parse::<u32>().ok() else {
        return invalid_port_name(&args.port);
    };

    let (del_ports, _) = mode_plan(args.current_mode, index);
    let (add_ports, port_json) = mode_plan(args.new_mode, index);

    let defaults = if args.load_default {
        match defaults::load_defaults_file(&args.defaults_file) {
            Ok(tree) => Some(tree),
            Err(e) => {
                error!("failed to load defaults file: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    let mut tree_store = TreeStore::new(&args.yang_dir);
    if let Err(e) = tree_store.load_model() {
        error!("failed to load YANG schema from '{}': {}", args.yang_dir, e);
        return ExitCode::FAILURE;
    }

    let mut config_db = RedisConfigDb::new(&args.config_db_host, args.config_db_port);
    if let Err(e) = config_db.connect(false).await {
        error!("failed to connect to Config DB: {}", e);
        return ExitCode::FAILURE;
    }

    let mut asic_db = RedisAsicDb::new(&args.config_db_host, args.config_db_port);
    if let Err(e) = asic_db.connect().await {
        error!("failed to connect to Asic DB: {}", e);
        return ExitCode::FAILURE;
    }

    let mut transaction = DpbTransaction::new(tree_store, config_db, asic_db, defaults);

    info!("breaking out {} from {:?} to {:?}", args.port, args.current_mode, args.new_mode);
    match transaction
        .break_out(&del_ports, &add_ports, &port_json, args.force, args.load_default)
        .await
    {
        Ok(()) => {
            info!("port breakout complete");
            ExitCode::SUCCESS
        }
        Err(DpbError::Dependencies { xpaths }) => {
            println!("{}", xpaths.join("\n"));
            error!("port breakout blocked by {} dependent xpath(s)", xpaths.len());
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("port breakout failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
