use std::path::PathBuf;

use cellview::{Options, Viewer};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "cellview",
    about = "Live viewer for a running capsule-cell simulation",
    version
)]
struct Cli {
    /// Simulation id to subscribe to.
    uuid: String,

    /// HTTP base URL of the simulation server; overrides the options file.
    #[arg(long, env = "CELLVIEW_SERVER", value_name = "URL")]
    server: Option<String>,

    /// TOML options file; missing fields use defaults.
    #[arg(long, value_name = "PATH")]
    options: Option<PathBuf>,

    /// Start out following the newest frame.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    latest: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut options = match &cli.options {
        Some(path) => match Options::load(path) {
            Ok(options) => options,
            Err(e) => {
                log::error!("{}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => Options::default(),
    };
    if let Some(server) = cli.server {
        options.connection.server_url = server;
    }
    options.connection.always_show_latest |= cli.latest;

    let viewer = Viewer::builder(cli.uuid).with_options(options).build();
    if let Err(e) = viewer.run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
