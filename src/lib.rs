pub mod avatar;
pub mod cli;
pub mod host;
pub mod inline_image;
pub mod journal;
pub mod metabolism;
pub mod models;
pub mod session;
pub mod settings;
pub mod state;
pub mod store;
pub mod timer;
pub mod utils;
pub mod vault;

use clap::Parser;

pub use host::{HostDialogs, PresetDialogs};
pub use session::VaultSession;
pub use settings::SettingsStore;
pub use store::{DocumentRead, FileStore, FsStore};
pub use timer::{Clock, FastProgress, FastTimer, ManualClock, SystemClock};

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = cli::Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(cli::execute(cli)) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
