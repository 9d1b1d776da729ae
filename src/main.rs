//! Binary entry point: initializes logging and hands off to the
//! interactive line protocol (§6).

use std::path::PathBuf;

fn main() {
    env_logger::init();

    let data_root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./data"));
    let cfg = lsmkv::robt_config::Config::default();

    if let Err(err) = lsmkv::cli::run(data_root, cfg) {
        log::error!("fatal: {err}");
        std::process::exit(1);
    }
}
