//! `arpass [options.toml]`: open a passthrough window over a synthetic
//! camera feed. Press `Space` or `S` to save the next frame.

use std::path::Path;

use arpass::{options::Options, Viewer};

fn main() {
    let options = match std::env::args().nth(1) {
        Some(path) => match Options::load(Path::new(&path)) {
            Ok(options) => options,
            Err(e) => {
                env_logger::init();
                log::error!("failed to load {path}: {e}");
                std::process::exit(1);
            }
        },
        None => Options::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(options.logging.filter.as_str()),
    )
    .init();

    if let Err(e) = Viewer::builder().with_options(options).build().run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
