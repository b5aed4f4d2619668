use config::Config;
use log::error;

mod args;
mod config;
mod generators;
mod header;
mod output;
mod render;

use crate::args::get_command;

pub fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = get_command().get_matches();

    let cfg = match Config::from_args(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = render::run(&cfg) {
        error!("{e}");
        std::process::exit(1);
    }
}
