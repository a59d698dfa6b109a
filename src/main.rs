mod utils;

use std::process::ExitCode;
use std::sync::Arc;

use teloxide::prelude::*;

use utils::config::Config;
use utils::conversation::Conversation;
use utils::store::InMemoryLocationStore;

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::init();
    log::info!("Starting paczka-bot...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "area lat {}..{} lon {}..{}, photo flow {}, data in {}",
        config.area.min_lat(),
        config.area.max_lat(),
        config.area.min_lon(),
        config.area.max_lon(),
        if config.photo_flow { "on" } else { "off" },
        config.data_dir.display()
    );

    let bot = Bot::new(&config.token);
    let conversation = Arc::new(Conversation::new(
        &config,
        Arc::new(InMemoryLocationStore::new()),
    ));

    Dispatcher::builder(bot, utils::bot::build_dp_tree())
        .dependencies(dptree::deps![conversation])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    ExitCode::SUCCESS
}
