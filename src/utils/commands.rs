use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Obsługiwane komendy:")]
pub enum Command {
    #[command(description = "udostępnij lokalizację i oznacz paczkę na mapie")]
    Start,
    #[command(description = "wyświetl ten tekst")]
    Help,
}
