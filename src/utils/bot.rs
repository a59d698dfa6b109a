use std::sync::Arc;

use crate::utils::commands::Command;
use crate::utils::conversation::{Conversation, Effect, Event};
use crate::utils::files::save_photo;
use crate::utils::geo::Coordinate;
use crate::utils::messages;

use teloxide::types::{InputFile, MessageId, UserId};
use teloxide::{
    dispatching::DpHandlerDescription, prelude::*, utils::command::BotCommands, ApiError,
    RequestError,
};

pub fn build_dp_tree(
) -> Handler<'static, DependencyMap, Result<(), RequestError>, DpHandlerDescription> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(answer),
        )
        .branch(
            Update::filter_message()
                .filter_map(|msg: Message| message_event(&msg))
                .endpoint(message_event_handler),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(message_handler))
}

/// Location shares and photos; everything else falls through to the
/// default handler.
fn message_event(msg: &Message) -> Option<Event> {
    if let Some(location) = msg.location() {
        return Some(Event::LocationShared(Coordinate::new(
            location.latitude,
            location.longitude,
        )));
    }
    // sizes are ordered, the last one is the largest
    msg.photo()
        .and_then(|sizes| sizes.last())
        .map(|photo| Event::PhotoReceived {
            file_id: photo.file.id.clone(),
        })
}

/// Where the effects of one event are delivered.
struct ReplyTarget {
    user: UserId,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    callback_id: Option<String>,
}

impl ReplyTarget {
    fn message(msg: &Message, user: UserId) -> Self {
        ReplyTarget {
            user,
            chat_id: msg.chat.id,
            message_id: Some(msg.id),
            callback_id: None,
        }
    }

    fn callback(q: &CallbackQuery) -> Self {
        ReplyTarget {
            user: q.from.id,
            chat_id: q
                .message
                .as_ref()
                .map(|m| m.chat.id)
                .unwrap_or_else(|| q.from.id.into()),
            message_id: q.message.as_ref().map(|m| m.id),
            callback_id: Some(q.id.clone()),
        }
    }
}

async fn answer(
    bot: Bot,
    msg: Message,
    cmd: Command,
    conversation: Arc<Conversation>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => {
            let Some(user) = msg.from() else {
                return message_handler(bot, msg).await;
            };
            log::info!("user {} started a conversation", user.id);
            let effects = conversation.handle(user.id, Event::Start);
            let target = ReplyTarget::message(&msg, user.id);
            apply_effects(&bot, &conversation, &target, effects).await?;
        }
        Command::Help => {
            let text = String::from("Obsługiwane komendy:\n\n")
                + Command::bot_commands()
                    .iter()
                    .map(|x| format!("/{} — {}", x.command.trim_start_matches('/'), x.description))
                    .collect::<Vec<String>>()
                    .join("\n")
                    .as_str();
            bot.send_message(msg.chat.id, text).await?;
        }
    };
    Ok(())
}

async fn message_event_handler(
    bot: Bot,
    msg: Message,
    event: Event,
    conversation: Arc<Conversation>,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        log::warn!("dropping {:?} without a sender in chat {}", event, msg.chat.id);
        return Ok(());
    };
    let effects = conversation.handle(user.id, event);
    let target = ReplyTarget::message(&msg, user.id);
    apply_effects(&bot, &conversation, &target, effects).await
}

async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    conversation: Arc<Conversation>,
) -> ResponseResult<()> {
    let target = ReplyTarget::callback(&q);
    let Some(data) = q.data.as_deref() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let effects = conversation.handle(target.user, Event::from_callback(data));
    apply_effects(&bot, &conversation, &target, effects).await
}

async fn apply_effects(
    bot: &Bot,
    conversation: &Conversation,
    target: &ReplyTarget,
    effects: Vec<Effect>,
) -> ResponseResult<()> {
    let chat_id = target.chat_id;
    for effect in effects {
        match effect {
            Effect::AnswerCallback => {
                if let Some(id) = &target.callback_id {
                    bot.answer_callback_query(id).await?;
                }
            }
            Effect::SendText { text, markup } => {
                let request = bot.send_message(chat_id, text);
                match markup {
                    Some(markup) => request.reply_markup(markup).await?,
                    None => request.await?,
                };
            }
            Effect::SendLocation { coordinate, markup } => {
                bot.send_location(chat_id, coordinate.latitude, coordinate.longitude)
                    .reply_markup(markup)
                    .await?;
            }
            Effect::EditText { text } => {
                let Some(message_id) = target.message_id else {
                    continue;
                };
                // tapping the same button twice edits to the same text
                if let Err(err) = bot.edit_message_text(chat_id, message_id, text).await {
                    if !matches!(err, RequestError::Api(ApiError::MessageNotModified)) {
                        return Err(err);
                    }
                }
            }
            Effect::SavePhoto {
                file_id,
                path,
                coordinate,
            } => {
                if let Err(err) = save_photo(bot, &file_id, &path).await {
                    log::error!("could not save photo {}: {}", path.display(), err);
                    bot.send_message(chat_id, messages::PHOTO_NOT_SAVED).await?;
                    return Ok(());
                }
                log::info!("stored photo {}", path.display());
                conversation.record_photo(target.user, coordinate);
            }
            Effect::SendPhoto { path, caption } => {
                bot.send_photo(chat_id, InputFile::file(path))
                    .caption(caption)
                    .await?;
            }
        }
    }
    Ok(())
}

async fn message_handler(bot: Bot, msg: Message) -> ResponseResult<()> {
    match msg.text() {
        None => log::debug!("ignoring non-text message in chat {}", msg.chat.id),
        Some(text) => {
            log::info!("could not handle message '{}'", text);
            bot.send_message(msg.chat.id, messages::UNKNOWN_MESSAGE)
                .await?;
        }
    }
    Ok(())
}
