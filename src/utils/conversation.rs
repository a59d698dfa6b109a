//! Conversation core: every inbound event is turned into a list of
//! [`Effect`]s by a pure [`Conversation::step`], which the bot layer then
//! executes against the Telegram API.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use teloxide::types::{ReplyMarkup, UserId};

use crate::utils::config::Config;
use crate::utils::files::photo_path;
use crate::utils::geo::{AreaBoundary, Coordinate, DEFAULT_CENTER};
use crate::utils::messages;
use crate::utils::payload::{CallbackData, MarkerPayload};
use crate::utils::store::LocationStore;

/// Where a user is in the flow. Transitions are not enforced: every event is
/// accepted in every state and only the stored location guards the photo.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingLocation,
    LocationReceived(Coordinate),
    MapShown(Coordinate),
    MarkerConfirmed(MarkerPayload),
    AwaitingPhoto,
    PhotoReceived(Coordinate),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Start,
    LocationShared(Coordinate),
    OpenMap,
    MarkerConfirmed(String),
    PhotoRequested,
    PhotoReceived { file_id: String },
}

impl Event {
    /// Event for a tapped inline button.
    pub fn from_callback(data: &str) -> Event {
        match CallbackData::parse(data) {
            CallbackData::OpenMap => Event::OpenMap,
            CallbackData::SendPhoto => Event::PhotoRequested,
            CallbackData::Marker(raw) => Event::MarkerConfirmed(raw),
        }
    }
}

/// Something the bot has to do in the chat the event came from.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    AnswerCallback,
    SendText {
        text: String,
        markup: Option<ReplyMarkup>,
    },
    SendLocation {
        coordinate: Coordinate,
        markup: ReplyMarkup,
    },
    /// Replace the text of the message whose button was tapped.
    EditText { text: String },
    /// Download the photo; on success the bot calls
    /// [`Conversation::record_photo`] with `coordinate`.
    SavePhoto {
        file_id: String,
        path: PathBuf,
        coordinate: Coordinate,
    },
    SendPhoto { path: PathBuf, caption: String },
}

impl Effect {
    fn text(text: impl Into<String>) -> Effect {
        Effect::SendText {
            text: text.into(),
            markup: None,
        }
    }

    fn text_with(text: impl Into<String>, markup: ReplyMarkup) -> Effect {
        Effect::SendText {
            text: text.into(),
            markup: Some(markup),
        }
    }
}

/// Result of one [`Conversation::step`].
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub state: ConversationState,
    /// Location to store for the user, if the event reported one.
    pub location: Option<Coordinate>,
    pub effects: Vec<Effect>,
}

impl Outcome {
    fn new(state: ConversationState, effects: Vec<Effect>) -> Self {
        Outcome {
            state,
            location: None,
            effects,
        }
    }
}

pub struct Conversation {
    area: AreaBoundary,
    photo_flow: bool,
    data_dir: PathBuf,
    locations: Arc<dyn LocationStore>,
    states: DashMap<UserId, ConversationState>,
}

impl Conversation {
    pub fn new(config: &Config, locations: Arc<dyn LocationStore>) -> Self {
        Conversation {
            area: config.area,
            photo_flow: config.photo_flow,
            data_dir: config.data_dir.clone(),
            locations,
            states: DashMap::new(),
        }
    }

    pub fn state(&self, user: UserId) -> ConversationState {
        self.states
            .get(&user)
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Runs `event` for `user`, records the new state and location, and
    /// returns what has to be sent back.
    pub fn handle(&self, user: UserId, event: Event) -> Vec<Effect> {
        // the entry guard serializes events of the same user
        let mut state = self.states.entry(user).or_default();
        let outcome = self.step(user, &state, self.locations.get(user), event);

        if let Some(coordinate) = outcome.location {
            self.locations.put(user, coordinate);
        }
        if outcome.state != *state {
            log::debug!("user {user}: {:?} -> {:?}", *state, outcome.state);
            *state = outcome.state;
        }
        outcome.effects
    }

    /// Called once the photo is on disk.
    pub fn record_photo(&self, user: UserId, coordinate: Coordinate) {
        log::debug!("user {user}: photo stored for {coordinate}");
        self.states
            .insert(user, ConversationState::PhotoReceived(coordinate));
    }

    /// Computes the transition without touching the stores.
    pub fn step(
        &self,
        user: UserId,
        state: &ConversationState,
        stored: Option<Coordinate>,
        event: Event,
    ) -> Outcome {
        match event {
            Event::Start => Outcome::new(
                ConversationState::AwaitingLocation,
                vec![Effect::text_with(
                    messages::GREETING,
                    messages::share_location_keyboard(),
                )],
            ),
            Event::LocationShared(coordinate) => self.location_shared(user, coordinate),
            Event::OpenMap => self.open_map(user, stored),
            Event::MarkerConfirmed(raw) => self.marker_confirmed(user, state, &raw),
            Event::PhotoRequested => self.photo_requested(user, state),
            Event::PhotoReceived { file_id } => self.photo_received(user, state, stored, file_id),
        }
    }

    fn location_shared(&self, user: UserId, coordinate: Coordinate) -> Outcome {
        let text = if self.area.contains(coordinate) {
            log::info!("user {user} shared location {coordinate} inside the area");
            messages::location_saved(coordinate)
        } else {
            log::info!("user {user} shared location {coordinate} outside the area");
            messages::OUTSIDE_AREA.to_string()
        };
        Outcome {
            state: ConversationState::LocationReceived(coordinate),
            location: Some(coordinate),
            effects: vec![Effect::text_with(text, messages::open_map_keyboard())],
        }
    }

    fn open_map(&self, user: UserId, stored: Option<Coordinate>) -> Outcome {
        let coordinate = stored.unwrap_or_else(|| {
            log::info!("user {user} opened the map without a location, using {DEFAULT_CENTER}");
            DEFAULT_CENTER
        });
        Outcome::new(
            ConversationState::MapShown(coordinate),
            vec![
                Effect::AnswerCallback,
                Effect::SendLocation {
                    coordinate,
                    markup: messages::mark_here_keyboard(MarkerPayload::from(coordinate)),
                },
                Effect::EditText {
                    text: messages::MAP_INSTRUCTION.to_string(),
                },
            ],
        )
    }

    fn marker_confirmed(&self, user: UserId, state: &ConversationState, raw: &str) -> Outcome {
        let marker = match raw.parse::<MarkerPayload>() {
            Ok(marker) => marker,
            Err(err) => return self.invalid_payload(user, state, raw, &err.to_string()),
        };
        log::info!("user {user} marked the parcel at {}", marker.coordinate());

        let reply = messages::marker_confirmed(marker, self.photo_flow);
        let reply = if self.photo_flow {
            Effect::text_with(reply, messages::send_photo_keyboard())
        } else {
            Effect::text(reply)
        };
        Outcome::new(
            ConversationState::MarkerConfirmed(marker),
            vec![Effect::AnswerCallback, reply],
        )
    }

    fn photo_requested(&self, user: UserId, state: &ConversationState) -> Outcome {
        if !self.photo_flow {
            return self.invalid_payload(user, state, "send_photo", "photo flow is disabled");
        }
        Outcome::new(
            ConversationState::AwaitingPhoto,
            vec![
                Effect::AnswerCallback,
                Effect::text_with(messages::PHOTO_PROMPT, messages::send_photo_keyboard()),
            ],
        )
    }

    fn photo_received(
        &self,
        user: UserId,
        state: &ConversationState,
        stored: Option<Coordinate>,
        file_id: String,
    ) -> Outcome {
        if !self.photo_flow {
            log::info!("user {user} sent a photo, photo flow is disabled");
            return Outcome::new(state.clone(), Vec::new());
        }
        let Some(coordinate) = stored else {
            log::warn!("user {user} sent a photo before sharing a location");
            return Outcome::new(
                state.clone(),
                vec![Effect::text(messages::MARK_LOCATION_FIRST)],
            );
        };

        let path = photo_path(&self.data_dir, user);
        log::info!("user {user} sent a parcel photo for {coordinate}");
        Outcome::new(
            state.clone(),
            vec![
                Effect::SavePhoto {
                    file_id,
                    path: path.clone(),
                    coordinate,
                },
                Effect::text(messages::photo_saved(coordinate)),
                Effect::SendPhoto {
                    path,
                    caption: messages::photo_caption(coordinate),
                },
            ],
        )
    }

    fn invalid_payload(
        &self,
        user: UserId,
        state: &ConversationState,
        raw: &str,
        reason: &str,
    ) -> Outcome {
        log::warn!("user {user} sent invalid callback data '{raw}': {reason}");
        Outcome::new(
            state.clone(),
            vec![
                Effect::AnswerCallback,
                Effect::text(messages::INVALID_MARKER),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::store::InMemoryLocationStore;
    use pretty_assertions::assert_eq;
    use teloxide::types::InlineKeyboardButtonKind;

    const USER: UserId = UserId(42);

    fn config(photo_flow: bool) -> Config {
        Config {
            token: "test".to_string(),
            area: AreaBoundary::tri_city(),
            photo_flow,
            data_dir: PathBuf::from("/data"),
        }
    }

    fn conversation(photo_flow: bool) -> (Conversation, Arc<InMemoryLocationStore>) {
        let store = Arc::new(InMemoryLocationStore::new());
        let conversation = Conversation::new(&config(photo_flow), store.clone());
        (conversation, store)
    }

    fn callback_data(markup: &ReplyMarkup) -> Vec<String> {
        match markup {
            ReplyMarkup::InlineKeyboard(markup) => markup
                .inline_keyboard
                .iter()
                .flatten()
                .filter_map(|button| match &button.kind {
                    InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn sent_text(effects: &[Effect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::SendText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn start_asks_for_location() {
        let (conversation, _) = conversation(true);
        let effects = conversation.handle(USER, Event::Start);
        assert_eq!(
            effects,
            vec![Effect::SendText {
                text: messages::GREETING.to_string(),
                markup: Some(messages::share_location_keyboard()),
            }]
        );
        assert_eq!(conversation.state(USER), ConversationState::AwaitingLocation);
    }

    #[test]
    fn location_inside_area() {
        let (conversation, store) = conversation(true);
        let coordinate = Coordinate::new(54.40, 18.60);
        let effects = conversation.handle(USER, Event::LocationShared(coordinate));

        assert_eq!(
            effects,
            vec![Effect::SendText {
                text: messages::location_saved(coordinate),
                markup: Some(messages::open_map_keyboard()),
            }]
        );
        assert_eq!(store.get(USER), Some(coordinate));
    }

    #[test]
    fn location_outside_area_is_still_stored() {
        let (conversation, store) = conversation(true);
        let coordinate = Coordinate::new(55.0, 18.6);
        let effects = conversation.handle(USER, Event::LocationShared(coordinate));

        assert_eq!(
            effects,
            vec![Effect::SendText {
                text: messages::OUTSIDE_AREA.to_string(),
                markup: Some(messages::open_map_keyboard()),
            }]
        );
        assert_eq!(store.get(USER), Some(coordinate));
        assert_eq!(
            conversation.state(USER),
            ConversationState::LocationReceived(coordinate)
        );
    }

    #[test]
    fn boundary_edges_select_inside_reply() {
        let (conversation, _) = conversation(true);
        for (coordinate, inside) in [
            (Coordinate::new(54.30, 18.40), true),
            (Coordinate::new(54.60, 18.85), true),
            (Coordinate::new(54.60, 18.40), true),
            (Coordinate::new(54.30, 18.85), true),
            (Coordinate::new(54.601, 18.6), false),
            (Coordinate::new(54.45, 18.851), false),
        ] {
            let effects = conversation.handle(USER, Event::LocationShared(coordinate));
            let expected = if inside {
                messages::location_saved(coordinate)
            } else {
                messages::OUTSIDE_AREA.to_string()
            };
            assert_eq!(sent_text(&effects), vec![expected.as_str()], "{coordinate}");
        }
    }

    #[test]
    fn sharing_the_same_location_twice_is_idempotent() {
        let (conversation, store) = conversation(true);
        let coordinate = Coordinate::new(54.5, 18.7);
        let first = conversation.handle(USER, Event::LocationShared(coordinate));
        let second = conversation.handle(USER, Event::LocationShared(coordinate));
        assert_eq!(first, second);
        assert_eq!(store.get(USER), Some(coordinate));
    }

    #[test]
    fn open_map_without_location_uses_default_center() {
        let (conversation, store) = conversation(true);
        let effects = conversation.handle(USER, Event::OpenMap);

        assert_eq!(effects[0], Effect::AnswerCallback);
        let Effect::SendLocation { coordinate, markup } = &effects[1] else {
            panic!("expected a location, got {:?}", effects[1]);
        };
        assert_eq!(*coordinate, DEFAULT_CENTER);
        assert_eq!(callback_data(markup), vec!["mark|54.45|18.6".to_string()]);
        assert_eq!(
            effects[2],
            Effect::EditText {
                text: messages::MAP_INSTRUCTION.to_string()
            }
        );
        assert_eq!(store.get(USER), None);
    }

    #[test]
    fn open_map_uses_stored_location() {
        let (conversation, _) = conversation(true);
        let stored = Coordinate::new(55.0, 18.6);
        conversation.handle(USER, Event::LocationShared(stored));

        let effects = conversation.handle(USER, Event::OpenMap);
        let Effect::SendLocation { coordinate, markup } = &effects[1] else {
            panic!("expected a location, got {:?}", effects[1]);
        };
        assert_eq!(*coordinate, stored);
        assert_eq!(callback_data(markup), vec!["mark|55.0|18.6".to_string()]);
        assert_eq!(conversation.state(USER), ConversationState::MapShown(stored));
    }

    #[test]
    fn valid_marker_offers_photo_upload() {
        let (conversation, _) = conversation(true);
        let effects = conversation.handle(USER, Event::from_callback("mark|54.5|18.6"));

        assert_eq!(effects[0], Effect::AnswerCallback);
        let Effect::SendText {
            text,
            markup: Some(markup),
        } = &effects[1]
        else {
            panic!("expected text with keyboard, got {:?}", effects[1]);
        };
        assert!(text.contains("54.5"));
        assert!(text.contains("18.6"));
        assert_eq!(callback_data(markup), vec!["send_photo".to_string()]);
    }

    #[test]
    fn valid_marker_in_simple_variant_is_final() {
        let (conversation, _) = conversation(false);
        let effects = conversation.handle(USER, Event::from_callback("mark|54.5|18.6"));
        let marker = MarkerPayload::from(Coordinate::new(54.5, 18.6));
        assert_eq!(
            effects,
            vec![
                Effect::AnswerCallback,
                Effect::SendText {
                    text: messages::marker_confirmed(marker, false),
                    markup: None,
                },
            ]
        );
        assert_eq!(
            conversation.state(USER),
            ConversationState::MarkerConfirmed(marker)
        );
    }

    #[test]
    fn malformed_marker_changes_nothing() {
        let (conversation, store) = conversation(true);
        let stored = Coordinate::new(54.4, 18.6);
        conversation.handle(USER, Event::LocationShared(stored));
        let before = conversation.state(USER);

        for raw in ["mark|abc|18.6", "foo", "mark|54.5", "mark|54.5|18.6|0", "pin|54.5|18.6"] {
            let effects = conversation.handle(USER, Event::from_callback(raw));
            assert_eq!(
                effects,
                vec![
                    Effect::AnswerCallback,
                    Effect::SendText {
                        text: messages::INVALID_MARKER.to_string(),
                        markup: None,
                    },
                ],
                "{raw}"
            );
            assert_eq!(conversation.state(USER), before);
            assert_eq!(store.get(USER), Some(stored));
        }
    }

    #[test]
    fn photo_request_prompts_for_photo() {
        let (conversation, _) = conversation(true);
        let effects = conversation.handle(USER, Event::from_callback("send_photo"));
        assert_eq!(
            effects,
            vec![
                Effect::AnswerCallback,
                Effect::SendText {
                    text: messages::PHOTO_PROMPT.to_string(),
                    markup: Some(messages::send_photo_keyboard()),
                },
            ]
        );
        assert_eq!(conversation.state(USER), ConversationState::AwaitingPhoto);
    }

    #[test]
    fn photo_request_in_simple_variant_is_rejected() {
        let (conversation, _) = conversation(false);
        let effects = conversation.handle(USER, Event::PhotoRequested);
        assert_eq!(sent_text(&effects), vec![messages::INVALID_MARKER]);
    }

    #[test]
    fn photo_before_location_writes_nothing() {
        let (conversation, _) = conversation(true);
        let effects = conversation.handle(
            USER,
            Event::PhotoReceived {
                file_id: "file".to_string(),
            },
        );
        assert_eq!(
            effects,
            vec![Effect::SendText {
                text: messages::MARK_LOCATION_FIRST.to_string(),
                markup: None,
            }]
        );
        assert_eq!(conversation.state(USER), ConversationState::Idle);
    }

    #[test]
    fn photo_after_location_is_saved_per_user() {
        let (conversation, _) = conversation(true);
        let stored = Coordinate::new(54.4, 18.6);
        conversation.handle(USER, Event::LocationShared(stored));

        let effects = conversation.handle(
            USER,
            Event::PhotoReceived {
                file_id: "file".to_string(),
            },
        );
        let path = PathBuf::from("/data/parcel_42.jpg");
        assert_eq!(
            effects,
            vec![
                Effect::SavePhoto {
                    file_id: "file".to_string(),
                    path: path.clone(),
                    coordinate: stored,
                },
                Effect::SendText {
                    text: messages::photo_saved(stored),
                    markup: None,
                },
                Effect::SendPhoto {
                    path,
                    caption: "📍 Szerokość: 54.4\n📍 Długość: 18.6".to_string(),
                },
            ]
        );
        // nothing is on disk yet
        assert_eq!(
            conversation.state(USER),
            ConversationState::LocationReceived(stored)
        );

        conversation.record_photo(USER, stored);
        assert_eq!(
            conversation.state(USER),
            ConversationState::PhotoReceived(stored)
        );
    }

    #[test]
    fn concurrent_shares_keep_state_and_store_in_step() {
        let (conversation, store) = conversation(true);
        std::thread::scope(|scope| {
            for i in 0..16u32 {
                let conversation = &conversation;
                scope.spawn(move || {
                    let coordinate = Coordinate::new(54.3 + f64::from(i) / 100.0, 18.6);
                    conversation.handle(USER, Event::LocationShared(coordinate));
                });
            }
        });
        let stored = store.get(USER).unwrap();
        assert_eq!(
            conversation.state(USER),
            ConversationState::LocationReceived(stored)
        );
    }

    #[test]
    fn photo_is_ignored_in_simple_variant() {
        let (conversation, _) = conversation(false);
        conversation.handle(USER, Event::LocationShared(Coordinate::new(54.4, 18.6)));
        let effects = conversation.handle(
            USER,
            Event::PhotoReceived {
                file_id: "file".to_string(),
            },
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn step_is_pure() {
        let (conversation, store) = conversation(true);
        let outcome = conversation.step(
            USER,
            &ConversationState::Idle,
            None,
            Event::LocationShared(Coordinate::new(54.4, 18.6)),
        );
        assert_eq!(outcome.location, Some(Coordinate::new(54.4, 18.6)));
        assert_eq!(store.get(USER), None);
        assert_eq!(conversation.state(USER), ConversationState::Idle);
    }

    #[test]
    fn full_flow_inside_area() {
        let (conversation, _) = conversation(true);

        let effects = conversation.handle(USER, Event::Start);
        assert_eq!(sent_text(&effects), vec![messages::GREETING]);

        let effects = conversation.handle(USER, Event::LocationShared(Coordinate::new(54.40, 18.60)));
        let Effect::SendText {
            text,
            markup: Some(markup),
        } = &effects[0]
        else {
            panic!("expected text with keyboard");
        };
        assert!(text.starts_with("Dziękuję!"));
        assert_eq!(callback_data(markup), vec!["mapa".to_string()]);

        let effects = conversation.handle(USER, Event::from_callback("mapa"));
        let Effect::SendLocation { coordinate, markup } = &effects[1] else {
            panic!("expected a location");
        };
        assert_eq!(*coordinate, Coordinate::new(54.40, 18.60));
        let marker = callback_data(markup);
        assert_eq!(marker, vec!["mark|54.4|18.6".to_string()]);

        let effects = conversation.handle(USER, Event::from_callback(&marker[0]));
        let texts = sent_text(&effects);
        assert!(texts[0].contains("Szerokość: 54.4\n"));
        assert!(texts[0].contains("Długość: 18.6\n"));
        assert_eq!(
            conversation.state(USER),
            ConversationState::MarkerConfirmed(MarkerPayload {
                latitude: 54.4,
                longitude: 18.6
            })
        );
    }

    #[test]
    fn events_are_accepted_in_any_state() {
        let (conversation, _) = conversation(true);
        let effects = conversation.handle(USER, Event::from_callback("mark|54.5|18.6"));
        assert_eq!(effects[0], Effect::AnswerCallback);
        assert_eq!(effects.len(), 2);
    }
}
