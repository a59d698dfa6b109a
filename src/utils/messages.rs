use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    ReplyMarkup,
};

use crate::utils::geo::Coordinate;
use crate::utils::payload::{MarkerPayload, OPEN_MAP, SEND_PHOTO};

pub const GREETING: &str = "Witaj! Kliknij przycisk poniżej, aby oznaczyć miejsce paczki na mapie.
Mapa działa tylko na terenie Gdyni, Gdańska i Sopotu.

Kliknij przycisk poniżej, aby udostępnić swoją lokalizację.";

pub const OUTSIDE_AREA: &str = "Twoja lokalizacja została zapisana, ale znajduje się poza obsługiwanym obszarem (Gdynia, Gdańsk, Sopot).";

pub const MAP_INSTRUCTION: &str =
    "Zaznacz aktualne położenie twojej paczki, stój w tym samym miejscu co paczka!!";

pub const INVALID_MARKER: &str = "Błąd: Nieprawidłowe dane lub współrzędne. Upewnij się, że zaznaczenie zostało wykonane poprawnie.";

pub const PHOTO_PROMPT: &str = "Proszę teraz przesłać zdjęcie paczki.";

pub const MARK_LOCATION_FIRST: &str = "Najpierw oznacz lokalizację paczki.";

pub const PHOTO_NOT_SAVED: &str = "Nie udało się zapisać zdjęcia paczki. Spróbuj ponownie.";

pub const UNKNOWN_MESSAGE: &str =
    "Nie rozumiem tej wiadomości. Użyj /start, aby oznaczyć miejsce paczki.";

const SHARE_LOCATION_BUTTON: &str = "Udostępnij lokalizację";
const OPEN_MAP_BUTTON: &str = "Otwórz mapę";
const MARK_HERE_BUTTON: &str = "Zaznacz paczkę tutaj";
const SEND_PHOTO_BUTTON: &str = "Prześlij zdjęcie paczki";

fn coordinate_lines(coordinate: Coordinate) -> String {
    format!(
        "📍 Szerokość: {:?}\n📍 Długość: {:?}",
        coordinate.latitude, coordinate.longitude
    )
}

pub fn location_saved(coordinate: Coordinate) -> String {
    format!(
        "Dziękuję! Twoja lokalizacja została zapisana.\n{}\nMożesz teraz otworzyć mapę, która wyświetli się w Twojej lokalizacji.",
        coordinate_lines(coordinate)
    )
}

pub fn marker_confirmed(marker: MarkerPayload, photo_flow: bool) -> String {
    let closing = if photo_flow {
        "Dziękujemy za użycie bota! Proszę teraz przesłać zdjęcie paczki."
    } else {
        "Dziękujemy za użycie bota!"
    };
    format!(
        "Paczka została oznaczona pod współrzędnymi:\n{}\n{closing}",
        coordinate_lines(marker.coordinate())
    )
}

pub fn photo_saved(coordinate: Coordinate) -> String {
    format!(
        "Dziękujemy za przesłanie zdjęcia paczki!\n{}\nZdjęcie paczki zostało zapisane.",
        coordinate_lines(coordinate)
    )
}

pub fn photo_caption(coordinate: Coordinate) -> String {
    coordinate_lines(coordinate)
}

pub fn share_location_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(
        KeyboardMarkup::new(vec![vec![
            KeyboardButton::new(SHARE_LOCATION_BUTTON).request(ButtonRequest::Location)
        ]])
        .one_time_keyboard(true),
    )
}

fn single_button(text: &str, data: String) -> ReplyMarkup {
    ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(text, data),
    ]]))
}

pub fn open_map_keyboard() -> ReplyMarkup {
    single_button(OPEN_MAP_BUTTON, OPEN_MAP.to_string())
}

pub fn mark_here_keyboard(marker: MarkerPayload) -> ReplyMarkup {
    single_button(MARK_HERE_BUTTON, marker.to_string())
}

pub fn send_photo_keyboard() -> ReplyMarkup {
    single_button(SEND_PHOTO_BUTTON, SEND_PHOTO.to_string())
}
