//! ============================================================================
//! Messages - User-facing texts and keyboards
//! ============================================================================
//! Everything the bot says lives here. HTML texts escape every value that
//! comes from a user or the catalog.
//! ============================================================================

use crate::browser::BrowseSession;
use crate::cooldown::Remaining;
use crate::draw::DrawOutcome;
use crate::transport::{Button, Keyboard, OutgoingMessage};
use crate::types::{BotError, Rarity};

pub const NAV_PREV: &str = "prev";
pub const NAV_NEXT: &str = "next";
const RARITY_PREFIX: &str = "rarity_";

pub const HELP_TEXT: &str = "🍇 Бот для коллекционирования фруктов!\n\
Пиши:\n\
• «Получить фрукт» - раз в 4 часа\n\
• «Мои фрукты» - показать коллекцию";

pub const PRIVATE_FALLBACK: &str = "⚠ Напишите мне в личные сообщения для получения списка!";
pub const SESSION_EXPIRED: &str = "⌛ Просмотр устарел. Напишите «Мои фрукты» ещё раз.";
pub const REVOKE_USAGE: &str = "❌ Формат: Отобрать карту @username Название_Карты";

/// Escape `<`, `>`, `&` and `"` for Telegram HTML
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Clickable user mention
pub fn mention(user_id: i64, name: &str) -> String {
    format!("<a href=\"tg://user?id={}\">{}</a>", user_id, escape_html(name))
}

/// Whole numbers without a trailing ".0"
pub fn format_stat(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn format_health(health: Option<f64>) -> String {
    health.map(format_stat).unwrap_or_else(|| "N/A".to_string())
}

/// `name` is the sender's full name, shown as the mention text
pub fn draw_result(user_id: i64, name: &str, outcome: &DrawOutcome) -> OutgoingMessage {
    let item = &outcome.item;
    let mut text = format!(
        "🎉 {} получил(а):\n<b>{}</b>\n🏷 Редкость: {}\n⚔ Урон: {}\n❤ Здоровье: {}",
        mention(user_id, name),
        escape_html(&item.name),
        item.rarity,
        format_stat(item.damage),
        format_health(item.health)
    );
    push_duplicates(&mut text, outcome);
    OutgoingMessage::html(text)
}

pub fn grant_result(user_id: i64, name: &str, outcome: &DrawOutcome) -> OutgoingMessage {
    let item = &outcome.item;
    let mut text = format!(
        "🎉 Админ {} получил:\n<b>{}</b>\n🏷 Редкость: {}\n⚔ Урон: {}",
        mention(user_id, name),
        escape_html(&item.name),
        item.rarity,
        format_stat(item.damage)
    );
    push_duplicates(&mut text, outcome);
    OutgoingMessage::html(text)
}

fn push_duplicates(text: &mut String, outcome: &DrawOutcome) {
    if let Some(count) = outcome.duplicate_count() {
        text.push_str(&format!("\n⚠ Дубликатов: {}", count));
    }
}

pub fn cooldown(remaining: Remaining) -> OutgoingMessage {
    OutgoingMessage::plain(format!(
        "⏳ Следующая попытка через {} ч. {} мин.",
        remaining.hours(),
        remaining.minutes()
    ))
}

pub fn revoked(item_name: &str, handle: &str) -> OutgoingMessage {
    OutgoingMessage::plain(format!(
        "✅ Карта {} отобрана у @{}",
        item_name,
        handle.trim_start_matches('@')
    ))
}

/// Short reply for a non-fatal error
pub fn error_reply(err: &BotError) -> OutgoingMessage {
    let text = match err {
        BotError::ItemNotFound(_) => "❌ Фрукт не найден!".to_string(),
        BotError::UserNotFound(_) => "❌ Пользователь не найден!".to_string(),
        BotError::CooldownActive(remaining) => return cooldown(*remaining),
        BotError::MalformedCommand(_) => REVOKE_USAGE.to_string(),
        BotError::CatalogEmpty(rarity) => format!("⚠ В каталоге нет фруктов редкости {}", rarity),
        BotError::StoreCorrupt(_) => "⚠ Данные коллекций недоступны, попробуйте позже".to_string(),
    };
    OutgoingMessage::plain(text)
}

/// Revoke-specific wording: the target simply doesn't own that fruit
pub fn revoke_error(err: &BotError) -> OutgoingMessage {
    match err {
        BotError::ItemNotFound(_) => OutgoingMessage::plain("❌ У пользователя нет такой карты!"),
        other => error_reply(other),
    }
}

/// Callback data for a rarity button
pub fn rarity_button_data(rarity: Rarity, chat_id: i64) -> String {
    format!("{}{}_{}", RARITY_PREFIX, rarity, chat_id)
}

/// Parse `rarity_<Rarity>[_<chat>]`
pub fn parse_rarity_button(data: &str) -> Option<Rarity> {
    let rest = data.strip_prefix(RARITY_PREFIX)?;
    let name = rest.split('_').next()?;
    name.parse().ok()
}

pub fn rarity_picker(first_name: &str, chat_id: i64) -> OutgoingMessage {
    let rows = Rarity::ALL
        .iter()
        .map(|rarity| vec![Button::new(rarity.as_str(), rarity_button_data(*rarity, chat_id))])
        .collect();
    OutgoingMessage::plain(format!("{}, ваши фрукты:", first_name)).with_keyboard(Keyboard::new(rows))
}

pub fn no_items_of(rarity: Rarity) -> OutgoingMessage {
    OutgoingMessage::plain(format!("🚫 Нет фруктов с редкостью {}", rarity))
}

/// Card for the session's current item, with prev/next only where valid
pub fn card(session: &BrowseSession) -> OutgoingMessage {
    let item = session.current();
    let text = format!(
        "🍇 Фрукт {}/{}\n📛 <b>{}</b>\n🏷 Редкость: {}\n🔮 Тип: {}\n⚔ Урон: {}\n❤ Здоровье: {}",
        session.index() + 1,
        session.len(),
        escape_html(&item.name),
        item.rarity,
        escape_html(&item.kind),
        format_stat(item.damage),
        format_health(item.health)
    );

    let mut nav = Vec::new();
    if session.has_prev() {
        nav.push(Button::new("⬅️", NAV_PREV));
    }
    if session.has_next() {
        nav.push(Button::new("➡️", NAV_NEXT));
    }
    OutgoingMessage::html(text).with_keyboard(Keyboard::new(vec![nav]))
}
