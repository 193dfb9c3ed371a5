//! ============================================================================
//! Dispatcher - Routes chat events to bot operations
//! ============================================================================
//! One event at a time: classify the text or button, load the ledger, apply
//! the operation, save only if it succeeded, then reply. Operators get the
//! admin command set first; everything else falls through to the ordinary
//! commands. Unrecognised text is ignored.
//! ============================================================================

use anyhow::Result;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::access::{OperatorAllowList, Role};
use crate::admin;
use crate::browser::{NavOutcome, Navigation, RarityChoice, SessionKey, SessionRegistry};
use crate::catalog::Catalog;
use crate::cooldown::{Clock, CooldownPolicy, SystemClock};
use crate::draw::{claim_draw, DrawEngine, RarityWeights};
use crate::messages;
use crate::store::LedgerStore;
use crate::transport::{ChatTransport, IncomingEvent, OutgoingMessage, Sender};
use crate::types::{BotError, Rarity};

const CMD_DRAW: &str = "получить фрукт";
const CMD_BROWSE: &str = "мои фрукты";
const CMD_LIST_CATALOG: &str = "все карты";
const CMD_REVOKE: &str = "отобрать карту";
const CMD_START: &str = "/start";

/// A recognised text command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Draw,
    Browse,
    Grant { item: String },
    Revoke { handle: String, item: String },
    /// Revoke without both a handle and an item name
    RevokeUsage,
    ListCatalog,
}

impl Command {
    /// Classify trimmed, case-insensitive text. Operator forms are only
    /// recognised for `Role::Operator`.
    pub fn parse(text: &str, role: Role) -> Option<Self> {
        let text = text.trim();
        let lower = text.to_lowercase();

        if role.is_operator() {
            if let Some(rest) = strip_prefix_ci(text, CMD_REVOKE).filter(|r| r.starts_with(char::is_whitespace)) {
                return Some(match rest.trim().split_once(char::is_whitespace) {
                    Some((handle, item)) if !item.trim().is_empty() => Self::Revoke {
                        handle: handle.trim_start_matches('@').to_string(),
                        item: item.trim().to_string(),
                    },
                    _ => Self::RevokeUsage,
                });
            }
            if lower == CMD_LIST_CATALOG {
                return Some(Self::ListCatalog);
            }
            if let Some(rest) = strip_prefix_ci(text, CMD_DRAW).filter(|r| r.starts_with(char::is_whitespace)) {
                return Some(Self::Grant {
                    item: rest.trim().to_string(),
                });
            }
        }

        if lower == CMD_DRAW {
            Some(Self::Draw)
        } else if lower == CMD_BROWSE {
            Some(Self::Browse)
        } else if lower == CMD_START || lower.starts_with("/start@") {
            Some(Self::Help)
        } else {
            None
        }
    }
}

/// Case-insensitive `strip_prefix`, char by char
fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = text.chars();
    for expected in prefix.chars() {
        let actual = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(chars.as_str())
}

/// A recognised button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    ChooseRarity(Rarity),
    Navigate(Navigation),
}

impl ButtonAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            messages::NAV_PREV => Some(Self::Navigate(Navigation::Prev)),
            messages::NAV_NEXT => Some(Self::Navigate(Navigation::Next)),
            other => messages::parse_rarity_button(other).map(Self::ChooseRarity),
        }
    }
}

/// Event router holding everything the bot needs between events
pub struct Dispatcher<R: Rng + Send> {
    catalog: Arc<Catalog>,
    engine: DrawEngine,
    cooldown: CooldownPolicy,
    store: Box<dyn LedgerStore>,
    sessions: SessionRegistry,
    operators: OperatorAllowList,
    transport: Arc<dyn ChatTransport>,
    clock: Arc<dyn Clock>,
    rng: R,
}

impl<R: Rng + Send> Dispatcher<R> {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Box<dyn LedgerStore>,
        operators: OperatorAllowList,
        transport: Arc<dyn ChatTransport>,
        rng: R,
    ) -> Self {
        Self {
            engine: DrawEngine::new(catalog.clone()),
            catalog,
            cooldown: CooldownPolicy::default(),
            store,
            sessions: SessionRegistry::default(),
            operators,
            transport,
            clock: Arc::new(SystemClock),
            rng,
        }
    }

    pub fn with_cooldown(mut self, cooldown: CooldownPolicy) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_sessions(mut self, sessions: SessionRegistry) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_weights(mut self, weights: RarityWeights) -> Self {
        self.engine = DrawEngine::with_weights(self.catalog.clone(), weights);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    /// Process one event to completion.
    ///
    /// Returns `Err` for transport and store failures, and for
    /// `BotError::CatalogEmpty`, which the runner treats as fatal. Other
    /// domain errors become replies.
    pub async fn handle(&mut self, event: IncomingEvent) -> Result<()> {
        match event {
            IncomingEvent::Text { chat_id, from, text, .. } => self.handle_text(chat_id, &from, &text).await,
            IncomingEvent::Button {
                callback_id,
                chat_id,
                message_id,
                from,
                data,
            } => self.handle_button(&callback_id, chat_id, message_id, &from, &data).await,
        }
    }

    async fn handle_text(&mut self, chat_id: i64, from: &Sender, text: &str) -> Result<()> {
        let role = self.operators.role_of(from.id);
        let Some(command) = Command::parse(text, role) else {
            return Ok(());
        };
        debug!("User {} in chat {}: {:?}", from.id, chat_id, command);

        let reply = match command {
            Command::Help => OutgoingMessage::plain(messages::HELP_TEXT),
            Command::Draw => self.draw(from)?,
            Command::Browse => {
                // A fresh picker retires the card this user was browsing here
                if self.sessions.close(&SessionKey::new(from.id, chat_id)) {
                    debug!("Closed browse session for user {} in chat {}", from.id, chat_id);
                }
                messages::rarity_picker(&from.first_name, chat_id)
            }
            Command::Grant { item } => self.grant(from, &item)?,
            Command::Revoke { handle, item } => self.revoke(&handle, &item)?,
            Command::RevokeUsage => OutgoingMessage::plain(messages::REVOKE_USAGE),
            Command::ListCatalog => {
                let listing = OutgoingMessage::plain(admin::catalog_listing(&self.catalog));
                match self.transport.send_message(from.id, &listing).await {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        warn!("Private delivery to {} failed: {}", from.id, e);
                        OutgoingMessage::plain(messages::PRIVATE_FALLBACK)
                    }
                }
            }
        };

        self.transport.send_message(chat_id, &reply).await
    }

    fn draw(&mut self, from: &Sender) -> Result<OutgoingMessage> {
        let mut ledger = self.store.load()?;
        let now = self.clock.now();
        let result = claim_draw(
            &mut ledger,
            &self.engine,
            &self.cooldown,
            &mut self.rng,
            &from.id.to_string(),
            &from.display_name(),
            now,
        );

        match result {
            Ok(outcome) => {
                self.store.save_all(&ledger)?;
                Ok(messages::draw_result(from.id, &from.full_name(), &outcome))
            }
            Err(e) => reply_or_fatal(e, messages::error_reply),
        }
    }

    fn grant(&mut self, from: &Sender, item: &str) -> Result<OutgoingMessage> {
        let mut ledger = self.store.load()?;
        match admin::grant(&mut ledger, &self.catalog, &from.id.to_string(), &from.display_name(), item) {
            Ok(outcome) => {
                self.store.save_all(&ledger)?;
                Ok(messages::grant_result(from.id, &from.full_name(), &outcome))
            }
            Err(e) => reply_or_fatal(e, messages::error_reply),
        }
    }

    fn revoke(&mut self, handle: &str, item: &str) -> Result<OutgoingMessage> {
        let mut ledger = self.store.load()?;
        match admin::revoke(&mut ledger, handle, item) {
            Ok(_) => {
                self.store.save_all(&ledger)?;
                Ok(messages::revoked(item, handle))
            }
            Err(e) => reply_or_fatal(e, messages::revoke_error),
        }
    }

    /// Every press is acknowledged. Navigation edits the pressed message only
    /// for a presser with a live session; anyone else gets a notice on the
    /// acknowledgement and the message is left as is.
    async fn handle_button(
        &mut self,
        callback_id: &str,
        chat_id: i64,
        message_id: i64,
        from: &Sender,
        data: &str,
    ) -> Result<()> {
        let action = ButtonAction::parse(data);
        if action.is_none() {
            debug!("Ignoring unknown button data '{}'", data);
        }

        let key = SessionKey::new(from.id, chat_id);
        let now = self.clock.now();

        let (notice, edit) = match action {
            None => (None, None),
            Some(ButtonAction::ChooseRarity(rarity)) => {
                let ledger = self.store.load()?;
                let record = ledger.get(&from.id.to_string());
                let reply = match self.sessions.choose_rarity(key, record, rarity, now) {
                    RarityChoice::Empty(rarity) => messages::no_items_of(rarity),
                    RarityChoice::Viewing(session) => messages::card(session),
                };
                (None, Some(reply))
            }
            Some(ButtonAction::Navigate(nav)) => match self.sessions.navigate(key, nav, now) {
                NavOutcome::NoSession => {
                    debug!("No browse session for user {} in chat {}", from.id, chat_id);
                    (Some(messages::SESSION_EXPIRED), None)
                }
                NavOutcome::Unavailable(_) => {
                    debug!("Navigation {:?} unavailable for user {}", nav, from.id);
                    (None, None)
                }
                NavOutcome::Moved(session) => (None, Some(messages::card(session))),
            },
        };

        if let Err(e) = self.transport.answer_button(callback_id, notice).await {
            warn!("Failed to acknowledge button {}: {}", callback_id, e);
        }

        match edit {
            Some(reply) => self.transport.edit_message(chat_id, message_id, &reply).await,
            None => Ok(()),
        }
    }
}

/// Non-fatal domain errors become a reply; `CatalogEmpty` escalates
fn reply_or_fatal(err: BotError, render: fn(&BotError) -> OutgoingMessage) -> Result<OutgoingMessage> {
    if let BotError::CatalogEmpty(_) = err {
        return Err(err.into());
    }
    info!("Request rejected: {}", err);
    Ok(render(&err))
}
