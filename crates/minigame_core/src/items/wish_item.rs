//! The Magic Wish: a flower that asks a language model for console
//! commands.
//!
//! Right-clicking prompts the holder to speak their wish in chat. The wish
//! is shipped to the chat-completion client off-thread; the response is
//! re-marshaled onto the tick thread before anything touches game state,
//! and each returned line runs as a console command scoped to the wisher's
//! world.

use crate::hooks::HookSet;
use crate::items::{CustomItem, ItemKind};
use crate::session::Session;
use chat_client::ChatCompletion;
use minigame_host::{Host, Material, PlayerChatEvent, PlayerId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};
use tracing::{error, info};

/// One-shot wish granter.
pub struct WishItem {
    session: Weak<Session>,
    chat: Arc<dyn ChatCompletion>,
    /// Players whose next chat line is their wish.
    awaiting: Mutex<HashSet<PlayerId>>,
}

impl WishItem {
    pub fn new(session: &Arc<Session>, chat: Arc<dyn ChatCompletion>) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::downgrade(session),
            chat,
            awaiting: Mutex::new(HashSet::new()),
        })
    }

    fn build_prompt(player_name: &str, world_name: &str, wish: &str) -> String {
        format!(
            "You are the console of a Minecraft server. Respond ONLY with \
             vanilla console commands, one per line, no commentary. The \
             commands should grant, as closely as the game allows, this wish \
             from player {player_name} in world {world_name}: {wish}"
        )
    }

    fn grant_wish(&self, player: PlayerId, wish: String) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let host = Arc::clone(session.host());
        let (player_name, world_name) = match host.with_player(player, |p| {
            let world = host
                .worlds
                .get(p.location.world)
                .map(|w| w.name.clone())
                .unwrap_or_default();
            (p.name.clone(), world)
        }) {
            Some(names) => names,
            None => return,
        };

        // Consume one wish flower.
        let marker = ItemKind::Wish.variant_id();
        host.with_player_mut(player, |p| {
            for stack in p.inventory.contents_mut() {
                let is_wish = stack
                    .as_ref()
                    .and_then(|s| s.custom_item_marker())
                    .map(|m| m == marker.as_str())
                    .unwrap_or(false);
                if is_wish {
                    *stack = None;
                    break;
                }
            }
        });

        info!(%player, %wish, "shipping wish to chat completion");
        let chat = Arc::clone(&self.chat);
        let prompt = Self::build_prompt(&player_name, &world_name, &wish);
        tokio::spawn(async move {
            let result = chat.request(&prompt).await;
            // Game state is only touched from the tick thread.
            host.scheduler.run_next_tick({
                let host = Arc::clone(&host);
                move || match result {
                    Ok(response) => execute_wish(&host, player, &world_name, &response),
                    Err(err) => {
                        error!(%player, %err, "wish request failed");
                        host.send_message(player, "\u{a7}cThe wish fizzles out...");
                    }
                }
            });
        });
    }
}

fn execute_wish(host: &Host, player: PlayerId, world_name: &str, response: &str) {
    let mut executed = 0;
    for line in response.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let line = line.trim_start_matches('/');
        host.dispatch_console_command(format!("execute in {world_name} run {line}"));
        executed += 1;
    }
    info!(%player, commands = executed, "wish granted");
    host.send_message(player, "\u{a7}dYour wish has been granted!");
}

impl CustomItem for WishItem {
    fn kind(&self) -> ItemKind {
        ItemKind::Wish
    }

    fn display_name(&self) -> String {
        "\u{a7}dMagic Wish".to_string()
    }

    fn material(&self) -> Material {
        Material::Sunflower
    }

    fn lore(&self) -> Vec<String> {
        vec![
            "Right-click, then speak your wish in chat".to_string(),
            "Single use".to_string(),
        ]
    }

    fn on_right_click(&self, player: PlayerId) -> bool {
        let Some(session) = self.session.upgrade() else {
            return false;
        };
        let mut awaiting = self.awaiting.lock().expect("wish state poisoned");
        if awaiting.insert(player) {
            session
                .host()
                .send_message(player, "\u{a7}dState your wish in chat.");
        } else {
            session
                .host()
                .send_message(player, "\u{a7}dOne wish at a time.");
        }
        true
    }

    fn register(self: Arc<Self>, session: &Arc<Session>) -> HookSet {
        let mut hooks = HookSet::default();
        let item = Arc::downgrade(&self);
        hooks.subscriptions.push(
            session
                .host()
                .events
                .subscribe::<PlayerChatEvent, _>(move |event| {
                    let Some(item) = item.upgrade() else {
                        return;
                    };
                    let speaking = item
                        .awaiting
                        .lock()
                        .expect("wish state poisoned")
                        .remove(&event.player);
                    if speaking {
                        event.cancelled = true;
                        item.grant_wish(event.player, event.message.clone());
                    }
                }),
        );
        hooks
    }
}
