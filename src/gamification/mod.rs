//! XP, levels, streaks and badges.
//!
//! Every transition takes the current [`GameState`] by reference and returns
//! the next state plus the events worth announcing, so the rules can be tested
//! without any storage behind them.

mod store;

pub use store::{GameStore, JsonFileStore, MemoryStore};

use aho_corasick::AhoCorasick;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const LEVEL_THRESHOLDS: [u32; 5] = [0, 50, 150, 300, 500];
pub const LEVEL_TITLES: [&str; 5] = ["Newcomer", "Trainee", "Athlete", "Competitor", "Elite"];
pub const XP_PER_MESSAGE: u32 = 10;
pub const MAX_LEVEL: u32 = 5;

const ON_A_ROLL_MESSAGES: u32 = 10;
const COMEBACK_STREAK_DAYS: u32 = 3;
const STREAK_DATE_FORMAT: &str = "%Y-%m-%d";
const INBOX_TRIGGERS: [&str; 3] = ["on its way", "sent to", "plan is on its way"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub id: &'static str,
    pub icon: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const BADGES: [Badge; 6] = [
    Badge {
        id: "first_rep",
        icon: "🏁",
        name: "First Rep",
        description: "Sent your first message",
    },
    Badge {
        id: "goal_setter",
        icon: "💬",
        name: "Goal Setter",
        description: "Got your first reply",
    },
    Badge {
        id: "on_a_roll",
        icon: "🔥",
        name: "On A Roll",
        description: "10 messages in one session",
    },
    Badge {
        id: "inbox",
        icon: "📧",
        name: "Inbox Athlete",
        description: "Got a plan emailed to you",
    },
    Badge {
        id: "comeback",
        icon: "⚡",
        name: "Comeback",
        description: "Opened 3 days in a row",
    },
    Badge {
        id: "elite",
        icon: "🏆",
        name: "Elite",
        description: "Reached Level 5",
    },
];

pub fn badge(id: &str) -> Option<&'static Badge> {
    BADGES.iter().find(|badge| badge.id == id)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Streak {
    /// ISO date of the last day the app was opened, empty before the first.
    pub last: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub xp: u32,
    pub level: u32,
    pub achievements: Vec<String>,
    pub streak: Streak,
    pub sessions: u32,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            achievements: Vec::new(),
            streak: Streak::default(),
            sessions: 0,
        }
    }
}

impl GameState {
    pub fn has_badge(&self, id: &str) -> bool {
        self.achievements.iter().any(|owned| owned == id)
    }

    pub fn level_title(&self) -> &'static str {
        level_title(self.level)
    }

    /// XP still missing for the next level, `None` at the top level.
    pub fn xp_to_next_level(&self) -> Option<u32> {
        LEVEL_THRESHOLDS
            .get(self.level as usize)
            .map(|next| next.saturating_sub(self.xp))
    }

    fn unlock(&mut self, id: &'static str, events: &mut Vec<GameEvent>) {
        if self.has_badge(id) {
            return;
        }
        self.achievements.push(id.to_string());
        events.push(GameEvent::BadgeUnlocked { id });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    LevelUp { level: u32, title: &'static str },
    BadgeUnlocked { id: &'static str },
    StreakExtended { days: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: GameState,
    pub events: Vec<GameEvent>,
}

pub fn compute_level(xp: u32) -> u32 {
    let reached = LEVEL_THRESHOLDS
        .iter()
        .rposition(|threshold| xp >= *threshold)
        .unwrap_or(0) as u32;
    (reached + 1).min(MAX_LEVEL)
}

pub fn level_title(level: u32) -> &'static str {
    let index = level.clamp(1, MAX_LEVEL) as usize - 1;
    LEVEL_TITLES[index]
}

/// Extend or restart the daily streak when the app is opened on `today`.
pub fn apply_day_rollover(state: &GameState, today: NaiveDate) -> Transition {
    let mut next = state.clone();
    let mut events = Vec::new();
    let today_key = today.format(STREAK_DATE_FORMAT).to_string();

    if next.streak.last != today_key {
        let yesterday_key = today
            .checked_sub_days(Days::new(1))
            .map(|day| day.format(STREAK_DATE_FORMAT).to_string());
        let continues = yesterday_key.as_deref() == Some(next.streak.last.as_str());
        next.streak.count = if continues { next.streak.count + 1 } else { 1 };
        next.streak.last = today_key;
        if continues {
            events.push(GameEvent::StreakExtended {
                days: next.streak.count,
            });
        }
    }

    if next.streak.count >= COMEBACK_STREAK_DAYS {
        next.unlock("comeback", &mut events);
    }

    Transition {
        state: next,
        events,
    }
}

/// Count one more app session.
pub fn apply_session_start(state: &GameState) -> GameState {
    let mut next = state.clone();
    next.sessions += 1;
    next
}

/// Award XP for a sent message. `session_messages` already includes it.
pub fn apply_message_sent(state: &GameState, session_messages: u32) -> Transition {
    let mut next = state.clone();
    let mut events = Vec::new();

    next.xp += XP_PER_MESSAGE;
    let level = compute_level(next.xp);
    if level > state.level {
        events.push(GameEvent::LevelUp {
            level,
            title: level_title(level),
        });
    }
    next.level = level;

    if level == MAX_LEVEL {
        next.unlock("elite", &mut events);
    }
    next.unlock("first_rep", &mut events);
    if session_messages == ON_A_ROLL_MESSAGES {
        next.unlock("on_a_roll", &mut events);
    }

    Transition {
        state: next,
        events,
    }
}

/// Badges earned by receiving a reply with this text.
pub fn apply_reply_received(state: &GameState, reply: &str) -> Transition {
    let mut next = state.clone();
    let mut events = Vec::new();

    next.unlock("goal_setter", &mut events);
    if inbox_triggers().is_match(reply) {
        next.unlock("inbox", &mut events);
    }

    Transition {
        state: next,
        events,
    }
}

fn inbox_triggers() -> &'static AhoCorasick {
    static MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
    MATCHER.get_or_init(|| {
        AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(INBOX_TRIGGERS)
            .expect("inbox trigger patterns must compile")
    })
}
