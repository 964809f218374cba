//! Dream icon picker
//!
//! Chooses a handful of named icon keys from English text by keyword hits.
//! The client renders each key with its own icon set.

/// Named dream icon: `(key, base weight, keywords)`
pub struct DreamIcon {
    pub key: &'static str,
    pub base: u32,
    pub keywords: &'static [&'static str],
}

const HIT_BONUS: u32 = 15;
const PER_HIT: u32 = 5;
const MAX_FREQUENCY_BONUS: u32 = 20;

macro_rules! icon {
    ($key:literal, $base:literal, [$($kw:literal),* $(,)?]) => {
        DreamIcon { key: $key, base: $base, keywords: &[$($kw),*] }
    };
}

pub const DREAM_ICONS: &[DreamIcon] = &[
    icon!("forest", 100, ["forest", "woods", "woodland", "trees", "tree", "pine", "jungle"]),
    icon!("bell", 92, ["bell", "bells", "ringing", "chime", "chimes", "ding", "toll"]),
    icon!("wind", 88, ["wind", "breeze", "gust", "blowing", "windy"]),
    icon!("music", 86, ["music", "melody", "song", "sing", "singing", "tune", "rhythm", "notes"]),
    // atmosphere and nature
    icon!("light", 70, ["light", "sun", "sunlight", "bright", "glow", "daylight"]),
    icon!("night", 62, ["night", "moon", "dark", "midnight"]),
    icon!("stars", 60, ["stars", "starry", "constellation"]),
    icon!("rain", 65, ["rain", "raining", "stormy", "drizzle", "wet"]),
    icon!("snow", 64, ["snow", "snowing", "blizzard", "icy"]),
    icon!("storm", 66, ["thunder", "lightning", "storm", "hurricane"]),
    icon!("water", 72, ["sea", "ocean", "waves", "river", "lake", "water", "swim", "swimming"]),
    icon!("fire", 74, ["fire", "flame", "burn", "burning", "smoke", "wildfire"]),
    icon!("tears", 58, ["tears", "cry", "crying", "wet eyes", "sob"]),
    icon!("mountain", 55, ["mountain", "hill", "peak", "cliff"]),
    icon!("nature", 52, ["nature", "leaf", "leaves", "green", "garden"]),
    icon!("flowers", 48, ["flower", "flowers", "blossom", "rose", "bouquet"]),
    // animals
    icon!("bird", 50, ["bird", "birds", "eagle", "crow", "owl"]),
    icon!("insects", 44, ["bug", "insect", "spider", "ants", "bee", "wasp"]),
    icon!("fish", 44, ["fish", "fishing", "aquarium"]),
    icon!("animals", 46, ["dog", "cat", "wolf", "bear", "animal", "paw", "pet"]),
    // places
    icon!("home", 68, ["home", "house", "apartment", "room", "bedroom"]),
    icon!("city", 45, ["city", "building", "street", "downtown"]),
    icon!("hospital", 52, ["hospital", "doctor", "nurse", "clinic", "surgery"]),
    icon!("school", 50, ["school", "class", "teacher", "exam", "university", "college"]),
    icon!("shop", 42, ["shop", "store", "mall", "market"]),
    // travel and movement
    icon!("car", 56, ["car", "drive", "driving", "parking", "road"]),
    icon!("public_transport", 40, ["bus", "subway", "metro"]),
    icon!("train", 44, ["train", "railway", "station"]),
    icon!("plane", 48, ["plane", "flight", "airport", "flying"]),
    icon!("ship", 44, ["ship", "boat", "sailing", "harbor"]),
    icon!("route", 46, ["route", "path", "journey", "trip"]),
    icon!("navigation", 40, ["navigate", "navigation", "compass", "direction"]),
    icon!("footsteps", 54, ["run", "running", "walk", "walking", "chase", "escape", "footsteps"]),
    icon!("location", 36, ["place", "location", "where", "map", "address"]),
    // objects and security
    icon!("key", 44, ["key", "keys", "unlock"]),
    icon!("lock", 52, ["lock", "locked", "closed door", "padlock"]),
    icon!("protection", 50, ["protect", "protection", "safe", "safety", "guard"]),
    // perception and interaction
    icon!("watching", 46, ["watching", "stare", "eyes", "looked at", "seen"]),
    icon!("hiding", 46, ["hide", "hiding", "invisible", "secret"]),
    icon!("search", 42, ["search", "looking for", "find", "finding"]),
    icon!("phone", 36, ["phone", "call", "calling"]),
    icon!("chat", 36, ["message", "chat", "texting", "sms"]),
    // people and emotions
    icon!("people", 42, ["people", "crowd", "group", "everyone"]),
    icon!("person", 40, ["person", "someone", "man", "woman", "stranger"]),
    icon!("baby", 42, ["baby", "child", "kid", "newborn"]),
    icon!("love", 62, ["love", "kiss", "romance", "heart"]),
    icon!("heartbreak", 58, ["breakup", "heartbreak", "betrayal", "cheating"]),
    icon!("happy", 45, ["happy", "joy", "smile", "smiling"]),
    icon!("sad", 45, ["sad", "depressed", "lonely", "cry"]),
    icon!("anger", 50, ["angry", "anger", "rage", "furious"]),
    icon!("laugh", 38, ["laugh", "laughing", "funny"]),
    // dark themes
    icon!("death", 60, ["death", "dead", "die", "dying", "corpse"]),
    icon!("ghost", 55, ["ghost", "haunted", "spirit", "paranormal"]),
    // abstract
    icon!("magic", 42, ["magic", "magical", "spell", "sparkle"]),
    icon!("idea", 34, ["idea", "realize", "insight", "understand"]),
    icon!("time", 36, ["time", "clock", "late", "early"]),
    icon!("date", 28, ["date", "calendar", "birthday", "anniversary"]),
    icon!("waiting", 32, ["wait", "waiting", "delay"]),
    // media and hobbies
    icon!("camera", 26, ["camera", "photo", "picture", "shooting"]),
    icon!("tv", 24, ["tv", "television", "screen", "show"]),
    icon!("game", 24, ["game", "gaming", "console", "playstation", "xbox"]),
    icon!("reading", 24, ["read", "reading", "book", "library"]),
    icon!("writing", 22, ["write", "writing", "pen", "note", "journal"]),
    icon!("cut", 18, ["cut", "scissors", "knife", "trim"]),
    // daily life
    icon!("shopping", 20, ["shopping", "buy", "purchase", "bag"]),
    icon!("money", 22, ["money", "pay", "payment", "credit", "card"]),
    icon!("work", 24, ["work", "job", "office", "boss", "meeting"]),
    icon!("food", 22, ["food", "eat", "eating", "dinner", "lunch", "restaurant"]),
    icon!("coffee", 20, ["coffee", "cafe", "espresso"]),
    icon!("fruit", 16, ["apple", "fruit"]),
    icon!("pizza", 16, ["pizza"]),
    icon!("drums", 18, ["drum", "drums", "drumming"]),
    icon!("guitar", 18, ["guitar"]),
    icon!("singing", 20, ["microphone", "mic", "singing", "karaoke"]),
    // sound
    icon!("silence", 30, ["silence", "silent", "quiet", "mute"]),
    icon!("loud", 24, ["loud", "noisy", "noise"]),
    // conflict
    icon!("danger", 54, ["danger", "warning", "threat", "panic"]),
    icon!("fight", 52, ["fight", "fighting", "attack", "battle", "war"]),
];

/// Lowercase, drop apostrophes, anything outside `[a-z0-9 ]` becomes a space
fn normalize_en_text(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| *c != '\'' && *c != '\u{2019}')
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pick up to `max` icon keys for English text, best first
pub fn pick_dream_icons(text: &str, max: usize) -> Vec<&'static str> {
    let text = normalize_en_text(text);
    if text.is_empty() || max == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(&'static str, u32)> = DREAM_ICONS
        .iter()
        .filter_map(|icon| {
            let hits = icon
                .keywords
                .iter()
                .map(|kw| normalize_en_text(kw))
                .filter(|kw| !kw.is_empty() && text.contains(kw.as_str()))
                .count() as u32;
            (hits > 0).then(|| {
                let frequency = (hits * PER_HIT).min(MAX_FREQUENCY_BONUS);
                (icon.key, icon.base + HIT_BONUS + frequency)
            })
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.into_iter().take(max).map(|(key, _)| key).collect()
}

pub fn is_known_icon(key: &str) -> bool {
    DREAM_ICONS.iter().any(|icon| icon.key == key)
}
