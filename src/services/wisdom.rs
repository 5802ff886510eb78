use std::collections::BTreeMap;

use rand::Rng;

use crate::models::task::Task;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

impl Quote {
    fn new(text: &str, author: &str) -> Self {
        Self {
            text: text.to_string(),
            author: author.to_string(),
        }
    }
}

/// Quote pools keyed by task metadata, with a fallback pool for tasks
/// carrying no recognized tags.
#[derive(Debug, Default, Clone)]
pub struct WisdomSet {
    pub mood: BTreeMap<String, Vec<Quote>>,
    pub category: BTreeMap<String, Vec<Quote>>,
    pub priority: BTreeMap<String, Vec<Quote>>,
    pub fallback: Vec<Quote>,
}

/// Exclude the previous quote only when the user asked for a refresh.
pub fn resolve_exclude_text(last_text: &str, force_refresh: bool) -> Option<&str> {
    if force_refresh && !last_text.is_empty() {
        Some(last_text)
    } else {
        None
    }
}

/// Picks a quote for a completed task.
///
/// The candidate pool concatenates the mood, category, and priority
/// pools (in that order), falling back to the default pool when all
/// three come up empty. An `exclude_text` filter never empties the
/// result: if nothing survives the filter, the unfiltered pool is used.
/// Returns `None` only when no quote exists anywhere.
pub fn pick_quote_for_task<'a>(
    task: &Task,
    set: &'a WisdomSet,
    exclude_text: Option<&str>,
    rng: &mut impl Rng,
) -> Option<&'a Quote> {
    let mut pool: Vec<&Quote> = Vec::new();
    if !task.mood.is_empty()
        && let Some(quotes) = set.mood.get(&task.mood)
    {
        pool.extend(quotes.iter());
    }
    if !task.category.is_empty()
        && let Some(quotes) = set.category.get(&task.category)
    {
        pool.extend(quotes.iter());
    }
    if !task.priority.is_empty()
        && let Some(quotes) = set.priority.get(&task.priority)
    {
        pool.extend(quotes.iter());
    }
    if pool.is_empty() {
        pool.extend(set.fallback.iter());
    }
    if pool.is_empty() {
        return None;
    }

    let candidates: Vec<&Quote> = match exclude_text {
        Some(text) => {
            let filtered: Vec<&Quote> = pool
                .iter()
                .copied()
                .filter(|quote| quote.text != text)
                .collect();
            if filtered.is_empty() { pool } else { filtered }
        }
        None => pool,
    };

    let index = rng.random_range(0..candidates.len());
    Some(candidates[index])
}

/// The built-in quote set.
pub fn default_wisdom_set() -> WisdomSet {
    let mut mood = BTreeMap::new();
    mood.insert(
        "bright".to_string(),
        vec![
            Quote::new("Your spark lights the path ahead.", "Journey Log"),
            Quote::new("Joy is a compass. Follow where it points.", "Journey Log"),
            Quote::new("Let this glow guide your next move.", "Journey Log"),
        ],
    );
    mood.insert(
        "calm".to_string(),
        vec![
            Quote::new("Steady breaths make steady steps.", "Journey Log"),
            Quote::new("Quiet focus is still forward motion.", "Journey Log"),
            Quote::new("Gentle pace, steady progress.", "Journey Log"),
        ],
    );
    mood.insert(
        "focused".to_string(),
        vec![
            Quote::new("Precision today, momentum tomorrow.", "Journey Log"),
            Quote::new("Aim true; the path shortens.", "Journey Log"),
            Quote::new("Each laser-fine step moves mountains.", "Journey Log"),
        ],
    );
    mood.insert(
        "reflective".to_string(),
        vec![
            Quote::new("Looking back helps the next stride land.", "Journey Log"),
            Quote::new(
                "Pause, notice, and carry the insight forward.",
                "Journey Log",
            ),
            Quote::new("Your reflection is a compass in disguise.", "Journey Log"),
        ],
    );

    let mut category = BTreeMap::new();
    category.insert(
        "wellness".to_string(),
        vec![
            Quote::new(
                "Care for your energy and the journey cares for you.",
                "Journey Log",
            ),
            Quote::new("Rest and action are teammates, not rivals.", "Journey Log"),
        ],
    );
    category.insert(
        "creative".to_string(),
        vec![
            Quote::new("Tiny experiments build big worlds.", "Journey Log"),
            Quote::new("Curiosity is your co-pilot today.", "Journey Log"),
        ],
    );
    category.insert(
        "planning".to_string(),
        vec![
            Quote::new("A map drawn today shortens tomorrow.", "Journey Log"),
            Quote::new("Every outline frees up future you.", "Journey Log"),
        ],
    );
    category.insert(
        "connection".to_string(),
        vec![
            Quote::new("Bridges grow stronger one hello at a time.", "Journey Log"),
            Quote::new(
                "A sincere note can turn into a landmark moment.",
                "Journey Log",
            ),
        ],
    );

    let mut priority = BTreeMap::new();
    priority.insert(
        "low".to_string(),
        vec![
            Quote::new("Soft steps still leave footprints.", "Journey Log"),
            Quote::new("Gentle pacing keeps the journey light.", "Journey Log"),
        ],
    );
    priority.insert(
        "medium".to_string(),
        vec![
            Quote::new("Balanced effort keeps you moving.", "Journey Log"),
            Quote::new("You're tuning the tempo just right.", "Journey Log"),
        ],
    );
    priority.insert(
        "high".to_string(),
        vec![
            Quote::new("When it matters most, every move counts.", "Journey Log"),
            Quote::new("This is a keystone. Place it with care.", "Journey Log"),
        ],
    );

    let fallback = vec![
        Quote::new(
            "The journey of a thousand miles begins with a single step.",
            "Lao Tzu",
        ),
        Quote::new(
            "Believe you can and you're halfway there.",
            "Theodore Roosevelt",
        ),
        Quote::new(
            "Our greatest glory is not in never failing, but in rising up every time we fail.",
            "Ralph Waldo Emerson",
        ),
        Quote::new(
            "The future belongs to those who believe in the beauty of their dreams.",
            "Eleanor Roosevelt",
        ),
        Quote::new(
            "Keep going. Your story is unfolding one line at a time.",
            "Journey Log",
        ),
    ];

    WisdomSet {
        mood,
        category,
        priority,
        fallback,
    }
}
