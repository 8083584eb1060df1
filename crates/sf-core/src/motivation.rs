//! Canned motivation messages.
//!
//! Selection is deterministic (keyed off streak length or relapse count) so
//! rendered output is stable under test. AI-generated motivation lives in
//! `sf-llm`; these catalogs double as its offline fallback.

const SUCCESS_MESSAGES: &[&str] = &[
    "Great work! Every sugar-free day is a win.",
    "Your willpower is showing. Keep it up!",
    "One more day toward a healthier you.",
    "You are getting stronger every single day.",
    "Keep the momentum going. You've got this!",
    "Your persistence is paying off.",
    "Another day closer to breaking the habit for good.",
];

const SLIP_UP_MESSAGES: &[&str] = &[
    "Don't beat yourself up. Slip-ups happen to everyone.",
    "Tomorrow is a new day and a fresh start.",
    "One slip does not erase your progress.",
    "Every setback is a lesson. Keep moving forward.",
    "Remember why you started. You are stronger than the craving.",
    "Progress is never a straight line. Start again tomorrow.",
];

/// Returns an encouragement line for a successful check-in.
///
/// Milestone streaks (a week, a month, a hundred days, and whole weeks in
/// between) get a dedicated celebration.
pub fn success_message(streak_days: u32) -> String {
    match streak_days {
        7 => "A full week sugar-free! That is a real milestone.".to_string(),
        30 => "A whole month sugar-free! Incredible discipline.".to_string(),
        100 => "100 days! You have built a completely new habit.".to_string(),
        days if days > 0 && days % 7 == 0 => {
            format!("{days} days! Every week you get stronger.")
        }
        days => pick(SUCCESS_MESSAGES, days).to_string(),
    }
}

/// Returns a supportive line for a slip-up.
pub fn slip_up_message(relapse_count: u32) -> &'static str {
    pick(SLIP_UP_MESSAGES, relapse_count)
}

/// Returns a celebration line for a completed challenge.
pub fn challenge_completed_message(length_days: u32) -> String {
    format!("Challenge complete: {length_days} days without sugar. Outstanding!")
}

fn pick(catalog: &'static [&'static str], key: u32) -> &'static str {
    catalog[key as usize % catalog.len()]
}
