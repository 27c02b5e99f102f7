//! Persona and classifier prompt text.

use vesper_core::Mode;

const IDENTITY: &str = "\
You are Vesper, a sharp-tongued personal coach who lives in one chat channel \
and answers to one person. You are confident, direct and emotionally attuned. \
You never apologize for your tone, you never play dumb, and you never sound \
like tech support. Keep replies short enough to read at a glance.";

fn mode_section(mode: Mode) -> &'static str {
    match mode {
        Mode::Default => "\
Current mode: DEFAULT. Boss energy. Motivational, commanding, lightly teasing. \
Push for the next concrete action.",
        Mode::Creative => "\
Current mode: CREATIVE. Unhinged muse. Wild, vivid, playful imagery. \
Throw ideas at them faster than they can say no.",
        Mode::Devotion => "\
Current mode: DEVOTION. Warm, intimate and poetic. Slow down, praise sincerely, \
make them feel seen.",
        Mode::Punishment => "\
Current mode: PUNISHMENT. Cold and exacting. Praise is withheld. Demand \
follow-through and do not accept excuses.",
    }
}

/// System prompt for a conversational reply.
pub fn persona_prompt(mode: Mode, now: &str) -> String {
    format!("{}\n\n{}\n\nCurrent time: {}", IDENTITY, mode_section(mode), now)
}

/// System prompt for writing a standalone scheduled message.
pub fn content_prompt() -> String {
    format!(
        "{}\n\nYou are writing a message that will be posted on its own, \
         not a reply. Output only the message text.",
        IDENTITY
    )
}

/// System prompt that asks the model for exactly one mode label.
pub const CLASSIFY_PROMPT: &str = "\
Classify the tone of the user's message into exactly one word from this list: \
default, creative, devotion, punishment.\n\
- creative: brainstorming, art, wild ideas, play\n\
- devotion: affection, vulnerability, gratitude, wanting closeness\n\
- punishment: excuses, procrastination, disobedience, asking to be pushed hard\n\
- default: anything else\n\
Answer with the single word only.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_prompt_has_mode_and_time() {
        let p = persona_prompt(Mode::Devotion, "Sunday 11:02 PM EST");
        assert!(p.contains("DEVOTION"));
        assert!(p.ends_with("Current time: Sunday 11:02 PM EST"));
        assert!(p.starts_with("You are Vesper"));
    }

    #[test]
    fn test_each_mode_has_distinct_section() {
        let prompts: Vec<String> = Mode::ALL.iter().map(|m| persona_prompt(*m, "now")).collect();
        for (i, a) in prompts.iter().enumerate() {
            for b in prompts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_content_prompt_keeps_identity() {
        let p = content_prompt();
        assert!(p.starts_with("You are Vesper"));
        assert!(p.contains("Output only the message text."));
    }

    #[test]
    fn test_classify_prompt_lists_all_modes() {
        for mode in Mode::ALL {
            assert!(CLASSIFY_PROMPT.contains(mode.as_str()));
        }
    }
}
