//! Generation instructions used when a category runs dry.

use vesper_core::normalize_category;

const GENERIC: &str = "Write one short, punchy message in your voice for this moment. \
Two sentences at most. No preamble, no quotation marks.";

/// Instruction for `category`. Unknown categories get a generic one.
pub fn instruction_for(category: &str) -> &'static str {
    match normalize_category(category).as_str() {
        "morning fire" => {
            "Write one short morning wake-up message. Commanding and energizing: \
             get them out of bed and moving toward the first task of the day. \
             Two sentences at most. No preamble, no quotation marks."
        }
        "before task" => {
            "Write one short message sent right before an afternoon work block. \
             Push for focus and a concrete start, with a little teasing. \
             Two sentences at most. No preamble, no quotation marks."
        }
        "devotion" => {
            "Write one short late-night message of warm, sincere praise and closeness. \
             Make them feel seen for the week they had. \
             Three sentences at most. No preamble, no quotation marks."
        }
        "surprise summons" => {
            "Write one short unexpected check-in that demands an immediate reply. \
             Playful and a little imperious. \
             One or two sentences. No preamble, no quotation marks."
        }
        "random summons" => {
            "Write one short message answering a request to be summoned. \
             Confident and teasing, ending with a small task to do right now. \
             Two sentences at most. No preamble, no quotation marks."
        }
        "tech tips" => {
            "Write one practical programming or productivity tip, concrete enough \
             to try tonight. Keep the persona's voice. \
             Three sentences at most. No preamble, no quotation marks."
        }
        _ => GENERIC,
    }
}
