//! LoRA-stack extraction from prompt text.
//!
//! Scans for `<lora:FILE:STRENGTH>` tokens, emits `(file, model_strength,
//! clip_strength)` entries with the single strength used for both, and
//! returns the prompt with matched tokens removed and comma spacing
//! normalized. Tokens that do not match the pattern are left untouched.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static LORA_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"<lora:([^:]+):([0-9.]+)>").unwrap());
static COMMA_SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*,\s*").unwrap());
static COMMA_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(,\s*)+").unwrap());

/// One extracted LoRA reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoraEntry {
    pub name: String,
    pub model_strength: f64,
    pub clip_strength: f64,
}

/// Collapse separators and drop redundant components without touching the
/// filesystem, the way the references are written inside prompts.
fn normalize_ref_path(name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in name.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            p => parts.push(p),
        }
    }
    parts.join("/")
}

/// Extract all LoRA references from `prompt`.
///
/// Returns the stack and the cleaned prompt text. Filenames lacking both
/// `.safetensors` and `.pt` get `.safetensors` appended.
pub fn extract_lora_stack(prompt: &str) -> (Vec<LoraEntry>, String) {
    let mut stack = Vec::new();
    for caps in LORA_REF.captures_iter(prompt) {
        let strength: f64 = match caps[2].parse() {
            Ok(s) => s,
            Err(_) => continue,
        };
        let mut name = normalize_ref_path(&caps[1]);
        if !(name.ends_with(".safetensors") || name.ends_with(".pt")) {
            name.push_str(".safetensors");
        }
        stack.push(LoraEntry {
            name,
            model_strength: strength,
            clip_strength: strength,
        });
    }

    let cleaned = LORA_REF.replace_all(prompt, "");
    let cleaned = COMMA_SPACING.replace_all(&cleaned, ", ");
    let cleaned = COMMA_RUNS.replace_all(&cleaned, ", ");
    let cleaned = cleaned
        .trim_matches(|c| c == ',' || c == ' ')
        .trim()
        .to_string();

    (stack, cleaned)
}
