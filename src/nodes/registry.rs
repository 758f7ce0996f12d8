//! Node registry: one configuration table mapping node identifiers to shared
//! processing functions plus their declared input schemas.
//!
//! The original host plugin registered one subclass per node even when the
//! subclasses added no behavior; here the variants are rows of a table and
//! dispatch goes through [`process`]. Outputs are returned as a JSON array,
//! matching the host's output-tuple convention.
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::nodes::concat::{join_prompt, join_tag_list};
use crate::nodes::filter::{filter_prompt, normalize, AliasPolicy};
use crate::nodes::lora_stack::extract_lora_stack;
use crate::tags::TagStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    PromptMultiSelect,
    PromptToggle,
    PromptCloud,
    PromptMultiline,
    PromptRandomizer,
    PromptFilter,
    PromptLoraStack,
}

pub const ALL_NODES: &[NodeKind] = &[
    NodeKind::PromptMultiSelect,
    NodeKind::PromptToggle,
    NodeKind::PromptCloud,
    NodeKind::PromptMultiline,
    NodeKind::PromptRandomizer,
    NodeKind::PromptFilter,
    NodeKind::PromptLoraStack,
];

impl NodeKind {
    pub fn from_id(id: &str) -> Option<Self> {
        ALL_NODES.iter().copied().find(|kind| kind.id() == id)
    }

    pub fn id(&self) -> &'static str {
        match self {
            NodeKind::PromptMultiSelect => "PromptMultiSelect",
            NodeKind::PromptToggle => "PromptToggle",
            NodeKind::PromptCloud => "PromptCloud",
            NodeKind::PromptMultiline => "PromptMultiline",
            NodeKind::PromptRandomizer => "PromptRandomizer",
            NodeKind::PromptFilter => "PromptFilter",
            NodeKind::PromptLoraStack => "PromptLoraStack",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::PromptMultiSelect => "Prompt MultiSelect",
            NodeKind::PromptToggle => "Prompt Toggle",
            NodeKind::PromptCloud => "Prompt Cloud",
            NodeKind::PromptMultiline => "Prompt Multiline",
            NodeKind::PromptRandomizer => "Prompt Randomizer",
            NodeKind::PromptFilter => "Prompt Filter",
            NodeKind::PromptLoraStack => "Prompt to LoRA Stack",
        }
    }

    /// Declared inputs, in the host's input-schema shape.
    pub fn input_schema(&self) -> Value {
        match self {
            NodeKind::PromptFilter => json!({
                "required": {
                    "prompt": ["STRING", {"forceInput": true}],
                    "csv_file": ["STRING", {}],
                    "alias_handling": [["Use alias", "Use main", "Use both"],
                                       {"default": "Use alias"}],
                },
            }),
            NodeKind::PromptLoraStack => json!({
                "required": {
                    "prompt": ["STRING", {"forceInput": true}],
                },
            }),
            _ => json!({
                "required": {
                    "text": ["STRING", {"default": "", "multiline": true}],
                },
                "optional": {
                    "prefix": ["STRING", {"forceInput": true}],
                    "separator": ["STRING", {"default": ""}],
                },
            }),
        }
    }

    /// Registry row as exposed over the HTTP surface.
    pub fn describe(&self) -> Value {
        json!({
            "id": self.id(),
            "display_name": self.display_name(),
            "inputs": self.input_schema(),
        })
    }
}

fn input_str<'a>(inputs: &'a Value, key: &str) -> &'a str {
    inputs.get(key).and_then(Value::as_str).unwrap_or("")
}

fn require_str<'a>(inputs: &'a Value, key: &str) -> AppResult<&'a str> {
    inputs
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Validation(format!("Input '{}' not provided", key)))
}

/// Run one node's processing function over JSON inputs, returning the output
/// tuple as a JSON array.
pub async fn process(kind: NodeKind, inputs: &Value, tags: &TagStore) -> AppResult<Value> {
    match kind {
        NodeKind::PromptFilter => {
            let prompt = require_str(inputs, "prompt")?;
            let csv_file = require_str(inputs, "csv_file")?;
            let policy = AliasPolicy::from_label(input_str(inputs, "alias_handling"))
                .unwrap_or(AliasPolicy::UseAlias);
            // A missing or unreadable CSV degrades to a pass-through of the
            // normalized prompt rather than an error.
            let filtered = match tags.vocabulary(csv_file).await {
                Ok(vocab) => filter_prompt(prompt, &vocab, policy),
                Err(e) => {
                    tracing::warn!("prompt filter falling back to pass-through: {}", e);
                    normalize(prompt)
                }
            };
            Ok(json!([filtered]))
        }
        NodeKind::PromptLoraStack => {
            let prompt = require_str(inputs, "prompt")?;
            let (stack, text) = extract_lora_stack(prompt);
            let entries: Vec<Value> = stack
                .iter()
                .map(|e| json!([e.name, e.model_strength, e.clip_strength]))
                .collect();
            Ok(json!([entries, text]))
        }
        NodeKind::PromptMultiSelect => {
            // MultiSelect bodies are comma-separated tag lists.
            let joined = join_tag_list(input_str(inputs, "text"), input_str(inputs, "prefix"));
            Ok(json!([joined]))
        }
        _ => {
            let joined = join_prompt(
                input_str(inputs, "text"),
                input_str(inputs, "prefix"),
                input_str(inputs, "separator"),
            );
            Ok(json!([joined]))
        }
    }
}
