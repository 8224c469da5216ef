//! Prompt templates, the selected template, and recently used ones
//!
//! A prompt's `value` is the text placed in front of the user's selection.
//! The selected prompt is tracked by value, the recent list by label.

use crate::error::{PopAskError, Result};
use crate::storage::{keys, load_json, save_json, KeyValueStore};
use serde::{Deserialize, Serialize};

/// Label of the built-in prompt
pub const DEFAULT_PROMPT_LABEL: &str = "翻译成中文";

/// Template of the built-in prompt
pub const DEFAULT_PROMPT_VALUE: &str = "请将以下文本翻译成中文，保持原文的语气和风格：\n";

/// A prompt template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub label: String,
    pub value: String,
    /// Global hotkey bound to this prompt, empty when unbound
    #[serde(default)]
    pub shortcut: String,
}

impl Prompt {
    /// Build a prompt, making sure the template ends with a newline
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        let mut value = value.into();
        if !value.ends_with('\n') {
            value.push('\n');
        }
        Self {
            label: label.into(),
            value,
            shortcut: String::new(),
        }
    }
}

/// The prompts shipped with the app
pub fn default_prompts() -> Vec<Prompt> {
    vec![Prompt {
        label: DEFAULT_PROMPT_LABEL.to_string(),
        value: DEFAULT_PROMPT_VALUE.to_string(),
        shortcut: String::new(),
    }]
}

/// Combine a template with the selected text
pub fn format_message(template: &str, text: &str) -> String {
    format!("{}{}", template, text)
}

/// Prompt list plus selection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptLibrary {
    prompts: Vec<Prompt>,
    selected: String,
    recent: Vec<Prompt>,
    recent_limit: usize,
}

impl PromptLibrary {
    /// Library with the default prompt selected and no history
    pub fn new(recent_limit: usize) -> Self {
        Self {
            prompts: default_prompts(),
            selected: DEFAULT_PROMPT_VALUE.to_string(),
            recent: Vec::new(),
            recent_limit,
        }
    }

    /// Load from the store; missing or unreadable keys fall back to defaults
    pub fn load(store: &dyn KeyValueStore, recent_limit: usize) -> Self {
        let defaults = Self::new(recent_limit);
        Self {
            prompts: load_json(store, keys::PROMPT_LIST).unwrap_or(defaults.prompts),
            selected: load_json(store, keys::SELECTED_PROMPT).unwrap_or(defaults.selected),
            recent: load_json(store, keys::RECENT_PROMPTS).unwrap_or_default(),
            recent_limit,
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) {
        save_json(store, keys::PROMPT_LIST, &self.prompts);
        save_json(store, keys::SELECTED_PROMPT, &self.selected);
        save_json(store, keys::RECENT_PROMPTS, &self.recent);
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    /// Template of the selected prompt (may be empty)
    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// The selected prompt, if it is still in the list
    pub fn selected_prompt(&self) -> Option<&Prompt> {
        self.find_by_value(&self.selected)
    }

    pub fn recent(&self) -> &[Prompt] {
        &self.recent
    }

    pub fn find_by_value(&self, value: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.value == value)
    }

    pub fn find_by_label(&self, label: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.label == label)
    }

    /// Select a template by value
    pub fn select(&mut self, value: impl Into<String>) {
        self.selected = value.into();
    }

    /// Select the prompt with `label`, returning its template
    pub fn select_by_label(&mut self, label: &str) -> Option<String> {
        let value = self.find_by_label(label)?.value.clone();
        self.selected = value.clone();
        Some(value)
    }

    /// Add a prompt
    ///
    /// # Errors
    ///
    /// Returns `PopAskError::InvalidPrompt` when the label or template is
    /// blank, or when the label is already taken
    pub fn add(&mut self, label: &str, value: &str) -> Result<()> {
        let label = label.trim();
        if label.is_empty() {
            return Err(PopAskError::InvalidPrompt("Name is required.".to_string()).into());
        }
        if value.trim().is_empty() {
            return Err(
                PopAskError::InvalidPrompt("Prompt content is required.".to_string()).into(),
            );
        }
        if self.find_by_label(label).is_some() {
            return Err(PopAskError::InvalidPrompt(format!(
                "A prompt named '{}' already exists.",
                label
            ))
            .into());
        }

        self.prompts.push(Prompt::new(label, value));
        Ok(())
    }

    /// Remove the prompt with `label`
    ///
    /// Removing the selected prompt clears the selection.
    pub fn remove(&mut self, label: &str) -> bool {
        let Some(index) = self.prompts.iter().position(|p| p.label == label) else {
            return false;
        };
        let removed = self.prompts.remove(index);
        if removed.value == self.selected {
            self.selected.clear();
        }
        self.recent.retain(|p| p.label != label);
        true
    }

    /// Move the selected prompt to the front of the recent list
    ///
    /// The list is deduplicated by label and capped at the configured
    /// length. Does nothing when the selection matches no prompt.
    pub fn record_recent(&mut self) -> Option<&Prompt> {
        let prompt = self.selected_prompt()?.clone();
        self.recent.retain(|p| p.label != prompt.label);
        self.recent.insert(0, prompt);
        self.recent.truncate(self.recent_limit);
        self.recent.first()
    }

    /// Swap the template at the start of `staged` for `template`
    ///
    /// When `staged` begins with a known template that prefix is replaced;
    /// otherwise `template` is put in front of the whole text.
    pub fn retemplate(&self, staged: &str, template: &str) -> String {
        for prompt in &self.prompts {
            if !prompt.value.is_empty() {
                if let Some(rest) = staged.strip_prefix(prompt.value.as_str()) {
                    return format_message(template, rest);
                }
            }
        }
        format_message(template, staged)
    }
}
