//! Prompt library for receipt extraction
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/ticketer/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Extraction uses two prompts per receipt: the envelope (`extract_receipt`),
//! which fixes the JSON shape, and one rule set chosen by [`StoreKind`].

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const IDENTIFY_STORE: &str = include_str!("../../../prompts/identify_store.md");
    pub const EXTRACT_RECEIPT: &str = include_str!("../../../prompts/extract_receipt.md");
    pub const ALDI_RULES: &str = include_str!("../../../prompts/aldi_rules.md");
    pub const CARREFOUR_RULES: &str = include_str!("../../../prompts/carrefour_rules.md");
    pub const GENERIC_RULES: &str = include_str!("../../../prompts/generic_rules.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Ask for the store name only
    IdentifyStore,
    /// Wraps the store rules and fixes the output JSON shape
    ExtractReceipt,
    AldiRules,
    CarrefourRules,
    GenericRules,
}

impl PromptId {
    /// Get the string identifier for this prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdentifyStore => "identify_store",
            Self::ExtractReceipt => "extract_receipt",
            Self::AldiRules => "aldi_rules",
            Self::CarrefourRules => "carrefour_rules",
            Self::GenericRules => "generic_rules",
        }
    }

    /// Get all known prompt IDs
    pub fn all() -> &'static [PromptId] {
        &[
            Self::IdentifyStore,
            Self::ExtractReceipt,
            Self::AldiRules,
            Self::CarrefourRules,
            Self::GenericRules,
        ]
    }

    /// Get the default embedded content for this prompt
    fn default_content(&self) -> &'static str {
        match self {
            Self::IdentifyStore => defaults::IDENTIFY_STORE,
            Self::ExtractReceipt => defaults::EXTRACT_RECEIPT,
            Self::AldiRules => defaults::ALDI_RULES,
            Self::CarrefourRules => defaults::CARREFOUR_RULES,
            Self::GenericRules => defaults::GENERIC_RULES,
        }
    }
}

/// Receipt layouts with dedicated extraction rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Aldi,
    Carrefour,
    /// Any store without its own rules
    Generic,
}

/// Identified store names (uppercase) and the layout they use
const STORE_LAYOUTS: &[(&str, StoreKind)] = &[
    ("ALDI", StoreKind::Aldi),
    ("CARREFOUR", StoreKind::Carrefour),
    ("CARREFOUR EXPRESS", StoreKind::Carrefour),
];

impl StoreKind {
    /// Resolve the layout for a store name as returned by identification
    pub fn from_store_name(name: &str) -> Self {
        let name = name.trim().to_uppercase();
        STORE_LAYOUTS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, kind)| *kind)
            .unwrap_or(StoreKind::Generic)
    }

    /// The rule prompt for this layout
    pub fn rules_prompt(&self) -> PromptId {
        match self {
            Self::Aldi => PromptId::AldiRules,
            Self::Carrefour => PromptId::CarrefourRules,
            Self::Generic => PromptId::GenericRules,
        }
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    /// Unique identifier
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
    /// Kind of model call (fast_vision, vision)
    pub task_type: String,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    /// Get the user section of the prompt
    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the user section (or whole body) with `{{var}}` placeholders replaced
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        let mut result = self.user_section().unwrap_or(&self.content).to_string();
        for (key, value) in vars {
            let pattern = format!("{{{{{}}}}}", key);
            result = result.replace(&pattern, value);
        }
        result
    }
}

/// Prompt library for loading and caching prompts
pub struct PromptLibrary {
    /// Override directory path
    override_dir: Option<PathBuf>,
    /// Cached parsed prompts
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Create a new prompt library with default paths
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with a custom override directory
    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a prompt by ID, loading from override or default
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        if !self.cache.contains_key(&id) {
            let prompt = self.load(id)?;
            self.cache.insert(id, prompt);
        }
        self.cache
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("prompt {}", id.as_str())))
    }

    /// Render the store identification prompt
    pub fn identify_store_prompt(&mut self) -> Result<String> {
        Ok(self.get(PromptId::IdentifyStore)?.render_user(&HashMap::new()))
    }

    /// Render the full extraction prompt for an identified store
    pub fn extraction_prompt(&mut self, store_name: &str) -> Result<String> {
        let kind = StoreKind::from_store_name(store_name);
        debug!(store = %store_name, layout = ?kind, "Selecting extraction rules");

        let instructions = self.get(kind.rules_prompt())?.render_user(&HashMap::new());

        let mut vars = HashMap::new();
        vars.insert("store_name", store_name);
        vars.insert("instructions", instructions.as_str());
        Ok(self.get(PromptId::ExtractReceipt)?.render_user(&vars))
    }

    /// Load a prompt (checking override first, then default)
    fn load(&self, id: PromptId) -> Result<Prompt> {
        if let Some(ref override_dir) = self.override_dir {
            let override_path = override_dir.join(format!("{}.md", id.as_str()));
            if override_path.exists() {
                let content = fs::read_to_string(&override_path).map_err(|e| {
                    Error::InvalidData(format!("Failed to read prompt override: {}", e))
                })?;
                let (metadata, body) = parse_prompt(&content)?;
                return Ok(Prompt {
                    metadata,
                    content: body,
                    is_override: true,
                    override_path: Some(override_path),
                });
            }
        }

        let (metadata, body) = parse_prompt(id.default_content())?;
        Ok(Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        })
    }

    /// List all prompts with their override status
    pub fn list(&mut self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .map(|&id| {
                let override_path = self.override_path(id);
                let prompt = self.get(id).ok();
                PromptInfo {
                    id: id.as_str().to_string(),
                    version: prompt.map(|p| p.metadata.version).unwrap_or(0),
                    task_type: prompt
                        .map(|p| p.metadata.task_type.clone())
                        .unwrap_or_default(),
                    has_override: override_path.is_some(),
                    override_path,
                }
            })
            .collect()
    }

    fn override_path(&self, id: PromptId) -> Option<PathBuf> {
        self.override_dir
            .as_ref()
            .map(|d| d.join(format!("{}.md", id.as_str())))
            .filter(|p| p.exists())
    }

    /// Get the override directory path
    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about a prompt for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub id: String,
    pub version: u32,
    pub task_type: String,
    pub has_override: bool,
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("ticketer").join("prompts").join("overrides"))
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    let rest = content.strip_prefix("---").ok_or_else(|| {
        Error::InvalidData("Prompt must start with YAML frontmatter (---)".into())
    })?;

    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

/// Extract a section from the prompt content
fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];

    // Sections end at the next top-level header
    let end = after_header.find("\n# ").unwrap_or(after_header.len());

    Some(after_header[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt() {
        let content = r#"---
id: test_prompt
version: 2
task_type: vision
---

# User
Receipt from {{store_name}}.
"#;

        let (metadata, body) = parse_prompt(content).unwrap();
        assert_eq!(metadata.id, "test_prompt");
        assert_eq!(metadata.version, 2);
        assert_eq!(metadata.task_type, "vision");
        assert!(body.starts_with("# User"));
    }

    #[test]
    fn test_parse_prompt_requires_frontmatter() {
        assert!(parse_prompt("# User\nno frontmatter").is_err());
        assert!(parse_prompt("---\nid: x\n# User").is_err());
    }

    #[test]
    fn test_user_section_keeps_markdown_subheaders() {
        let content = "# User\n## ROLE\n\nReader.\n\n## STEPS\n\n1. Read";
        let section = extract_section(content, "# User").unwrap();
        assert!(section.contains("## ROLE"));
        assert!(section.contains("1. Read"));
    }

    #[test]
    fn test_store_kind_mapping() {
        assert_eq!(StoreKind::from_store_name("ALDI"), StoreKind::Aldi);
        assert_eq!(StoreKind::from_store_name("aldi "), StoreKind::Aldi);
        assert_eq!(StoreKind::from_store_name("CARREFOUR"), StoreKind::Carrefour);
        assert_eq!(
            StoreKind::from_store_name("CARREFOUR EXPRESS"),
            StoreKind::Carrefour
        );
        assert_eq!(StoreKind::from_store_name("MERCADONA"), StoreKind::Generic);
        assert_eq!(StoreKind::from_store_name("UNKNOWN"), StoreKind::Generic);
        assert_eq!(StoreKind::from_store_name(""), StoreKind::Generic);
    }

    #[test]
    fn test_extraction_prompt_uses_store_rules() {
        let mut lib = PromptLibrary::embedded_only();

        let aldi = lib.extraction_prompt("ALDI").unwrap();
        assert!(aldi.contains("from the supermarket ALDI"));
        assert!(aldi.contains("Process the ALDI receipt"));
        assert!(aldi.contains("\"bought_date\""));
        assert!(!aldi.contains("{{"));

        let carrefour = lib.extraction_prompt("CARREFOUR EXPRESS").unwrap();
        assert!(carrefour.contains("Process the CARREFOUR [EXPRESS] receipt"));

        let generic = lib.extraction_prompt("MERCADONA").unwrap();
        assert!(generic.contains("identifying columns"));
        assert!(generic.contains("from the supermarket MERCADONA"));
    }

    #[test]
    fn test_identify_store_prompt() {
        let mut lib = PromptLibrary::embedded_only();
        let prompt = lib.identify_store_prompt().unwrap();
        assert!(prompt.contains("UPPERCASE"));
        assert!(prompt.contains("UNKNOWN"));
    }

    #[test]
    fn test_override_takes_precedence() {
        let dir = std::env::temp_dir().join(format!("ticketer_prompts_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("aldi_rules.md"),
            "---\nid: aldi_rules\nversion: 9\ntask_type: vision\n---\n\n# User\nCustom ALDI rules",
        )
        .unwrap();

        let mut lib = PromptLibrary::with_override_dir(dir.clone());
        let prompt = lib.extraction_prompt("ALDI").unwrap();
        assert!(prompt.contains("Custom ALDI rules"));

        let listed = lib.list();
        let aldi = listed.iter().find(|p| p.id == "aldi_rules").unwrap();
        assert!(aldi.has_override);
        assert_eq!(aldi.version, 9);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_prompt_library_embedded() {
        let mut lib = PromptLibrary::embedded_only();
        for id in PromptId::all() {
            let prompt = lib.get(*id).unwrap();
            assert!(!prompt.is_override);
        }
        assert_eq!(lib.list().len(), 5);
    }

    #[test]
    fn test_default_prompts_parse() {
        for id in PromptId::all() {
            let result = parse_prompt(id.default_content());
            assert!(
                result.is_ok(),
                "Failed to parse {}: {:?}",
                id.as_str(),
                result.err()
            );

            let (metadata, body) = result.unwrap();
            assert_eq!(metadata.id, id.as_str(), "Prompt ID mismatch");
            assert!(body.contains("# User"));
        }
    }
}
