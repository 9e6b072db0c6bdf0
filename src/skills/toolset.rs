// ABOUTME: SkillsToolset - exposes loaded skills to an agent as three tools:
// ABOUTME: list_skills, load_skill, and read_skill_resource (confined to the skill dir).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::SkillDescriptor;
use crate::agent::RunContext;
use crate::error::{SkillError, ToolError};
use crate::tool::{Tool, ToolResult};
use crate::toolset::Toolset;

/// An immutable set of skills shared by the skill tools.
#[derive(Debug, Default)]
pub struct SkillLibrary {
    skills: Vec<SkillDescriptor>,
}

impl SkillLibrary {
    pub fn new(skills: Vec<SkillDescriptor>) -> Self {
        Self { skills }
    }

    pub fn skills(&self) -> &[SkillDescriptor] {
        &self.skills
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn get(&self, id: &str) -> Result<&SkillDescriptor, SkillError> {
        self.skills
            .iter()
            .find(|s| s.id == id || s.name == id)
            .ok_or_else(|| SkillError::NotFound(id.to_string()))
    }

    /// Files bundled with a skill, relative to its directory.
    pub fn resources(&self, skill: &SkillDescriptor) -> Vec<String> {
        let pattern = skill.dir.join("**").join("*");
        let Ok(paths) = glob::glob(&pattern.to_string_lossy()) else {
            return Vec::new();
        };
        let mut files: Vec<String> = paths
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .filter_map(|p| {
                p.strip_prefix(&skill.dir)
                    .ok()
                    .map(|rel| rel.to_string_lossy().replace('\\', "/"))
            })
            .filter(|rel| rel != super::SKILL_FILE)
            .collect();
        files.sort();
        files
    }

    /// Read a file inside a skill directory. Paths resolving outside the
    /// skill (via `..` or symlinks) are rejected.
    pub fn read_resource(&self, id: &str, resource: &str) -> Result<String, SkillError> {
        let skill = self.get(id)?;
        let outside = || SkillError::OutsideSkill {
            skill: skill.id.clone(),
            resource: resource.to_string(),
        };
        if Path::new(resource).is_absolute() {
            return Err(outside());
        }

        let io_err = |path: &Path| {
            let path = path.display().to_string();
            move |source| SkillError::Io { path, source }
        };
        let root = skill.dir.canonicalize().map_err(io_err(&skill.dir))?;
        let requested = root.join(resource);
        let resolved: PathBuf = requested.canonicalize().map_err(io_err(&requested))?;
        if !resolved.starts_with(&root) {
            return Err(outside());
        }

        std::fs::read_to_string(&resolved).map_err(io_err(&resolved))
    }

    /// Short listing appended to an agent's instructions.
    pub fn prompt_section(&self) -> Option<String> {
        if self.skills.is_empty() {
            return None;
        }
        let mut section = String::from(
            "## Skills\nLoad a skill with `load_skill` before using it for a matching request.\n",
        );
        for skill in &self.skills {
            section.push_str(&format!("- {}: {}\n", skill.id, skill.description));
        }
        Some(section)
    }
}

/// Toolset over a [`SkillLibrary`].
pub struct SkillsToolset {
    name: String,
    library: Arc<SkillLibrary>,
}

impl SkillsToolset {
    pub fn new(name: impl Into<String>, skills: Vec<SkillDescriptor>) -> Self {
        Self {
            name: name.into(),
            library: Arc::new(SkillLibrary::new(skills)),
        }
    }

    pub fn library(&self) -> &Arc<SkillLibrary> {
        &self.library
    }
}

#[async_trait]
impl Toolset for SkillsToolset {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>, ToolError> {
        Ok(vec![
            Arc::new(ListSkillsTool(Arc::clone(&self.library))),
            Arc::new(LoadSkillTool(Arc::clone(&self.library))),
            Arc::new(ReadSkillResourceTool(Arc::clone(&self.library))),
        ])
    }
}

/// Lists the available skills.
pub struct ListSkillsTool(Arc<SkillLibrary>);

#[async_trait]
impl Tool for ListSkillsTool {
    fn name(&self) -> &str {
        "list_skills"
    }

    fn description(&self) -> &str {
        "List the skills available to you with their descriptions and tags."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        _params: serde_json::Value,
    ) -> Result<ToolResult, anyhow::Error> {
        Ok(ToolResult::json(&self.0.skills()))
    }
}

/// Returns a skill's instructions and its bundled files.
pub struct LoadSkillTool(Arc<SkillLibrary>);

#[async_trait]
impl Tool for LoadSkillTool {
    fn name(&self) -> &str {
        "load_skill"
    }

    fn description(&self) -> &str {
        "Load the full instructions of a skill by id, plus the list of resource files it bundles."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "skill_id": {
                    "type": "string",
                    "description": "Id of the skill, as returned by list_skills"
                }
            },
            "required": ["skill_id"]
        })
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        params: serde_json::Value,
    ) -> Result<ToolResult, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            skill_id: String,
        }
        let params: Params = serde_json::from_value(params)?;

        let skill = match self.0.get(&params.skill_id) {
            Ok(skill) => skill,
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };
        let instructions = match skill.instructions() {
            Ok(text) => text,
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };

        let mut content = format!("# {}\n\n{}", skill.name, instructions);
        let resources = self.0.resources(skill);
        if !resources.is_empty() {
            content.push_str("\n\n## Resources\n");
            for r in &resources {
                content.push_str(&format!("- {}\n", r));
            }
        }
        Ok(ToolResult::text(content).with_metadata("resources", resources))
    }
}

/// Reads one file bundled with a skill.
pub struct ReadSkillResourceTool(Arc<SkillLibrary>);

#[async_trait]
impl Tool for ReadSkillResourceTool {
    fn name(&self) -> &str {
        "read_skill_resource"
    }

    fn description(&self) -> &str {
        "Read a resource file bundled with a skill. The path is relative to the skill directory."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "skill_id": {"type": "string"},
                "path": {
                    "type": "string",
                    "description": "Relative path of the resource inside the skill"
                }
            },
            "required": ["skill_id", "path"]
        })
    }

    async fn execute(
        &self,
        _ctx: &RunContext,
        params: serde_json::Value,
    ) -> Result<ToolResult, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            skill_id: String,
            path: String,
        }
        let params: Params = serde_json::from_value(params)?;

        match self.0.read_resource(&params.skill_id, &params.path) {
            Ok(content) => Ok(ToolResult::text(content)),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}
