// ABOUTME: SkillDescriptor and the SKILL.md loader - YAML frontmatter parsing,
// ABOUTME: directory discovery, and the domain/supervisor skill roots.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SkillError;

pub const SKILL_FILE: &str = "SKILL.md";

/// A skill as advertised to agents and in the A2A agent card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDescriptor {
    /// Directory name of the skill.
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub input_modes: Vec<String>,
    pub output_modes: Vec<String>,
    /// Directory holding SKILL.md and its resources.
    #[serde(skip)]
    pub dir: PathBuf,
}

impl SkillDescriptor {
    pub fn skill_file(&self) -> PathBuf {
        self.dir.join(SKILL_FILE)
    }

    /// The SKILL.md body below the frontmatter.
    pub fn instructions(&self) -> Result<String, SkillError> {
        let path = self.skill_file();
        let content = std::fs::read_to_string(&path).map_err(|source| SkillError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(split_frontmatter(&content)
            .map(|(_, body)| body)
            .unwrap_or(&content)
            .trim()
            .to_string())
    }
}

#[derive(Debug, Deserialize)]
struct Frontmatter {
    name: Option<String>,
    #[serde(default)]
    description: String,
    tags: Option<Vec<String>>,
}

/// Split `---\n<yaml>\n---\n<body>` into its parts.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.trim_start_matches('\u{feff}').trim_start();
    let rest = rest.strip_prefix("---")?;
    let end = rest.find("\n---")?;
    let yaml = &rest[..end];
    let body = rest[end + 4..].trim_start_matches(['\r', '\n']);
    Some((yaml, body))
}

/// Parse one SKILL.md found in `dir`.
pub fn parse_skill(dir: &Path, content: &str) -> Result<SkillDescriptor, SkillError> {
    let path = dir.join(SKILL_FILE).display().to_string();
    let id = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| SkillError::Format {
            path: path.clone(),
            message: "skill directory has no name".to_string(),
        })?;

    let (yaml, _) = split_frontmatter(content).ok_or_else(|| SkillError::Format {
        path: path.clone(),
        message: "missing YAML frontmatter".to_string(),
    })?;
    let front: Frontmatter = serde_yaml::from_str(yaml).map_err(|e| SkillError::Format {
        path,
        message: e.to_string(),
    })?;

    Ok(SkillDescriptor {
        name: front.name.unwrap_or_else(|| id.clone()),
        description: front.description.trim().to_string(),
        tags: front
            .tags
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| vec![id.clone()]),
        input_modes: vec!["text".to_string()],
        output_modes: vec!["text".to_string()],
        dir: dir.to_path_buf(),
        id,
    })
}

/// Load the skills under `dir`.
///
/// `dir` is either a skill itself (it holds SKILL.md) or a directory of
/// skills (`dir/*/SKILL.md`). A missing directory yields no skills; broken
/// skill files are logged and skipped. Results are sorted by id.
pub fn load_skills(dir: &Path) -> Result<Vec<SkillDescriptor>, SkillError> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "Skills directory not found");
        return Ok(Vec::new());
    }

    let skill_dirs: Vec<PathBuf> = if dir.join(SKILL_FILE).is_file() {
        vec![dir.to_path_buf()]
    } else {
        let pattern = dir.join("*").join(SKILL_FILE);
        let pattern = pattern.to_string_lossy();
        glob::glob(&pattern)
            .map_err(|e| SkillError::Format {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?
            .filter_map(Result::ok)
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect()
    };

    let mut skills = Vec::new();
    for skill_dir in skill_dirs {
        let file = skill_dir.join(SKILL_FILE);
        let parsed = std::fs::read_to_string(&file)
            .map_err(|source| SkillError::Io {
                path: file.display().to_string(),
                source,
            })
            .and_then(|content| parse_skill(&skill_dir, &content));
        match parsed {
            Ok(skill) => skills.push(skill),
            Err(e) => warn!(error = %e, "Skipping skill"),
        }
    }

    skills.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(skills)
}

/// Load several directories in order; the first skill with a given id wins.
pub fn load_skill_dirs(dirs: &[PathBuf]) -> Result<Vec<SkillDescriptor>, SkillError> {
    let mut seen = HashSet::new();
    let mut skills = Vec::new();
    for dir in dirs {
        for skill in load_skills(dir)? {
            if seen.insert(skill.id.clone()) {
                skills.push(skill);
            }
        }
    }
    Ok(skills)
}

/// Where skills live: the bundled default root and an optional custom root.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillRoots {
    pub default: PathBuf,
    pub custom: Option<PathBuf>,
}

impl SkillRoots {
    pub fn new(default: impl Into<PathBuf>) -> Self {
        Self {
            default: default.into(),
            custom: None,
        }
    }

    pub fn with_custom(mut self, custom: impl Into<PathBuf>) -> Self {
        self.custom = Some(custom.into());
        self
    }

    /// Directory name holding one domain's skills.
    pub fn domain_dir_name(tag: &str) -> String {
        format!("plane-{}", tag.replace('_', "-"))
    }

    /// Existing skill directories for `tag`, custom root first.
    pub fn domain_dirs(&self, tag: &str) -> Vec<PathBuf> {
        let name = Self::domain_dir_name(tag);
        self.custom
            .iter()
            .chain(std::iter::once(&self.default))
            .map(|root| root.join(&name))
            .filter(|dir| dir.is_dir())
            .collect()
    }

    /// Roots searched for supervisor skills: default, then custom.
    pub fn supervisor_dirs(&self) -> Vec<PathBuf> {
        std::iter::once(self.default.clone())
            .chain(self.custom.clone())
            .collect()
    }
}
