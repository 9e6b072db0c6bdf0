// ABOUTME: Skills module - SKILL.md discovery into SkillDescriptors and the
// ABOUTME: toolset that lets agents list, load, and read skills.

mod descriptor;
mod toolset;

pub use descriptor::{
    SKILL_FILE, SkillDescriptor, SkillRoots, load_skill_dirs, load_skills, parse_skill,
};
pub use toolset::{
    ListSkillsTool, LoadSkillTool, ReadSkillResourceTool, SkillLibrary, SkillsToolset,
};
