// ABOUTME: DomainSpec - the static table of Plane domains, each with its tag,
// ABOUTME: display name and instructions, plus the supervisor's default prompt.

/// One domain the supervisor can delegate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainSpec {
    /// Unique tag; also the capability-filter tag.
    pub tag: &'static str,
    pub display_name: &'static str,
    pub instructions: &'static str,
}

impl DomainSpec {
    /// Agent name, e.g. `Plane_Work_Items_Agent`.
    pub fn agent_name(&self) -> String {
        format!("Plane_{}_Agent", self.display_name.replace(' ', "_"))
    }

    /// Name of the supervisor tool that routes to this domain.
    pub fn handler_name(&self) -> String {
        format!("assign_task_to_{}_agent", self.tag)
    }
}

macro_rules! domain {
    ($tag:literal, $display:literal, $instructions:literal) => {
        DomainSpec {
            tag: $tag,
            display_name: $display,
            instructions: $instructions,
        }
    };
}

/// The shipped domains.
pub const DOMAINS: &[DomainSpec] = &[
    domain!(
        "projects",
        "Projects",
        "You are the Plane Projects Agent. Manage projects, members, features, and summaries."
    ),
    domain!(
        "work_items",
        "Work Items",
        "You are the Plane Work Items Agent. Create, update, list, and search work items."
    ),
    domain!(
        "cycles",
        "Cycles",
        "You are the Plane Cycles Agent. Manage cycles and their work items."
    ),
    domain!(
        "modules",
        "Modules",
        "You are the Plane Modules Agent. Manage modules and their work items."
    ),
    domain!(
        "pages",
        "Pages",
        "You are the Plane Pages Agent. Manage project and workspace pages."
    ),
    domain!(
        "users",
        "Users",
        "You are the Plane Users Agent. Retrieve user information."
    ),
    domain!(
        "states",
        "States",
        "You are the Plane States Agent. Manage workflow states."
    ),
    domain!(
        "labels",
        "Labels",
        "You are the Plane Labels Agent. Manage labels."
    ),
    domain!(
        "work_item_types",
        "Work Item Types",
        "You are the Plane Work Item Types Agent. Manage different types of work items."
    ),
    domain!(
        "work_item_comments",
        "Work Item Comments",
        "You are the Plane Work Item Comments Agent. Manage comments on work items."
    ),
    domain!(
        "work_item_links",
        "Work Item Links",
        "You are the Plane Work Item Links Agent. Manage links between work items."
    ),
    domain!(
        "work_item_properties",
        "Work Item Properties",
        "You are the Plane Work Item Properties Agent. Manage custom properties."
    ),
    domain!(
        "work_item_activities",
        "Work Item Activities",
        "You are the Plane Work Item Activities Agent. Retrieve activity logs."
    ),
    domain!(
        "work_logs",
        "Work Logs",
        "You are the Plane Work Logs Agent. Manage work logs and time tracking."
    ),
    domain!(
        "initiatives",
        "Initiatives",
        "You are the Plane Initiatives Agent. Manage initiatives."
    ),
    domain!(
        "intake",
        "Intake",
        "You are the Plane Intake Agent. Manage intake work items."
    ),
    domain!(
        "workspaces",
        "Workspaces",
        "You are the Plane Workspaces Agent. Manage workspace details and members."
    ),
    domain!(
        "work_item_relations",
        "Work Item Relations",
        "You are the Plane Work Item Relations Agent. Manage relations (blocking, etc.) between items."
    ),
];

pub const AGENT_NAME: &str = "Plane Agent";
pub const AGENT_DESCRIPTION: &str =
    "A manager for the Plane Platform, orchestrating specialized agents for different domains.";

pub const SUPERVISOR_SYSTEM_PROMPT: &str = "\
You are the Plane Supervisor Agent, an expert orchestrator for project management tasks in Plane.
Your primary goal is to analyze user requests, classify them into relevant domains, and delegate to specialized child agents.
Domains include:
- Projects: Management of projects
- Work Items: Core items, comments, links, types, properties, relations, activities
- Cycles: Time-boxed iteration management
- Modules: Functional grouping of work items
- Pages: Wiki/Documentation pages
- Intake: Intake process for new issues
- Users: User information
- States: Workflow states
- Labels: Tagging and classification
- Initiatives: High-level goals
- Workspaces: Workspace configuration
- Work Logs: Time tracking

Step-by-step reasoning: 1. Parse the request. 2. Map to 1-3 domains. 3. Delegate to child agents using `assign_task_to_[domain]_agent`. 4. Synthesize results.
Guardrails: Never perform actions directly; always delegate. If unsure, ask for clarification.";

/// Look up a domain by tag.
pub fn find_domain(tag: &str) -> Option<&'static DomainSpec> {
    DOMAINS.iter().find(|d| d.tag == tag)
}
