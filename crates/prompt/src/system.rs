//! Base system message text (spec.md §4.6, step 1) — the always-present
//! `<AGENT_FLOW>`/`<RISK_ASSESSMENT>` sections plus tool usage rules, in the
//! grounding repo's "always state the rules plainly, every round" register.

use aiq_core::{Skill, ToolDefinition};

pub fn build_system_message(agent_name: &str, tool_definitions: &[ToolDefinition], active_skills: &[&Skill]) -> String {
    let agent_flow = agent_flow_section();
    let risk_assessment = risk_assessment_section();
    let tools = tools_section(tool_definitions);
    let skills = skills_section(active_skills);

    format!(
        "You are {agent_name}, a terminal assistant that converts natural-language \
         requests into database queries and shell actions by calling tools.\n\n\
         {agent_flow}\n\n{risk_assessment}\n\n{tools}{skills}"
    )
}

fn agent_flow_section() -> String {
    "<AGENT_FLOW>\n\
     Classify each request as exploratory (the user is still figuring out what \
     they want — answer directly, ask clarifying questions, or run a low-risk \
     read) or definitive (the user has stated a concrete action — carry it out). \
     This classification guides your own judgment only; never mention it to the \
     user and never treat it as a rule about which tool to call.\n\
     </AGENT_FLOW>"
        .to_string()
}

fn risk_assessment_section() -> String {
    "<RISK_ASSESSMENT>\n\
     Every mutating tool call may carry a risk_level of low, medium, or high. \
     Set it according to the blast radius of the action: reads and idempotent \
     checks are low; anything that creates, deletes, or alters state, or that \
     is not on the auto-execute whitelist, should be high so the user is asked \
     to confirm. When a tool call comes back with error_type=permission_denied \
     because the user declined, do not retry the same call — propose an \
     alternative or ask what they'd like instead.\n\
     </RISK_ASSESSMENT>"
        .to_string()
}

fn tools_section(tool_definitions: &[ToolDefinition]) -> String {
    if tool_definitions.is_empty() {
        return String::new();
    }
    let listing = tool_definitions
        .iter()
        .map(|def| format!("  - {}: {}", def.name, def.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "TOOL USAGE RULES:\n\
         1. Prefer the tools below over free-text guesses whenever the user's \
            request requires current data or a real side effect.\n\
         2. When a tool result carries displayed=true, the user has already seen \
            the full output directly — do not restate it in your reply.\n\
         3. If a tool call fails, read the structured error and either retry with \
            a corrected call, try a resolving action, or explain the failure.\n\n\
         Available tools:\n{listing}\n"
    )
}

fn skills_section(active_skills: &[&Skill]) -> String {
    if active_skills.is_empty() {
        return String::new();
    }
    active_skills
        .iter()
        .map(|skill| {
            format!(
                "\n<SKILL name=\"{}\">\n{}\n</SKILL>\n",
                skill.metadata.name,
                skill.body.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("")
}
