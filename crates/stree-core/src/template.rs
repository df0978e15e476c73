//! Placeholder substitution for window names and agent prompts.
//!
//! Placeholders are written `{KEY}`. Substitution is a single pass over
//! the template, so a substituted value is never itself rescanned, and
//! unknown placeholders are left as they are.

use chrono::NaiveDate;

/// Replaces every `{key}` in `template` whose key appears in `vars`.
#[must_use]
pub fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let (before, from_open) = rest.split_at(open);
        out.push_str(before);

        let after_open = from_open.get(1..).unwrap_or_default();
        let replacement = after_open.find('}').and_then(|close| {
            let key = after_open.get(..close)?;
            let value = vars.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)?;
            Some((value, close))
        });

        match replacement {
            Some((value, close)) => {
                out.push_str(value);
                rest = after_open.get(close + 1..).unwrap_or_default();
            }
            None => {
                out.push('{');
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Builds a window name from a pattern with `{agent}` and `{parent}`.
#[must_use]
pub fn window_name(pattern: &str, agent: &str, parent: &str) -> String {
    substitute(pattern, &[("agent", agent), ("parent", parent)])
}

/// Numbers each line of a task description starting at 1.
///
/// `"fix bug\nadd test"` becomes `"1. fix bug\n2. add test"`.
#[must_use]
pub fn numbered_tasks(description: &str) -> String {
    description
        .split('\n')
        .enumerate()
        .map(|(i, line)| format!("{}. {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Derives a slug from the first line of a task description.
///
/// Lower-cased; runs of non-alphanumeric characters become one hyphen;
/// leading and trailing hyphens are dropped. Empty input yields `"task"`.
#[must_use]
pub fn task_slug(description: &str) -> String {
    let first_line = description.split('\n').next().unwrap_or_default();
    let mut slug = String::with_capacity(first_line.len());
    let mut pending_hyphen = false;

    for c in first_line.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        "task".to_string()
    } else {
        slug
    }
}

/// Quotes a string for a POSIX shell using single quotes.
#[must_use]
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Values substituted into the agent startup prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptVars {
    /// Upper-cased agent type.
    pub agent_type: String,
    pub project_name: String,
    pub parent_name: String,
    /// ISO calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub tasks: String,
    pub task_name: String,
}

impl PromptVars {
    pub fn new(
        agent_type: &str,
        project_name: impl Into<String>,
        parent_name: impl Into<String>,
        date: NaiveDate,
        task_description: &str,
    ) -> Self {
        Self {
            agent_type: agent_type.to_uppercase(),
            project_name: project_name.into(),
            parent_name: parent_name.into(),
            date: date.format("%Y-%m-%d").to_string(),
            tasks: numbered_tasks(task_description),
            task_name: task_slug(task_description),
        }
    }

    /// Renders `template`, replacing `{AGENT_TYPE}`, `{PROJECT_NAME}`,
    /// `{PARENT_NAME}`, `{DATE}`, `{TASKS}` and `{TASK_NAME}`.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        substitute(
            template,
            &[
                ("AGENT_TYPE", self.agent_type.as_str()),
                ("PROJECT_NAME", self.project_name.as_str()),
                ("PARENT_NAME", self.parent_name.as_str()),
                ("DATE", self.date.as_str()),
                ("TASKS", self.tasks.as_str()),
                ("TASK_NAME", self.task_name.as_str()),
            ],
        )
    }
}
