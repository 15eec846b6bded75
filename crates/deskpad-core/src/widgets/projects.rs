use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{days_until, short_id};
use crate::clock::Clock;
use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::list::{FILTER_ALL, ListManager, Record};
use crate::store::StoreKey;
use crate::surface::Confirmed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[default]
    Planning,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "On Hold")]
    OnHold,
    Completed,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Planning,
        ProjectStatus::InProgress,
        ProjectStatus::OnHold,
        ProjectStatus::Completed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProjectStatus::Planning => "Planning",
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::OnHold => "On Hold",
            ProjectStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProjectStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "planning" => Ok(ProjectStatus::Planning),
            "inprogress" => Ok(ProjectStatus::InProgress),
            "onhold" => Ok(ProjectStatus::OnHold),
            "completed" | "done" => Ok(ProjectStatus::Completed),
            _ => Err(ValidationError::UnknownStatus(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub progress: u8,
}

pub fn deadline_label(days_left: i64) -> String {
    match days_left {
        d if d > 0 => format!("{d} days left"),
        0 => "Due today".to_string(),
        _ => "Overdue".to_string(),
    }
}

/// `all` sorts by deadline with undated projects last; any status name keeps
/// only that status in stored order.
fn filter_projects<'a>(items: &'a [Record<Project>], filter: &str) -> Vec<&'a Record<Project>> {
    if filter == FILTER_ALL {
        let mut sorted: Vec<&Record<Project>> = items.iter().collect();
        sorted.sort_by_key(|p| (p.data.deadline.is_none(), p.data.deadline));
        return sorted;
    }
    match filter.parse::<ProjectStatus>() {
        Ok(status) => items.iter().filter(|p| p.data.status == status).collect(),
        Err(_) => items.iter().collect(),
    }
}

fn render_project(project: &Record<Project>, today: NaiveDate) -> String {
    let mut line = format!(
        "{} {} [{}] {}%",
        short_id(project.id()),
        project.data.name,
        project.data.status,
        project.data.progress
    );
    if !project.data.description.is_empty() {
        line.push_str(&format!(" - {}", project.data.description));
    }
    if let Some(deadline) = project.data.deadline {
        line.push_str(&format!(
            " (due {deadline}, {})",
            deadline_label(days_until(today, deadline))
        ));
    }
    if !project.data.tasks.is_empty() {
        line.push_str(&format!(" {{{} tasks}}", project.data.tasks.len()));
    }
    line
}

#[derive(Debug)]
pub struct Projects {
    list: ListManager<Project>,
}

impl Projects {
    pub fn new(services: Services) -> Self {
        let clock: Rc<dyn Clock> = Rc::clone(&services.clock);
        let list = ListManager::new(StoreKey::Projects, services)
            .empty_message("No projects yet. Create one to get started!")
            .filter_with(filter_projects)
            .render_with(move |project: &Record<Project>| render_project(project, clock.today()));
        Self { list }
    }

    pub fn list(&self) -> &ListManager<Project> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListManager<Project> {
        &mut self.list
    }

    #[instrument(skip(self))]
    pub fn add(
        &mut self,
        name: &str,
        description: &str,
        status: ProjectStatus,
        deadline: Option<NaiveDate>,
    ) -> WidgetResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return self.list.services().reject(ValidationError::EmptyProjectName);
        }
        Ok(self.list.add(Project {
            name: name.to_string(),
            description: description.trim().to_string(),
            status,
            deadline,
            tasks: Vec::new(),
            progress: 0,
        }))
    }

    pub fn set_status(&mut self, id: &str, status: ProjectStatus) -> bool {
        self.list.update(id, |project| project.status = status)
    }

    pub fn set_progress(&mut self, id: &str, progress: i64) -> bool {
        let progress = progress.clamp(0, 100) as u8;
        self.list.update(id, |project| project.progress = progress)
    }

    pub fn add_task(&mut self, id: &str, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.list
            .update(id, |project| project.tasks.push(text.to_string()))
    }

    pub fn delete(&mut self, id: &str, confirmed: Confirmed) -> bool {
        self.list.delete(id, confirmed)
    }

    /// Days from today until the project's deadline, if it has one.
    pub fn days_until_deadline(&self, id: &str) -> Option<i64> {
        let deadline = self.list.get(id)?.data.deadline?;
        Some(days_until(self.list.services().clock.today(), deadline))
    }

    pub fn count_by_status(&self, status: ProjectStatus) -> usize {
        self.list
            .items()
            .iter()
            .filter(|p| p.data.status == status)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{ProjectStatus, Projects, deadline_label};
    use crate::dashboard::test_support::Harness;
    use crate::error::ValidationError;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn all_filter_sorts_by_deadline_with_undated_last() {
        let h = Harness::new();
        let mut projects = Projects::new(h.services.clone());
        projects
            .add("Undated", "", ProjectStatus::Planning, None)
            .expect("added");
        projects
            .add("Later", "", ProjectStatus::InProgress, date(2026, 12, 1))
            .expect("added");
        projects
            .add("Sooner", "", ProjectStatus::Planning, date(2026, 10, 20))
            .expect("added");

        let names: Vec<&str> = projects
            .list()
            .visible()
            .iter()
            .map(|p| p.data.name.as_str())
            .collect();
        assert_eq!(names, vec!["Sooner", "Later", "Undated"]);

        let names: Vec<String> = projects
            .list_mut()
            .set_filter("In Progress")
            .lines()
            .to_vec();
        assert_eq!(names.len(), 1);
        assert!(names[0].contains("Later [In Progress]"));
    }

    #[test]
    fn status_and_deadline_tracking() {
        let h = Harness::new();
        let mut projects = Projects::new(h.services.clone());
        let id = projects
            .add("Launch", "ship it", ProjectStatus::Planning, date(2026, 10, 20))
            .expect("added");

        assert!(projects.set_status(&id, ProjectStatus::Completed));
        assert_eq!(projects.count_by_status(ProjectStatus::Completed), 1);
        assert_eq!(projects.days_until_deadline(&id), Some(3));
        assert!(projects.set_progress(&id, 140));
        assert_eq!(projects.list().get(&id).map(|p| p.data.progress), Some(100));
        assert!(projects.add_task(&id, "write notes"));
        assert_eq!(projects.list().get(&id).map(|p| p.data.tasks.len()), Some(1));
    }

    #[test]
    fn name_is_required() {
        let h = Harness::new();
        let mut projects = Projects::new(h.services.clone());
        assert_eq!(
            projects.add(" ", "", ProjectStatus::Planning, None),
            Err(ValidationError::EmptyProjectName)
        );
    }

    #[test]
    fn labels_and_parsing() {
        assert_eq!(deadline_label(3), "3 days left");
        assert_eq!(deadline_label(0), "Due today");
        assert_eq!(deadline_label(-1), "Overdue");
        assert_eq!("in-progress".parse(), Ok(ProjectStatus::InProgress));
        assert_eq!("On Hold".parse(), Ok(ProjectStatus::OnHold));
        assert!("shipped".parse::<ProjectStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&ProjectStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
    }
}
