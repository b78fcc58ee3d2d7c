//! In-memory narrowing of a ledger result set.
//!
//! Stages run in a fixed order whatever order they were added in: project
//! name, contact/role name, explicit filters, currency. The first stage that
//! leaves nothing ends the run and names itself in the [`NotFound`] it returns.

use tracing::debug;

use crate::{
    movements::{Movement, RoleColumn, any_role_matches, any_role_present},
    outcome::{NotFound, NotFoundStage},
    text::{Needle, matches},
};

type Predicate = Box<dyn Fn(&Movement) -> bool + Send + Sync>;

/// Accessor for one optional text column.
pub type FieldAccessor = fn(&Movement) -> Option<&str>;

pub struct FilterStage {
    stage: NotFoundStage,
    detail: Option<String>,
    keep: Predicate,
}

impl std::fmt::Debug for FilterStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterStage")
            .field("stage", &self.stage)
            .field("detail", &self.detail)
            .finish_non_exhaustive()
    }
}

impl FilterStage {
    pub fn new<F>(stage: NotFoundStage, detail: Option<String>, keep: F) -> Self
    where
        F: Fn(&Movement) -> bool + Send + Sync + 'static,
    {
        Self {
            stage,
            detail,
            keep: Box::new(keep),
        }
    }

    /// Keeps movements whose project name contains any of `names`.
    pub fn projects(names: &[String]) -> Option<Self> {
        let names: Vec<&String> = names.iter().filter(|n| !n.trim().is_empty()).collect();
        if names.is_empty() {
            return None;
        }
        let detail = names
            .iter()
            .map(|n| n.trim())
            .collect::<Vec<_>>()
            .join(", ");
        let needles: Vec<Needle> = names.iter().map(|n| Needle::new(n)).collect();
        Some(Self::new(NotFoundStage::Project, Some(detail), move |m| {
            m.project_name
                .as_deref()
                .is_some_and(|project| needles.iter().any(|needle| needle.found_in(project)))
        }))
    }

    pub fn project(name: Option<&str>) -> Option<Self> {
        let name = name?.to_string();
        Self::projects(std::slice::from_ref(&name))
    }

    /// Keeps movements where `name` appears in any of `columns`.
    pub fn contact(
        stage: NotFoundStage,
        name: &str,
        columns: &'static [RoleColumn],
    ) -> Option<Self> {
        let needle = Needle::new(name);
        if needle.is_empty() {
            return None;
        }
        Some(Self::new(stage, Some(name.trim().to_string()), move |m| {
            any_role_matches(m, columns, &needle)
        }))
    }

    /// Keeps movements whose `field` equals any of `values` after
    /// normalization.
    pub fn one_of(field: FieldAccessor, values: &[String]) -> Option<Self> {
        let values: Vec<String> = values
            .iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            return None;
        }
        let detail = values.join(", ");
        Some(Self::new(NotFoundStage::Filters, Some(detail), move |m| {
            field(m).is_some_and(|value| values.iter().any(|wanted| matches(value, wanted)))
        }))
    }

    /// Keeps movements carrying any of `columns`.
    pub fn roles_present(columns: Vec<RoleColumn>) -> Option<Self> {
        if columns.is_empty() {
            return None;
        }
        let detail = columns
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Some(Self::new(NotFoundStage::Filters, Some(detail), move |m| {
            any_role_present(m, &columns)
        }))
    }

    pub fn currency(code: Option<&str>) -> Option<Self> {
        let code = code.map(str::trim).filter(|c| !c.is_empty())?;
        let wanted = code.to_ascii_uppercase();
        Some(Self::new(NotFoundStage::Currency, Some(wanted.clone()), move |m| {
            m.currency_key() == wanted
        }))
    }

    pub fn stage(&self) -> NotFoundStage {
        self.stage
    }

    pub fn apply(&self, movements: Vec<Movement>) -> Result<Vec<Movement>, NotFound> {
        let kept: Vec<Movement> = movements.into_iter().filter(|m| (self.keep)(m)).collect();
        if kept.is_empty() {
            return Err(NotFound::new(self.stage, self.detail.clone()));
        }
        Ok(kept)
    }
}

#[derive(Debug, Default)]
pub struct Pipeline {
    project: Option<FilterStage>,
    contact: Option<FilterStage>,
    filters: Vec<FilterStage>,
    currency: Option<FilterStage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, stage: Option<FilterStage>) -> Self {
        self.project = stage;
        self
    }

    pub fn contact(mut self, stage: Option<FilterStage>) -> Self {
        self.contact = stage;
        self
    }

    pub fn filter(mut self, stage: Option<FilterStage>) -> Self {
        self.filters.extend(stage);
        self
    }

    pub fn currency(mut self, stage: Option<FilterStage>) -> Self {
        self.currency = stage;
        self
    }

    pub fn stages(&self) -> impl Iterator<Item = &FilterStage> {
        self.project
            .iter()
            .chain(self.contact.iter())
            .chain(self.filters.iter())
            .chain(self.currency.iter())
    }

    pub fn run(&self, movements: Vec<Movement>) -> Result<Vec<Movement>, NotFound> {
        let mut remaining = movements;
        for stage in self.stages() {
            let before = remaining.len();
            remaining = stage.apply(remaining).inspect_err(|_| {
                debug!(stage = ?stage.stage(), before, "filter stage emptied the result set");
            })?;
        }
        Ok(remaining)
    }
}
