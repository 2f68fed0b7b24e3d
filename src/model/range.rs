//! Range aggregate and its nested value objects

use crate::closed_set;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Store-generated identifier of a range document
pub type RangeId = String;

closed_set! {
    /// Decision taken for a share of a hand bucket's combos
    pub enum ActionType: "action type" {
        Fold => "fold",
        Call => "call",
        Raise => "raise",
        Check => "check",
    }
}

/// An action and the fraction of combos it applies to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Expected to lie in 0.0..=1.0; not enforced
    pub percentage: f64,
}

impl Action {
    pub fn new(action_type: ActionType, percentage: f64) -> Self {
        Self {
            action_type,
            percentage,
        }
    }

    fn validate_at(&self, path: &str) -> Result<(), ValidationError> {
        if !self.percentage.is_finite() {
            return Err(ValidationError::NotFinite {
                field: format!("{}.percentage", path),
            });
        }
        Ok(())
    }
}

/// One labeled bucket of a strategy chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandRange {
    pub range_fraction: f64,
    pub label: String,
    pub actions: Vec<Action>,
}

impl HandRange {
    pub fn new(label: impl Into<String>, range_fraction: f64, actions: Vec<Action>) -> Self {
        Self {
            range_fraction,
            label: label.into(),
            actions,
        }
    }

    fn validate_at(&self, path: &str) -> Result<(), ValidationError> {
        if !self.range_fraction.is_finite() {
            return Err(ValidationError::NotFinite {
                field: format!("{}.rangeFraction", path),
            });
        }
        require_text(&self.label, &format!("{}.label", path))?;
        if self.actions.is_empty() {
            return Err(ValidationError::EmptyList {
                field: format!("{}.actions", path),
            });
        }
        for (i, action) in self.actions.iter().enumerate() {
            action.validate_at(&format!("{}.actions[{}]", path, i))?;
        }
        Ok(())
    }

    /// Sum of action percentages; a well-formed bucket sums to 1.0
    pub fn total_percentage(&self) -> f64 {
        self.actions.iter().map(|a| a.percentage).sum()
    }
}

/// A named strategy chart owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RangeId>,
    pub name: String,
    pub hands_range: Vec<HandRange>,
    pub user_id: String,
}

impl Range {
    /// Create a range that has not been persisted yet
    pub fn new(
        name: impl Into<String>,
        user_id: impl Into<String>,
        hands_range: Vec<HandRange>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            hands_range,
            user_id: user_id.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<RangeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Check the aggregate invariants, cascading into every bucket and action
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "name")?;
        require_text(&self.user_id, "userId")?;
        if self.hands_range.is_empty() {
            return Err(ValidationError::EmptyList {
                field: "handsRange".to_string(),
            });
        }
        for (i, hand) in self.hands_range.iter().enumerate() {
            hand.validate_at(&format!("handsRange[{}]", i))?;
        }
        Ok(())
    }

    /// True when every field except the id matches
    pub fn same_content(&self, other: &Range) -> bool {
        self.name == other.name
            && self.user_id == other.user_id
            && self.hands_range == other.hands_range
    }
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField {
            field: field.to_string(),
        });
    }
    Ok(())
}
