//! Inbound range payloads
//!
//! Request bodies are first read into these loosely typed mirrors of the
//! domain types so that a missing or malformed field can be reported with
//! its full path (`handsRange[2].actions[0].type`) instead of a generic
//! deserialization error.

use crate::error::ValidationError;
use crate::model::range::{require_text, Action, ActionType, HandRange, Range};
use crate::model::token::ClosedSet;
use serde::{Deserialize, Serialize};

/// Range as submitted by a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangePayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "hands_range")]
    pub hands_range: Option<Vec<HandRangePayload>>,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandRangePayload {
    #[serde(default, alias = "range_fraction")]
    pub range_fraction: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub actions: Option<Vec<ActionPayload>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionPayload {
    #[serde(default, rename = "type")]
    pub action_type: Option<String>,
    #[serde(default)]
    pub percentage: Option<f64>,
}

fn required<T>(value: Option<T>, field: impl Into<String>) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::MissingField {
        field: field.into(),
    })
}

impl ActionPayload {
    fn into_action(self, path: &str) -> Result<Action, ValidationError> {
        let type_field = format!("{}.type", path);
        let token = required(self.action_type, type_field.as_str())?;
        let action_type = ActionType::parse_token_for(&token, &type_field)?;
        let percentage = required(self.percentage, format!("{}.percentage", path))?;
        Ok(Action::new(action_type, percentage))
    }
}

impl HandRangePayload {
    fn into_hand_range(self, path: &str) -> Result<HandRange, ValidationError> {
        let range_fraction = required(self.range_fraction, format!("{}.rangeFraction", path))?;
        let label_field = format!("{}.label", path);
        let label = required(self.label, label_field.as_str())?;
        require_text(&label, &label_field)?;

        let actions_field = format!("{}.actions", path);
        let actions = required(self.actions, actions_field.as_str())?;
        if actions.is_empty() {
            return Err(ValidationError::EmptyList {
                field: actions_field,
            });
        }

        let actions = actions
            .into_iter()
            .enumerate()
            .map(|(i, action)| action.into_action(&format!("{}[{}]", actions_field, i)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HandRange::new(label, range_fraction, actions))
    }
}

impl TryFrom<RangePayload> for Range {
    type Error = ValidationError;

    fn try_from(payload: RangePayload) -> Result<Self, Self::Error> {
        let name = required(payload.name, "name")?;
        let hands = required(payload.hands_range, "handsRange")?;
        let user_id = required(payload.user_id, "userId")?;

        let hands_range = hands
            .into_iter()
            .enumerate()
            .map(|(i, hand)| hand.into_hand_range(&format!("handsRange[{}]", i)))
            .collect::<Result<Vec<_>, _>>()?;

        let range = Range {
            id: payload.id.filter(|id| !id.trim().is_empty()),
            name,
            hands_range,
            user_id,
        };
        range.validate()?;
        Ok(range)
    }
}

impl From<Range> for RangePayload {
    fn from(range: Range) -> Self {
        Self {
            id: range.id,
            name: Some(range.name),
            hands_range: Some(
                range
                    .hands_range
                    .into_iter()
                    .map(|hand| HandRangePayload {
                        range_fraction: Some(hand.range_fraction),
                        label: Some(hand.label),
                        actions: Some(
                            hand.actions
                                .into_iter()
                                .map(|action| ActionPayload {
                                    action_type: Some(action.action_type.token().to_string()),
                                    percentage: Some(action.percentage),
                                })
                                .collect(),
                        ),
                    })
                    .collect(),
            ),
            user_id: Some(range.user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<Range, ValidationError> {
        let payload: RangePayload = serde_json::from_value(value).unwrap();
        Range::try_from(payload)
    }

    fn valid_body() -> serde_json::Value {
        json!({
            "name": "BTN vs 3bet",
            "userId": "user-9",
            "handsRange": [
                {
                    "rangeFraction": 0.1,
                    "label": "QQ+",
                    "actions": [{"type": "RAISE", "percentage": 1.0}]
                },
                {
                    "rangeFraction": 0.2,
                    "label": "AQs",
                    "actions": [
                        {"type": "call", "percentage": 0.7},
                        {"type": "Fold", "percentage": 0.3}
                    ]
                }
            ]
        })
    }

    #[test]
    fn test_valid_payload_converts() {
        let range = parse(valid_body()).unwrap();
        assert_eq!(range.id, None);
        assert_eq!(range.name, "BTN vs 3bet");
        assert_eq!(range.hands_range.len(), 2);
        assert_eq!(range.hands_range[0].actions[0].action_type, ActionType::Raise);
        assert_eq!(range.hands_range[1].actions[1].action_type, ActionType::Fold);
    }

    #[test]
    fn test_snake_case_aliases_accepted() {
        let range = parse(json!({
            "name": "SB limp",
            "user_id": "user-2",
            "hands_range": [
                {"range_fraction": 0.5, "label": "any two", "actions": [{"type": "check", "percentage": 1.0}]}
            ]
        }))
        .unwrap();
        assert_eq!(range.user_id, "user-2");
        assert_eq!(range.hands_range[0].range_fraction, 0.5);
    }

    #[test]
    fn test_missing_fields_report_paths() {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("userId");
        assert_eq!(
            parse(body).unwrap_err(),
            ValidationError::MissingField {
                field: "userId".to_string()
            }
        );

        let mut body = valid_body();
        body["handsRange"][1]["actions"][0]
            .as_object_mut()
            .unwrap()
            .remove("percentage");
        assert_eq!(
            parse(body).unwrap_err().field(),
            Some("handsRange[1].actions[0].percentage")
        );

        let mut body = valid_body();
        body["handsRange"][0]
            .as_object_mut()
            .unwrap()
            .remove("rangeFraction");
        assert_eq!(
            parse(body).unwrap_err().field(),
            Some("handsRange[0].rangeFraction")
        );
    }

    #[test]
    fn test_unknown_action_type_rejected() {
        let mut body = valid_body();
        body["handsRange"][1]["actions"][1]["type"] = json!("jam");
        assert_eq!(
            parse(body).unwrap_err(),
            ValidationError::InvalidEnumValue {
                field: "handsRange[1].actions[1].type".to_string(),
                token: "jam".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_collections_rejected() {
        let mut body = valid_body();
        body["handsRange"] = json!([]);
        assert_eq!(parse(body).unwrap_err().field(), Some("handsRange"));

        let mut body = valid_body();
        body["handsRange"][0]["actions"] = json!([]);
        assert_eq!(
            parse(body).unwrap_err().field(),
            Some("handsRange[0].actions")
        );
    }

    #[test]
    fn test_blank_id_is_dropped() {
        let mut body = valid_body();
        body["id"] = json!("  ");
        assert_eq!(parse(body).unwrap().id, None);

        let mut body = valid_body();
        body["id"] = json!("66b0c0ffee");
        assert_eq!(parse(body).unwrap().id.as_deref(), Some("66b0c0ffee"));
    }

    #[test]
    fn test_range_converts_back_to_payload() {
        let range = parse(valid_body()).unwrap();
        let payload = RangePayload::from(range.clone());
        assert_eq!(Range::try_from(payload).unwrap(), range);
    }
}
