use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Tags the building filter endpoint understands.
pub const EXHIBIT_TAGS: [&str; 10] = [
    "AI",
    "ICT",
    "Structures",
    "Mechanical",
    "Civil",
    "Power",
    "Automation",
    "Robotics",
    "Electronics",
    "Software",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Building {
    #[serde(default)]
    pub id: String,
    pub building_id: i64,
    #[serde(default)]
    pub zone_id: i64,
    pub building_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub exhibits: Vec<String>,
    #[serde(default)]
    pub exhibit_tags: HashMap<String, Vec<String>>,
}

impl Building {
    /// Exhibits in this building carrying `tag`.
    pub fn exhibits_tagged(&self, tag: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .exhibit_tags
            .iter()
            .filter(|(_, tags)| tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhibits_tagged() {
        let building: Building = serde_json::from_str(
            r#"{
                "id": "b1",
                "building_id": 3,
                "zone_id": 1,
                "building_name": "Engineering Hall",
                "exhibits": ["Rover", "Bridge", "Chatbot"],
                "exhibit_tags": {
                    "Rover": ["Robotics", "AI"],
                    "Bridge": ["Civil", "Structures"],
                    "Chatbot": ["ai", "Software"]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(building.exhibits_tagged("AI"), vec!["Chatbot", "Rover"]);
        assert_eq!(building.exhibits_tagged("Civil"), vec!["Bridge"]);
        assert!(building.exhibits_tagged("Power").is_empty());
        assert_eq!(building.description, "");
    }
}
