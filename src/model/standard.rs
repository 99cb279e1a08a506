use serde::{Deserialize, Serialize};

/// A curriculum standard that generation requests target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standard {
    pub id: u64,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub grade_level: Option<u32>,
    #[serde(default)]
    pub ela_standard_type: Option<String>,
    #[serde(default)]
    pub curriculum_board: Option<String>,
}

/// Query for `GET /standards/lookup`.
#[derive(Debug, Clone, Default)]
pub struct StandardLookup {
    pub code: Option<String>,
    pub grade_level: Option<u32>,
    pub curriculum_board: Option<String>,
    pub limit: Option<u32>,
}

impl StandardLookup {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(code) = &self.code {
            pairs.push(("code".to_string(), code.clone()));
        }
        if let Some(grade) = self.grade_level {
            pairs.push(("grade_level".to_string(), grade.to_string()));
        }
        if let Some(board) = &self.curriculum_board {
            pairs.push(("curriculum_board".to_string(), board.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}
