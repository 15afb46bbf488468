use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Easy" | "easy" => Ok(Difficulty::Easy),
            "Medium" | "medium" => Ok(Difficulty::Medium),
            "Hard" | "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// 题目记录，即 `problems/<id>` 文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRecord {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub dislikes: u32,
    /// 为空表示 "general"
    #[serde(default)]
    pub companies: Vec<String>,
}

/// 管理员表单提交的新题目
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProblem {
    pub id: String,
    pub title: String,
    pub difficulty: String,
    pub category: String,
    /// 表单里是文本框，保留原始输入再解析
    pub order: String,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    /// "general" 或空表示不属于任何公司
    #[serde(default)]
    pub company: Option<String>,
}

/// 公司详情的可选描述信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founded: Option<i32>,
}

/// 公司详情，即 `companiesDetails/<NAME>` 文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub name: String,
    #[serde(flatten)]
    pub details: CompanyDetails,
    pub created_at: DateTime<Utc>,
}

/// 用户进度，即 `users/<uid>` 文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    #[serde(default)]
    pub liked_problems: Vec<String>,
    #[serde(default)]
    pub disliked_problems: Vec<String>,
    #[serde(default)]
    pub starred_problems: Vec<String>,
    #[serde(default)]
    pub solved_problems: Vec<String>,
}

impl UserProgress {
    pub fn is_empty(&self) -> bool {
        self.liked_problems.is_empty()
            && self.disliked_problems.is_empty()
            && self.starred_problems.is_empty()
            && self.solved_problems.is_empty()
    }
}
