// 用户进度：点赞、点踩、收藏与已解决题目，存放在 users/<uid>

use crate::error::StoreError;
use crate::models::{ProblemRecord, UserProgress};
use crate::services::database::{Write, USERS};
use crate::services::problem_store::ProblemStore;
use crate::services::store_client::StoreClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const LIKED: &str = "likedProblems";
const DISLIKED: &str = "dislikedProblems";
const STARRED: &str = "starredProblems";
const SOLVED: &str = "solvedProblems";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Dislike,
    Clear,
}

/// 仪表盘数据
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub liked: Vec<ProblemRecord>,
    pub disliked: Vec<ProblemRecord>,
    pub starred: Vec<ProblemRecord>,
    pub solved: Vec<String>,
}

#[derive(Clone)]
pub struct ProgressStore {
    client: StoreClient,
    problems: ProblemStore,
}

impl ProgressStore {
    pub fn new(client: StoreClient) -> Self {
        Self {
            problems: ProblemStore::new(client.clone()),
            client,
        }
    }

    /// 文档不存在时返回空进度
    pub async fn get_progress(&self, uid: &str) -> Result<UserProgress, StoreError> {
        Ok(self
            .client
            .get_as::<UserProgress>(USERS, uid)
            .await?
            .unwrap_or_default())
    }

    /// 把题目 id 解析为题目记录，不存在的 id 被略过
    pub async fn resolve(&self, ids: &[String]) -> Result<Vec<ProblemRecord>, StoreError> {
        self.problems.get_many(ids).await
    }

    /// 点赞与点踩互斥，在一次提交中完成
    pub async fn set_reaction(
        &self,
        uid: &str,
        problem_id: &str,
        reaction: Reaction,
    ) -> Result<UserProgress, StoreError> {
        let id = vec![Value::String(problem_id.to_string())];
        let writes = match reaction {
            Reaction::Like => vec![
                Write::array_union(USERS, uid, LIKED, id.clone()),
                Write::array_remove(USERS, uid, DISLIKED, id),
            ],
            Reaction::Dislike => vec![
                Write::array_union(USERS, uid, DISLIKED, id.clone()),
                Write::array_remove(USERS, uid, LIKED, id),
            ],
            Reaction::Clear => vec![
                Write::array_remove(USERS, uid, LIKED, id.clone()),
                Write::array_remove(USERS, uid, DISLIKED, id),
            ],
        };
        self.client.commit(writes).await?;
        log::debug!("user {} reaction {:?} on {}", uid, reaction, problem_id);
        self.get_progress(uid).await
    }

    /// 切换收藏状态，返回切换后是否已收藏
    pub async fn toggle_star(&self, uid: &str, problem_id: &str) -> Result<bool, StoreError> {
        let progress = self.get_progress(uid).await?;
        let starred = progress.starred_problems.iter().any(|p| p == problem_id);
        let id = vec![Value::String(problem_id.to_string())];

        if starred {
            self.client.array_remove(USERS, uid, STARRED, id).await?;
        } else {
            self.client.array_union(USERS, uid, STARRED, id).await?;
        }
        Ok(!starred)
    }

    /// 记录已解决题目，重复调用无副作用
    pub async fn mark_solved(&self, uid: &str, problem_id: &str) -> Result<(), StoreError> {
        self.client
            .array_union(USERS, uid, SOLVED, vec![Value::String(problem_id.to_string())])
            .await
    }

    /// 并发解析三个列表
    pub async fn dashboard(&self, uid: &str) -> Result<Dashboard, StoreError> {
        let progress = self.get_progress(uid).await?;

        let (liked, disliked, starred) = futures::join!(
            self.resolve(&progress.liked_problems),
            self.resolve(&progress.disliked_problems),
            self.resolve(&progress.starred_problems),
        );

        Ok(Dashboard {
            liked: liked?,
            disliked: disliked?,
            starred: starred?,
            solved: progress.solved_problems,
        })
    }
}
