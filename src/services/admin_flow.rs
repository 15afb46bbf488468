// 管理员表单状态机
// Idle → Editing → Submitting → Done | Failed；Done / Failed 可重新进入 Editing

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FlowState {
    #[default]
    Idle,
    Editing,
    Submitting,
    Done,
    Failed { reason: String },
}

impl FlowState {
    fn name(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::Editing => "editing",
            FlowState::Submitting => "submitting",
            FlowState::Done => "done",
            FlowState::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("cannot {action} while {from}")]
    IllegalTransition {
        from: &'static str,
        action: &'static str,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminFlow {
    state: FlowState,
}

impl AdminFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        self.state == FlowState::Submitting
    }

    /// 打开表单；提交中不能重新编辑
    pub fn edit(&mut self) -> Result<(), FlowError> {
        match self.state {
            FlowState::Idle | FlowState::Editing | FlowState::Done | FlowState::Failed { .. } => {
                self.state = FlowState::Editing;
                Ok(())
            }
            FlowState::Submitting => Err(self.illegal("edit")),
        }
    }

    pub fn submit(&mut self) -> Result<(), FlowError> {
        match self.state {
            FlowState::Editing => {
                self.state = FlowState::Submitting;
                Ok(())
            }
            _ => Err(self.illegal("submit")),
        }
    }

    pub fn succeed(&mut self) -> Result<(), FlowError> {
        match self.state {
            FlowState::Submitting => {
                self.state = FlowState::Done;
                Ok(())
            }
            _ => Err(self.illegal("complete")),
        }
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), FlowError> {
        match self.state {
            FlowState::Submitting => {
                self.state = FlowState::Failed {
                    reason: reason.into(),
                };
                Ok(())
            }
            _ => Err(self.illegal("fail")),
        }
    }

    /// 关闭表单
    pub fn close(&mut self) -> Result<(), FlowError> {
        match self.state {
            FlowState::Submitting => Err(self.illegal("close")),
            _ => {
                self.state = FlowState::Idle;
                Ok(())
            }
        }
    }

    fn illegal(&self, action: &'static str) -> FlowError {
        FlowError::IllegalTransition {
            from: self.state.name(),
            action,
        }
    }
}
