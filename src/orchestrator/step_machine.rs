//! 步骤状态机
//!
//! 按步骤表单向推进，每次变化都把整份快照推给进度通道。
//! 快照由步骤表和当前步骤折叠而成：
//! 当前步骤之前的全部 `completed`，之后的全部 `pending`。

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::SessionError;
use crate::models::{OrderResult, Step, StepDef, StepId, StepStatus, WorkflowKind, WorkflowState};
use crate::progress::ProgressSender;

/// 当前步骤所处的阶段
#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Running,
    StepDone,
    Finished,
    Failed(String),
}

/// 步骤状态机
pub struct StepMachine {
    table: Vec<StepDef>,
    current: Option<usize>,
    phase: Phase,
    results: Vec<OrderResult>,
    progress: ProgressSender,
    abort_on_disconnect: bool,
}

impl StepMachine {
    pub fn new(kind: WorkflowKind, config: &Config, progress: ProgressSender) -> Self {
        Self {
            table: kind.step_table(config),
            current: None,
            phase: Phase::Running,
            results: Vec::new(),
            progress,
            abort_on_disconnect: config.policy.abort_on_disconnect,
        }
    }

    fn index_of(&self, id: StepId) -> Option<usize> {
        self.table.iter().position(|def| def.id == id)
    }

    pub fn current_step(&self) -> Option<StepId> {
        self.current.map(|i| self.table[i].id)
    }

    pub fn results(&self) -> &[OrderResult] {
        &self.results
    }

    /// 折叠出当前快照
    pub fn snapshot(&self) -> WorkflowState {
        let steps = self
            .table
            .iter()
            .enumerate()
            .map(|(i, def)| {
                let (status, error) = match self.current {
                    Some(cur) if i < cur => (StepStatus::Completed, None),
                    Some(cur) if i == cur => match &self.phase {
                        Phase::Running => (StepStatus::Running, None),
                        Phase::StepDone | Phase::Finished => (StepStatus::Completed, None),
                        Phase::Failed(message) => (StepStatus::Error, Some(message.clone())),
                    },
                    _ => (StepStatus::Pending, None),
                };
                Step {
                    id: def.id,
                    title: def.title.to_string(),
                    description: def.description.clone(),
                    status,
                    error,
                }
            })
            .collect();

        let error = match &self.phase {
            Phase::Failed(message) => Some(message.clone()),
            _ => None,
        };

        WorkflowState {
            is_running: self.current.is_some()
                && matches!(self.phase, Phase::Running | Phase::StepDone),
            current_step_id: self
                .current_step()
                .map(|id| id.as_str().to_string())
                .unwrap_or_default(),
            steps,
            results: self.results.clone(),
            error,
        }
    }

    /// 推送快照；消费者断开且策略要求放弃时返回 `Cancelled`
    fn emit(&self) -> Result<(), SessionError> {
        if self.progress.emit(self.snapshot()) || !self.abort_on_disconnect {
            Ok(())
        } else {
            Err(SessionError::Cancelled)
        }
    }

    /// 进入下一个步骤，只允许按表顺序前进
    pub fn start(&mut self, id: StepId) -> Result<(), SessionError> {
        let Some(next) = self.index_of(id) else {
            warn!("步骤 {} 不属于当前流程，忽略", id);
            return Ok(());
        };
        let expected = self.current.map_or(0, |cur| cur + 1);
        if next != expected || matches!(self.phase, Phase::Failed(_) | Phase::Finished) {
            warn!("非法的步骤跳转: {:?} → {}", self.current_step(), id);
            return Ok(());
        }

        debug!("▶ 步骤 {} 开始", id);
        self.current = Some(next);
        self.phase = Phase::Running;
        self.emit()
    }

    /// 当前步骤完成
    pub fn complete(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Running {
            return Ok(());
        }
        if let Some(id) = self.current_step() {
            debug!("✓ 步骤 {} 完成", id);
        }
        self.phase = Phase::StepDone;
        self.emit()
    }

    /// 最后一个步骤完成，流程结束
    pub fn finish(&mut self) -> Result<(), SessionError> {
        self.phase = Phase::Finished;
        self.emit()
    }

    /// 当前步骤失败，推送终态快照
    ///
    /// 终态快照不受消费者断开影响，总是返回。
    pub fn fail(&mut self, message: impl Into<String>) -> WorkflowState {
        self.phase = Phase::Failed(message.into());
        let state = self.snapshot();
        self.progress.emit(state.clone());
        state
    }

    /// 更新某个步骤的描述
    pub fn describe(&mut self, id: StepId, description: impl Into<String>) -> Result<(), SessionError> {
        if let Some(i) = self.index_of(id) {
            self.table[i].description = description.into();
        }
        self.emit()
    }

    /// 追加一个订单结果，返回它的下标
    pub fn push_result(&mut self, result: OrderResult) -> Result<usize, SessionError> {
        self.results.push(result);
        self.emit()?;
        Ok(self.results.len() - 1)
    }

    /// 原地替换订单结果
    pub fn replace_result(&mut self, index: usize, result: OrderResult) -> Result<(), SessionError> {
        match self.results.get_mut(index) {
            Some(slot) if slot.is_final() => {
                warn!("订单 {} 已有最终结果，忽略更新", slot.order_number);
                return Ok(());
            }
            Some(slot) => *slot = result,
            None => self.results.push(result),
        }
        self.emit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{progress_channel, ProgressReceiver};

    fn machine(kind: WorkflowKind) -> (StepMachine, ProgressReceiver) {
        let (tx, rx) = progress_channel();
        (StepMachine::new(kind, &Config::default(), tx), rx)
    }

    fn drain(rx: &mut ProgressReceiver) -> Vec<WorkflowState> {
        let mut states = Vec::new();
        while let Ok(state) = rx.try_recv() {
            states.push(state);
        }
        states
    }

    fn statuses(state: &WorkflowState) -> Vec<StepStatus> {
        state.steps.iter().map(|s| s.status).collect()
    }

    #[test]
    fn test_fail_before_any_step() {
        let (mut machine, _rx) = machine(WorkflowKind::OrderSync);
        let state = machine.fail("Missing required configuration (username)");

        assert!(!state.is_running);
        assert_eq!(state.current_step_id, "");
        assert!(state.steps.iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(state.error.as_deref(), Some("Missing required configuration (username)"));
    }

    #[test]
    fn test_fail_folds_statuses() {
        let (mut machine, _rx) = machine(WorkflowKind::OrderSync);
        for id in [StepId::Initialize, StepId::Navigate, StepId::Login, StepId::Facility] {
            machine.start(id).unwrap();
            if id != StepId::Facility {
                machine.complete().unwrap();
            }
        }
        let state = machine.fail("Failed to select facility: boom");

        use StepStatus::*;
        assert_eq!(
            statuses(&state),
            vec![Completed, Completed, Completed, Error, Pending, Pending, Pending, Pending, Pending]
        );
        assert_eq!(state.current_step_id, "facility");
        assert_eq!(state.steps[3].error.as_deref(), Some("Failed to select facility: boom"));
        assert!(!state.is_running);
    }

    #[test]
    fn test_every_snapshot_respects_ordering() {
        let (mut machine, mut rx) = machine(WorkflowKind::FacilityOnly);
        for &id in WorkflowKind::FacilityOnly.step_ids() {
            machine.start(id).unwrap();
            machine.complete().unwrap();
        }
        machine.finish().unwrap();

        let states = drain(&mut rx);
        assert_eq!(states.len(), 11);
        for state in &states {
            let cur = state
                .steps
                .iter()
                .position(|s| s.id.as_str() == state.current_step_id)
                .unwrap();
            for (i, step) in state.steps.iter().enumerate() {
                if i < cur {
                    assert_eq!(step.status, StepStatus::Completed);
                } else if i > cur {
                    assert_eq!(step.status, StepStatus::Pending);
                } else {
                    assert_ne!(step.status, StepStatus::Pending);
                }
            }
        }

        let last = states.last().unwrap();
        assert!(!last.is_running);
        assert!(last.steps.iter().all(|s| s.status == StepStatus::Completed));
    }

    #[test]
    fn test_rejects_skipping_steps() {
        let (mut machine, mut rx) = machine(WorkflowKind::OrderSync);
        machine.start(StepId::Initialize).unwrap();
        machine.start(StepId::Login).unwrap();
        machine.start(StepId::ProcessOrders).unwrap();

        assert_eq!(machine.current_step(), Some(StepId::Initialize));
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_results_replaced_in_place() {
        let (mut machine, _rx) = machine(WorkflowKind::OrderSync);
        let index = machine.push_result(OrderResult::processing("A")).unwrap();
        machine
            .replace_result(index, OrderResult::success("A", "1-1", "ok"))
            .unwrap();

        assert_eq!(machine.results().len(), 1);
        assert!(machine.results()[0].is_final());

        // 终态不会被覆盖
        machine
            .replace_result(index, OrderResult::error("A", "late failure"))
            .unwrap();
        assert_eq!(machine.results()[0].location.as_deref(), Some("1-1"));
    }

    #[test]
    fn test_disconnect_cancels_only_when_configured() {
        let (tx, rx) = progress_channel();
        drop(rx);
        let mut lenient = StepMachine::new(WorkflowKind::OrderSync, &Config::default(), tx.clone());
        assert!(lenient.start(StepId::Initialize).is_ok());

        let mut config = Config::default();
        config.policy.abort_on_disconnect = true;
        let mut strict = StepMachine::new(WorkflowKind::OrderSync, &config, tx);
        assert!(matches!(
            strict.start(StepId::Initialize),
            Err(SessionError::Cancelled)
        ));
    }

    #[test]
    fn test_describe_updates_snapshot() {
        let (mut machine, _rx) = machine(WorkflowKind::OrderSync);
        machine
            .describe(StepId::ProcessOrders, "Processing BoltYYZ3-1 (1/2)")
            .unwrap();
        let state = machine.snapshot();
        assert_eq!(state.steps[7].description, "Processing BoltYYZ3-1 (1/2)");
    }
}
