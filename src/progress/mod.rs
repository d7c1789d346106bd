//! 进度通道
//!
//! 生产者（编排器）每次状态变化推送一份完整的 `WorkflowState` 快照，
//! 消费者按顺序取出。通道无界：生产者不会因为慢消费者而阻塞，也不会丢弃快照。
//!
//! 线格式是 `data: <json>\n\n` 帧，与浏览器 EventSource 兼容。

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::WorkflowState;

const DATA_PREFIX: &str = "data: ";
const FRAME_END: &str = "\n\n";

pub type ProgressReceiver = mpsc::UnboundedReceiver<WorkflowState>;

/// 进度发送端
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<WorkflowState>,
}

impl ProgressSender {
    /// 推送一份快照，消费者已断开时返回 `false`
    pub fn emit(&self, state: WorkflowState) -> bool {
        match self.tx.send(state) {
            Ok(()) => true,
            Err(_) => {
                debug!("进度消费者已断开，快照未送达");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// 创建一对进度通道
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx }, rx)
}

/// 把快照编码成一帧
pub fn encode_frame(state: &WorkflowState) -> Result<String, serde_json::Error> {
    Ok(format!("{}{}{}", DATA_PREFIX, serde_json::to_string(state)?, FRAME_END))
}

/// 消费端的帧拆分器
///
/// 数据可能被任意切分，未完成的帧留在缓冲区等待下一块。
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一块数据，返回其中所有完整的快照
    pub fn push(&mut self, chunk: &str) -> Vec<WorkflowState> {
        self.buffer.push_str(chunk);

        let mut states = Vec::new();
        while let Some(end) = self.buffer.find(FRAME_END) {
            let frame: String = self.buffer.drain(..end + FRAME_END.len()).collect();
            for line in frame.lines() {
                let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                    continue;
                };
                match serde_json::from_str::<WorkflowState>(payload) {
                    Ok(state) => states.push(state),
                    Err(e) => warn!("⚠️ 无法解析进度帧: {}", e),
                }
            }
        }
        states
    }

    /// 缓冲区中尚未完成的字节数
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderResult;

    fn state(step: &str) -> WorkflowState {
        WorkflowState {
            is_running: true,
            current_step_id: step.to_string(),
            steps: Vec::new(),
            results: vec![OrderResult::processing("BoltYYZ3-1")],
            error: None,
        }
    }

    #[test]
    fn test_frame_format() {
        let frame = encode_frame(&state("login")).unwrap();
        assert!(frame.starts_with("data: {"));
        assert!(frame.ends_with("}\n\n"));
        assert_eq!(frame.matches('\n').count(), 2);
    }

    #[test]
    fn test_decoder_handles_split_frames() {
        let mut stream = encode_frame(&state("login")).unwrap();
        stream.push_str(&encode_frame(&state("facility")).unwrap());

        let mut decoder = FrameDecoder::new();
        let (head, tail) = stream.split_at(17);
        assert!(decoder.push(head).is_empty());
        assert!(decoder.pending() > 0);

        let states = decoder.push(tail);
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].current_step_id, "login");
        assert_eq!(states[1].current_step_id, "facility");
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_decoder_skips_garbage() {
        let mut decoder = FrameDecoder::new();
        let mut input = String::from(": keep-alive\n\ndata: {broken\n\n");
        input.push_str(&encode_frame(&state("complete")).unwrap());

        let states = decoder.push(&input);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].current_step_id, "complete");
    }

    #[tokio::test]
    async fn test_emit_reports_disconnect() {
        let (tx, mut rx) = progress_channel();
        assert!(tx.emit(state("initialize")));
        assert_eq!(rx.recv().await.unwrap().current_step_id, "initialize");

        drop(rx);
        assert!(!tx.emit(state("navigate")));
        assert!(tx.is_closed());
    }
}
