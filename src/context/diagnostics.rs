//! 诊断来源：进程监管方（构建 / 预览服务）把输出的错误行推进来，分析器只读快照

use std::sync::{Arc, Mutex};

/// 诊断来源
pub trait DiagnosticFeed: Send + Sync {
    /// 当前所有诊断行
    fn snapshot(&self) -> Vec<String>;

    fn push(&self, line: String);

    fn clear(&self);
}

/// 可共享的内存缓冲（clone 后指向同一份数据）
#[derive(Debug, Clone, Default)]
pub struct DiagnosticBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl DiagnosticBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticFeed for DiagnosticBuffer {
    fn snapshot(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line);
    }

    fn clear(&self) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_lines() {
        let buffer = DiagnosticBuffer::new();
        let supervisor_side = buffer.clone();
        supervisor_side.push("Failed to compile".into());
        assert_eq!(buffer.snapshot(), vec!["Failed to compile"]);
        buffer.clear();
        assert!(supervisor_side.is_empty());
    }
}
