//! 错误分类与终端报错
//!
//! - `ErrorCategory`: 终止性错误是否值得换参数重跑
//! - `report_failure()`: 把错误、完整的 cause 链和提示写到 stderr 与日志
//! - `install_panic_handler()`: 崩溃前记录 panic 位置

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::panic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rerunning with other limits may succeed (e.g. search budget spent)
    Recoverable,
    /// Rerunning unchanged will fail the same way
    Fatal,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Recoverable => "RECOVERABLE",
            ErrorCategory::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Walks `error.source()` down to the root cause.
pub fn cause_chain(error: &(dyn Error + 'static)) -> Vec<String> {
    let mut causes = Vec::new();
    let mut next = error.source();
    while let Some(cause) = next {
        causes.push(cause.to_string());
        next = cause.source();
    }
    causes
}

/// 🔥 响亮报错：stderr 给人看，tracing 事件给日志文件
pub fn report_failure(error: &(dyn Error + 'static), category: ErrorCategory, hint: Option<&str>) {
    let causes = cause_chain(error);

    eprintln!("🔥 {}: {}", category, error);
    for (depth, cause) in causes.iter().enumerate() {
        eprintln!("   {}. Caused by: {}", depth + 1, cause);
    }
    if let Some(hint) = hint {
        eprintln!("   💡 {}", hint);
    }

    tracing::error!(
        category = %category,
        causes = ?causes,
        hint = hint.unwrap_or(""),
        "{}",
        error
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Unknown panic payload".to_string())
}

/// Logs panics through tracing before handing over to the default hook.
pub fn install_panic_handler() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let message = panic_message(info.payload());
        let location = info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "Unknown location".to_string());

        eprintln!("💥 PANIC at {}: {}", location, message);
        eprintln!("   This is a bug! Please report it.");
        tracing::error!(location = %location, "PANIC: {}", message);

        default_hook(info);
    }));
}
