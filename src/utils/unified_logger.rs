use chrono::Local;
use log::{Level, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
/// 统一日志管理模块
/// 进程日志由 log4rs 输出；下单审计日志通过注入的 AuditLog 写入，不依赖全局单例
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::config::LoggingSettings;
use crate::core::error::ExchangeError;

/// 日志格式，与原有 bot.log 保持一致
pub const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} - {l} - {m}{n}";

/// 审计日志的 log target
pub const AUDIT_TARGET: &str = "audit";

/// 解析日志级别
pub fn parse_level_filter(level: &str) -> LevelFilter {
    match level.to_uppercase().as_str() {
        "TRACE" => LevelFilter::Trace,
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARN" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// 初始化进程日志（文件 + 可选控制台）
pub fn init_logger(settings: &LoggingSettings) -> Result<(), ExchangeError> {
    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(&settings.file)
        .map_err(|e| ExchangeError::ConfigError(format!("打开日志文件失败: {}", e)))?;

    let mut builder =
        Config::builder().appender(Appender::builder().build("file", Box::new(file)));
    let mut root = Root::builder().appender("file");

    if settings.console {
        let console = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build();
        builder = builder.appender(Appender::builder().build("console", Box::new(console)));
        root = root.appender("console");
    }

    let config = builder
        .build(root.build(parse_level_filter(&settings.level)))
        .map_err(|e| ExchangeError::ConfigError(format!("日志配置错误: {}", e)))?;

    log4rs::init_config(config)
        .map_err(|e| ExchangeError::ConfigError(format!("初始化日志失败: {}", e)))?;

    Ok(())
}

/// 审计日志能力
///
/// 写入失败不得影响下单，因此接口不返回错误。
pub trait AuditLog: Send + Sync {
    fn record(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }
}

/// 只转发到 log 门面的审计日志
#[derive(Debug, Default, Clone)]
pub struct LogAudit;

impl AuditLog for LogAudit {
    fn record(&self, level: Level, message: &str) {
        log::log!(target: AUDIT_TARGET, level, "{}", message);
    }
}

/// 文件审计日志，持有文件句柄直到被释放，超过大小后轮转
pub struct FileAuditLog {
    path: PathBuf,
    file: Mutex<Option<fs::File>>,
    max_size: u64,
    current_size: Mutex<u64>,
}

impl FileAuditLog {
    /// 打开（或创建）审计日志文件
    pub fn open(path: impl AsRef<Path>, max_size_mb: u64) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
            max_size: max_size_mb.max(1) * 1024 * 1024,
            current_size: Mutex::new(current_size),
        })
    }

    /// 轮转：重命名当前文件并重新打开
    fn rotate(&self, file_guard: &mut Option<fs::File>, size_guard: &mut u64) {
        *file_guard = None;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audit");
        let rotated = self
            .path
            .with_file_name(format!("{}_{}_rotated.log", stem, timestamp));

        if let Err(e) = fs::rename(&self.path, &rotated) {
            log::warn!("审计日志轮转失败: {}", e);
        }

        match fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        {
            Ok(new_file) => {
                *file_guard = Some(new_file);
                *size_guard = 0;
            }
            Err(e) => log::warn!("重新打开审计日志失败: {}", e),
        }
    }
}

impl AuditLog for FileAuditLog {
    fn record(&self, level: Level, message: &str) {
        log::log!(target: AUDIT_TARGET, level, "{}", message);

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let formatted = format!("[{}] [{}] {}\n", timestamp, level, message);

        let (mut file_guard, mut size_guard) = match (self.file.lock(), self.current_size.lock())
        {
            (Ok(f), Ok(s)) => (f, s),
            _ => return,
        };

        if *size_guard + formatted.len() as u64 > self.max_size {
            self.rotate(&mut *file_guard, &mut *size_guard);
        }

        if let Some(ref mut file) = *file_guard {
            if file.write_all(formatted.as_bytes()).is_ok() {
                *size_guard += formatted.len() as u64;
                let _ = file.flush();
            }
        }
    }
}

impl Drop for FileAuditLog {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
            *guard = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("perpbot_audit_{}_{}", std::process::id(), name))
            .join("audit.log")
    }

    #[test]
    fn test_file_audit_log_writes_entries() {
        let path = temp_path("writes");
        {
            let audit = FileAuditLog::open(&path, 1).unwrap();
            audit.info("API Request: POST /fapi/v1/order");
            audit.error("API Error: -2019 - Margin is insufficient.");
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[INFO] API Request: POST /fapi/v1/order"));
        assert!(contents.contains("[ERROR] API Error: -2019"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_audit_log_rotates_when_full() {
        let path = temp_path("rotates");
        let line = "x".repeat(1000);
        {
            let audit = FileAuditLog::open(&path, 1).unwrap();
            for _ in 0..1100 {
                audit.info(&line);
            }
        }

        let dir = path.parent().unwrap();
        let rotated: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with("_rotated.log"))
            .collect();
        assert_eq!(rotated.len(), 1);
        assert!(rotated[0].metadata().unwrap().len() <= 1024 * 1024);
        assert!(fs::metadata(&path).unwrap().len() > 0);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_parse_level_filter() {
        assert_eq!(parse_level_filter("debug"), LevelFilter::Debug);
        assert_eq!(parse_level_filter("bogus"), LevelFilter::Info);
    }
}
