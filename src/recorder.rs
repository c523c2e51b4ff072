//! Append-only log of found wallets.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::worker::GenerationResult;

/// Receives every successful search result.
pub trait ResultRecorder: Send + Sync {
    fn record(&self, result: &GenerationResult) -> io::Result<()>;
}

/// Appends one line per result to a text file.
pub struct FileRecorder {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl ResultRecorder for FileRecorder {
    fn record(&self, result: &GenerationResult) -> io::Result<()> {
        let line = format!(
            "{} | {} | public={} | private={} | attempts={} | duration={:.3}s | worker={}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            result.wallet.address,
            result.wallet.public_key,
            result.wallet.private_key,
            result.attempts,
            result.duration.as_secs_f64(),
            result.worker_id,
        );

        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::Wallet;
    use std::time::Duration;

    fn result(address: &str) -> GenerationResult {
        GenerationResult {
            wallet: Wallet {
                address: address.into(),
                public_key: "ab".repeat(64),
                private_key: "cd".repeat(32),
            },
            attempts: 4242,
            duration: Duration::from_millis(1500),
            worker_id: 3,
        }
    }

    #[test]
    fn test_appends_lines() {
        let path = std::env::temp_dir().join(format!("vanity-recorder-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let recorder = FileRecorder::new(&path);
        recorder.record(&result("0xaaaa")).unwrap();
        recorder.record(&result("0xbbbb")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("| 0xaaaa |"));
        assert!(lines[1].contains("| 0xbbbb |"));
        assert!(lines[1].contains("attempts=4242"));
        assert!(lines[1].contains("duration=1.500s"));
        assert!(lines[1].contains(&format!("private={}", "cd".repeat(32))));

        std::fs::remove_file(&path).unwrap();
    }
}
