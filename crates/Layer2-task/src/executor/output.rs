//! Bounded output capture for child process pipes

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

/// stdout 캡처 상한 (5 MiB)
pub const MAX_STDOUT_BYTES: usize = 5 * 1024 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// 캡처된 파이프 출력
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub bytes: Vec<u8>,
    /// 상한을 넘어 일부 바이트가 버려졌는지
    pub truncated: bool,
}

impl CapturedOutput {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// 상한까지만 저장하고 나머지는 버린다
    fn push(&mut self, chunk: &[u8], limit: Option<usize>) {
        let accept = match limit {
            Some(limit) => chunk.len().min(limit.saturating_sub(self.bytes.len())),
            None => chunk.len(),
        };
        self.bytes.extend_from_slice(&chunk[..accept]);

        if accept < chunk.len() && !self.truncated {
            self.truncated = true;
            warn!(
                limit = limit.unwrap_or_default(),
                "Output exceeded capture limit, dropping remaining bytes"
            );
        }
    }
}

/// EOF까지 읽는다. 상한을 넘어도 파이프는 계속 비워서 child가 막히지 않게 한다.
pub async fn capture<R>(mut reader: R, limit: Option<usize>) -> CapturedOutput
where
    R: AsyncRead + Unpin,
{
    let mut output = CapturedOutput::default();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => output.push(&buf[..n], limit),
            Err(e) => {
                debug!("Pipe read error: {}", e);
                break;
            }
        }
    }

    output
}
