//! History envelope for composed prompts
//!
//! backend CLI는 세션 개념이 없으므로 이전 turn을 평문 블록으로 감싸
//! 새 메시지 앞에 붙인다. 포맷은 바이트 단위로 고정이다:
//!
//! ```text
//! <conversation_history>
//! [user]: What is 2+2?
//! [assistant]: 4
//! </conversation_history>
//!
//! Continue the conversation. Respond to the following message:
//!
//! And 3+3?
//! ```

use crate::session::types::Turn;

pub const HISTORY_OPEN: &str = "<conversation_history>";
pub const HISTORY_CLOSE: &str = "</conversation_history>";
pub const HISTORY_INSTRUCTION: &str =
    "Continue the conversation. Respond to the following message:";

/// 이전 turn들과 새 메시지를 하나의 프롬프트로 합친다.
/// history가 비어 있으면 메시지를 그대로 돌려준다.
pub fn render<'a, I>(history: I, message: &str) -> String
where
    I: IntoIterator<Item = &'a Turn>,
{
    let lines: Vec<String> = history
        .into_iter()
        .map(|turn| format!("[{}]: {}", turn.role, turn.content))
        .collect();

    if lines.is_empty() {
        return message.to_string();
    }

    format!(
        "{}\n{}\n{}\n\n{}\n\n{}",
        HISTORY_OPEN,
        lines.join("\n"),
        HISTORY_CLOSE,
        HISTORY_INSTRUCTION,
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_is_raw_message() {
        assert_eq!(render(&Vec::<Turn>::new(), "hello  \n"), "hello  \n");
    }

    #[test]
    fn test_envelope_byte_exact() {
        let turns = [Turn::user("What is 2+2?"), Turn::assistant("4")];
        let prompt = render(&turns, "And 3+3?");
        assert_eq!(
            prompt,
            "<conversation_history>\n\
             [user]: What is 2+2?\n\
             [assistant]: 4\n\
             </conversation_history>\n\
             \n\
             Continue the conversation. Respond to the following message:\n\
             \n\
             And 3+3?"
        );
    }

    #[test]
    fn test_multiline_content_kept_verbatim() {
        let turns = [Turn::user("line one\nline two")];
        let prompt = render(&turns, "next");
        assert!(prompt.contains("[user]: line one\nline two\n</conversation_history>"));
        assert!(prompt.ends_with(":\n\nnext"));
    }
}
