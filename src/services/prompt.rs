//! 提示词构建
//!
//! 选择题模式下在原文后追加严格的输出格式要求；返回内容不做任何校验，
//! 原样交给调用方。

use crate::models::QueryRequest;

/// 模型判断输入不是选择题时应回复的字面量
pub const NOT_AN_MCQ: &str = "Not an MCQ";

const SINGLE_CHOICE_INSTRUCTION: &str = "\nIMPORTANT: This is a SINGLE CHOICE question where ONLY ONE option is correct. \
Analyze the question carefully and provide the single correct option.\n\n\
Format your response EXACTLY like this:\n\
- If options are A, B, C: 'A. [text of option A]' or 'C. [text of option C]'\n\
- If options are 1, 2, 3: '1. [text of option 1]' or '3. [text of option 3]'\n\n\
DO NOT include explanations, reasoning, or anything else. ONLY the single correct answer in the exact format shown above.\n\
If this is not an MCQ question, simply respond with 'Not an MCQ'";

const MULTIPLE_CHOICE_INSTRUCTION: &str = "\nIMPORTANT: This is a MULTIPLE CHOICE question where MULTIPLE options can be correct. \
Analyze the question carefully and provide ALL correct options.\n\n\
Format your response EXACTLY like this:\n\
- If options are A, B, C and A and C are correct: 'A. [text of option A], C. [text of option C]'\n\
- If options are 1, 2, 3 and 1 and 3 are correct: '1. [text of option 1], 3. [text of option 3]'\n\
- If only one option is correct, provide just that one: 'B. [text of option B]'\n\n\
DO NOT include explanations, reasoning, or anything else. ONLY the correct option(s) in the exact format shown above, separated by commas if multiple.\n\
If this is not an MCQ question, simply respond with 'Not an MCQ'";

/// 连接测试使用的固定提示词
pub const CONNECTION_TEST_PROMPT: &str =
    "Hello, this is a test message. Please respond with 'API connection successful!' if you receive this.";

/// 生成最终发送给模型的提示词
pub fn augment(request: &QueryRequest) -> String {
    if !request.is_mcq() {
        return request.text().to_string();
    }

    let instruction = if request.is_multiple_choice() {
        MULTIPLE_CHOICE_INSTRUCTION
    } else {
        SINGLE_CHOICE_INSTRUCTION
    };
    format!("{}{}", request.text(), instruction)
}

/// 带上下文的对话提示词
pub fn chat_prompt(message: &str, context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!(
            "Context: {}\n\nUser: {}\n\nPlease provide a helpful response.",
            context, message
        ),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_request_is_untouched() {
        let request = QueryRequest::new("What does Pin guarantee?");
        assert_eq!(augment(&request), "What does Pin guarantee?");
    }

    #[test]
    fn test_single_choice_instruction() {
        let prompt = augment(&QueryRequest::single_choice("What is 2+2? A.3 B.4"));
        assert!(prompt.starts_with("What is 2+2? A.3 B.4\n"));
        assert!(prompt.contains("SINGLE CHOICE"));
        assert!(prompt.contains(NOT_AN_MCQ));
        assert!(!prompt.contains("separated by commas"));
    }

    #[test]
    fn test_multiple_choice_instruction() {
        let prompt = augment(&QueryRequest::multiple_choice("Which are even? A.2 B.3 C.4"));
        assert!(prompt.contains("MULTIPLE options can be correct"));
        assert!(prompt.contains("separated by commas"));
        assert!(prompt.contains(NOT_AN_MCQ));
    }

    #[test]
    fn test_chat_prompt_with_context() {
        assert_eq!(chat_prompt("hi", None), "hi");
        assert_eq!(chat_prompt("hi", Some("  ")), "hi");
        assert_eq!(
            chat_prompt("why?", Some("lifetimes")),
            "Context: lifetimes\n\nUser: why?\n\nPlease provide a helpful response."
        );
    }
}
