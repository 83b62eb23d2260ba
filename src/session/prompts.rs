//! Persona prompts for session chat.

use super::ResponseMode;
use crate::types::Message;

pub const CHAT_SYSTEM: &str = "\
You are OrbitFlow, a senior AI copilot that writes concise yet actionable answers. \
Always think through the request before replying, but expose only the final response.
Internally follow the workflow START ➜ PLAN ➜ TOOL ➜ OBSERVE ➜ OUTPUT to reason about every question, even if no tools are available.
Guidelines:
1. Lead with an 'Insight' sentence summarizing the answer.
2. Follow with a 'Details' section that uses short bullet lines.
3. Close with 'Next steps' and either list clear follow-ups or write 'No next steps.'
4. Keep technical accuracy high, cite concrete facts, and stay calm and encouraging.";

pub const TONE_CONTROL: &str = "\
Tone control: adapt to the requested response_mode.
- helpful: friendly mentor tone.
- concise: direct bullet summary, omit fluff.
- expert: authoritative consultant voice with rationale.";

const CHAT_EXAMPLE_QUESTION: &str = "Example: I need a quick way to explain recursion to a junior dev.";
const CHAT_EXAMPLE_ANSWER: &str = "\
Insight: Recursion is a function calling itself until a base case.
Details:
- Show the base case first.
- Use a small factorial example.
Next steps: Practice tracing factorial(4).";

pub const REASON_SYSTEM: &str = r#"You are ApexReasoner, built for transparent structured reasoning.
Emulate the workflow START ➜ PLAN ➜ TOOL ➜ OBSERVE ➜ OUTPUT for every query.
Return ONLY strict JSON matching:
{"workflow": [ {"step": string, "content": string, "tool_call": string | null, "tool_input": string | null } ],
 "answer": string }
Rules:
- Include at least START, PLAN, and OUTPUT objects.
- TOOL and OBSERVE entries appear only if tools are hypothetically used.
- Each content value must describe the action in one concise sentence.
- The final answer string should restate the conclusion plainly."#;

const REASON_EXAMPLE_QUESTION: &str = "Example: What is the perimeter of a 5 by 9 rectangle?";
const REASON_EXAMPLE_ANSWER: &str = r#"{"workflow": [ {"step": "START", "content": "Identify this as a perimeter calculation.", "tool_call": null, "tool_input": null }, {"step": "PLAN", "content": "Use formula 2 * (w + h) with w=5, h=9.", "tool_call": null, "tool_input": null }, {"step": "PLAN", "content": "Compute 5 + 9 = 14 and double it to get 28.", "tool_call": null, "tool_input": null }, {"step": "OUTPUT", "content": "State the perimeter result.", "tool_call": null, "tool_input": null } ], "answer": "The perimeter is 28 units."}"#;

/// Persona, tone rules, one worked example, the session so far, then the request.
pub fn chat_messages(history: &[Message], input: &str, mode: ResponseMode) -> Vec<Message> {
    let mut messages = vec![
        Message::system(CHAT_SYSTEM),
        Message::system(TONE_CONTROL),
        Message::user(CHAT_EXAMPLE_QUESTION),
        Message::assistant(CHAT_EXAMPLE_ANSWER),
    ];
    messages.extend_from_slice(history);
    messages.push(Message::user(format!(
        "Follow the structure above. Work through the request using the \
         START/PLAN/TOOL/OBSERVE/OUTPUT checklist before responding.\n\
         User message: {input}\n\
         Desired response mode: {mode}."
    )));
    messages
}

pub fn reason_messages(history: &[Message], query: &str) -> Vec<Message> {
    let mut messages = vec![
        Message::system(REASON_SYSTEM),
        Message::user(REASON_EXAMPLE_QUESTION),
        Message::assistant(REASON_EXAMPLE_ANSWER),
    ];
    messages.extend_from_slice(history);
    messages.push(Message::user(format!(
        "Solve the problem carefully. If a tool would help, describe its hypothetical call \
         in the workflow, but keep tool_call/tool_input null otherwise.\n\
         Return valid JSON only. Problem: {query}"
    )));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_example_is_valid_json() {
        let parsed: serde_json::Value = serde_json::from_str(REASON_EXAMPLE_ANSWER).unwrap();
        assert_eq!(parsed["answer"], "The perimeter is 28 units.");
        assert_eq!(parsed["workflow"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn chat_request_carries_mode_and_history() {
        let history = vec![Message::user("earlier"), Message::assistant("reply")];
        let messages = chat_messages(&history, "What is a monad?", ResponseMode::Expert);
        assert_eq!(messages.len(), 7);
        assert_eq!(messages[4].text, "earlier");
        let last = &messages[6].text;
        assert!(last.contains("User message: What is a monad?"));
        assert!(last.ends_with("Desired response mode: expert."));
    }
}
