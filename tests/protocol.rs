use genline::model::{token_budget, GenParams, LlmBackend};
use genline::protocol::serve;
use serde_json::Value;
use std::io::Cursor;

struct FakeBackend;

impl LlmBackend for FakeBackend {
    fn complete(&self, prompt: &str, _p: &GenParams) -> anyhow::Result<String> {
        // Simulate a backend error for specific input to exercise error handling
        if prompt == "fail" {
            anyhow::bail!("backend failure for test prompt");
        }
        Ok(format!("{prompt} and then some"))
    }
}

fn run(input: &str) -> Vec<Value> {
    let params = GenParams { max_length: 200 };
    let mut out = Vec::new();
    serve(&FakeBackend, &params, Cursor::new(input.as_bytes()), &mut out).unwrap();
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn prompt_gets_one_response_line() {
    let replies = run("{\"prompt\":\"Hello\"}\n");
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["response"], "Hello and then some");
    assert!(replies[0].get("error").is_none());
}

#[test]
fn missing_prompt_defaults_to_empty() {
    let replies = run("{}\n");
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["response"], " and then some");
}

#[test]
fn unknown_fields_are_ignored() {
    let replies = run("{\"prompt\":\"hi\",\"extra\":42}\n");
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["response"], "hi and then some");
}

#[test]
fn invalid_json_reports_error_and_continues() {
    let replies = run("not json\n{\"prompt\":\"next\"}\n");
    assert_eq!(replies.len(), 2);
    let msg = replies[0]["error"].as_str().unwrap();
    assert!(msg.contains("invalid request line"), "got: {msg}");
    assert!(replies[0].get("response").is_none());
    assert_eq!(replies[1]["response"], "next and then some");
}

#[test]
fn backend_error_does_not_stop_the_loop() {
    let replies = run("{\"prompt\":\"fail\"}\n{\"prompt\":\"ok\"}\n");
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["error"], "backend failure for test prompt");
    assert_eq!(replies[1]["response"], "ok and then some");
}

#[test]
fn every_reply_has_exactly_one_key() {
    let replies = run("{\"prompt\":\"a\"}\nbroken\n{\"prompt\":\"fail\"}\n");
    assert_eq!(replies.len(), 3);
    for reply in &replies {
        let obj = reply.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj.contains_key("response") ^ obj.contains_key("error"));
    }
}

#[test]
fn blank_line_terminates_the_loop() {
    let replies = run("{\"prompt\":\"a\"}\n\n{\"prompt\":\"b\"}\n");
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["response"], "a and then some");
}

#[test]
fn whitespace_line_is_a_request_not_a_terminator() {
    let replies = run("   \n{\"prompt\":\"b\"}\n");
    assert_eq!(replies.len(), 2);
    assert!(replies[0].get("error").is_some());
    assert_eq!(replies[1]["response"], "b and then some");
}

#[test]
fn end_of_input_terminates_the_loop() {
    assert!(run("").is_empty());
}

#[test]
fn budget_caps_total_length() {
    assert_eq!(token_budget(0, 200), 200);
    assert_eq!(token_budget(150, 200), 50);
    assert_eq!(token_budget(200, 200), 0);
    assert_eq!(token_budget(250, 200), 0);
}
