//! Scripted prompt and opening line for the conversational agent.

/// Context carried into one call's conversation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub candidate_name: String,
    pub role: String,
    pub notes: String,
    pub company_name: String,
    pub agent_name: String,
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Build the agent's system prompt from the call context.
pub fn build_prompt(ctx: &CallContext) -> String {
    let agent = or_default(&ctx.agent_name, "Sarah");
    let company = or_default(&ctx.company_name, "our company");
    let candidate = or_default(&ctx.candidate_name, "a candidate");
    let role = or_default(&ctx.role, "open position");

    let notes = if ctx.notes.is_empty() {
        String::new()
    } else {
        format!("\nAdditional context: {}\n", ctx.notes)
    };

    format!(
        "You are {agent}, a friendly and professional recruiting assistant \
calling on behalf of {company}.

You are calling {candidate} about the {role}.
{notes}
Your goals for this call:
1. Confirm you're speaking with the right person
2. Briefly introduce the opportunity
3. Gauge their interest level
4. If interested, ask a few quick screening questions:
   - Current availability / notice period
   - Relevant experience
   - Salary expectations (optional, handle sensitively)
5. If interested, schedule a follow-up call with the hiring team
6. If not interested, thank them politely and end the call

Guidelines:
- Be conversational, warm, and professional
- Keep responses concise (1-2 sentences when possible)
- Listen actively and respond naturally
- If they're busy, offer to call back at a better time
- If they ask to be removed from the list, acknowledge and end politely
- Never be pushy or aggressive
- If asked if you're an AI, be honest but emphasize you're here to help"
    )
}

/// Build the agent's opening line.
pub fn build_first_message(ctx: &CallContext) -> String {
    let agent = or_default(&ctx.agent_name, "Sarah");
    let company = or_default(&ctx.company_name, "the recruiting team");
    let candidate = or_default(&ctx.candidate_name, "the right person");

    format!("Hi, this is {agent} calling from {company}. Am I speaking with {candidate}?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_context_fields() {
        let ctx = CallContext {
            candidate_name: "Ada".to_string(),
            role: "Staff Engineer role".to_string(),
            notes: "Referred by Grace".to_string(),
            company_name: "Initech".to_string(),
            agent_name: "Sam".to_string(),
        };

        let prompt = build_prompt(&ctx);
        assert!(prompt.contains("You are Sam"));
        assert!(prompt.contains("on behalf of Initech"));
        assert!(prompt.contains("calling Ada about the Staff Engineer role"));
        assert!(prompt.contains("Referred by Grace"));
    }

    #[test]
    fn empty_context_falls_back_to_defaults() {
        let first = build_first_message(&CallContext::default());
        assert_eq!(
            first,
            "Hi, this is Sarah calling from the recruiting team. Am I speaking with the right person?"
        );
    }
}
