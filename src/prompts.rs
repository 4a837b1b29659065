//! Fixed prompt templates and placeholder interpolation.
//!
//! Templates carry `{context}` / `{question}` / `{answer}` placeholders.
//! Substitution is a single left-to-right pass over a closed set of
//! recognized names: a placeholder-looking token inside substituted user
//! content is never re-expanded, and unrecognized tokens pass through
//! unchanged.

/// System message instructing the model to answer strictly from context.
pub const QNA_SYSTEM_MESSAGE: &str = "\
You are a highly accurate and concise question-answering assistant.
Your sole purpose is to answer questions ONLY based on the provided CONTEXT.

You will be given a CONTEXT and a QUESTION.
You must follow these strict rules when answering:

RULES:
1. If the answer to the question IS PRESENT in the provided CONTEXT, answer concisely.
2. If the answer to the question IS NOT PRESENT in the provided CONTEXT, respond \"I don't know\". No additional information, no apologies, no elaborations.
3. DO NOT use any external knowledge. Rely strictly on the provided CONTEXT.
4. Do not rephrase the question in your answer.

Strictly adhere to these rules.
";

/// User message template combining retrieved context with the question.
pub const QNA_USER_MESSAGE_TEMPLATE: &str = "\
###Context
Here are some documents that are relevant to the question mentioned below.
{context}

###Question
{question}
";

/// System message for the groundedness judge.
pub const GROUNDEDNESS_RATER_SYSTEM_MESSAGE: &str = "\
You are tasked with rating AI generated answers to questions posed by users.
You will be presented a question, context used by the AI system to generate the answer and an AI generated answer to the question.
In the input, the question will begin with ###Question, the context will begin with ###Context while the AI generated answer will begin with ###Answer.

Evaluation criteria:
The task is to judge the extent to which the metric is followed by the answer.
1 - The metric is not followed at all
2 - The metric is followed only to a limited extent
3 - The metric is followed to a good extent
4 - The metric is followed mostly
5 - The metric is followed completely

Metric:
The answer should be derived only from the information presented in the context

Instructions:
1. First write down the steps that are needed to evaluate the answer as per the metric.
2. Give a step-by-step explanation if the answer adheres to the metric considering the question and context as the input.
3. Next, evaluate the extent to which the metric is followed.
4. Use the previous information to rate the answer using the evaluaton criteria and assign a score.
";

/// System message for the relevance judge.
pub const RELEVANCE_RATER_SYSTEM_MESSAGE: &str = "\
You are tasked with rating AI generated answers to questions posed by users.
You will be presented a question, context used by the AI system to generate the answer and an AI generated answer to the question.
In the input, the question will begin with ###Question, the context will begin with ###Context while the AI generated answer will begin with ###Answer.

Evaluation criteria:
The task is to judge the extent to which the metric is followed by the answer.
1 - The metric is not followed at all
2 - The metric is followed only to a limited extent
3 - The metric is followed to a good extent
4 - The metric is followed mostly
5 - The metric is followed completely

Metric:
Relevance measures how well the answer addresses the main aspects of the question, based on the context.
Consider whether all and only the important aspects are contained in the answer when evaluating relevance.

Instructions:
1. First write down the steps that are needed to evaluate the context as per the metric.
2. Give a step-by-step explanation if the context adheres to the metric considering the question as the input.
3. Next, evaluate the extent to which the metric is followed.
4. Use the previous information to rate the context using the evaluaton criteria and assign a score.
";

/// User message template shared by both evaluation flows.
pub const EVAL_USER_MESSAGE_TEMPLATE: &str = "\
###Question
{question}

###Context
{context}

###Answer
{answer}
";

/// Substitute recognized placeholders in `template` with their values.
///
/// Each `(name, value)` pair replaces every `{name}` occurrence. The scan
/// is a single pass: substituted values are emitted verbatim and never
/// re-examined, and `{` sequences that do not match a recognized name are
/// copied through unchanged.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    'scan: while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        for (name, value) in vars {
            let token_len = name.len() + 2;
            if tail.len() >= token_len
                && tail.as_bytes()[token_len - 1] == b'}'
                && &tail[1..token_len - 1] == *name
            {
                out.push_str(value);
                rest = &tail[token_len..];
                continue 'scan;
            }
        }
        // Not a recognized placeholder; pass the brace through.
        out.push('{');
        rest = &tail[1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_every_occurrence() {
        let rendered = render("{q} and {q}", &[("q", "x")]);
        assert_eq!(rendered, "x and x");
    }

    #[test]
    fn ignores_unrecognized_placeholders() {
        let rendered = render("{question} {unknown}", &[("question", "why")]);
        assert_eq!(rendered, "why {unknown}");
    }

    #[test]
    fn does_not_resubstitute_user_content() {
        // Context that itself contains a placeholder-looking token must
        // survive untouched.
        let rendered =
            render("{context} / {question}", &[("context", "{question}"), ("question", "why")]);
        assert_eq!(rendered, "{question} / why");
    }

    #[test]
    fn qna_template_interpolates_context_and_question() {
        let rendered = render(
            QNA_USER_MESSAGE_TEMPLATE,
            &[("context", "some facts"), ("question", "what facts?")],
        );
        assert!(rendered.contains("some facts"));
        assert!(rendered.contains("###Question\nwhat facts?"));
        assert!(!rendered.contains("{context}"));
    }

    #[test]
    fn rater_messages_share_rubric() {
        assert!(GROUNDEDNESS_RATER_SYSTEM_MESSAGE.contains("5 - The metric is followed completely"));
        assert!(RELEVANCE_RATER_SYSTEM_MESSAGE.contains("5 - The metric is followed completely"));
        assert!(GROUNDEDNESS_RATER_SYSTEM_MESSAGE.contains("derived only from the information"));
        assert!(RELEVANCE_RATER_SYSTEM_MESSAGE.contains("Relevance measures"));
    }
}
